use crate::model::{
    amenity::{
        event::{AmenityListOptions, CalendarRange, CreateAmenity, CreateShift, CreateUnit},
        Amenity, AmenityCalendar, AmenityDetail, Shift, Unit,
    },
    id::AmenityId,
};
use async_trait::async_trait;
use shared::error::AppResult;

#[async_trait]
pub trait AmenityRepository: Send + Sync {
    async fn create(&self, event: CreateAmenity) -> AppResult<Amenity>;
    async fn add_unit(&self, event: CreateUnit) -> AppResult<Unit>;
    async fn add_shift(&self, event: CreateShift) -> AppResult<Shift>;
    async fn find_all(&self, options: AmenityListOptions) -> AppResult<Vec<Amenity>>;
    async fn find_by_id(&self, amenity_id: AmenityId) -> AppResult<Option<AmenityDetail>>;
    // 区画ごとの予約状況、または時間枠ごとの空き状況
    async fn calendar(&self, amenity_id: AmenityId, range: CalendarRange) -> AppResult<AmenityCalendar>;
}
