use crate::model::{
    amenity::AllocationModel,
    id::AmenityId,
    window::TimeWindow,
};
use chrono::{DateTime, NaiveTime, Utc};
use derive_new::new;

#[derive(Debug, new)]
pub struct CreateAmenity {
    pub name: String,
    pub model: AllocationModel,
    pub description: String,
    pub rules: String,
    pub opens_at: Option<NaiveTime>,
    pub closes_at: Option<NaiveTime>,
}

#[derive(Debug, new)]
pub struct CreateUnit {
    pub amenity_id: AmenityId,
    pub name: String,
    pub description: String,
}

#[derive(Debug, new)]
pub struct CreateShift {
    pub amenity_id: AmenityId,
    pub title: String,
    pub window: TimeWindow,
    pub capacity: i32,
}

#[derive(Debug, Default)]
pub struct AmenityListOptions {
    pub is_active: Option<bool>,
    pub model: Option<AllocationModel>,
}

#[derive(Debug, Default, new)]
pub struct CalendarRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}
