use crate::model::{
    id::{AmenityId, ReservationId, ResidentId, ShiftId, UnitId},
    reservation::ReservationStatus,
    window::TimeWindow,
};
use chrono::NaiveTime;
use strum::{AsRefStr, Display, EnumString};

pub mod event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationModel {
    // 区画ごとの排他予約（例: バーベキューコンロ）
    Unit,
    // 時間枠ごとの定員制
    Quota,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Amenity {
    pub amenity_id: AmenityId,
    pub name: String,
    pub model: AllocationModel,
    pub description: String,
    pub rules: String,
    pub is_active: bool,
    pub opens_at: Option<NaiveTime>,
    pub closes_at: Option<NaiveTime>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub unit_id: UnitId,
    pub amenity_id: AmenityId,
    pub name: String,
    pub description: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shift {
    pub shift_id: ShiftId,
    pub amenity_id: AmenityId,
    pub title: String,
    pub window: TimeWindow,
    pub capacity: i32,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmenityDetail {
    pub amenity: Amenity,
    pub units: Vec<Unit>,
    pub shifts: Vec<Shift>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitBooking {
    pub reservation_id: ReservationId,
    pub unit_id: UnitId,
    pub unit_name: String,
    pub window: TimeWindow,
    pub status: ReservationStatus,
    pub resident_id: ResidentId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftOccupancy {
    pub shift: Shift,
    pub occupied: i64,
}

impl ShiftOccupancy {
    pub fn available(&self) -> i64 {
        (i64::from(self.shift.capacity) - self.occupied).max(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmenityCalendar {
    Units(Vec<UnitBooking>),
    Shifts(Vec<ShiftOccupancy>),
}
