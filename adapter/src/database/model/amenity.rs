use super::parse_column;
use kernel::model::{
    amenity::{Amenity, Shift, ShiftOccupancy, Unit, UnitBooking},
    id::{AmenityId, ReservationId, ResidentId, ShiftId, UnitId},
    window::TimeWindow,
};
use shared::error::AppError;
use sqlx::types::chrono::{DateTime, NaiveTime, Utc};

#[derive(sqlx::FromRow)]
pub struct AmenityRow {
    pub amenity_id: AmenityId,
    pub name: String,
    pub allocation_model: String,
    pub description: String,
    pub rules: String,
    pub is_active: bool,
    pub opens_at: Option<NaiveTime>,
    pub closes_at: Option<NaiveTime>,
}

impl TryFrom<AmenityRow> for Amenity {
    type Error = AppError;

    fn try_from(value: AmenityRow) -> Result<Self, Self::Error> {
        let AmenityRow {
            amenity_id,
            name,
            allocation_model,
            description,
            rules,
            is_active,
            opens_at,
            closes_at,
        } = value;
        Ok(Amenity {
            amenity_id,
            name,
            model: parse_column("amenities.allocation_model", &allocation_model)?,
            description,
            rules,
            is_active,
            opens_at,
            closes_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub struct UnitRow {
    pub unit_id: UnitId,
    pub amenity_id: AmenityId,
    pub name: String,
    pub description: String,
    pub is_active: bool,
}

impl From<UnitRow> for Unit {
    fn from(value: UnitRow) -> Self {
        let UnitRow {
            unit_id,
            amenity_id,
            name,
            description,
            is_active,
        } = value;
        Unit {
            unit_id,
            amenity_id,
            name,
            description,
            is_active,
        }
    }
}

#[derive(sqlx::FromRow)]
pub struct ShiftRow {
    pub shift_id: ShiftId,
    pub amenity_id: AmenityId,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub capacity: i32,
    pub is_active: bool,
}

impl TryFrom<ShiftRow> for Shift {
    type Error = AppError;

    fn try_from(value: ShiftRow) -> Result<Self, Self::Error> {
        let ShiftRow {
            shift_id,
            amenity_id,
            title,
            starts_at,
            ends_at,
            capacity,
            is_active,
        } = value;
        Ok(Shift {
            shift_id,
            amenity_id,
            title,
            window: TimeWindow::new(starts_at, ends_at)?,
            capacity,
            is_active,
        })
    }
}

// 時間枠と、その枠を占有している人数の合計
#[derive(sqlx::FromRow)]
pub struct ShiftOccupancyRow {
    #[sqlx(flatten)]
    pub shift: ShiftRow,
    pub occupied: i64,
}

impl TryFrom<ShiftOccupancyRow> for ShiftOccupancy {
    type Error = AppError;

    fn try_from(value: ShiftOccupancyRow) -> Result<Self, Self::Error> {
        Ok(ShiftOccupancy {
            shift: Shift::try_from(value.shift)?,
            occupied: value.occupied,
        })
    }
}

#[derive(sqlx::FromRow)]
pub struct UnitBookingRow {
    pub reservation_id: ReservationId,
    pub unit_id: UnitId,
    pub unit_name: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: String,
    pub resident_id: ResidentId,
}

impl TryFrom<UnitBookingRow> for UnitBooking {
    type Error = AppError;

    fn try_from(value: UnitBookingRow) -> Result<Self, Self::Error> {
        let UnitBookingRow {
            reservation_id,
            unit_id,
            unit_name,
            starts_at,
            ends_at,
            status,
            resident_id,
        } = value;
        Ok(UnitBooking {
            reservation_id,
            unit_id,
            unit_name,
            window: TimeWindow::new(starts_at, ends_at)?,
            status: parse_column("reservations.status", &status)?,
            resident_id,
        })
    }
}
