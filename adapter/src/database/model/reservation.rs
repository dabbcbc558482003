use super::parse_column;
use kernel::model::{
    id::{AmenityId, FamilyId, ReservationId, ResidentId, ShiftId, UnitId},
    reservation::{
        validation::{ShiftHold, UnitHold},
        Reservation, ReservationClaim,
    },
    window::TimeWindow,
};
use shared::error::AppError;
use sqlx::types::chrono::{DateTime, Utc};

pub const RESERVATION_SELECT: &str = r#"
    SELECT
        r.reservation_id,
        r.amenity_id,
        m.name AS amenity_name,
        r.resident_id,
        r.family_id,
        r.status,
        r.unit_id,
        r.starts_at,
        r.ends_at,
        r.shift_id,
        r.headcount,
        r.notes,
        r.created_at
    FROM reservations AS r
    INNER JOIN amenities AS m ON r.amenity_id = m.amenity_id
"#;

#[derive(sqlx::FromRow)]
pub struct ReservationRow {
    pub reservation_id: ReservationId,
    pub amenity_id: AmenityId,
    pub amenity_name: String,
    pub resident_id: ResidentId,
    pub family_id: Option<FamilyId>,
    pub status: String,
    pub unit_id: Option<UnitId>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub shift_id: Option<ShiftId>,
    pub headcount: Option<i32>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = AppError;

    fn try_from(value: ReservationRow) -> Result<Self, Self::Error> {
        let ReservationRow {
            reservation_id,
            amenity_id,
            amenity_name,
            resident_id,
            family_id,
            status,
            unit_id,
            starts_at,
            ends_at,
            shift_id,
            headcount,
            notes,
            created_at,
        } = value;
        let claim = match (unit_id, starts_at, ends_at, shift_id, headcount) {
            (Some(unit_id), Some(starts_at), Some(ends_at), None, None) => ReservationClaim::Unit {
                unit_id,
                window: TimeWindow::new(starts_at, ends_at)?,
            },
            (None, None, None, Some(shift_id), Some(headcount)) => ReservationClaim::Quota {
                shift_id,
                headcount,
            },
            _ => {
                return Err(AppError::ConversionEntityError(format!(
                    "予約（{reservation_id}）の区画・時間枠の組み合わせが不正です。"
                )))
            }
        };
        Ok(Reservation {
            reservation_id,
            amenity_id,
            amenity_name,
            resident_id,
            family_id,
            status: parse_column("reservations.status", &status)?,
            claim,
            notes,
            created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub struct UnitHoldRow {
    pub reservation_id: ReservationId,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: String,
}

impl TryFrom<UnitHoldRow> for UnitHold {
    type Error = AppError;

    fn try_from(value: UnitHoldRow) -> Result<Self, Self::Error> {
        Ok(UnitHold {
            reservation_id: value.reservation_id,
            window: TimeWindow::new(value.starts_at, value.ends_at)?,
            status: parse_column("reservations.status", &value.status)?,
        })
    }
}

#[derive(sqlx::FromRow)]
pub struct ShiftHoldRow {
    pub reservation_id: ReservationId,
    pub headcount: i32,
    pub status: String,
}

impl TryFrom<ShiftHoldRow> for ShiftHold {
    type Error = AppError;

    fn try_from(value: ShiftHoldRow) -> Result<Self, Self::Error> {
        Ok(ShiftHold {
            reservation_id: value.reservation_id,
            headcount: value.headcount,
            status: parse_column("reservations.status", &value.status)?,
        })
    }
}
