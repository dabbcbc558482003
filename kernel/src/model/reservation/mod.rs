use crate::model::{
    amenity::AllocationModel,
    id::{AmenityId, FamilyId, ReservationId, ResidentId, ShiftId, UnitId},
    window::TimeWindow,
};
use chrono::{DateTime, Utc};
use shared::error::{AppError, AppResult};
use strum::{AsRefStr, Display, EnumString};

pub mod event;
pub mod validation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl ReservationStatus {
    /// Only pending and confirmed reservations consume capacity.
    pub fn holds_capacity(self) -> bool {
        matches!(self, ReservationStatus::Pending | ReservationStatus::Confirmed)
    }
}

/// What a reservation claims: one unit for a time range, or seats in one shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationClaim {
    Unit { unit_id: UnitId, window: TimeWindow },
    Quota { shift_id: ShiftId, headcount: i32 },
}

impl ReservationClaim {
    pub fn model(&self) -> AllocationModel {
        match self {
            ReservationClaim::Unit { .. } => AllocationModel::Unit,
            ReservationClaim::Quota { .. } => AllocationModel::Quota,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub reservation_id: ReservationId,
    pub amenity_id: AmenityId,
    pub amenity_name: String,
    pub resident_id: ResidentId,
    pub family_id: Option<FamilyId>,
    pub status: ReservationStatus,
    pub claim: ReservationClaim,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

/// Claim fields as they arrive from a caller; absent fields fall back to the
/// reservation being updated, if any.
#[derive(Debug, Clone, Default)]
pub struct ClaimRequest {
    pub unit_id: Option<UnitId>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub shift_id: Option<ShiftId>,
    pub headcount: Option<i32>,
}

impl ClaimRequest {
    pub fn resolve(
        self,
        model: AllocationModel,
        current: Option<&ReservationClaim>,
    ) -> AppResult<ReservationClaim> {
        match model {
            AllocationModel::Unit => {
                let (cur_unit, cur_window) = match current {
                    Some(ReservationClaim::Unit { unit_id, window }) => {
                        (Some(*unit_id), Some(*window))
                    }
                    _ => (None, None),
                };
                let unit_id = self
                    .unit_id
                    .or(cur_unit)
                    .ok_or_else(|| AppError::MissingField("unit".into()))?;
                let starts_at = self
                    .starts_at
                    .or(cur_window.map(|w| w.starts_at()))
                    .ok_or_else(|| AppError::MissingField("startsAt".into()))?;
                let ends_at = self
                    .ends_at
                    .or(cur_window.map(|w| w.ends_at()))
                    .ok_or_else(|| AppError::MissingField("endsAt".into()))?;
                Ok(ReservationClaim::Unit {
                    unit_id,
                    window: TimeWindow::new(starts_at, ends_at)?,
                })
            }
            AllocationModel::Quota => {
                let (cur_shift, cur_headcount) = match current {
                    Some(ReservationClaim::Quota {
                        shift_id,
                        headcount,
                    }) => (Some(*shift_id), Some(*headcount)),
                    _ => (None, None),
                };
                let shift_id = self
                    .shift_id
                    .or(cur_shift)
                    .ok_or_else(|| AppError::MissingField("shift".into()))?;
                let headcount = self
                    .headcount
                    .or(cur_headcount)
                    .filter(|h| *h >= 1)
                    .ok_or_else(|| AppError::MissingField("headcount".into()))?;
                Ok(ReservationClaim::Quota {
                    shift_id,
                    headcount,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn nine() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn unit_claim_requires_unit_and_window() {
        let missing_unit = ClaimRequest {
            starts_at: Some(nine()),
            ends_at: Some(nine() + Duration::hours(3)),
            ..Default::default()
        };
        assert!(matches!(
            missing_unit.resolve(AllocationModel::Unit, None),
            Err(AppError::MissingField(f)) if f == "unit"
        ));

        let missing_end = ClaimRequest {
            unit_id: Some(UnitId::new()),
            starts_at: Some(nine()),
            ..Default::default()
        };
        assert!(matches!(
            missing_end.resolve(AllocationModel::Unit, None),
            Err(AppError::MissingField(_))
        ));
    }

    #[test]
    fn quota_claim_requires_shift_and_positive_headcount() {
        let shift_id = ShiftId::new();
        let zero = ClaimRequest {
            shift_id: Some(shift_id),
            headcount: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            zero.resolve(AllocationModel::Quota, None),
            Err(AppError::MissingField(f)) if f == "headcount"
        ));
        let no_shift = ClaimRequest {
            headcount: Some(2),
            ..Default::default()
        };
        assert!(matches!(
            no_shift.resolve(AllocationModel::Quota, None),
            Err(AppError::MissingField(f)) if f == "shift"
        ));
    }

    #[test]
    fn update_falls_back_to_current_claim() {
        let unit_id = UnitId::new();
        let current = ReservationClaim::Unit {
            unit_id,
            window: TimeWindow::new(nine(), nine() + Duration::hours(3)).unwrap(),
        };
        let later_end = ClaimRequest {
            ends_at: Some(nine() + Duration::hours(4)),
            ..Default::default()
        };
        let resolved = later_end
            .resolve(AllocationModel::Unit, Some(&current))
            .unwrap();
        let ReservationClaim::Unit { unit_id: u, window } = resolved else {
            panic!("expected a unit claim");
        };
        assert_eq!(u, unit_id);
        assert_eq!(window.starts_at(), nine());
        assert_eq!(window.ends_at(), nine() + Duration::hours(4));
    }

    #[test]
    fn cancelled_does_not_hold_capacity() {
        assert!(ReservationStatus::Pending.holds_capacity());
        assert!(ReservationStatus::Confirmed.holds_capacity());
        assert!(!ReservationStatus::Cancelled.holds_capacity());
    }
}
