use chrono::{DateTime, Utc};
use garde::Validate;
use kernel::model::{
    id::{AmenityId, FamilyId, ReservationId, ResidentId, ShiftId, UnitId},
    reservation::{
        event::{CreateReservation, ReservationListOptions, UpdateReservation, ValidateReservation},
        ClaimRequest, Reservation, ReservationClaim, ReservationStatus,
    },
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatusName {
    Pending,
    Confirmed,
    Cancelled,
}

impl From<ReservationStatus> for ReservationStatusName {
    fn from(value: ReservationStatus) -> Self {
        match value {
            ReservationStatus::Pending => Self::Pending,
            ReservationStatus::Confirmed => Self::Confirmed,
            ReservationStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl From<ReservationStatusName> for ReservationStatus {
    fn from(value: ReservationStatusName) -> Self {
        match value {
            ReservationStatusName::Pending => Self::Pending,
            ReservationStatusName::Confirmed => Self::Confirmed,
            ReservationStatusName::Cancelled => Self::Cancelled,
        }
    }
}

// 区画予約と時間枠予約で共通の指定項目
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ClaimFields {
    #[garde(skip)]
    pub unit_id: Option<UnitId>,
    #[garde(skip)]
    pub starts_at: Option<DateTime<Utc>>,
    #[garde(skip)]
    pub ends_at: Option<DateTime<Utc>>,
    #[garde(skip)]
    pub shift_id: Option<ShiftId>,
    #[garde(range(min = 1))]
    pub headcount: Option<i32>,
}

impl From<ClaimFields> for ClaimRequest {
    fn from(value: ClaimFields) -> Self {
        let ClaimFields {
            unit_id,
            starts_at,
            ends_at,
            shift_id,
            headcount,
        } = value;
        ClaimRequest {
            unit_id,
            starts_at,
            ends_at,
            shift_id,
            headcount,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationRequest {
    #[garde(skip)]
    pub amenity_id: AmenityId,
    #[garde(dive)]
    #[serde(flatten)]
    pub claim: ClaimFields,
    #[garde(skip)]
    pub status: Option<ReservationStatusName>,
    #[garde(length(max = 1000))]
    pub notes: Option<String>,
}

impl CreateReservationRequest {
    pub fn into_event(
        self,
        resident_id: ResidentId,
        family_id: Option<FamilyId>,
        now: DateTime<Utc>,
    ) -> CreateReservation {
        CreateReservation::new(
            self.amenity_id,
            resident_id,
            family_id,
            self.claim.into(),
            self.status
                .map(ReservationStatus::from)
                .unwrap_or(ReservationStatus::Confirmed),
            self.notes.unwrap_or_default(),
            now,
        )
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReservationRequest {
    #[garde(dive)]
    #[serde(flatten)]
    pub claim: ClaimFields,
    #[garde(skip)]
    pub status: Option<ReservationStatusName>,
    #[garde(length(max = 1000))]
    pub notes: Option<String>,
}

impl UpdateReservationRequest {
    pub fn into_event(self, reservation_id: ReservationId) -> UpdateReservation {
        UpdateReservation::new(
            reservation_id,
            self.claim.into(),
            self.status.map(ReservationStatus::from),
            self.notes,
        )
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ValidateReservationRequest {
    #[garde(dive)]
    #[serde(flatten)]
    pub claim: ClaimFields,
    #[garde(skip)]
    pub status: Option<ReservationStatusName>,
    #[garde(skip)]
    pub excluding_reservation_id: Option<ReservationId>,
}

impl ValidateReservationRequest {
    pub fn into_event(self, amenity_id: AmenityId) -> ValidateReservation {
        ValidateReservation::new(
            amenity_id,
            self.claim.into(),
            self.status
                .map(ReservationStatus::from)
                .unwrap_or(ReservationStatus::Confirmed),
            self.excluding_reservation_id,
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateReservationResponse {
    pub ok: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationListQuery {
    pub amenity_id: Option<AmenityId>,
    pub status: Option<ReservationStatusName>,
}

impl ReservationListQuery {
    pub fn into_options(self, family_id: Option<FamilyId>) -> ReservationListOptions {
        ReservationListOptions {
            amenity_id: self.amenity_id,
            resident_id: None,
            family_id,
            status: self.status.map(ReservationStatus::from),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationResponse {
    pub reservation_id: ReservationId,
    pub amenity_id: AmenityId,
    pub amenity_name: String,
    pub resident_id: ResidentId,
    pub family_id: Option<FamilyId>,
    pub status: ReservationStatusName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<UnitId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shift_id: Option<ShiftId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headcount: Option<i32>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl From<Reservation> for ReservationResponse {
    fn from(value: Reservation) -> Self {
        let Reservation {
            reservation_id,
            amenity_id,
            amenity_name,
            resident_id,
            family_id,
            status,
            claim,
            notes,
            created_at,
        } = value;
        let (unit_id, starts_at, ends_at, shift_id, headcount) = match claim {
            ReservationClaim::Unit { unit_id, window } => (
                Some(unit_id),
                Some(window.starts_at()),
                Some(window.ends_at()),
                None,
                None,
            ),
            ReservationClaim::Quota {
                shift_id,
                headcount,
            } => (None, None, None, Some(shift_id), Some(headcount)),
        };
        Self {
            reservation_id,
            amenity_id,
            amenity_name,
            resident_id,
            family_id,
            status: status.into(),
            unit_id,
            starts_at,
            ends_at,
            shift_id,
            headcount,
            notes,
            created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationsResponse {
    pub items: Vec<ReservationResponse>,
}

impl From<Vec<Reservation>> for ReservationsResponse {
    fn from(value: Vec<Reservation>) -> Self {
        Self {
            items: value.into_iter().map(ReservationResponse::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn create_defaults_to_confirmed() {
        let json = format!(
            r#"{{"amenityId":"{}","shiftId":"{}","headcount":2}}"#,
            AmenityId::new(),
            ShiftId::new()
        );
        let req: CreateReservationRequest = serde_json::from_str(&json).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        let event = req.into_event(ResidentId::new(), None, now);
        assert_eq!(event.status, ReservationStatus::Confirmed);
        assert_eq!(event.claim.headcount, Some(2));
        assert!(event.claim.unit_id.is_none());
        assert_eq!(event.notes, "");
    }
}
