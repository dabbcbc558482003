use crate::model::{
    id::{AmenityId, FamilyId, ReservationId, ResidentId},
    reservation::{ClaimRequest, ReservationStatus},
};
use chrono::{DateTime, Utc};
use derive_new::new;

#[derive(Debug, new)]
pub struct CreateReservation {
    pub amenity_id: AmenityId,
    pub resident_id: ResidentId,
    pub family_id: Option<FamilyId>,
    pub claim: ClaimRequest,
    pub status: ReservationStatus,
    pub notes: String,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, new)]
pub struct UpdateReservation {
    pub reservation_id: ReservationId,
    pub claim: ClaimRequest,
    pub status: Option<ReservationStatus>,
    pub notes: Option<String>,
}

/// 予約を作らずに可否だけを確認する
#[derive(Debug, new)]
pub struct ValidateReservation {
    pub amenity_id: AmenityId,
    pub claim: ClaimRequest,
    pub status: ReservationStatus,
    pub excluding: Option<ReservationId>,
}

#[derive(Debug, Default)]
pub struct ReservationListOptions {
    pub amenity_id: Option<AmenityId>,
    pub resident_id: Option<ResidentId>,
    pub family_id: Option<FamilyId>,
    pub status: Option<ReservationStatus>,
}
