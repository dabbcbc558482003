use crate::model::{
    access::GateEvent,
    authorization::{AuthorizationCode, ExtensionRequest},
    id::{FamilyId, ResidentId},
    visitor::event::NewVisitor,
    window::TimeWindow,
};
use chrono::{DateTime, Utc};
use derive_new::new;

#[derive(Debug, new)]
pub struct CreateAuthorization {
    pub issued_by: ResidentId,
    pub family_id: FamilyId,
    pub visitor: NewVisitor,
    pub window: TimeWindow,
    pub entries_allowed: i32,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, new)]
pub struct ExtendAuthorization {
    pub code: AuthorizationCode,
    pub request: ExtensionRequest,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, new)]
pub struct CancelAuthorization {
    pub code: AuthorizationCode,
    pub requested_by: ResidentId,
}

#[derive(Debug, new)]
pub struct VerifyAccess {
    pub code: AuthorizationCode,
    pub event: GateEvent,
    pub presented_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct AuthorizationListOptions {
    pub family_id: Option<FamilyId>,
    pub status: Option<super::AuthorizationStatus>,
    // 指定時刻に有効期間内のものだけ
    pub valid_at: Option<DateTime<Utc>>,
}
