use crate::model::{
    access::{SubjectKind, VerificationMethod},
    id::VehicleId,
};
use chrono::{DateTime, Utc};
use derive_new::new;
use uuid::Uuid;

#[derive(Debug, Clone, new)]
pub struct RecordAccess {
    pub occurred_at: DateTime<Utc>,
    pub subject_kind: SubjectKind,
    pub subject_id: Uuid,
    pub method: VerificationMethod,
    pub success: bool,
    pub details: serde_json::Value,
    pub vehicle_id: Option<VehicleId>,
}

#[derive(Debug, Default, new)]
pub struct AccessEventRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub subject_kind: Option<SubjectKind>,
}
