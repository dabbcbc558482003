use crate::model::id::{AccessEventId, VehicleId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

pub mod event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum GateEvent {
    Enter,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SubjectKind {
    Resident,
    Visitor,
    Delivery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationMethod {
    Facial,
    Credential,
    Manual,
}

// 監査用の追記専用レコード。作成後に更新しない。
#[derive(Debug, Clone, PartialEq)]
pub struct AccessEvent {
    pub access_event_id: AccessEventId,
    pub occurred_at: DateTime<Utc>,
    pub subject_kind: SubjectKind,
    pub subject_id: Uuid,
    pub method: VerificationMethod,
    pub success: bool,
    pub details: serde_json::Value,
    pub vehicle_id: Option<VehicleId>,
}
