use super::parse_column;
use kernel::model::{
    access::AccessEvent,
    id::{AccessEventId, VehicleId},
};
use shared::error::AppError;
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(sqlx::FromRow)]
pub struct AccessEventRow {
    pub access_event_id: AccessEventId,
    pub occurred_at: DateTime<Utc>,
    pub subject_kind: String,
    pub subject_id: Uuid,
    pub method: String,
    pub success: bool,
    pub details: serde_json::Value,
    pub vehicle_id: Option<VehicleId>,
}

impl TryFrom<AccessEventRow> for AccessEvent {
    type Error = AppError;

    fn try_from(value: AccessEventRow) -> Result<Self, Self::Error> {
        let AccessEventRow {
            access_event_id,
            occurred_at,
            subject_kind,
            subject_id,
            method,
            success,
            details,
            vehicle_id,
        } = value;
        Ok(AccessEvent {
            access_event_id,
            occurred_at,
            subject_kind: parse_column("access_events.subject_kind", &subject_kind)?,
            subject_id,
            method: parse_column("access_events.method", &method)?,
            success,
            details,
            vehicle_id,
        })
    }
}
