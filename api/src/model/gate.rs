use chrono::{DateTime, Utc};
use derive_new::new;
use kernel::model::id::ResidentId;
use serde::Serialize;
use strum::{AsRefStr, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum GateAction {
    Open,
    Close,
}

#[derive(Debug, Serialize, new)]
#[serde(rename_all = "camelCase")]
pub struct GateActionResponse {
    pub gate: String,
    pub action: String,
    pub state: String,
    pub operated_by: ResidentId,
    pub operated_at: DateTime<Utc>,
}
