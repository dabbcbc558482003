use crate::model::id::{ResidentId, VisitorId};
use strum::{AsRefStr, EnumString};

pub mod event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessMode {
    Pedestrian,
    Vehicular,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visitor {
    pub visitor_id: VisitorId,
    pub full_name: String,
    pub document_id: Option<String>,
    pub access_mode: AccessMode,
    pub authorized_by: ResidentId,
}
