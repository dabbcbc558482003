use crate::model::id::ResidentId;
use serde::Serialize;
use strum::{AsRefStr, Display};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    AuthorizationCreated,
    AuthorizationExtended,
    AuthorizationExpired,
    AuthorizationCancelled,
    AccessDenied,
}

/// Delivery of resident-facing notifications.
///
/// Fire-and-forget: the call returns immediately and a delivery failure never
/// reaches the caller, so it cannot undo a committed transaction.
pub trait NotificationService: Send + Sync {
    fn notify(&self, recipient: ResidentId, kind: NotificationKind, payload: serde_json::Value);
}
