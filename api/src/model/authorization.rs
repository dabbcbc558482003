use chrono::{DateTime, Duration, Utc};
use derive_new::new;
use garde::Validate;
use kernel::model::{
    authorization::{
        event::{AuthorizationListOptions, CreateAuthorization},
        AuthorizationCode, AuthorizationStatus, ExtensionRequest, VisitAuthorization,
    },
    id::{AuthorizationId, FamilyId, ResidentId, VisitorId},
    visitor::{event::NewVisitor, AccessMode, Visitor},
    window::TimeWindow,
};
use kernel::repository::authorization::Extended;
use serde::{Deserialize, Serialize};
use shared::error::{AppError, AppResult};

// 終了時刻も滞在時間も指定されなかった場合の有効時間
const DEFAULT_VISIT_HOURS: i64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessModeName {
    Pedestrian,
    Vehicular,
}

impl From<AccessMode> for AccessModeName {
    fn from(value: AccessMode) -> Self {
        match value {
            AccessMode::Pedestrian => Self::Pedestrian,
            AccessMode::Vehicular => Self::Vehicular,
        }
    }
}

impl From<AccessModeName> for AccessMode {
    fn from(value: AccessModeName) -> Self {
        match value {
            AccessModeName::Pedestrian => Self::Pedestrian,
            AccessModeName::Vehicular => Self::Vehicular,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthorizationStatusName {
    Active,
    Expired,
    Cancelled,
    Used,
}

impl From<AuthorizationStatus> for AuthorizationStatusName {
    fn from(value: AuthorizationStatus) -> Self {
        match value {
            AuthorizationStatus::Active => Self::Active,
            AuthorizationStatus::Expired => Self::Expired,
            AuthorizationStatus::Cancelled => Self::Cancelled,
            AuthorizationStatus::Used => Self::Used,
        }
    }
}

impl From<AuthorizationStatusName> for AuthorizationStatus {
    fn from(value: AuthorizationStatusName) -> Self {
        match value {
            AuthorizationStatusName::Active => Self::Active,
            AuthorizationStatusName::Expired => Self::Expired,
            AuthorizationStatusName::Cancelled => Self::Cancelled,
            AuthorizationStatusName::Used => Self::Used,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAuthorizationRequest {
    #[garde(length(min = 1, max = 255))]
    pub visitor_name: String,
    #[garde(length(min = 1, max = 64))]
    pub document_id: Option<String>,
    #[garde(skip)]
    pub access_mode: AccessModeName,
    #[garde(skip)]
    pub starts_at: Option<DateTime<Utc>>,
    #[garde(skip)]
    pub ends_at: Option<DateTime<Utc>>,
    #[garde(range(min = 1))]
    pub duration_minutes: Option<i64>,
    #[garde(skip)]
    pub entries_allowed: Option<i32>,
}

impl CreateAuthorizationRequest {
    /// Fills in the omitted window and entry count relative to `now`.
    pub fn into_event(
        self,
        issued_by: ResidentId,
        family_id: FamilyId,
        now: DateTime<Utc>,
    ) -> AppResult<CreateAuthorization> {
        let Self {
            visitor_name,
            document_id,
            access_mode,
            starts_at,
            ends_at,
            duration_minutes,
            entries_allowed,
        } = self;

        let starts_at = starts_at.unwrap_or(now);
        let ends_at = match (ends_at, duration_minutes) {
            (Some(ends_at), _) => ends_at,
            (None, Some(minutes)) => Duration::try_minutes(minutes)
                .and_then(|duration| starts_at.checked_add_signed(duration))
                .ok_or_else(|| {
                    AppError::InvalidWindow(format!("滞在時間（{minutes} 分）が範囲外です。"))
                })?,
            (None, None) => now + Duration::hours(DEFAULT_VISIT_HOURS),
        };

        Ok(CreateAuthorization::new(
            issued_by,
            family_id,
            NewVisitor::new(visitor_name, document_id, access_mode.into()),
            TimeWindow::new(starts_at, ends_at)?,
            entries_allowed.unwrap_or(1).max(1),
            now,
        ))
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ExtendAuthorizationRequest {
    #[garde(skip)]
    pub hours: Option<i64>,
    #[garde(skip)]
    pub new_ends_at: Option<DateTime<Utc>>,
}

impl TryFrom<ExtendAuthorizationRequest> for ExtensionRequest {
    type Error = AppError;

    fn try_from(value: ExtendAuthorizationRequest) -> Result<Self, Self::Error> {
        match (value.hours, value.new_ends_at) {
            (Some(hours), _) => Ok(ExtensionRequest::Hours(hours)),
            (None, Some(ends_at)) => Ok(ExtensionRequest::NewEndsAt(ends_at)),
            (None, None) => Err(AppError::MissingField("hours".into())),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationListQuery {
    pub status: Option<AuthorizationStatusName>,
    #[serde(default)]
    pub valid_now: bool,
    // 管理者のみ有効
    pub family_id: Option<FamilyId>,
}

impl AuthorizationListQuery {
    pub fn into_options(self, family_id: Option<FamilyId>, now: DateTime<Utc>) -> AuthorizationListOptions {
        AuthorizationListOptions {
            family_id,
            status: self.status.map(AuthorizationStatus::from),
            valid_at: self.valid_now.then_some(now),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorResponse {
    pub visitor_id: VisitorId,
    pub full_name: String,
    pub document_id: Option<String>,
    pub access_mode: AccessModeName,
}

impl From<Visitor> for VisitorResponse {
    fn from(value: Visitor) -> Self {
        let Visitor {
            visitor_id,
            full_name,
            document_id,
            access_mode,
            authorized_by: _,
        } = value;
        Self {
            visitor_id,
            full_name,
            document_id,
            access_mode: access_mode.into(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationResponse {
    pub authorization_id: AuthorizationId,
    pub code: AuthorizationCode,
    pub visitor: VisitorResponse,
    pub authorized_by: ResidentId,
    pub family_id: Option<FamilyId>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: AuthorizationStatusName,
    pub entries_allowed: i32,
    pub entries_consumed: i32,
    pub remaining_entries: i32,
    pub is_inside: bool,
    pub qr_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<VisitAuthorization> for AuthorizationResponse {
    fn from(value: VisitAuthorization) -> Self {
        let remaining_entries = value.remaining_entries();
        let VisitAuthorization {
            authorization_id,
            code,
            visitor,
            authorized_by,
            family_id,
            window,
            status,
            entries_allowed,
            entries_consumed,
            is_inside,
            qr_image,
            created_at,
        } = value;
        Self {
            authorization_id,
            code,
            visitor: visitor.into(),
            authorized_by,
            family_id,
            starts_at: window.starts_at(),
            ends_at: window.ends_at(),
            status: status.into(),
            entries_allowed,
            entries_consumed,
            remaining_entries,
            is_inside,
            qr_image,
            created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedAuthorizationResponse {
    pub code: AuthorizationCode,
    pub qr_image: Option<String>,
    pub authorization: AuthorizationResponse,
}

impl From<VisitAuthorization> for IssuedAuthorizationResponse {
    fn from(value: VisitAuthorization) -> Self {
        Self {
            code: value.code.clone(),
            qr_image: value.qr_image.clone(),
            authorization: value.into(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedAuthorizationResponse {
    pub extended_by_minutes: i64,
    pub authorization: AuthorizationResponse,
}

impl From<Extended> for ExtendedAuthorizationResponse {
    fn from(value: Extended) -> Self {
        Self {
            extended_by_minutes: value.extended_by.num_minutes(),
            authorization: value.authorization.into(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationsResponse {
    pub items: Vec<AuthorizationResponse>,
}

impl From<Vec<VisitAuthorization>> for AuthorizationsResponse {
    fn from(value: Vec<VisitAuthorization>) -> Self {
        Self {
            items: value.into_iter().map(AuthorizationResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, new)]
#[serde(rename_all = "camelCase")]
pub struct SweepResponse {
    pub expired: u64,
}
