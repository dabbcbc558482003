use super::parse_column;
use kernel::model::{
    authorization::{AuthorizationCode, VisitAuthorization},
    id::{AuthorizationId, FamilyId, ResidentId, VisitorId},
    visitor::Visitor,
    window::TimeWindow,
};
use shared::error::AppError;
use sqlx::types::chrono::{DateTime, Utc};

// 認可と訪問者を結合して取得する列。FOR UPDATE OF a と組み合わせて使う。
pub const AUTHORIZATION_SELECT: &str = r#"
    SELECT
        a.authorization_id,
        a.code,
        a.visitor_id,
        v.full_name AS visitor_name,
        v.document_id,
        v.access_mode,
        a.authorized_by,
        a.family_id,
        a.starts_at,
        a.ends_at,
        a.status,
        a.entries_allowed,
        a.entries_consumed,
        a.is_inside,
        a.qr_image,
        a.created_at
    FROM visit_authorizations AS a
    INNER JOIN visitors AS v ON a.visitor_id = v.visitor_id
"#;

#[derive(sqlx::FromRow)]
pub struct AuthorizationRow {
    pub authorization_id: AuthorizationId,
    pub code: String,
    pub visitor_id: VisitorId,
    pub visitor_name: String,
    pub document_id: Option<String>,
    pub access_mode: String,
    pub authorized_by: ResidentId,
    pub family_id: Option<FamilyId>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: String,
    pub entries_allowed: i32,
    pub entries_consumed: i32,
    pub is_inside: bool,
    pub qr_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<AuthorizationRow> for VisitAuthorization {
    type Error = AppError;

    fn try_from(value: AuthorizationRow) -> Result<Self, Self::Error> {
        let AuthorizationRow {
            authorization_id,
            code,
            visitor_id,
            visitor_name,
            document_id,
            access_mode,
            authorized_by,
            family_id,
            starts_at,
            ends_at,
            status,
            entries_allowed,
            entries_consumed,
            is_inside,
            qr_image,
            created_at,
        } = value;
        Ok(VisitAuthorization {
            authorization_id,
            code: AuthorizationCode::from(code),
            visitor: Visitor {
                visitor_id,
                full_name: visitor_name,
                document_id,
                access_mode: parse_column("visitors.access_mode", &access_mode)?,
                authorized_by,
            },
            authorized_by,
            family_id,
            window: TimeWindow::new(starts_at, ends_at)?,
            status: parse_column("visit_authorizations.status", &status)?,
            entries_allowed,
            entries_consumed,
            is_inside,
            qr_image,
            created_at,
        })
    }
}
