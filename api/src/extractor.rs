use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use kernel::model::{
    id::{FamilyId, ResidentId},
    resident::Resident,
};
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

// 認証済みの住民 ID は上流の認証ゲートウェイがこのヘッダーで渡す
pub const RESIDENT_ID_HEADER: &str = "x-resident-id";

pub struct AuthorizedResident {
    resident: Resident,
}

impl AuthorizedResident {
    pub fn id(&self) -> ResidentId {
        self.resident.resident_id
    }

    pub fn family_id(&self) -> Option<FamilyId> {
        self.resident.family_id
    }

    pub fn is_admin(&self) -> bool {
        self.resident.is_admin()
    }

    pub fn resident(&self) -> &Resident {
        &self.resident
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if !self.is_admin() {
            return Err(AppError::ForbiddenOperation(
                "管理者のみが実行できる操作です。".into(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl FromRequestParts<AppRegistry> for AuthorizedResident {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        registry: &AppRegistry,
    ) -> Result<Self, Self::Rejection> {
        let resident_id: ResidentId = parts
            .headers
            .get(RESIDENT_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok())
            .ok_or(AppError::UnauthenticatedError)?;

        let resident = registry
            .resident_repository()
            .find_by_id(resident_id)
            .await?
            .filter(|resident| resident.is_active)
            .ok_or(AppError::UnauthenticatedError)?;

        Ok(Self { resident })
    }
}
