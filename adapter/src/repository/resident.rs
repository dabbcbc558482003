use crate::database::{model::resident::ResidentRow, ConnectionPool};
use async_trait::async_trait;
use derive_new::new;
use kernel::model::{id::ResidentId, resident::Resident};
use kernel::repository::resident::ResidentRepository;
use shared::error::{AppError, AppResult};

#[derive(new)]
pub struct ResidentRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl ResidentRepository for ResidentRepositoryImpl {
    async fn find_by_id(&self, resident_id: ResidentId) -> AppResult<Option<Resident>> {
        let row: Option<ResidentRow> = sqlx::query_as(
            r#"
                SELECT
                    resident_id,
                    family_id,
                    full_name,
                    document_id,
                    role,
                    kind,
                    is_active,
                    can_open_gate,
                    can_open_door,
                    can_issue_pedestrian_qr,
                    can_issue_vehicular_qr,
                    can_reserve_amenities
                FROM residents
                WHERE resident_id = $1
            "#,
        )
        .bind(resident_id)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::from_query)?;

        row.map(Resident::try_from).transpose()
    }

    // 無効化された住民は照合に使わない
    async fn find_by_document(&self, document_id: &str) -> AppResult<Option<Resident>> {
        let row: Option<ResidentRow> = sqlx::query_as(
            r#"
                SELECT
                    resident_id,
                    family_id,
                    full_name,
                    document_id,
                    role,
                    kind,
                    is_active,
                    can_open_gate,
                    can_open_door,
                    can_issue_pedestrian_qr,
                    can_issue_vehicular_qr,
                    can_reserve_amenities
                FROM residents
                WHERE document_id = $1
                AND is_active
            "#,
        )
        .bind(document_id)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::from_query)?;

        row.map(Resident::try_from).transpose()
    }
}
