use crate::model::{id::ResidentId, resident::Resident};
use async_trait::async_trait;
use shared::error::AppResult;

#[async_trait]
pub trait ResidentRepository: Send + Sync {
    async fn find_by_id(&self, resident_id: ResidentId) -> AppResult<Option<Resident>>;
    async fn find_by_document(&self, document_id: &str) -> AppResult<Option<Resident>>;
}
