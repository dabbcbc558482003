use crate::model::config::ConfigStore;
use async_trait::async_trait;
use shared::error::AppResult;
use std::sync::Arc;

#[async_trait]
pub trait ConfigRepository: Send + Sync {
    /// Current snapshot; never touches storage.
    fn current(&self) -> Arc<ConfigStore>;
    /// Re-reads the settings table and swaps the snapshot.
    async fn reload(&self) -> AppResult<Arc<ConfigStore>>;
}
