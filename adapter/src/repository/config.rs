use crate::database::{model::config::ConfigRow, ConnectionPool};
use arc_swap::ArcSwap;
use async_trait::async_trait;
use kernel::model::config::{ConfigEntry, ConfigStore};
use kernel::repository::config::ConfigRepository;
use shared::error::{AppError, AppResult};
use std::sync::Arc;

/// Holds the latest `access_settings` snapshot. Reads never hit the database.
pub struct ConfigRepositoryImpl {
    db: ConnectionPool,
    snapshot: ArcSwap<ConfigStore>,
}

impl ConfigRepositoryImpl {
    // 読み込むまでは既定値のみのスナップショットで動く
    pub fn new(db: ConnectionPool) -> Self {
        Self {
            db,
            snapshot: ArcSwap::from_pointee(ConfigStore::default()),
        }
    }
}

#[async_trait]
impl ConfigRepository for ConfigRepositoryImpl {
    fn current(&self) -> Arc<ConfigStore> {
        self.snapshot.load_full()
    }

    async fn reload(&self) -> AppResult<Arc<ConfigStore>> {
        let rows: Vec<ConfigRow> =
            sqlx::query_as("SELECT key, value, description FROM access_settings")
                .fetch_all(self.db.inner_ref())
                .await
                .map_err(AppError::from_query)?;

        let store = Arc::new(ConfigStore::new(rows.into_iter().map(ConfigEntry::from)));
        self.snapshot.store(store.clone());
        Ok(store)
    }
}
