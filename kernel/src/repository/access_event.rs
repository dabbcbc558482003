use crate::model::{
    access::{
        event::{AccessEventRange, RecordAccess},
        AccessEvent,
    },
    id::AccessEventId,
};
use async_trait::async_trait;
use shared::error::AppResult;

#[async_trait]
pub trait AccessEventRepository: Send + Sync {
    async fn record(&self, event: RecordAccess) -> AppResult<AccessEventId>;
    async fn find_in_range(&self, range: AccessEventRange) -> AppResult<Vec<AccessEvent>>;
}
