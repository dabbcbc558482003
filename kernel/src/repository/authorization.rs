use crate::model::{
    authorization::{
        event::{
            AuthorizationListOptions, CancelAuthorization, CreateAuthorization,
            ExtendAuthorization, VerifyAccess,
        },
        AccessDecision, AuthorizationCode, VisitAuthorization,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use shared::error::AppResult;

/// 照合結果。業務上の拒否は `verdict` に入り、その場合も状態は保存済み。
#[derive(Debug)]
pub struct VerificationOutcome {
    pub authorization: VisitAuthorization,
    pub verdict: AppResult<AccessDecision>,
}

#[derive(Debug)]
pub struct Extended {
    pub authorization: VisitAuthorization,
    pub extended_by: Duration,
}

#[async_trait]
pub trait AuthorizationRepository: Send + Sync {
    // 認可を発行する（家族ごとの上限はトランザクション内で確認）
    async fn create(&self, event: CreateAuthorization) -> AppResult<VisitAuthorization>;
    // 有効期限を延長する
    async fn extend(&self, event: ExtendAuthorization) -> AppResult<Extended>;
    // 取り消す
    async fn cancel(&self, event: CancelAuthorization) -> AppResult<VisitAuthorization>;
    // ゲートでの入退場を照合し、結果をアクセスイベントとして記録する
    async fn verify(&self, event: VerifyAccess) -> AppResult<VerificationOutcome>;
    // 期限切れの認可をまとめて EXPIRED にする
    async fn sweep_expired(&self, now: DateTime<Utc>) -> AppResult<u64>;
    async fn find_by_code(&self, code: &AuthorizationCode) -> AppResult<Option<VisitAuthorization>>;
    async fn find_all(&self, options: AuthorizationListOptions) -> AppResult<Vec<VisitAuthorization>>;
}
