use crate::model::{
    id::ReservationId,
    reservation::{
        event::{
            CreateReservation, ReservationListOptions, UpdateReservation, ValidateReservation,
        },
        Reservation,
    },
};
use async_trait::async_trait;
use shared::error::AppResult;

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    // 重複・定員の確認と書き込みを同一トランザクションで行う
    async fn create(&self, event: CreateReservation) -> AppResult<Reservation>;
    async fn update(&self, event: UpdateReservation) -> AppResult<Reservation>;
    async fn cancel(&self, reservation_id: ReservationId) -> AppResult<Reservation>;
    // 書き込まずに確認だけ行う
    async fn validate(&self, event: ValidateReservation) -> AppResult<()>;
    async fn find_by_id(&self, reservation_id: ReservationId) -> AppResult<Option<Reservation>>;
    async fn find_all(&self, options: ReservationListOptions) -> AppResult<Vec<Reservation>>;
}
