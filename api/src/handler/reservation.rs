use crate::{
    extractor::AuthorizedResident,
    model::reservation::{
        CreateReservationRequest, ReservationListQuery, ReservationResponse,
        ReservationsResponse, UpdateReservationRequest,
    },
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use garde::Validate;
use kernel::model::{id::ReservationId, reservation::Reservation};
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

fn ensure_may_reserve(resident: &AuthorizedResident) -> AppResult<()> {
    if !resident.resident().may_reserve_amenities() {
        return Err(AppError::ForbiddenOperation(
            "施設を予約する権限がありません。".into(),
        ));
    }
    Ok(())
}

// 管理者・予約した本人・同じ家族の住民だけが扱える
async fn load_owned(
    resident: &AuthorizedResident,
    registry: &AppRegistry,
    reservation_id: ReservationId,
) -> AppResult<Reservation> {
    let reservation = registry
        .reservation_repository()
        .find_by_id(reservation_id)
        .await?
        .ok_or_else(|| AppError::EntityNotFound("予約が見つかりませんでした。".into()))?;
    if reservation.resident_id != resident.id()
        && !resident.resident().may_manage_family(reservation.family_id)
    {
        return Err(AppError::ForbiddenOperation(
            "この予約を操作する権限がありません。".into(),
        ));
    }
    Ok(reservation)
}

pub async fn register_reservation(
    resident: AuthorizedResident,
    State(registry): State<AppRegistry>,
    Json(req): Json<CreateReservationRequest>,
) -> AppResult<(StatusCode, Json<ReservationResponse>)> {
    ensure_may_reserve(&resident)?;
    req.validate(&())?;

    let event = req.into_event(resident.id(), resident.family_id(), Utc::now());
    let reservation = registry.reservation_repository().create(event).await?;
    Ok((StatusCode::CREATED, Json(reservation.into())))
}

pub async fn update_reservation(
    resident: AuthorizedResident,
    Path(reservation_id): Path<ReservationId>,
    State(registry): State<AppRegistry>,
    Json(req): Json<UpdateReservationRequest>,
) -> AppResult<Json<ReservationResponse>> {
    ensure_may_reserve(&resident)?;
    req.validate(&())?;
    load_owned(&resident, &registry, reservation_id).await?;

    registry
        .reservation_repository()
        .update(req.into_event(reservation_id))
        .await
        .map(ReservationResponse::from)
        .map(Json)
}

pub async fn cancel_reservation(
    resident: AuthorizedResident,
    Path(reservation_id): Path<ReservationId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<ReservationResponse>> {
    ensure_may_reserve(&resident)?;
    load_owned(&resident, &registry, reservation_id).await?;

    registry
        .reservation_repository()
        .cancel(reservation_id)
        .await
        .map(ReservationResponse::from)
        .map(Json)
}

pub async fn show_reservation_list(
    resident: AuthorizedResident,
    Query(query): Query<ReservationListQuery>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<ReservationsResponse>> {
    let options = if resident.is_admin() {
        query.into_options(None)
    } else {
        match resident.family_id() {
            Some(family_id) => query.into_options(Some(family_id)),
            // 家族に属さない住民は自分の予約だけ
            None => {
                let mut options = query.into_options(None);
                options.resident_id = Some(resident.id());
                options
            }
        }
    };

    registry
        .reservation_repository()
        .find_all(options)
        .await
        .map(ReservationsResponse::from)
        .map(Json)
}

pub async fn show_reservation(
    resident: AuthorizedResident,
    Path(reservation_id): Path<ReservationId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<ReservationResponse>> {
    load_owned(&resident, &registry, reservation_id)
        .await
        .map(ReservationResponse::from)
        .map(Json)
}
