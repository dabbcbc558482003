use crate::{
    extractor::AuthorizedResident,
    model::{
        amenity::{
            AmenitiesResponse, AmenityDetailResponse, AmenityListQuery, AmenityResponse,
            CalendarQuery, CalendarResponse, CreateAmenityRequest, CreateShiftRequest,
            CreateUnitRequest, ShiftResponse, UnitResponse,
        },
        reservation::{ValidateReservationRequest, ValidateReservationResponse},
    },
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use garde::Validate;
use kernel::model::id::AmenityId;
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

pub async fn register_amenity(
    resident: AuthorizedResident,
    State(registry): State<AppRegistry>,
    Json(req): Json<CreateAmenityRequest>,
) -> AppResult<(StatusCode, Json<AmenityResponse>)> {
    resident.require_admin()?;
    req.validate(&())?;

    let amenity = registry.amenity_repository().create(req.into()).await?;
    Ok((StatusCode::CREATED, Json(amenity.into())))
}

pub async fn register_unit(
    resident: AuthorizedResident,
    Path(amenity_id): Path<AmenityId>,
    State(registry): State<AppRegistry>,
    Json(req): Json<CreateUnitRequest>,
) -> AppResult<(StatusCode, Json<UnitResponse>)> {
    resident.require_admin()?;
    req.validate(&())?;

    let unit = registry
        .amenity_repository()
        .add_unit(req.into_event(amenity_id))
        .await?;
    Ok((StatusCode::CREATED, Json(unit.into())))
}

pub async fn register_shift(
    resident: AuthorizedResident,
    Path(amenity_id): Path<AmenityId>,
    State(registry): State<AppRegistry>,
    Json(req): Json<CreateShiftRequest>,
) -> AppResult<(StatusCode, Json<ShiftResponse>)> {
    resident.require_admin()?;
    req.validate(&())?;

    let shift = registry
        .amenity_repository()
        .add_shift(req.into_event(amenity_id)?)
        .await?;
    Ok((StatusCode::CREATED, Json(shift.into())))
}

pub async fn show_amenity_list(
    _resident: AuthorizedResident,
    Query(query): Query<AmenityListQuery>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<AmenitiesResponse>> {
    registry
        .amenity_repository()
        .find_all(query.into())
        .await
        .map(AmenitiesResponse::from)
        .map(Json)
}

pub async fn show_amenity(
    _resident: AuthorizedResident,
    Path(amenity_id): Path<AmenityId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<AmenityDetailResponse>> {
    registry
        .amenity_repository()
        .find_by_id(amenity_id)
        .await
        .and_then(|detail| match detail {
            Some(detail) => Ok(Json(detail.into())),
            None => Err(AppError::EntityNotFound(
                "施設が見つかりませんでした。".into(),
            )),
        })
}

pub async fn show_amenity_calendar(
    _resident: AuthorizedResident,
    Path(amenity_id): Path<AmenityId>,
    Query(query): Query<CalendarQuery>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<CalendarResponse>> {
    registry
        .amenity_repository()
        .calendar(amenity_id, query.into())
        .await
        .map(CalendarResponse::from)
        .map(Json)
}

// 保存せずに予約内容だけを検証する
pub async fn validate_reservation(
    resident: AuthorizedResident,
    Path(amenity_id): Path<AmenityId>,
    State(registry): State<AppRegistry>,
    Json(req): Json<ValidateReservationRequest>,
) -> AppResult<Json<ValidateReservationResponse>> {
    if !resident.resident().may_reserve_amenities() {
        return Err(AppError::ForbiddenOperation(
            "施設を予約する権限がありません。".into(),
        ));
    }
    req.validate(&())?;

    registry
        .reservation_repository()
        .validate(req.into_event(amenity_id))
        .await?;
    Ok(Json(ValidateReservationResponse { ok: true }))
}
