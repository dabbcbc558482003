use crate::{
    extractor::AuthorizedResident,
    model::access::{
        AccessEventQuery, AccessEventsResponse, FaceMatchRequest, MatchResponse,
        PlateMatchRequest, RecordAccessRequest, RecordedAccessEventResponse, VerifyAccessRequest,
        VerifyAccessResponse,
    },
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use garde::Validate;
use kernel::model::authorization::{event::VerifyAccess, AuthorizationStatus};
use kernel::notification::NotificationKind;
use registry::AppRegistry;
use serde_json::json;
use shared::error::{AppError, AppResult};

// ゲート端末からの照合。拒否も 200 で返し、理由は本文に入れる。
pub async fn verify_access(
    State(registry): State<AppRegistry>,
    Json(req): Json<VerifyAccessRequest>,
) -> AppResult<Json<VerifyAccessResponse>> {
    req.validate(&())?;

    let event = VerifyAccess::new(req.code(), req.event, Utc::now());
    let outcome = match registry.authorization_repository().verify(event).await {
        Ok(outcome) => outcome,
        Err(e @ AppError::EntityNotFound(_)) => {
            return Ok(Json(VerifyAccessResponse::denied(&e, None)));
        }
        Err(e) => return Err(e),
    };

    let authorization = outcome.authorization;
    match outcome.verdict {
        Ok(decision) => Ok(Json(VerifyAccessResponse::accepted(
            decision,
            authorization.visitor.full_name,
        ))),
        Err(e) => {
            let kind = if authorization.status == AuthorizationStatus::Expired {
                NotificationKind::AuthorizationExpired
            } else {
                NotificationKind::AccessDenied
            };
            registry.notification_service().notify(
                authorization.authorized_by,
                kind,
                json!({
                    "code": authorization.code,
                    "visitor": authorization.visitor.full_name,
                    "event": req.event,
                    "reason": e.kind(),
                }),
            );
            Ok(Json(VerifyAccessResponse::denied(
                &e,
                Some(authorization.status.into()),
            )))
        }
    }
}

pub async fn show_access_event_list(
    resident: AuthorizedResident,
    Query(query): Query<AccessEventQuery>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<AccessEventsResponse>> {
    resident.require_admin()?;

    registry
        .access_event_repository()
        .find_in_range(query.into())
        .await
        .map(AccessEventsResponse::from)
        .map(Json)
}

pub async fn record_access_event(
    resident: AuthorizedResident,
    State(registry): State<AppRegistry>,
    Json(req): Json<RecordAccessRequest>,
) -> AppResult<(StatusCode, Json<RecordedAccessEventResponse>)> {
    resident.require_admin()?;

    if let Some(resident_id) = req.resident_id() {
        registry
            .resident_repository()
            .find_by_id(resident_id)
            .await?
            .ok_or_else(|| {
                AppError::EntityNotFound(format!("住民（{resident_id}）が見つかりませんでした。"))
            })?;
    }

    let access_event_id = registry
        .access_event_repository()
        .record(req.into_event(Utc::now())?)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(RecordedAccessEventResponse { access_event_id }),
    ))
}

// 顔認証端末の代わりに身分証番号で照合する。一致したら FACIAL で記録する。
pub async fn match_face(
    State(registry): State<AppRegistry>,
    Json(req): Json<FaceMatchRequest>,
) -> AppResult<(StatusCode, Json<MatchResponse>)> {
    req.validate(&())?;

    let Some(resident) = registry
        .resident_repository()
        .find_by_document(&req.document_id)
        .await?
    else {
        return Ok((StatusCode::NOT_FOUND, Json(MatchResponse::unmatched())));
    };

    registry
        .access_event_repository()
        .record(req.into_event(&resident, Utc::now()))
        .await?;
    Ok((StatusCode::OK, Json(resident.into())))
}

// 車両台帳を持たないので、ナンバーは受け取った値をそのまま返す
pub async fn match_plate(Json(req): Json<PlateMatchRequest>) -> AppResult<Json<MatchResponse>> {
    req.validate(&())?;

    tracing::info!(plate = %req.plate, "plate recognition accepted");
    Ok(Json(MatchResponse::plate(req.plate)))
}
