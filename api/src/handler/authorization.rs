use crate::{
    extractor::AuthorizedResident,
    model::authorization::{
        AuthorizationListQuery, AuthorizationResponse, AuthorizationsResponse,
        CreateAuthorizationRequest, ExtendAuthorizationRequest, ExtendedAuthorizationResponse,
        IssuedAuthorizationResponse, SweepResponse,
    },
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use garde::Validate;
use kernel::model::authorization::{
    event::{CancelAuthorization, ExtendAuthorization},
    AuthorizationCode, VisitAuthorization,
};
use kernel::notification::NotificationKind;
use registry::AppRegistry;
use serde_json::json;
use shared::error::{AppError, AppResult};

// 認可の所属家族の住民（または管理者）だけが参照・変更できる
async fn load_managed(
    resident: &AuthorizedResident,
    registry: &AppRegistry,
    code: &AuthorizationCode,
) -> AppResult<VisitAuthorization> {
    let authorization = registry
        .authorization_repository()
        .find_by_code(code)
        .await?
        .ok_or_else(|| AppError::EntityNotFound(format!("認可（{code}）が見つかりませんでした。")))?;
    if !resident.resident().may_manage_family(authorization.family_id) {
        return Err(AppError::ForbiddenOperation(
            "この認可を操作する権限がありません。".into(),
        ));
    }
    Ok(authorization)
}

pub async fn issue_authorization(
    resident: AuthorizedResident,
    State(registry): State<AppRegistry>,
    Json(req): Json<CreateAuthorizationRequest>,
) -> AppResult<(StatusCode, Json<IssuedAuthorizationResponse>)> {
    req.validate(&())?;

    let family_id = resident.family_id().ok_or_else(|| {
        AppError::ForbiddenOperation("家族に所属していない住民は認可を発行できません。".into())
    })?;
    if !resident.resident().may_issue_for(req.access_mode.into()) {
        return Err(AppError::ForbiddenOperation(
            "この種類の QR を発行する権限がありません。".into(),
        ));
    }

    let event = req.into_event(resident.id(), family_id, Utc::now())?;
    let authorization = registry.authorization_repository().create(event).await?;

    registry.notification_service().notify(
        resident.id(),
        NotificationKind::AuthorizationCreated,
        json!({
            "code": authorization.code,
            "visitor": authorization.visitor.full_name,
            "startsAt": authorization.window.starts_at(),
            "endsAt": authorization.window.ends_at(),
        }),
    );

    Ok((StatusCode::CREATED, Json(authorization.into())))
}

pub async fn show_authorization_list(
    resident: AuthorizedResident,
    Query(query): Query<AuthorizationListQuery>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<AuthorizationsResponse>> {
    let now = Utc::now();
    let family_id = if resident.is_admin() {
        query.family_id
    } else {
        match resident.family_id() {
            Some(family_id) => Some(family_id),
            None => return Ok(Json(AuthorizationsResponse::from(Vec::new()))),
        }
    };

    // 一覧の前に期限切れを反映させる
    let repository = registry.authorization_repository();
    repository.sweep_expired(now).await?;
    repository
        .find_all(query.into_options(family_id, now))
        .await
        .map(AuthorizationsResponse::from)
        .map(Json)
}

pub async fn show_authorization(
    resident: AuthorizedResident,
    Path(code): Path<String>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<AuthorizationResponse>> {
    let code = AuthorizationCode::from(code);
    load_managed(&resident, &registry, &code)
        .await
        .map(AuthorizationResponse::from)
        .map(Json)
}

pub async fn extend_authorization(
    resident: AuthorizedResident,
    Path(code): Path<String>,
    State(registry): State<AppRegistry>,
    Json(req): Json<ExtendAuthorizationRequest>,
) -> AppResult<Json<ExtendedAuthorizationResponse>> {
    req.validate(&())?;

    let code = AuthorizationCode::from(code);
    let authorization = load_managed(&resident, &registry, &code).await?;
    let extended = registry
        .authorization_repository()
        .extend(ExtendAuthorization::new(code, req.try_into()?, Utc::now()))
        .await?;

    registry.notification_service().notify(
        authorization.authorized_by,
        NotificationKind::AuthorizationExtended,
        json!({
            "code": extended.authorization.code,
            "extendedByMinutes": extended.extended_by.num_minutes(),
            "endsAt": extended.authorization.window.ends_at(),
        }),
    );

    Ok(Json(extended.into()))
}

pub async fn cancel_authorization(
    resident: AuthorizedResident,
    Path(code): Path<String>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<AuthorizationResponse>> {
    let code = AuthorizationCode::from(code);
    load_managed(&resident, &registry, &code).await?;
    let cancelled = registry
        .authorization_repository()
        .cancel(CancelAuthorization::new(code, resident.id()))
        .await?;

    registry.notification_service().notify(
        cancelled.authorized_by,
        NotificationKind::AuthorizationCancelled,
        json!({
            "code": cancelled.code,
            "cancelledBy": resident.id(),
        }),
    );

    Ok(Json(cancelled.into()))
}

pub async fn sweep_authorizations(
    resident: AuthorizedResident,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<SweepResponse>> {
    resident.require_admin()?;

    registry
        .authorization_repository()
        .sweep_expired(Utc::now())
        .await
        .map(SweepResponse::new)
        .map(Json)
}
