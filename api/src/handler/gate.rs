use crate::{
    extractor::AuthorizedResident,
    model::gate::{GateAction, GateActionResponse},
};
use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use kernel::model::{
    access::{event::RecordAccess, SubjectKind, VerificationMethod},
    resident::GateKind,
};
use registry::AppRegistry;
use serde_json::json;
use shared::error::{AppError, AppResult};

// 実機制御は行わず、開閉の要求を受け付けて記録だけする
pub async fn operate_gate(
    resident: AuthorizedResident,
    Path((gate, action)): Path<(String, String)>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<GateActionResponse>> {
    let gate_kind: GateKind = gate
        .parse()
        .map_err(|_| AppError::ConversionEntityError(format!("不明なゲートです: {gate}")))?;
    let gate_action: GateAction = action
        .parse()
        .map_err(|_| AppError::ConversionEntityError(format!("不明な操作です: {action}")))?;

    if !resident.resident().may_operate(gate_kind) {
        return Err(AppError::ForbiddenOperation(
            "このゲートを操作する権限がありません。".into(),
        ));
    }

    let now = Utc::now();
    if gate_action == GateAction::Open {
        registry
            .access_event_repository()
            .record(RecordAccess::new(
                now,
                SubjectKind::Resident,
                resident.id().raw(),
                VerificationMethod::Manual,
                true,
                json!({ "gate": gate_kind.as_ref(), "action": gate_action.as_ref() }),
                None,
            ))
            .await?;
    }

    let state = match gate_action {
        GateAction::Open => "OPEN",
        GateAction::Close => "CLOSED",
    };
    tracing::info!(
        gate = gate_kind.as_ref(),
        action = gate_action.as_ref(),
        resident_id = %resident.id(),
        "gate operated"
    );

    Ok(Json(GateActionResponse::new(
        gate_kind.as_ref().to_string(),
        gate_action.as_ref().to_string(),
        state.to_string(),
        resident.id(),
        now,
    )))
}
