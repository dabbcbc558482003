use chrono::{DateTime, Utc};
use garde::Validate;
use kernel::model::{
    access::{
        event::{AccessEventRange, RecordAccess},
        AccessEvent, GateEvent, SubjectKind, VerificationMethod,
    },
    authorization::{AccessDecision, AuthorizationCode},
    id::{AccessEventId, ResidentId, VehicleId},
    resident::Resident,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared::error::{AppError, AppResult};
use uuid::Uuid;

use super::authorization::AuthorizationStatusName;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyAccessRequest {
    #[garde(length(min = 1, max = 64))]
    pub code: String,
    #[garde(skip)]
    pub event: GateEvent,
}

impl VerifyAccessRequest {
    pub fn code(&self) -> AuthorizationCode {
        AuthorizationCode::from(self.code.clone())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyAccessResponse {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_status: Option<AuthorizationStatusName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visitor_name: Option<String>,
}

impl VerifyAccessResponse {
    pub fn accepted(decision: AccessDecision, visitor_name: String) -> Self {
        Self {
            accepted: true,
            reason: None,
            message: None,
            remaining: Some(decision.remaining),
            new_status: Some(decision.status.into()),
            visitor_name: Some(visitor_name),
        }
    }

    pub fn denied(error: &AppError, new_status: Option<AuthorizationStatusName>) -> Self {
        Self {
            accepted: false,
            reason: Some(error.kind().to_string()),
            message: Some(error.to_string()),
            remaining: None,
            new_status,
            visitor_name: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubjectKindName {
    Resident,
    Visitor,
    Delivery,
}

impl From<SubjectKindName> for SubjectKind {
    fn from(value: SubjectKindName) -> Self {
        match value {
            SubjectKindName::Resident => Self::Resident,
            SubjectKindName::Visitor => Self::Visitor,
            SubjectKindName::Delivery => Self::Delivery,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationMethodName {
    Facial,
    Credential,
    Manual,
}

impl From<VerificationMethodName> for VerificationMethod {
    fn from(value: VerificationMethodName) -> Self {
        match value {
            VerificationMethodName::Facial => Self::Facial,
            VerificationMethodName::Credential => Self::Credential,
            VerificationMethodName::Manual => Self::Manual,
        }
    }
}

fn default_success() -> bool {
    true
}

// 警備員や管理者が手動で残す入退場記録
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordAccessRequest {
    pub subject_kind: SubjectKindName,
    pub subject_id: Uuid,
    pub method: VerificationMethodName,
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
    pub vehicle_id: Option<VehicleId>,
}

impl RecordAccessRequest {
    pub fn into_event(self, now: DateTime<Utc>) -> AppResult<RecordAccess> {
        let RecordAccessRequest {
            subject_kind,
            subject_id,
            method,
            success,
            details,
            vehicle_id,
        } = self;
        // 来訪者はコード照合の中で記録する
        if matches!(subject_kind, SubjectKindName::Visitor) {
            return Err(AppError::ConversionEntityError(
                "来訪者の入退場は認可コードの照合で記録されます。".into(),
            ));
        }
        let details = match details {
            None => json!({}),
            Some(value @ serde_json::Value::Object(_)) => value,
            Some(_) => {
                return Err(AppError::ConversionEntityError(
                    "details はオブジェクトで指定してください。".into(),
                ))
            }
        };
        Ok(RecordAccess::new(
            now,
            subject_kind.into(),
            subject_id,
            method.into(),
            success,
            details,
            vehicle_id,
        ))
    }

    pub fn resident_id(&self) -> Option<ResidentId> {
        matches!(self.subject_kind, SubjectKindName::Resident).then(|| self.subject_id.into())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedAccessEventResponse {
    pub access_event_id: AccessEventId,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FaceMatchRequest {
    #[garde(length(min = 1, max = 64))]
    pub document_id: String,
}

impl FaceMatchRequest {
    pub fn into_event(self, resident: &Resident, now: DateTime<Utc>) -> RecordAccess {
        RecordAccess::new(
            now,
            SubjectKind::Resident,
            resident.resident_id.raw(),
            VerificationMethod::Facial,
            true,
            json!({ "documentId": self.document_id }),
            None,
        )
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PlateMatchRequest {
    #[garde(length(min = 1, max = 16))]
    pub plate: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResponse {
    #[serde(rename = "match")]
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resident_id: Option<ResidentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plate: Option<String>,
}

impl MatchResponse {
    pub fn unmatched() -> Self {
        Self {
            matched: false,
            resident_id: None,
            full_name: None,
            plate: None,
        }
    }

    pub fn plate(plate: String) -> Self {
        Self {
            matched: true,
            plate: Some(plate),
            ..Self::unmatched()
        }
    }
}

impl From<Resident> for MatchResponse {
    fn from(value: Resident) -> Self {
        Self {
            matched: true,
            resident_id: Some(value.resident_id),
            full_name: Some(value.full_name),
            plate: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessEventQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub subject_kind: Option<SubjectKindName>,
}

impl From<AccessEventQuery> for AccessEventRange {
    fn from(value: AccessEventQuery) -> Self {
        AccessEventRange::new(value.from, value.to, value.subject_kind.map(SubjectKind::from))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessEventResponse {
    pub access_event_id: AccessEventId,
    pub occurred_at: DateTime<Utc>,
    pub subject_kind: String,
    pub subject_id: Uuid,
    pub method: String,
    pub success: bool,
    pub details: serde_json::Value,
    pub vehicle_id: Option<VehicleId>,
}

impl From<AccessEvent> for AccessEventResponse {
    fn from(value: AccessEvent) -> Self {
        let AccessEvent {
            access_event_id,
            occurred_at,
            subject_kind,
            subject_id,
            method,
            success,
            details,
            vehicle_id,
        } = value;
        Self {
            access_event_id,
            occurred_at,
            subject_kind: subject_kind.as_ref().to_string(),
            subject_id,
            method: method.as_ref().to_string(),
            success,
            details,
            vehicle_id,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessEventsResponse {
    pub items: Vec<AccessEventResponse>,
}

impl From<Vec<AccessEvent>> for AccessEventsResponse {
    fn from(value: Vec<AccessEvent>) -> Self {
        Self {
            items: value.into_iter().map(AccessEventResponse::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel::model::authorization::AuthorizationStatus;

    #[test]
    fn denial_carries_kind_and_status() {
        let res = VerifyAccessResponse::denied(&AppError::Expired, Some(AuthorizationStatus::Expired.into()));
        let json = serde_json::to_value(&res).unwrap();
        assert_eq!(json["accepted"], false);
        assert_eq!(json["reason"], "Expired");
        assert_eq!(json["newStatus"], "EXPIRED");
        assert!(json.get("remaining").is_none());
    }

    #[test]
    fn manual_record_accepts_delivery_and_defaults_details() {
        let now = Utc::now();
        let req: RecordAccessRequest = serde_json::from_value(json!({
            "subjectKind": "DELIVERY",
            "subjectId": Uuid::nil(),
            "method": "MANUAL",
        }))
        .unwrap();
        assert!(req.resident_id().is_none());

        let event = req.into_event(now).unwrap();
        assert_eq!(event.subject_kind, SubjectKind::Delivery);
        assert_eq!(event.method, VerificationMethod::Manual);
        assert!(event.success);
        assert_eq!(event.details, json!({}));
        assert_eq!(event.occurred_at, now);
    }

    #[test]
    fn manual_record_rejects_visitors_and_scalar_details() {
        let visitor: RecordAccessRequest = serde_json::from_value(json!({
            "subjectKind": "VISITOR",
            "subjectId": Uuid::nil(),
            "method": "CREDENTIAL",
        }))
        .unwrap();
        assert!(matches!(
            visitor.into_event(Utc::now()),
            Err(AppError::ConversionEntityError(_))
        ));

        let scalar: RecordAccessRequest = serde_json::from_value(json!({
            "subjectKind": "RESIDENT",
            "subjectId": Uuid::nil(),
            "method": "MANUAL",
            "success": false,
            "details": "gate jammed",
        }))
        .unwrap();
        assert_eq!(scalar.resident_id(), Some(ResidentId::from(Uuid::nil())));
        assert!(matches!(
            scalar.into_event(Utc::now()),
            Err(AppError::ConversionEntityError(_))
        ));
    }

    #[test]
    fn face_match_records_a_facial_resident_event() {
        let resident_id = ResidentId::new();
        let resident = Resident {
            resident_id,
            family_id: None,
            full_name: "Rosa Vera".into(),
            document_id: Some("V-100".into()),
            role: kernel::model::role::Role::Resident,
            kind: kernel::model::resident::ResidentKind::Member,
            is_active: true,
            can_open_gate: false,
            can_open_door: false,
            can_issue_pedestrian_qr: false,
            can_issue_vehicular_qr: false,
            can_reserve_amenities: false,
        };
        let req = FaceMatchRequest {
            document_id: "V-100".into(),
        };
        let event = req.into_event(&resident, Utc::now());
        assert_eq!(event.subject_kind, SubjectKind::Resident);
        assert_eq!(event.subject_id, resident_id.raw());
        assert_eq!(event.method, VerificationMethod::Facial);
        assert_eq!(event.details["documentId"], "V-100");

        let json = serde_json::to_value(MatchResponse::from(resident)).unwrap();
        assert_eq!(json["match"], true);
        assert_eq!(json["residentId"], resident_id.to_string());
        assert_eq!(json["fullName"], "Rosa Vera");

        let json = serde_json::to_value(MatchResponse::unmatched()).unwrap();
        assert_eq!(json, json!({ "match": false }));
    }

    #[test]
    fn empty_recognition_inputs_fail_validation() {
        let face = FaceMatchRequest {
            document_id: String::new(),
        };
        assert!(face.validate(&()).is_err());
        let plate = PlateMatchRequest {
            plate: String::new(),
        };
        assert!(plate.validate(&()).is_err());

        let json = serde_json::to_value(MatchResponse::plate("ABC-123".into())).unwrap();
        assert_eq!(json, json!({ "match": true, "plate": "ABC-123" }));
    }

    #[test]
    fn request_accepts_upper_case_events() {
        let req: VerifyAccessRequest =
            serde_json::from_str(r#"{"code":"AV-20250601090000-ABC123","event":"EXIT"}"#).unwrap();
        assert_eq!(req.event, GateEvent::Exit);
        assert_eq!(req.code().as_str(), "AV-20250601090000-ABC123");
    }
}
