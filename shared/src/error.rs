use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    // ------------------------------
    // 業務ルール違反
    // ------------------------------
    #[error("{0}")]
    InvalidWindow(String),
    #[error("家族あたりの有効な認可数の上限（{limit}件）に達しています。")]
    QuotaExceeded { limit: i64 },
    #[error("現在の状態（{0}）ではこの操作はできません。")]
    InvalidState(String),
    #[error("認可の有効期限が切れています。")]
    Expired,
    #[error("訪問者はすでに入場しています。")]
    AlreadyInside,
    #[error("訪問者は入場していません。")]
    NotInside,
    #[error("許可された入場回数をすべて使用済みです。")]
    EntriesExhausted,
    #[error("{0}")]
    EntityNotFound(String),
    #[error("必須項目（{0}）が指定されていません。")]
    MissingField(String),
    #[error("{0}")]
    Overlap(String),
    #[error("定員を超えています（要求 {requested}、残り {available}）。")]
    CapacityExceeded { requested: i64, available: i64 },
    #[error("{0}")]
    ForbiddenOperation(String),
    #[error("{0}")]
    ValidationError(#[from] garde::Report),
    #[error("{0}")]
    ConvertToUuidError(#[from] uuid::Error),
    #[error("認証情報がありません。")]
    UnauthenticatedError,
    #[error("{0}")]
    ConversionEntityError(String),

    // ------------------------------
    // ストレージ層の失敗
    // ------------------------------
    #[error("トランザクションを実行できませんでした。")]
    TransactionError(#[source] sqlx::Error),
    #[error("トランザクションが競合しました。再試行してください。")]
    TransactionConflict(#[source] sqlx::Error),
    #[error("データベース処理実行中にエラーが発生しました。")]
    SpecificOperationError(#[source] sqlx::Error),
    #[error("No rows affected: {0}")]
    NoRowsAffectedError(String),
    #[error("{0}")]
    ExternalServiceError(String),
    #[error("一意な認可コードを {attempts} 回の試行で生成できませんでした。")]
    CodeGenerationExhausted { attempts: usize },
}

// シリアライズ失敗 (40001) とデッドロック検出 (40P01)
const RETRYABLE_SQLSTATES: [&str; 2] = ["40001", "40P01"];

impl AppError {
    /// Wraps a query failure, keeping serialization conflicts apart so callers can retry.
    pub fn from_query(err: sqlx::Error) -> Self {
        let conflict = err
            .as_database_error()
            .and_then(|db| db.code())
            .map(|code| RETRYABLE_SQLSTATES.iter().any(|c| code == *c))
            .unwrap_or(false);
        if conflict {
            AppError::TransactionConflict(err)
        } else {
            AppError::SpecificOperationError(err)
        }
    }

    /// Stable machine-readable name of the failure.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidWindow(_) => "InvalidWindow",
            AppError::QuotaExceeded { .. } => "QuotaExceeded",
            AppError::InvalidState(_) => "InvalidState",
            AppError::Expired => "Expired",
            AppError::AlreadyInside => "AlreadyInside",
            AppError::NotInside => "NotInside",
            AppError::EntriesExhausted => "EntriesExhausted",
            AppError::EntityNotFound(_) => "NotFound",
            AppError::MissingField(_) => "MissingField",
            AppError::Overlap(_) => "Overlap",
            AppError::CapacityExceeded { .. } => "CapacityExceeded",
            AppError::ForbiddenOperation(_) => "PermissionDenied",
            AppError::ValidationError(_)
            | AppError::ConvertToUuidError(_)
            | AppError::ConversionEntityError(_) => "BadRequest",
            AppError::UnauthenticatedError => "Unauthenticated",
            AppError::TransactionError(_) => "TransactionError",
            AppError::TransactionConflict(_) => "TransactionConflict",
            AppError::SpecificOperationError(_) => "StorageError",
            AppError::NoRowsAffectedError(_) => "NoRowsAffected",
            AppError::ExternalServiceError(_) => "ExternalServiceError",
            AppError::CodeGenerationExhausted { .. } => "CodeGenerationExhausted",
        }
    }

    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            AppError::TransactionError(_)
                | AppError::TransactionConflict(_)
                | AppError::SpecificOperationError(_)
                | AppError::NoRowsAffectedError(_)
        )
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::TransactionConflict(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidWindow(_)
            | AppError::MissingField(_)
            | AppError::ValidationError(_)
            | AppError::ConvertToUuidError(_)
            | AppError::ConversionEntityError(_) => StatusCode::BAD_REQUEST,
            AppError::QuotaExceeded { .. }
            | AppError::InvalidState(_)
            | AppError::Expired
            | AppError::AlreadyInside
            | AppError::NotInside
            | AppError::EntriesExhausted => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Overlap(_) | AppError::CapacityExceeded { .. } => StatusCode::CONFLICT,
            AppError::EntityNotFound(_) => StatusCode::NOT_FOUND,
            AppError::ForbiddenOperation(_) => StatusCode::FORBIDDEN,
            AppError::UnauthenticatedError => StatusCode::UNAUTHORIZED,
            AppError::TransactionConflict(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::TransactionError(_)
            | AppError::SpecificOperationError(_)
            | AppError::NoRowsAffectedError(_)
            | AppError::ExternalServiceError(_)
            | AppError::CodeGenerationExhausted { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        if self.is_storage_failure()
            || matches!(
                self,
                AppError::ExternalServiceError(_) | AppError::CodeGenerationExhausted { .. }
            )
        {
            tracing::error!(
                error.cause_chain = ?self,
                error.message = %self,
                retryable = self.is_retryable(),
                "Unexpected error happened"
            );
        }
        let body = Json(json!({
            "error": self.kind(),
            "message": self.to_string(),
            "retryable": self.is_retryable(),
        }));
        (status_code, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
