use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use stockroom_core::error::CoreError;
use stockroom_core::ledger::LedgerError;
use stockroom_db::error::StoreError;

/// PostgreSQL `lock_not_available`, raised when `lock_timeout` expires.
const LOCK_NOT_AVAILABLE: &str = "55P03";
/// PostgreSQL `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// Application-level error type for HTTP handlers.
///
/// Produces a `{ "error", "code", "details"? }` JSON body.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Core(core) => Self::Core(core),
            StoreError::Database(db) => Self::Database(db),
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        Self::Core(CoreError::Ledger(err))
    }
}

struct ErrorBody {
    status: StatusCode,
    code: &'static str,
    message: String,
    details: Option<serde_json::Value>,
}

impl ErrorBody {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: None,
        }
    }

    fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            "An internal error occurred",
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = match &self {
            AppError::Core(core) => classify_core_error(core),
            AppError::Database(err) => classify_sqlx_error(err),
            AppError::BadRequest(msg) => {
                ErrorBody::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone())
            }
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                ErrorBody::internal()
            }
        };

        let mut json = json!({
            "error": body.message,
            "code": body.code,
        });
        if let Some(details) = body.details {
            json["details"] = details;
        }
        (body.status, axum::Json(json)).into_response()
    }
}

fn classify_core_error(err: &CoreError) -> ErrorBody {
    match err {
        CoreError::NotFound { entity, id } => ErrorBody::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => {
            ErrorBody::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
        }
        CoreError::Conflict(msg) => ErrorBody::new(StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        CoreError::Ledger(ledger) => classify_ledger_error(ledger),
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            ErrorBody::internal()
        }
    }
}

/// Rule violations keep their own code and carry their context as `details`.
fn classify_ledger_error(err: &LedgerError) -> ErrorBody {
    let status = match err {
        LedgerError::NotFound { .. } => StatusCode::NOT_FOUND,
        LedgerError::InvalidQuantity { .. } | LedgerError::OwnerRequired { .. } => {
            StatusCode::BAD_REQUEST
        }
        LedgerError::InsufficientFree { .. }
        | LedgerError::HoldNotActive { .. }
        | LedgerError::RequestsStillPending { .. }
        | LedgerError::BelowOutstanding { .. }
        | LedgerError::HasActiveHolds { .. }
        | LedgerError::BorrowingDisabled { .. }
        | LedgerError::PoolAlreadyEnabled { .. } => StatusCode::CONFLICT,
    };
    let details = err.details();
    ErrorBody {
        status,
        code: err.code(),
        message: err.to_string(),
        details: (!details.is_null()).then_some(details),
    }
}

/// - `RowNotFound` maps to 404.
/// - Unique violations on `uq_` constraints map to 409.
/// - Lock timeouts map to 503 so clients retry.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> ErrorBody {
    match err {
        sqlx::Error::RowNotFound => {
            ErrorBody::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Resource not found")
        }
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            Some(LOCK_NOT_AVAILABLE) => {
                tracing::warn!(error = %db_err, "Ledger lock wait timed out");
                ErrorBody::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "LOCK_TIMEOUT",
                    "The asset is busy, retry shortly",
                )
            }
            Some(UNIQUE_VIOLATION)
                if db_err.constraint().is_some_and(|c| c.starts_with("uq_")) =>
            {
                let constraint = db_err.constraint().unwrap_or_default();
                ErrorBody::new(
                    StatusCode::CONFLICT,
                    "CONFLICT",
                    format!("Duplicate value violates unique constraint: {constraint}"),
                )
            }
            _ => {
                tracing::error!(error = %db_err, "Database error");
                ErrorBody::internal()
            }
        },
        sqlx::Error::PoolTimedOut => {
            tracing::warn!("Database pool exhausted");
            ErrorBody::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "UNAVAILABLE",
                "The service is busy, retry shortly",
            )
        }
        other => {
            tracing::error!(error = %other, "Database error");
            ErrorBody::internal()
        }
    }
}
