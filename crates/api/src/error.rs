use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lockbank_core::error::CoreError;
use lockbank_core::types::Timestamp;
use lockbank_db::{AssociationError, StoreError};
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `lockbank_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A storage error from `lockbank_db`.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Another association is waiting for its card scan.
    #[error("An association is already in progress until {expires_at}")]
    AssociationBusy { expires_at: Timestamp },

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<AssociationError> for AppError {
    fn from(err: AssociationError) -> Self {
        match err {
            AssociationError::Busy { expires_at } => Self::AssociationBusy { expires_at },
            AssociationError::Store(e) => Self::Store(e),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errs: validator::ValidationErrors) -> Self {
        Self::Core(CoreError::Validation(errs.to_string()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::LockerNotFound(id) => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("Locker {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
            },

            // --- Storage errors ---
            AppError::Store(err) => classify_store_error(err),

            // --- Association ---
            AppError::AssociationBusy { .. } => {
                (StatusCode::CONFLICT, "BUSY", self.to_string())
            }

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify a storage error into an HTTP status, error code, and message.
///
/// - A database that stayed locked through every retry maps to 503.
/// - Everything else maps to 500 with a sanitized message.
fn classify_store_error(err: &StoreError) -> (StatusCode, &'static str, String) {
    if err.is_busy() {
        tracing::warn!(error = %err, "Database busy");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            "DATABASE_BUSY",
            "The database is busy, try again shortly".to_string(),
        );
    }
    tracing::error!(error = %err, "Database error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}
