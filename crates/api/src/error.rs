use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gatehouse_core::error::CoreError;
use gatehouse_pipeline::error::{PipelineError, StoreError};
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] and [`PipelineError`] and adds HTTP-specific
/// variants. Implements [`IntoResponse`] to produce consistent JSON error
/// responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

type Classified = (StatusCode, &'static str, String);

fn internal() -> Classified {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core_error(core),
            AppError::Pipeline(err) => classify_pipeline_error(err),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn classify_core_error(core: &CoreError) -> Classified {
    match core {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            internal()
        }
    }
}

fn classify_pipeline_error(err: &PipelineError) -> Classified {
    match err {
        PipelineError::Core(core) => classify_core_error(core),
        PipelineError::Store(StoreError::Conflict(constraint)) => (
            StatusCode::CONFLICT,
            "CONFLICT",
            format!("Duplicate value violates unique constraint: {constraint}"),
        ),
        PipelineError::Store(StoreError::Database(db_err)) => classify_sqlx_error(db_err),
        PipelineError::Store(StoreError::Unavailable(msg)) => {
            tracing::error!(error = %msg, "Store unavailable");
            internal()
        }
        // Uploads report parse failures as validation errors; anything
        // reaching here comes from a server-side file.
        PipelineError::Parse { path, source } => {
            tracing::error!(path = %path, error = %source, "Stored Caddyfile failed to parse");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "PARSE_ERROR",
                "Failed to parse the Caddyfile for this import session".to_string(),
            )
        }
        PipelineError::Apply(apply) => {
            tracing::error!(error = %apply, "Live config apply failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "APPLY_FAILED",
                "Failed to apply configuration to Caddy; the change was rolled back".to_string(),
            )
        }
        PipelineError::ApplyNotRolledBack(apply) => {
            tracing::error!(error = %apply, "Live config apply failed; store change kept");
            (
                StatusCode::BAD_GATEWAY,
                "APPLY_FAILED_NOT_ROLLED_BACK",
                "Change saved but failed to apply configuration to Caddy".to_string(),
            )
        }
        PipelineError::Io { path, source } => {
            tracing::error!(path = %path, error = %source, "I/O error");
            internal()
        }
        PipelineError::Serialization(e) => {
            tracing::error!(error = %e, "Serialization error");
            internal()
        }
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// Store-level conflicts are already split out by [`StoreError`]; anything
/// reaching here is a 404 for `RowNotFound` or a sanitized 500.
fn classify_sqlx_error(err: &sqlx::Error) -> Classified {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}
