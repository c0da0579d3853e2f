//! Route definitions for the `/import` resource.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::import;
use crate::state::AppState;

/// Routes mounted at `/import`.
///
/// ```text
/// GET    /status          -> status
/// GET    /preview         -> preview (?session_uuid=)
/// POST   /upload          -> upload
/// POST   /upload-multi    -> upload_multi
/// POST   /detect-imports  -> detect_imports
/// POST   /commit          -> commit
/// DELETE /cancel          -> cancel (?session_uuid=)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(import::status))
        .route("/preview", get(import::preview))
        .route("/upload", post(import::upload))
        .route("/upload-multi", post(import::upload_multi))
        .route("/detect-imports", post(import::detect_imports))
        .route("/commit", post(import::commit))
        .route("/cancel", delete(import::cancel))
}
