//! Handlers for the Caddyfile import workflow.
//!
//! Uploads are previewed straight away; nothing touches the managed hosts
//! until `commit`.

use std::collections::BTreeMap;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use gatehouse_core::resolution::Resolution;
use gatehouse_core::upload_path::UploadFile;
use gatehouse_pipeline::import::{
    CommitRequest, CommitResult, DetectImportsResult, ImportPreview, ImportService, ImportStatus,
};
use serde::Deserialize;

use crate::error::AppResult;
use crate::extract::JsonBody;
use crate::handlers::parse_uuid;
use crate::response::DataResponse;
use crate::state::AppState;

/// Optional `?session_uuid=` query parameter.
#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub session_uuid: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub content: String,
    pub filename: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UploadMultiRequest {
    pub files: Vec<UploadFile>,
}

#[derive(Debug, Deserialize)]
pub struct DetectImportsRequest {
    pub content: String,
}

/// Commit body. The session id stays a string so a malformed id is a 400.
#[derive(Debug, Deserialize)]
pub struct CommitBody {
    pub session_uuid: String,
    #[serde(default)]
    pub resolutions: BTreeMap<String, Resolution>,
    #[serde(default)]
    pub names: BTreeMap<String, String>,
}

/// GET /api/v1/import/status
pub async fn status(State(state): State<AppState>) -> AppResult<Json<DataResponse<ImportStatus>>> {
    let status = state.imports.status().await?;
    Ok(Json(DataResponse { data: status }))
}

/// GET /api/v1/import/preview
pub async fn preview(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> AppResult<Json<DataResponse<ImportPreview>>> {
    let session_uuid = query
        .session_uuid
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|s| parse_uuid("session_uuid", s))
        .transpose()?;
    let preview = state.imports.preview(session_uuid).await?;
    Ok(Json(DataResponse { data: preview }))
}

/// POST /api/v1/import/upload
pub async fn upload(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<UploadRequest>,
) -> AppResult<Json<DataResponse<ImportPreview>>> {
    let preview = state
        .imports
        .upload(&body.content, body.filename.as_deref())
        .await?;
    Ok(Json(DataResponse { data: preview }))
}

/// POST /api/v1/import/upload-multi
pub async fn upload_multi(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<UploadMultiRequest>,
) -> AppResult<Json<DataResponse<ImportPreview>>> {
    let preview = state.imports.upload_multi(&body.files).await?;
    Ok(Json(DataResponse { data: preview }))
}

/// POST /api/v1/import/detect-imports
pub async fn detect_imports(
    JsonBody(body): JsonBody<DetectImportsRequest>,
) -> Json<DataResponse<DetectImportsResult>> {
    Json(DataResponse {
        data: ImportService::detect_imports(&body.content),
    })
}

/// POST /api/v1/import/commit
pub async fn commit(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CommitBody>,
) -> AppResult<Json<DataResponse<CommitResult>>> {
    let request = CommitRequest {
        session_uuid: parse_uuid("session_uuid", &body.session_uuid)?,
        resolutions: body.resolutions,
        names: body.names,
    };
    let result = state.imports.commit(&request).await?;
    Ok(Json(DataResponse { data: result }))
}

/// DELETE /api/v1/import/cancel?session_uuid=...
pub async fn cancel(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> AppResult<StatusCode> {
    let raw = query.session_uuid.unwrap_or_default();
    let session_uuid = parse_uuid("session_uuid", &raw)?;
    state.imports.cancel(session_uuid).await?;
    Ok(StatusCode::NO_CONTENT)
}
