//! Handlers for managed proxy hosts.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use gatehouse_core::types::DbId;
use gatehouse_db::models::proxy_host::{CreateProxyHost, ProxyHost, UpdateProxyHost};
use gatehouse_pipeline::hosts::BulkUpdateResult;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::extract::JsonBody;
use crate::handlers::parse_uuid;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BulkAccessListRequest {
    pub host_uuids: Vec<Uuid>,
    /// `null` clears the access list.
    pub access_list_id: Option<DbId>,
}

/// GET /api/v1/proxy-hosts
pub async fn list(State(state): State<AppState>) -> AppResult<Json<DataResponse<Vec<ProxyHost>>>> {
    let hosts = state.hosts.list().await?;
    Ok(Json(DataResponse { data: hosts }))
}

/// POST /api/v1/proxy-hosts
pub async fn create(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<CreateProxyHost>,
) -> AppResult<(StatusCode, Json<DataResponse<ProxyHost>>)> {
    let host = state.hosts.create(input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: host })))
}

/// PUT /api/v1/proxy-hosts/{uuid}
pub async fn update(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    JsonBody(input): JsonBody<UpdateProxyHost>,
) -> AppResult<Json<DataResponse<ProxyHost>>> {
    let uuid = parse_uuid("proxy host uuid", &raw)?;
    let host = state.hosts.update(uuid, input).await?;
    Ok(Json(DataResponse { data: host }))
}

/// DELETE /api/v1/proxy-hosts/{uuid}
pub async fn delete(State(state): State<AppState>, Path(raw): Path<String>) -> AppResult<StatusCode> {
    let uuid = parse_uuid("proxy host uuid", &raw)?;
    state.hosts.delete(uuid).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/proxy-hosts/bulk-access-list
pub async fn bulk_access_list(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<BulkAccessListRequest>,
) -> AppResult<Json<DataResponse<BulkUpdateResult>>> {
    let result = state
        .hosts
        .bulk_assign_access_list(&body.host_uuids, body.access_list_id)
        .await?;
    Ok(Json(DataResponse { data: result }))
}
