use std::sync::Arc;

use gatehouse_pipeline::hosts::HostService;
use gatehouse_pipeline::import::ImportService;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    /// Database pool, used by the health check. `None` when the services
    /// run on in-memory stores.
    pub pool: Option<gatehouse_db::DbPool>,
    pub config: Arc<ServerConfig>,
    pub imports: Arc<ImportService>,
    pub hosts: Arc<HostService>,
}
