pub mod health;
pub mod import;
pub mod proxy_hosts;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /import/status                   pending import, if any
/// /import/preview                  parse + conflicts for a session
/// /import/upload                   single Caddyfile upload
/// /import/upload-multi             Caddyfile plus imported files
/// /import/detect-imports           scan text for import directives
/// /import/commit                   apply resolutions
/// /import/cancel                   reject or discard a session
///
/// /proxy-hosts                     list, create
/// /proxy-hosts/bulk-access-list    bulk access-list assignment
/// /proxy-hosts/{uuid}              update, delete
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/import", import::router())
        .nest("/proxy-hosts", proxy_hosts::router())
}
