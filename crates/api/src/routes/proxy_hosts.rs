//! Route definitions for the `/proxy-hosts` resource.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::proxy_hosts;
use crate::state::AppState;

/// Routes mounted at `/proxy-hosts`.
///
/// ```text
/// GET    /                   -> list
/// POST   /                   -> create
/// PUT    /bulk-access-list   -> bulk_access_list
/// PUT    /{uuid}             -> update
/// DELETE /{uuid}             -> delete
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(proxy_hosts::list).post(proxy_hosts::create))
        .route("/bulk-access-list", put(proxy_hosts::bulk_access_list))
        .route(
            "/{uuid}",
            put(proxy_hosts::update).delete(proxy_hosts::delete),
        )
}
