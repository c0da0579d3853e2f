pub mod import;
pub mod proxy_hosts;

use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Parse a client-supplied uuid, rejecting anything malformed with 400.
pub(crate) fn parse_uuid(field: &str, raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::BadRequest(format!("Invalid {field}: must be a UUID")))
}
