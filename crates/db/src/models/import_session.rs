//! Import session rows and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;
use gatehouse_core::error::CoreError;
use gatehouse_core::import_session::SessionStatus;
use gatehouse_core::types::{DbId, Timestamp};

/// A row from the `import_sessions` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct ImportSession {
    pub id: DbId,
    pub uuid: Uuid,
    pub source_file: String,
    pub status_id: DbId,
    /// Serialized `ParseResult`.
    pub parsed_data: Option<serde_json::Value>,
    /// Serialized list of conflicting domains.
    pub conflict_report: Option<serde_json::Value>,
    /// Serialized `{domain: resolution}` map chosen at commit.
    pub user_resolutions: Option<serde_json::Value>,
    pub error_msg: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub committed_at: Option<Timestamp>,
}

impl ImportSession {
    pub fn status(&self) -> Result<SessionStatus, CoreError> {
        SessionStatus::from_id(self.status_id)
    }
}

/// DTO for inserting a session row.
#[derive(Debug, Clone)]
pub struct CreateImportSession {
    pub uuid: Uuid,
    pub source_file: String,
    pub status: SessionStatus,
    pub parsed_data: Option<serde_json::Value>,
    pub conflict_report: Option<serde_json::Value>,
    pub user_resolutions: Option<serde_json::Value>,
    pub error_msg: Option<String>,
}

/// Data written back onto a session when it is committed.
#[derive(Debug, Clone)]
pub struct CommitRecord {
    pub parsed_data: serde_json::Value,
    pub conflict_report: serde_json::Value,
    pub user_resolutions: serde_json::Value,
    pub error_msg: Option<String>,
}
