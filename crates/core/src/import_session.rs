//! Import session statuses and the mounted-file eligibility rule.
//!
//! Persisted sessions move through `pending -> reviewing -> committed`
//! (or `rejected` on cancel, `abandoned` when the mounted file vanishes).
//! Sessions without a database row are reported as `transient`.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ── Status names ─────────────────────────────────────────────────────

pub const SESSION_STATUS_PENDING: &str = "pending";
pub const SESSION_STATUS_REVIEWING: &str = "reviewing";
pub const SESSION_STATUS_COMMITTED: &str = "committed";
pub const SESSION_STATUS_REJECTED: &str = "rejected";
pub const SESSION_STATUS_ABANDONED: &str = "abandoned";

/// Status reported for sessions that only exist as files on disk.
pub const SESSION_STATUS_TRANSIENT: &str = "transient";

/// Session status enum matching the `import_session_statuses` seed data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending = 1,
    Reviewing = 2,
    Committed = 3,
    Rejected = 4,
    Abandoned = 5,
}

impl SessionStatus {
    /// Statuses that count as "an import is in progress".
    pub const OPEN: [SessionStatus; 2] = [SessionStatus::Pending, SessionStatus::Reviewing];

    /// Lookup-table primary key.
    pub fn id(self) -> DbId {
        self as DbId
    }

    pub fn from_id(id: DbId) -> Result<Self, CoreError> {
        match id {
            1 => Ok(Self::Pending),
            2 => Ok(Self::Reviewing),
            3 => Ok(Self::Committed),
            4 => Ok(Self::Rejected),
            5 => Ok(Self::Abandoned),
            other => Err(CoreError::Internal(format!(
                "Unknown import session status id {other}"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => SESSION_STATUS_PENDING,
            Self::Reviewing => SESSION_STATUS_REVIEWING,
            Self::Committed => SESSION_STATUS_COMMITTED,
            Self::Rejected => SESSION_STATUS_REJECTED,
            Self::Abandoned => SESSION_STATUS_ABANDONED,
        }
    }

    /// `true` for `pending` and `reviewing`.
    pub fn is_open(self) -> bool {
        Self::OPEN.contains(&self)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a mounted source file should be offered as an import candidate.
///
/// A file that was committed before is only offered again once its
/// modification time moves past the commit time.
pub fn is_source_eligible(modified_at: Timestamp, last_committed_at: Option<Timestamp>) -> bool {
    match last_committed_at {
        None => true,
        Some(committed_at) => modified_at > committed_at,
    }
}
