use gatehouse_caddy::caddyfile::CaddyfileError;
use gatehouse_core::error::CoreError;

/// Failures reported by a host or session store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness rule was violated (named by its constraint).
    #[error("Duplicate value violates unique constraint: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// The backing store could not be used at all.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    /// PostgreSQL unique violations on `uq_*` constraints become
    /// [`StoreError::Conflict`]; everything else is passed through.
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some("23505") {
                if let Some(constraint) = db_err.constraint().filter(|c| c.starts_with("uq_")) {
                    return StoreError::Conflict(constraint.to_string());
                }
            }
        }
        StoreError::Database(err)
    }
}

/// A live configuration push that did not succeed.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ApplyError(pub String);

/// Errors surfaced by the pipeline services.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The parser rejected a stored or mounted configuration.
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: CaddyfileError,
    },

    /// Live apply failed after a create; the new host was removed again.
    #[error("Failed to apply configuration to Caddy: {0}")]
    Apply(ApplyError),

    /// Live apply failed after an update or delete. The store change was
    /// kept, so the running proxy no longer matches the store.
    #[error("Change saved but failed to apply configuration to Caddy: {0}")]
    ApplyNotRolledBack(ApplyError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
