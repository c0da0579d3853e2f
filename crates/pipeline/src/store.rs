//! Collaborator interfaces used by the pipeline services.

use std::path::Path;

use async_trait::async_trait;
use gatehouse_caddy::caddyfile::CaddyfileError;
use gatehouse_core::caddy_import::ParseResult;
use gatehouse_core::import_session::SessionStatus;
use gatehouse_core::types::{DbId, Timestamp};
use gatehouse_db::models::import_session::{CommitRecord, CreateImportSession, ImportSession};
use gatehouse_db::models::proxy_host::{CreateProxyHost, ProxyHost};
use uuid::Uuid;

use crate::error::{ApplyError, StoreError};

/// Persistence for managed proxy hosts.
#[async_trait]
pub trait ProxyHostStore: Send + Sync {
    async fn list(&self) -> Result<Vec<ProxyHost>, StoreError>;

    async fn find_by_uuid(&self, uuid: Uuid) -> Result<Option<ProxyHost>, StoreError>;

    async fn create(&self, input: &CreateProxyHost) -> Result<ProxyHost, StoreError>;

    /// Write every mutable column of `host`. `None` if the row is gone.
    async fn update(&self, host: &ProxyHost) -> Result<Option<ProxyHost>, StoreError>;

    async fn set_access_list(
        &self,
        id: DbId,
        access_list_id: Option<DbId>,
    ) -> Result<Option<ProxyHost>, StoreError>;

    /// Returns `false` if no row had that id.
    async fn delete(&self, id: DbId) -> Result<bool, StoreError>;
}

/// Persistence for import sessions.
#[async_trait]
pub trait ImportSessionStore: Send + Sync {
    /// Fails with [`StoreError::Conflict`] if another open session already
    /// exists for the same source file.
    async fn create(&self, input: &CreateImportSession) -> Result<ImportSession, StoreError>;

    async fn find_by_uuid(&self, uuid: Uuid) -> Result<Option<ImportSession>, StoreError>;

    /// Most recent `pending`/`reviewing` session.
    async fn find_open(&self) -> Result<Option<ImportSession>, StoreError>;

    async fn latest_committed_at(&self, source_file: &str)
        -> Result<Option<Timestamp>, StoreError>;

    /// Atomically move the session to `to` if its status is one of `from`.
    async fn transition_status(
        &self,
        uuid: Uuid,
        from: &[SessionStatus],
        to: SessionStatus,
    ) -> Result<Option<ImportSession>, StoreError>;

    async fn record_commit(
        &self,
        uuid: Uuid,
        record: &CommitRecord,
    ) -> Result<Option<ImportSession>, StoreError>;

    async fn abandon_open_for_source(&self, source_file: &str) -> Result<u64, StoreError>;
}

/// Turns a root configuration file into candidate hosts.
pub trait ConfigParser: Send + Sync {
    fn import_file(&self, path: &Path) -> Result<ParseResult, CaddyfileError>;
}

/// Pushes the complete managed host set to the live proxy.
#[async_trait]
pub trait ConfigApplier: Send + Sync {
    async fn apply(&self, hosts: &[ProxyHost]) -> Result<(), ApplyError>;
}
