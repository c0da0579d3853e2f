//! In-process store and applier implementations.
//!
//! They follow the same rules as the PostgreSQL stores (unique uuids, one
//! open session per source file, compare-and-set transitions) so the
//! services can be exercised without a database or a running Caddy.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use gatehouse_core::import_session::SessionStatus;
use gatehouse_core::types::{DbId, Timestamp};
use gatehouse_db::models::import_session::{CommitRecord, CreateImportSession, ImportSession};
use gatehouse_db::models::proxy_host::{CreateProxyHost, ProxyHost};
use uuid::Uuid;

use crate::error::{ApplyError, StoreError};
use crate::store::{ConfigApplier, ImportSessionStore, ProxyHostStore};

fn poisoned() -> StoreError {
    StoreError::Unavailable("memory store lock poisoned".to_string())
}

struct Table<T> {
    rows: Vec<T>,
    next_id: DbId,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            next_id: 0,
        }
    }
}

impl<T> Table<T> {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }
}

// ── Proxy hosts ──────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryProxyHostStore {
    table: Mutex<Table<ProxyHost>>,
}

impl MemoryProxyHostStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProxyHostStore for MemoryProxyHostStore {
    async fn list(&self) -> Result<Vec<ProxyHost>, StoreError> {
        let table = self.table.lock().map_err(|_| poisoned())?;
        Ok(table.rows.clone())
    }

    async fn find_by_uuid(&self, uuid: Uuid) -> Result<Option<ProxyHost>, StoreError> {
        let table = self.table.lock().map_err(|_| poisoned())?;
        Ok(table.rows.iter().find(|h| h.uuid == uuid).cloned())
    }

    async fn create(&self, input: &CreateProxyHost) -> Result<ProxyHost, StoreError> {
        let mut table = self.table.lock().map_err(|_| poisoned())?;
        if table.rows.iter().any(|h| h.uuid == input.uuid) {
            return Err(StoreError::Conflict("uq_proxy_hosts_uuid".to_string()));
        }
        let now = Utc::now();
        let host = ProxyHost {
            id: table.next_id(),
            uuid: input.uuid,
            name: input.name.clone(),
            domain_names: input.domain_names.clone(),
            forward_scheme: input.forward_scheme.clone(),
            forward_host: input.forward_host.clone(),
            forward_port: input.forward_port,
            ssl_forced: input.ssl_forced,
            http2_support: input.http2_support,
            hsts_enabled: input.hsts_enabled,
            hsts_subdomains: input.hsts_subdomains,
            block_exploits: input.block_exploits,
            websocket_support: input.websocket_support,
            enabled: input.enabled,
            certificate_id: input.certificate_id,
            access_list_id: input.access_list_id,
            advanced_config: input.advanced_config.clone(),
            advanced_config_backup: None,
            created_at: now,
            updated_at: now,
        };
        table.rows.push(host.clone());
        Ok(host)
    }

    async fn update(&self, host: &ProxyHost) -> Result<Option<ProxyHost>, StoreError> {
        let mut table = self.table.lock().map_err(|_| poisoned())?;
        let Some(row) = table.rows.iter_mut().find(|h| h.id == host.id) else {
            return Ok(None);
        };
        let created_at = row.created_at;
        *row = host.clone();
        row.created_at = created_at;
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn set_access_list(
        &self,
        id: DbId,
        access_list_id: Option<DbId>,
    ) -> Result<Option<ProxyHost>, StoreError> {
        let mut table = self.table.lock().map_err(|_| poisoned())?;
        Ok(table.rows.iter_mut().find(|h| h.id == id).map(|row| {
            row.access_list_id = access_list_id;
            row.updated_at = Utc::now();
            row.clone()
        }))
    }

    async fn delete(&self, id: DbId) -> Result<bool, StoreError> {
        let mut table = self.table.lock().map_err(|_| poisoned())?;
        let before = table.rows.len();
        table.rows.retain(|h| h.id != id);
        Ok(table.rows.len() != before)
    }
}

// ── Import sessions ──────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryImportSessionStore {
    table: Mutex<Table<ImportSession>>,
}

impl MemoryImportSessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn is_open(session: &ImportSession) -> bool {
    SessionStatus::OPEN.iter().any(|s| s.id() == session.status_id)
}

#[async_trait]
impl ImportSessionStore for MemoryImportSessionStore {
    async fn create(&self, input: &CreateImportSession) -> Result<ImportSession, StoreError> {
        let mut table = self.table.lock().map_err(|_| poisoned())?;
        if table.rows.iter().any(|s| s.uuid == input.uuid) {
            return Err(StoreError::Conflict("uq_import_sessions_uuid".to_string()));
        }
        if input.status.is_open()
            && table
                .rows
                .iter()
                .any(|s| is_open(s) && s.source_file == input.source_file)
        {
            return Err(StoreError::Conflict(
                "uq_import_sessions_open_source".to_string(),
            ));
        }
        let now = Utc::now();
        let session = ImportSession {
            id: table.next_id(),
            uuid: input.uuid,
            source_file: input.source_file.clone(),
            status_id: input.status.id(),
            parsed_data: input.parsed_data.clone(),
            conflict_report: input.conflict_report.clone(),
            user_resolutions: input.user_resolutions.clone(),
            error_msg: input.error_msg.clone(),
            created_at: now,
            updated_at: now,
            committed_at: (input.status == SessionStatus::Committed).then_some(now),
        };
        table.rows.push(session.clone());
        Ok(session)
    }

    async fn find_by_uuid(&self, uuid: Uuid) -> Result<Option<ImportSession>, StoreError> {
        let table = self.table.lock().map_err(|_| poisoned())?;
        Ok(table.rows.iter().find(|s| s.uuid == uuid).cloned())
    }

    async fn find_open(&self) -> Result<Option<ImportSession>, StoreError> {
        let table = self.table.lock().map_err(|_| poisoned())?;
        Ok(table
            .rows
            .iter()
            .filter(|s| is_open(s))
            .max_by_key(|s| (s.created_at, s.id))
            .cloned())
    }

    async fn latest_committed_at(
        &self,
        source_file: &str,
    ) -> Result<Option<Timestamp>, StoreError> {
        let table = self.table.lock().map_err(|_| poisoned())?;
        Ok(table
            .rows
            .iter()
            .filter(|s| {
                s.source_file == source_file && s.status_id == SessionStatus::Committed.id()
            })
            .filter_map(|s| s.committed_at)
            .max())
    }

    async fn transition_status(
        &self,
        uuid: Uuid,
        from: &[SessionStatus],
        to: SessionStatus,
    ) -> Result<Option<ImportSession>, StoreError> {
        let mut table = self.table.lock().map_err(|_| poisoned())?;
        let Some(row) = table
            .rows
            .iter_mut()
            .find(|s| s.uuid == uuid && from.iter().any(|f| f.id() == s.status_id))
        else {
            return Ok(None);
        };
        let now = Utc::now();
        row.status_id = to.id();
        row.updated_at = now;
        if to == SessionStatus::Committed {
            row.committed_at = Some(now);
        }
        Ok(Some(row.clone()))
    }

    async fn record_commit(
        &self,
        uuid: Uuid,
        record: &CommitRecord,
    ) -> Result<Option<ImportSession>, StoreError> {
        let mut table = self.table.lock().map_err(|_| poisoned())?;
        Ok(table.rows.iter_mut().find(|s| s.uuid == uuid).map(|row| {
            row.parsed_data = Some(record.parsed_data.clone());
            row.conflict_report = Some(record.conflict_report.clone());
            row.user_resolutions = Some(record.user_resolutions.clone());
            row.error_msg = record.error_msg.clone();
            row.updated_at = Utc::now();
            row.clone()
        }))
    }

    async fn abandon_open_for_source(&self, source_file: &str) -> Result<u64, StoreError> {
        let mut table = self.table.lock().map_err(|_| poisoned())?;
        let mut count = 0;
        for row in table
            .rows
            .iter_mut()
            .filter(|s| s.source_file == source_file)
        {
            if is_open(row) {
                row.status_id = SessionStatus::Abandoned.id();
                row.updated_at = Utc::now();
                count += 1;
            }
        }
        Ok(count)
    }
}

// ── Applier ──────────────────────────────────────────────────────────

/// Records every pushed host set; can be switched to fail.
#[derive(Default)]
pub struct RecordingApplier {
    failing: AtomicBool,
    pushes: Mutex<Vec<Vec<ProxyHost>>>,
}

impl RecordingApplier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent pushes fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn push_count(&self) -> usize {
        self.pushes.lock().map(|p| p.len()).unwrap_or_default()
    }

    /// Host set of the most recent successful push.
    pub fn last_push(&self) -> Option<Vec<ProxyHost>> {
        self.pushes.lock().ok().and_then(|p| p.last().cloned())
    }
}

#[async_trait]
impl ConfigApplier for RecordingApplier {
    async fn apply(&self, hosts: &[ProxyHost]) -> Result<(), ApplyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ApplyError("caddy admin API unreachable".to_string()));
        }
        self.pushes
            .lock()
            .map_err(|_| ApplyError("applier lock poisoned".to_string()))?
            .push(hosts.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn session(source: &str, status: SessionStatus) -> CreateImportSession {
        CreateImportSession {
            uuid: Uuid::new_v4(),
            source_file: source.to_string(),
            status,
            parsed_data: None,
            conflict_report: None,
            user_resolutions: None,
            error_msg: None,
        }
    }

    #[tokio::test]
    async fn second_open_session_for_same_source_conflicts() {
        let store = MemoryImportSessionStore::new();
        store.create(&session("/etc/caddy/Caddyfile", SessionStatus::Pending)).await.unwrap();
        assert_matches!(
            store.create(&session("/etc/caddy/Caddyfile", SessionStatus::Reviewing)).await,
            Err(StoreError::Conflict(c)) if c == "uq_import_sessions_open_source"
        );
        // Closed sessions do not count.
        store.create(&session("/etc/caddy/Caddyfile", SessionStatus::Committed)).await.unwrap();
    }

    #[tokio::test]
    async fn transition_is_compare_and_set() {
        let store = MemoryImportSessionStore::new();
        let row = store.create(&session("a", SessionStatus::Reviewing)).await.unwrap();

        let first = store
            .transition_status(row.uuid, &[SessionStatus::Reviewing], SessionStatus::Committed)
            .await
            .unwrap();
        assert!(first.unwrap().committed_at.is_some());

        let second = store
            .transition_status(row.uuid, &[SessionStatus::Reviewing], SessionStatus::Committed)
            .await
            .unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn abandon_only_touches_open_sessions_of_source() {
        let store = MemoryImportSessionStore::new();
        store.create(&session("a", SessionStatus::Pending)).await.unwrap();
        store.create(&session("a", SessionStatus::Committed)).await.unwrap();
        store.create(&session("b", SessionStatus::Pending)).await.unwrap();

        assert_eq!(store.abandon_open_for_source("a").await.unwrap(), 1);
        assert_eq!(store.abandon_open_for_source("a").await.unwrap(), 0);
        assert_eq!(store.find_open().await.unwrap().unwrap().source_file, "b");
    }

    #[tokio::test]
    async fn fresh_host_store_numbers_rows_from_one() {
        let store = MemoryProxyHostStore::new();
        assert!(store.list().await.unwrap().is_empty());
        let dto: CreateProxyHost = serde_json::from_value(serde_json::json!({
            "domain_names": "a.com",
            "forward_host": "app",
            "forward_port": 80,
        }))
        .unwrap();
        assert_eq!(store.create(&dto).await.unwrap().id, 1);
        let second = CreateProxyHost {
            uuid: Uuid::new_v4(),
            ..dto
        };
        assert_eq!(store.create(&second).await.unwrap().id, 2);
    }

    #[tokio::test]
    async fn failing_applier_records_nothing() {
        let applier = RecordingApplier::new();
        applier.set_failing(true);
        assert!(applier.apply(&[]).await.is_err());
        assert_eq!(applier.push_count(), 0);
        applier.set_failing(false);
        applier.apply(&[]).await.unwrap();
        assert_eq!(applier.push_count(), 1);
    }
}
