//! PostgreSQL-backed stores.

use async_trait::async_trait;
use gatehouse_core::import_session::SessionStatus;
use gatehouse_core::types::{DbId, Timestamp};
use gatehouse_db::models::import_session::{CommitRecord, CreateImportSession, ImportSession};
use gatehouse_db::models::proxy_host::{CreateProxyHost, ProxyHost};
use gatehouse_db::repositories::{ImportSessionRepo, ProxyHostRepo};
use gatehouse_db::DbPool;
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::{ImportSessionStore, ProxyHostStore};

#[derive(Clone)]
pub struct PgProxyHostStore {
    pool: DbPool,
}

impl PgProxyHostStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProxyHostStore for PgProxyHostStore {
    async fn list(&self) -> Result<Vec<ProxyHost>, StoreError> {
        Ok(ProxyHostRepo::list(&self.pool).await?)
    }

    async fn find_by_uuid(&self, uuid: Uuid) -> Result<Option<ProxyHost>, StoreError> {
        Ok(ProxyHostRepo::find_by_uuid(&self.pool, uuid).await?)
    }

    async fn create(&self, input: &CreateProxyHost) -> Result<ProxyHost, StoreError> {
        Ok(ProxyHostRepo::create(&self.pool, input).await?)
    }

    async fn update(&self, host: &ProxyHost) -> Result<Option<ProxyHost>, StoreError> {
        Ok(ProxyHostRepo::update(&self.pool, host).await?)
    }

    async fn set_access_list(
        &self,
        id: DbId,
        access_list_id: Option<DbId>,
    ) -> Result<Option<ProxyHost>, StoreError> {
        Ok(ProxyHostRepo::set_access_list(&self.pool, id, access_list_id).await?)
    }

    async fn delete(&self, id: DbId) -> Result<bool, StoreError> {
        Ok(ProxyHostRepo::delete(&self.pool, id).await?)
    }
}

#[derive(Clone)]
pub struct PgImportSessionStore {
    pool: DbPool,
}

impl PgImportSessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImportSessionStore for PgImportSessionStore {
    async fn create(&self, input: &CreateImportSession) -> Result<ImportSession, StoreError> {
        Ok(ImportSessionRepo::create(&self.pool, input).await?)
    }

    async fn find_by_uuid(&self, uuid: Uuid) -> Result<Option<ImportSession>, StoreError> {
        Ok(ImportSessionRepo::find_by_uuid(&self.pool, uuid).await?)
    }

    async fn find_open(&self) -> Result<Option<ImportSession>, StoreError> {
        Ok(ImportSessionRepo::find_open(&self.pool).await?)
    }

    async fn latest_committed_at(
        &self,
        source_file: &str,
    ) -> Result<Option<Timestamp>, StoreError> {
        Ok(ImportSessionRepo::latest_committed_at(&self.pool, source_file).await?)
    }

    async fn transition_status(
        &self,
        uuid: Uuid,
        from: &[SessionStatus],
        to: SessionStatus,
    ) -> Result<Option<ImportSession>, StoreError> {
        Ok(ImportSessionRepo::transition_status(&self.pool, uuid, from, to).await?)
    }

    async fn record_commit(
        &self,
        uuid: Uuid,
        record: &CommitRecord,
    ) -> Result<Option<ImportSession>, StoreError> {
        Ok(ImportSessionRepo::record_commit(&self.pool, uuid, record).await?)
    }

    async fn abandon_open_for_source(&self, source_file: &str) -> Result<u64, StoreError> {
        Ok(ImportSessionRepo::abandon_open_for_source(&self.pool, source_file).await?)
    }
}
