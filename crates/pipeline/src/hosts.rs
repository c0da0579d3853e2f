//! Managed host mutations with live config application.
//!
//! Every mutation is followed by a push of the full host set. Only
//! creation is rolled back when that push fails; updates and deletes stay
//! in the store and are reported as [`PipelineError::ApplyNotRolledBack`].

use std::sync::Arc;

use gatehouse_core::advanced_config::normalize_advanced_config;
use gatehouse_core::error::CoreError;
use gatehouse_core::types::DbId;
use gatehouse_db::models::proxy_host::{CreateProxyHost, ProxyHost, UpdateProxyHost};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ApplyError, PipelineError};
use crate::store::{ConfigApplier, ProxyHostStore};

/// Accepted upstream schemes.
pub const VALID_FORWARD_SCHEMES: &[&str] = &["http", "https"];

/// Outcome of a bulk access-list assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkUpdateResult {
    pub updated: usize,
    pub errors: Vec<String>,
}

/// Check the fields every stored host must satisfy.
pub fn validate_host_fields(
    domain_names: &str,
    forward_scheme: &str,
    forward_host: &str,
    forward_port: i32,
) -> Result<(), CoreError> {
    if domain_names.trim().is_empty() {
        return Err(CoreError::Validation("Domain names are required".into()));
    }
    if !VALID_FORWARD_SCHEMES.contains(&forward_scheme) {
        return Err(CoreError::Validation(format!(
            "Invalid forward scheme '{forward_scheme}'. Must be one of: {}",
            VALID_FORWARD_SCHEMES.join(", ")
        )));
    }
    if forward_host.trim().is_empty() {
        return Err(CoreError::Validation(format!(
            "Host '{domain_names}' has no forward host"
        )));
    }
    if !(1..=65535).contains(&forward_port) {
        return Err(CoreError::Validation(format!(
            "Forward port {forward_port} is out of range (1-65535)"
        )));
    }
    Ok(())
}

/// Push the store's current host set to the live proxy.
pub(crate) async fn push_live(
    store: &dyn ProxyHostStore,
    applier: &dyn ConfigApplier,
) -> Result<(), PushError> {
    let hosts = store.list().await.map_err(PushError::Store)?;
    applier.apply(&hosts).await.map_err(PushError::Apply)
}

/// Why a live push did not happen.
#[derive(Debug)]
pub(crate) enum PushError {
    /// The host set could not be read, so nothing was pushed.
    Store(crate::error::StoreError),
    Apply(ApplyError),
}

impl std::fmt::Display for PushError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PushError::Store(e) => write!(f, "{e}"),
            PushError::Apply(e) => write!(f, "{e}"),
        }
    }
}

impl PushError {
    fn into_apply(self) -> ApplyError {
        match self {
            PushError::Store(e) => ApplyError(format!("could not load hosts for push: {e}")),
            PushError::Apply(e) => e,
        }
    }
}

/// Proxy host operations that keep Caddy in sync with the store.
pub struct HostService {
    store: Arc<dyn ProxyHostStore>,
    applier: Arc<dyn ConfigApplier>,
}

impl HostService {
    pub fn new(store: Arc<dyn ProxyHostStore>, applier: Arc<dyn ConfigApplier>) -> Self {
        Self { store, applier }
    }

    pub async fn list(&self) -> Result<Vec<ProxyHost>, PipelineError> {
        Ok(self.store.list().await?)
    }

    pub async fn get(&self, uuid: Uuid) -> Result<ProxyHost, PipelineError> {
        self.store
            .find_by_uuid(uuid)
            .await?
            .ok_or_else(|| CoreError::not_found("ProxyHost", uuid).into())
    }

    /// Create a host and make it live. If the push fails the row is
    /// deleted again and [`PipelineError::Apply`] is returned.
    pub async fn create(&self, mut input: CreateProxyHost) -> Result<ProxyHost, PipelineError> {
        validate_host_fields(
            &input.domain_names,
            &input.forward_scheme,
            &input.forward_host,
            input.forward_port,
        )?;
        input.advanced_config = match input.advanced_config.as_deref() {
            Some(raw) => normalize_advanced_config(raw)?,
            None => None,
        };

        let host = self.store.create(&input).await?;

        if let Err(e) = push_live(self.store.as_ref(), self.applier.as_ref()).await {
            tracing::warn!(host_uuid = %host.uuid, error = %e, "Live apply failed, rolling back create");
            match self.store.delete(host.id).await {
                Ok(_) => {}
                Err(del_err) => tracing::error!(
                    host_uuid = %host.uuid,
                    error = %del_err,
                    "Failed to roll back host after apply failure",
                ),
            }
            return Err(PipelineError::Apply(e.into_apply()));
        }

        tracing::info!(host_uuid = %host.uuid, domains = %host.domain_names, "Proxy host created");
        Ok(host)
    }

    /// Apply a partial update. A changed advanced config snippet is
    /// normalized and the previous snippet is kept as the backup.
    pub async fn update(
        &self,
        uuid: Uuid,
        input: UpdateProxyHost,
    ) -> Result<ProxyHost, PipelineError> {
        let mut host = self.get(uuid).await?;
        input.apply_to(&mut host);
        validate_host_fields(
            &host.domain_names,
            &host.forward_scheme,
            &host.forward_host,
            host.forward_port,
        )?;

        if let Some(raw) = input.advanced_config.as_deref() {
            let normalized = normalize_advanced_config(raw)?;
            if normalized != host.advanced_config {
                host.advanced_config_backup = host.advanced_config.take();
                host.advanced_config = normalized;
            }
        }

        let updated = self
            .store
            .update(&host)
            .await?
            .ok_or_else(|| CoreError::not_found("ProxyHost", uuid))?;

        self.push_not_rolled_back(uuid).await?;
        tracing::info!(host_uuid = %uuid, "Proxy host updated");
        Ok(updated)
    }

    pub async fn delete(&self, uuid: Uuid) -> Result<(), PipelineError> {
        let host = self.get(uuid).await?;
        if !self.store.delete(host.id).await? {
            return Err(CoreError::not_found("ProxyHost", uuid).into());
        }
        self.push_not_rolled_back(uuid).await?;
        tracing::info!(host_uuid = %uuid, "Proxy host deleted");
        Ok(())
    }

    /// Set (or clear) the access list on many hosts. Per-host failures are
    /// collected; the live config is pushed once if anything changed.
    pub async fn bulk_assign_access_list(
        &self,
        host_uuids: &[Uuid],
        access_list_id: Option<DbId>,
    ) -> Result<BulkUpdateResult, PipelineError> {
        let mut result = BulkUpdateResult::default();

        for uuid in host_uuids {
            let outcome = match self.store.find_by_uuid(*uuid).await {
                Ok(Some(host)) => self
                    .store
                    .set_access_list(host.id, access_list_id)
                    .await
                    .map_err(|e| e.to_string())
                    .and_then(|row| row.ok_or_else(|| "host no longer exists".to_string())),
                Ok(None) => Err("host not found".to_string()),
                Err(e) => Err(e.to_string()),
            };
            match outcome {
                Ok(_) => result.updated += 1,
                Err(msg) => result.errors.push(format!("{uuid}: {msg}")),
            }
        }

        if result.updated > 0 {
            if let Err(e) = push_live(self.store.as_ref(), self.applier.as_ref()).await {
                tracing::error!(error = %e, updated = result.updated, "Live apply failed after bulk access list update");
                return Err(PipelineError::ApplyNotRolledBack(e.into_apply()));
            }
        }

        tracing::info!(
            updated = result.updated,
            failed = result.errors.len(),
            "Bulk access list assignment finished",
        );
        Ok(result)
    }

    async fn push_not_rolled_back(&self, uuid: Uuid) -> Result<(), PipelineError> {
        push_live(self.store.as_ref(), self.applier.as_ref())
            .await
            .map_err(|e| {
                tracing::error!(host_uuid = %uuid, error = %e, "Live apply failed; store change kept");
                PipelineError::ApplyNotRolledBack(e.into_apply())
            })
    }
}
