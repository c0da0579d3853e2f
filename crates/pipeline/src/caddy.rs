//! Caddy-backed parser and live config applier.

use std::path::Path;

use async_trait::async_trait;
use gatehouse_caddy::admin::{CaddyAdmin, CaddyAdminError};
use gatehouse_caddy::caddyfile::{self, CaddyfileError};
use gatehouse_caddy::config::build_config;
use gatehouse_core::caddy_import::ParseResult;
use gatehouse_db::models::proxy_host::ProxyHost;

use crate::error::ApplyError;
use crate::store::{ConfigApplier, ConfigParser};

/// [`ConfigParser`] over the Caddyfile import parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaddyfileParser;

impl ConfigParser for CaddyfileParser {
    fn import_file(&self, path: &Path) -> Result<ParseResult, CaddyfileError> {
        caddyfile::import_file(path)
    }
}

/// Renders the full host set and loads it through the Caddy admin API.
pub struct CaddyApplier {
    admin: CaddyAdmin,
}

impl CaddyApplier {
    pub fn new(admin: CaddyAdmin) -> Self {
        Self { admin }
    }
}

impl From<CaddyAdminError> for ApplyError {
    fn from(err: CaddyAdminError) -> Self {
        ApplyError(err.to_string())
    }
}

#[async_trait]
impl ConfigApplier for CaddyApplier {
    async fn apply(&self, hosts: &[ProxyHost]) -> Result<(), ApplyError> {
        let config = build_config(hosts);
        self.admin.load(&config).await?;
        tracing::info!(
            admin_url = %self.admin.admin_url(),
            hosts = hosts.len(),
            "Loaded configuration into Caddy",
        );
        Ok(())
    }
}
