//! Managed proxy host rows and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use gatehouse_core::reconcile::HostSnapshot;
use gatehouse_core::types::{DbId, Timestamp};

/// A row from the `proxy_hosts` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct ProxyHost {
    pub id: DbId,
    pub uuid: Uuid,
    pub name: String,
    pub domain_names: String,
    pub forward_scheme: String,
    pub forward_host: String,
    pub forward_port: i32,
    pub ssl_forced: bool,
    pub http2_support: bool,
    pub hsts_enabled: bool,
    pub hsts_subdomains: bool,
    pub block_exploits: bool,
    pub websocket_support: bool,
    pub enabled: bool,
    pub certificate_id: Option<DbId>,
    pub access_list_id: Option<DbId>,
    pub advanced_config: Option<String>,
    pub advanced_config_backup: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ProxyHost {
    /// Comparable fields for conflict reports.
    pub fn snapshot(&self) -> HostSnapshot {
        HostSnapshot {
            domain_names: self.domain_names.clone(),
            forward_scheme: self.forward_scheme.clone(),
            forward_host: self.forward_host.clone(),
            forward_port: self.forward_port,
            ssl_forced: self.ssl_forced,
            websocket_support: self.websocket_support,
            enabled: self.enabled,
        }
    }

    /// Overwrite the forwarding and behaviour fields with those of
    /// `incoming`, keeping identity, certificate and access-list linkage,
    /// advanced config and creation time.
    pub fn apply_fields(&mut self, incoming: &CreateProxyHost) {
        self.name = incoming.name.clone();
        self.domain_names = incoming.domain_names.clone();
        self.forward_scheme = incoming.forward_scheme.clone();
        self.forward_host = incoming.forward_host.clone();
        self.forward_port = incoming.forward_port;
        self.ssl_forced = incoming.ssl_forced;
        self.http2_support = incoming.http2_support;
        self.hsts_enabled = incoming.hsts_enabled;
        self.hsts_subdomains = incoming.hsts_subdomains;
        self.block_exploits = incoming.block_exploits;
        self.websocket_support = incoming.websocket_support;
        self.enabled = incoming.enabled;
    }
}

/// DTO for inserting a proxy host. The caller picks the external uuid.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CreateProxyHost {
    #[serde(default = "Uuid::new_v4")]
    pub uuid: Uuid,
    #[serde(default)]
    pub name: String,
    pub domain_names: String,
    #[serde(default = "default_forward_scheme")]
    pub forward_scheme: String,
    pub forward_host: String,
    pub forward_port: i32,
    #[serde(default)]
    pub ssl_forced: bool,
    #[serde(default = "default_true")]
    pub http2_support: bool,
    #[serde(default)]
    pub hsts_enabled: bool,
    #[serde(default)]
    pub hsts_subdomains: bool,
    #[serde(default = "default_true")]
    pub block_exploits: bool,
    #[serde(default)]
    pub websocket_support: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub certificate_id: Option<DbId>,
    #[serde(default)]
    pub access_list_id: Option<DbId>,
    #[serde(default)]
    pub advanced_config: Option<String>,
}

/// DTO for a partial update. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProxyHost {
    pub name: Option<String>,
    pub domain_names: Option<String>,
    pub forward_scheme: Option<String>,
    pub forward_host: Option<String>,
    pub forward_port: Option<i32>,
    pub ssl_forced: Option<bool>,
    pub http2_support: Option<bool>,
    pub hsts_enabled: Option<bool>,
    pub hsts_subdomains: Option<bool>,
    pub block_exploits: Option<bool>,
    pub websocket_support: Option<bool>,
    pub enabled: Option<bool>,
    pub certificate_id: Option<DbId>,
    pub access_list_id: Option<DbId>,
    /// An empty string clears the snippet.
    pub advanced_config: Option<String>,
}

impl UpdateProxyHost {
    /// Apply every provided field except `advanced_config`, which the
    /// caller normalizes and backs up separately.
    pub fn apply_to(&self, host: &mut ProxyHost) {
        if let Some(v) = &self.name {
            host.name = v.clone();
        }
        if let Some(v) = &self.domain_names {
            host.domain_names = v.clone();
        }
        if let Some(v) = &self.forward_scheme {
            host.forward_scheme = v.clone();
        }
        if let Some(v) = &self.forward_host {
            host.forward_host = v.clone();
        }
        if let Some(v) = self.forward_port {
            host.forward_port = v;
        }
        if let Some(v) = self.ssl_forced {
            host.ssl_forced = v;
        }
        if let Some(v) = self.http2_support {
            host.http2_support = v;
        }
        if let Some(v) = self.hsts_enabled {
            host.hsts_enabled = v;
        }
        if let Some(v) = self.hsts_subdomains {
            host.hsts_subdomains = v;
        }
        if let Some(v) = self.block_exploits {
            host.block_exploits = v;
        }
        if let Some(v) = self.websocket_support {
            host.websocket_support = v;
        }
        if let Some(v) = self.enabled {
            host.enabled = v;
        }
        if let Some(v) = self.certificate_id {
            host.certificate_id = Some(v);
        }
        if let Some(v) = self.access_list_id {
            host.access_list_id = Some(v);
        }
    }
}

fn default_forward_scheme() -> String {
    "http".to_string()
}

fn default_true() -> bool {
    true
}
