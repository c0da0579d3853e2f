//! Repository for managed proxy hosts.

use sqlx::PgPool;
use uuid::Uuid;
use gatehouse_core::types::DbId;

use crate::models::proxy_host::{CreateProxyHost, ProxyHost};

/// Column list for `proxy_hosts`.
const COLUMNS: &str = "id, uuid, name, domain_names, forward_scheme, forward_host, forward_port, \
     ssl_forced, http2_support, hsts_enabled, hsts_subdomains, block_exploits, \
     websocket_support, enabled, certificate_id, access_list_id, advanced_config, \
     advanced_config_backup, created_at, updated_at";

/// Provides CRUD operations for proxy hosts.
pub struct ProxyHostRepo;

impl ProxyHostRepo {
    /// List every managed host, oldest first.
    pub async fn list(pool: &PgPool) -> Result<Vec<ProxyHost>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM proxy_hosts ORDER BY id");
        sqlx::query_as::<_, ProxyHost>(&sql).fetch_all(pool).await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ProxyHost>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM proxy_hosts WHERE id = $1");
        sqlx::query_as::<_, ProxyHost>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_uuid(pool: &PgPool, uuid: Uuid) -> Result<Option<ProxyHost>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM proxy_hosts WHERE uuid = $1");
        sqlx::query_as::<_, ProxyHost>(&sql)
            .bind(uuid)
            .fetch_optional(pool)
            .await
    }

    /// Insert a new host.
    pub async fn create(pool: &PgPool, input: &CreateProxyHost) -> Result<ProxyHost, sqlx::Error> {
        let sql = format!(
            "INSERT INTO proxy_hosts \
                (uuid, name, domain_names, forward_scheme, forward_host, forward_port, \
                 ssl_forced, http2_support, hsts_enabled, hsts_subdomains, block_exploits, \
                 websocket_support, enabled, certificate_id, access_list_id, advanced_config) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProxyHost>(&sql)
            .bind(input.uuid)
            .bind(&input.name)
            .bind(&input.domain_names)
            .bind(&input.forward_scheme)
            .bind(&input.forward_host)
            .bind(input.forward_port)
            .bind(input.ssl_forced)
            .bind(input.http2_support)
            .bind(input.hsts_enabled)
            .bind(input.hsts_subdomains)
            .bind(input.block_exploits)
            .bind(input.websocket_support)
            .bind(input.enabled)
            .bind(input.certificate_id)
            .bind(input.access_list_id)
            .bind(&input.advanced_config)
            .fetch_one(pool)
            .await
    }

    /// Write every mutable column of `host` back to its row.
    ///
    /// `uuid` and `created_at` are never changed. Returns `None` if the
    /// row no longer exists.
    pub async fn update(pool: &PgPool, host: &ProxyHost) -> Result<Option<ProxyHost>, sqlx::Error> {
        let sql = format!(
            "UPDATE proxy_hosts SET \
                name = $2, domain_names = $3, forward_scheme = $4, forward_host = $5, \
                forward_port = $6, ssl_forced = $7, http2_support = $8, hsts_enabled = $9, \
                hsts_subdomains = $10, block_exploits = $11, websocket_support = $12, \
                enabled = $13, certificate_id = $14, access_list_id = $15, \
                advanced_config = $16, advanced_config_backup = $17, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProxyHost>(&sql)
            .bind(host.id)
            .bind(&host.name)
            .bind(&host.domain_names)
            .bind(&host.forward_scheme)
            .bind(&host.forward_host)
            .bind(host.forward_port)
            .bind(host.ssl_forced)
            .bind(host.http2_support)
            .bind(host.hsts_enabled)
            .bind(host.hsts_subdomains)
            .bind(host.block_exploits)
            .bind(host.websocket_support)
            .bind(host.enabled)
            .bind(host.certificate_id)
            .bind(host.access_list_id)
            .bind(&host.advanced_config)
            .bind(&host.advanced_config_backup)
            .fetch_optional(pool)
            .await
    }

    /// Set or clear the access list on one host.
    pub async fn set_access_list(
        pool: &PgPool,
        id: DbId,
        access_list_id: Option<DbId>,
    ) -> Result<Option<ProxyHost>, sqlx::Error> {
        let sql = format!(
            "UPDATE proxy_hosts SET access_list_id = $2, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProxyHost>(&sql)
            .bind(id)
            .bind(access_list_id)
            .fetch_optional(pool)
            .await
    }

    /// Hard-delete a host. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM proxy_hosts WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
