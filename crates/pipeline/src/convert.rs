//! Conversion of parsed candidates into the managed host shape.

use gatehouse_core::caddy_import::ParsedHost;
use gatehouse_db::models::proxy_host::CreateProxyHost;
use uuid::Uuid;

/// Build the create DTO for a candidate, with a fresh external id.
///
/// The display name defaults to the domain list. Flags the Caddyfile
/// cannot express take the same defaults as a host created through the
/// API.
pub fn to_create_proxy_host(host: &ParsedHost) -> CreateProxyHost {
    CreateProxyHost {
        uuid: Uuid::new_v4(),
        name: host.domain_names.clone(),
        domain_names: host.domain_names.clone(),
        forward_scheme: host.forward_scheme.clone(),
        forward_host: host.forward_host.clone(),
        forward_port: host.forward_port,
        ssl_forced: host.ssl_forced,
        http2_support: true,
        hsts_enabled: host.hsts_enabled,
        hsts_subdomains: false,
        block_exploits: true,
        websocket_support: host.websocket_support,
        enabled: true,
        certificate_id: None,
        access_list_id: None,
        advanced_config: None,
    }
}

/// Create DTOs for every candidate, in order.
pub fn convert_to_proxy_hosts(hosts: &[ParsedHost]) -> Vec<CreateProxyHost> {
    hosts.iter().map(to_create_proxy_host).collect()
}
