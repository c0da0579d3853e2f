//! Caddy JSON configuration generation.
//!
//! The whole managed host set is rendered into one HTTP server and pushed
//! with `POST /load`, replacing whatever Caddy was running.

use gatehouse_core::advanced_config::advanced_config_handlers;
use gatehouse_db::models::proxy_host::ProxyHost;
use serde_json::{json, Value};

/// Name of the HTTP server block owned by this service.
pub const SERVER_NAME: &str = "gatehouse";

/// HSTS header value used when a host enables HSTS.
pub const HSTS_MAX_AGE: &str = "max-age=31536000";

/// Render the full Caddy configuration for `hosts`.
///
/// Disabled hosts and hosts without an upstream produce no route. Hosts
/// that do not force TLS have their domains excluded from automatic
/// HTTPS redirects.
pub fn build_config(hosts: &[ProxyHost]) -> Value {
    let mut routes = Vec::new();
    let mut skip_redirects: Vec<String> = Vec::new();

    for host in hosts {
        if !host.enabled || host.forward_host.is_empty() {
            continue;
        }
        let domains = split_domains(&host.domain_names);
        if domains.is_empty() {
            continue;
        }
        if !host.ssl_forced {
            skip_redirects.extend(domains.iter().cloned());
        }
        routes.push(host_route(host, &domains));
    }

    json!({
        "apps": {
            "http": {
                "servers": {
                    SERVER_NAME: {
                        "listen": [":443", ":80"],
                        "routes": routes,
                        "automatic_https": {
                            "skip_redirects": skip_redirects,
                        },
                    }
                }
            }
        }
    })
}

fn split_domains(domain_names: &str) -> Vec<String> {
    domain_names
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect()
}

fn host_route(host: &ProxyHost, domains: &[String]) -> Value {
    let mut handlers = Vec::new();

    if host.hsts_enabled {
        let value = if host.hsts_subdomains {
            format!("{HSTS_MAX_AGE}; includeSubDomains")
        } else {
            HSTS_MAX_AGE.to_string()
        };
        handlers.push(json!({
            "handler": "headers",
            "response": { "set": { "Strict-Transport-Security": [value] } },
        }));
    }

    if let Some(snippet) = host.advanced_config.as_deref() {
        match advanced_config_handlers(snippet) {
            Ok(extra) => handlers.extend(extra),
            Err(e) => tracing::warn!(
                host_uuid = %host.uuid,
                error = %e,
                "Ignoring unparseable advanced config",
            ),
        }
    }

    handlers.push(reverse_proxy_handler(host));

    json!({
        "@id": format!("host-{}", host.uuid),
        "match": [{ "host": domains }],
        "handle": [{
            "handler": "subroute",
            "routes": [{ "handle": handlers }],
        }],
        "terminal": true,
    })
}

fn reverse_proxy_handler(host: &ProxyHost) -> Value {
    let mut handler = json!({
        "handler": "reverse_proxy",
        "upstreams": [{ "dial": format!("{}:{}", host.forward_host, host.forward_port) }],
    });
    if host.forward_scheme == "https" {
        handler["transport"] = json!({ "protocol": "http", "tls": {} });
    }
    if host.websocket_support {
        handler["flush_interval"] = json!(-1);
    }
    handler
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn host(domains: &str) -> ProxyHost {
        ProxyHost {
            id: 1,
            uuid: Uuid::new_v4(),
            name: String::new(),
            domain_names: domains.to_string(),
            forward_scheme: "http".into(),
            forward_host: "app".into(),
            forward_port: 8080,
            ssl_forced: true,
            http2_support: true,
            hsts_enabled: false,
            hsts_subdomains: false,
            block_exploits: true,
            websocket_support: false,
            enabled: true,
            certificate_id: None,
            access_list_id: None,
            advanced_config: None,
            advanced_config_backup: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn routes(config: &Value) -> &Vec<Value> {
        config["apps"]["http"]["servers"][SERVER_NAME]["routes"]
            .as_array()
            .unwrap()
    }

    #[test]
    fn empty_host_set_renders_empty_server() {
        let config = build_config(&[]);
        assert!(routes(&config).is_empty());
    }

    #[test]
    fn route_matches_every_domain_and_dials_upstream() {
        let config = build_config(&[host("a.com, www.a.com")]);
        let route = &routes(&config)[0];
        assert_eq!(route["match"][0]["host"], json!(["a.com", "www.a.com"]));
        let handlers = &route["handle"][0]["routes"][0]["handle"];
        assert_eq!(handlers[0]["handler"], "reverse_proxy");
        assert_eq!(handlers[0]["upstreams"][0]["dial"], "app:8080");
    }

    #[test]
    fn disabled_and_upstreamless_hosts_are_omitted() {
        let mut disabled = host("a.com");
        disabled.enabled = false;
        let mut no_upstream = host("b.com");
        no_upstream.forward_host.clear();
        let config = build_config(&[disabled, no_upstream, host("c.com")]);
        assert_eq!(routes(&config).len(), 1);
    }

    #[test]
    fn https_upstream_gets_tls_transport_and_websocket_flushes() {
        let mut h = host("a.com");
        h.forward_scheme = "https".into();
        h.websocket_support = true;
        let config = build_config(&[h]);
        let rp = &routes(&config)[0]["handle"][0]["routes"][0]["handle"][0];
        assert_eq!(rp["transport"]["protocol"], "http");
        assert_eq!(rp["flush_interval"], -1);
    }

    #[test]
    fn hsts_and_advanced_handlers_precede_proxy() {
        let mut h = host("a.com");
        h.hsts_enabled = true;
        h.hsts_subdomains = true;
        h.advanced_config = Some(r#"{"handler":"encode"}"#.into());
        let config = build_config(&[h]);
        let handlers = routes(&config)[0]["handle"][0]["routes"][0]["handle"]
            .as_array()
            .unwrap()
            .clone();
        let names: Vec<&str> = handlers.iter().map(|h| h["handler"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["headers", "encode", "reverse_proxy"]);
        assert_eq!(
            handlers[0]["response"]["set"]["Strict-Transport-Security"][0],
            "max-age=31536000; includeSubDomains"
        );
    }

    #[test]
    fn unforced_ssl_domains_skip_redirects() {
        let mut h = host("plain.com");
        h.ssl_forced = false;
        let config = build_config(&[h, host("secure.com")]);
        assert_eq!(
            config["apps"]["http"]["servers"][SERVER_NAME]["automatic_https"]["skip_redirects"],
            json!(["plain.com"])
        );
    }
}
