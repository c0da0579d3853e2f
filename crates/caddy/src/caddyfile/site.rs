//! Conversion of a parsed site block into a candidate proxy host.

use gatehouse_core::caddy_import::ParsedHost;

use super::blocks::{Directive, SiteBlock};

const STS_HEADER: &str = "Strict-Transport-Security";

/// A `reverse_proxy` upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Upstream {
    scheme: &'static str,
    host: String,
    port: i32,
}

/// Build a [`ParsedHost`] from a site block.
///
/// Returns a human-readable error when the site has no usable domain
/// (e.g. a port-only `:8080` listener).
pub(crate) fn to_parsed_host(site: &SiteBlock, source_file: &str) -> Result<ParsedHost, String> {
    let mut domains: Vec<String> = Vec::new();
    let mut plain_http = false;

    for raw in &site.addresses {
        let Some(addr) = parse_address(raw) else {
            continue;
        };
        plain_http |= addr.plain_http;
        if !domains.contains(&addr.host) {
            domains.push(addr.host);
        }
    }

    if domains.is_empty() {
        return Err(format!(
            "{source_file}: site '{}' has no domain name and was skipped",
            site.addresses.join(", ")
        ));
    }

    let mut warnings = Vec::new();
    let upstream = match find_reverse_proxy(site) {
        None => {
            warnings.push("No reverse_proxy directive; an upstream must be set after import".to_string());
            None
        }
        Some(rp) => {
            let targets = upstream_args(rp);
            if targets.len() > 1 {
                warnings.push(format!(
                    "Multiple upstreams found; only '{}' was imported",
                    targets[0]
                ));
            }
            match targets.first() {
                None => {
                    warnings.push("reverse_proxy has no upstream".to_string());
                    None
                }
                Some(target) => match parse_upstream(target) {
                    Some(mut up) => {
                        if uses_tls_transport(rp) {
                            up.scheme = "https";
                        }
                        Some(up)
                    }
                    None => {
                        warnings.push(format!("Unsupported upstream '{target}'"));
                        None
                    }
                },
            }
        }
    };

    let (forward_scheme, forward_host, forward_port) = match upstream {
        Some(up) => (up.scheme.to_string(), up.host, up.port),
        None => ("http".to_string(), String::new(), 80),
    };

    Ok(ParsedHost {
        domain_names: domains.join(","),
        forward_scheme,
        forward_host,
        forward_port,
        ssl_forced: !plain_http,
        websocket_support: has_websocket_hint(site),
        hsts_enabled: has_hsts_header(site),
        source_file: source_file.to_string(),
        warnings,
    })
}

struct Address {
    host: String,
    plain_http: bool,
}

/// Reduce a site address to its host name. `None` for port-only
/// addresses.
fn parse_address(raw: &str) -> Option<Address> {
    let (rest, mut plain_http) = if let Some(rest) = raw.strip_prefix("http://") {
        (rest, true)
    } else if let Some(rest) = raw.strip_prefix("https://") {
        (rest, false)
    } else {
        (raw, false)
    };

    let authority = rest.split('/').next().unwrap_or_default();
    let (host, port) = split_host_port(authority);
    if port == Some(80) {
        plain_http = true;
    }
    if host.is_empty() {
        return None;
    }
    Some(Address {
        host: host.to_ascii_lowercase(),
        plain_http,
    })
}

/// Split `host:port`, leaving bracketed IPv6 literals intact.
fn split_host_port(authority: &str) -> (&str, Option<i32>) {
    if authority.starts_with('[') {
        if let Some(end) = authority.find(']') {
            let port = authority[end + 1..]
                .strip_prefix(':')
                .and_then(|p| p.parse().ok());
            return (&authority[..=end], port);
        }
    }
    match authority.rsplit_once(':') {
        Some((host, port)) => match port.parse::<u16>() {
            Ok(port) => (host, Some(i32::from(port))),
            Err(_) => (authority, None),
        },
        None => (authority, None),
    }
}

fn find_reverse_proxy(site: &SiteBlock) -> Option<&Directive> {
    let mut found = None;
    site.walk(|d| {
        if found.is_none() && d.name == "reverse_proxy" {
            found = Some(d);
        }
    });
    found
}

/// Upstream addresses from the directive arguments (after an optional
/// matcher) and any `to` subdirectives.
fn upstream_args(rp: &Directive) -> Vec<&str> {
    let mut args = rp.args.iter().map(String::as_str).peekable();
    if args
        .peek()
        .is_some_and(|a| a.starts_with('/') || a.starts_with('@') || a.starts_with('*'))
    {
        args.next();
    }
    let mut targets: Vec<&str> = args.collect();
    for sub in rp.block.iter().filter(|d| d.name == "to") {
        targets.extend(sub.args.iter().map(String::as_str));
    }
    targets
}

fn parse_upstream(raw: &str) -> Option<Upstream> {
    let (scheme, rest) = if let Some(rest) = raw.strip_prefix("https://") {
        ("https", rest)
    } else if let Some(rest) = raw.strip_prefix("http://") {
        ("http", rest)
    } else if let Some(rest) = raw.strip_prefix("h2c://") {
        ("http", rest)
    } else {
        ("http", raw)
    };

    let authority = rest.split('/').next().unwrap_or_default();
    if authority.is_empty() {
        return None;
    }
    if let Some(port) = authority.strip_prefix(':') {
        let port: u16 = port.parse().ok()?;
        return Some(Upstream {
            scheme,
            host: "localhost".to_string(),
            port: i32::from(port),
        });
    }

    let (host, port) = split_host_port(authority);
    if host.contains(':') && !host.starts_with('[') {
        // Unparseable port, e.g. a port range.
        return None;
    }
    let default_port = if scheme == "https" { 443 } else { 80 };
    Some(Upstream {
        scheme,
        host: host.to_string(),
        port: port.unwrap_or(default_port),
    })
}

/// `transport http { tls }` inside the `reverse_proxy` block.
fn uses_tls_transport(rp: &Directive) -> bool {
    rp.block.iter().any(|d| {
        d.name == "transport"
            && d.args.first().is_some_and(|a| a == "http")
            && d.block.iter().any(|t| t.name.starts_with("tls"))
    })
}

fn has_websocket_hint(site: &SiteBlock) -> bool {
    let mut hint = false;
    site.walk(|d| {
        if d.name == "header_up"
            && d.args.first().is_some_and(|h| {
                let h = h.trim_start_matches(['+', '-']);
                h.eq_ignore_ascii_case("Upgrade") || h.eq_ignore_ascii_case("Connection")
            })
        {
            hint = true;
        }
        if d.name.starts_with('@') && mentions_websocket(d) {
            hint = true;
        }
    });
    hint
}

fn mentions_websocket(d: &Directive) -> bool {
    let lower = |s: &String| s.to_ascii_lowercase();
    d.args
        .iter()
        .map(lower)
        .any(|a| a.contains("upgrade") || a.contains("websocket"))
        || d.block.iter().any(mentions_websocket)
        || d.name.eq_ignore_ascii_case("Upgrade")
}

fn has_hsts_header(site: &SiteBlock) -> bool {
    let is_sts = |s: &str| s.trim_start_matches(['+', '-', '>']).eq_ignore_ascii_case(STS_HEADER);
    let mut hsts = false;
    site.walk(|d| {
        if (d.name == "header" && d.args.iter().any(|a| is_sts(a.as_str()))) || is_sts(d.name.as_str()) {
            hsts = true;
        }
    });
    hsts
}
