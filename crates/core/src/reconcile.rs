//! Conflict detection between imported candidates and managed hosts.
//!
//! Matching is exact string equality on the full `domain_names` field.
//! `"a.com,b.com"` does not match a managed `"a.com"`; wildcard and
//! multi-domain splitting are intentionally not performed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::caddy_import::{ParseResult, ParsedHost};

/// The fields an operator compares when deciding how to resolve a conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostSnapshot {
    pub domain_names: String,
    pub forward_scheme: String,
    pub forward_host: String,
    pub forward_port: i32,
    pub ssl_forced: bool,
    pub websocket_support: bool,
    pub enabled: bool,
}

impl From<&ParsedHost> for HostSnapshot {
    fn from(host: &ParsedHost) -> Self {
        Self {
            domain_names: host.domain_names.clone(),
            forward_scheme: host.forward_scheme.clone(),
            forward_host: host.forward_host.clone(),
            forward_port: host.forward_port,
            ssl_forced: host.ssl_forced,
            websocket_support: host.websocket_support,
            // Imported hosts are created enabled.
            enabled: true,
        }
    }
}

/// Side-by-side view of one conflicting domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictEntry {
    pub existing: HostSnapshot,
    pub incoming: HostSnapshot,
}

/// All conflicts for one parse result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReport {
    /// Conflicting domains in candidate order. This is what gets persisted.
    pub domains: Vec<String>,
    /// Per-domain comparison for display only.
    pub details: BTreeMap<String, ConflictEntry>,
}

impl ConflictReport {
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

/// Compare candidates against the managed host set.
pub fn detect_conflicts(candidates: &[ParsedHost], existing: &[HostSnapshot]) -> ConflictReport {
    let by_domain: BTreeMap<&str, &HostSnapshot> = existing
        .iter()
        .map(|h| (h.domain_names.as_str(), h))
        .collect();

    let mut report = ConflictReport::default();
    for candidate in candidates {
        let Some(current) = by_domain.get(candidate.domain_names.as_str()) else {
            continue;
        };
        if report.details.contains_key(&candidate.domain_names) {
            continue;
        }
        report.domains.push(candidate.domain_names.clone());
        report.details.insert(
            candidate.domain_names.clone(),
            ConflictEntry {
                existing: (*current).clone(),
                incoming: HostSnapshot::from(candidate),
            },
        );
    }
    report
}

/// Run [`detect_conflicts`] and record the conflicting domains on the
/// parse result. Returns the full report for the caller to display.
pub fn reconcile(result: &mut ParseResult, existing: &[HostSnapshot]) -> ConflictReport {
    let report = detect_conflicts(&result.hosts, existing);
    for domain in &report.domains {
        if !result.conflicts.contains(domain) {
            result.conflicts.push(domain.clone());
        }
    }
    report
}
