//! Candidate hosts produced by parsing an imported Caddyfile, and the
//! stateless `import` directive scanner used by the upload UI.

use serde::{Deserialize, Serialize};

/// Directive keyword that pulls other files (or snippets) into a Caddyfile.
pub const IMPORT_DIRECTIVE: &str = "import";

/// A host described by imported configuration text.
///
/// Never stored directly; the pipeline converts it into a managed proxy
/// host before writing anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedHost {
    /// Site addresses joined with `,` (e.g. `"a.com,www.a.com"`).
    pub domain_names: String,
    pub forward_scheme: String,
    /// Empty when the site block has no `reverse_proxy` upstream.
    pub forward_host: String,
    pub forward_port: i32,
    pub ssl_forced: bool,
    pub websocket_support: bool,
    pub hsts_enabled: bool,
    /// File the site block was read from (root or an imported file).
    #[serde(default)]
    pub source_file: String,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl ParsedHost {
    /// `true` when the site proxies to an upstream.
    pub fn has_upstream(&self) -> bool {
        !self.forward_host.is_empty()
    }
}

/// Outcome of parsing a root Caddyfile and everything it imports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseResult {
    pub hosts: Vec<ParsedHost>,
    /// Domains that collide with managed hosts. Filled by the reconciler.
    #[serde(default)]
    pub conflicts: Vec<String>,
    /// Non-fatal problems (unresolvable imports, unreadable files).
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Scan raw Caddyfile text for `import` directives and return their
/// arguments.
///
/// Only lines whose trimmed form starts with the directive keyword count.
/// Anything after a `#` is a comment and is dropped.
pub fn detect_imports(content: &str) -> Vec<String> {
    content
        .lines()
        .filter_map(|line| {
            let code = match line.find('#') {
                Some(pos) => &line[..pos],
                None => line,
            };
            let trimmed = code.trim();
            let rest = trimmed.strip_prefix(IMPORT_DIRECTIVE)?;
            if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
                // e.g. "imports" or "import_foo"
                return None;
            }
            let args = rest.trim();
            (!args.is_empty()).then(|| args.to_string())
        })
        .collect()
}
