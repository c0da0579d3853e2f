//! Caddyfile import parser.
//!
//! Turns a root Caddyfile (plus everything it imports) into candidate
//! proxy hosts. Only the subset of Caddyfile syntax that maps onto a
//! managed proxy host is interpreted: site addresses, `reverse_proxy`
//! upstreams, websocket hints and HSTS headers. Everything else is
//! tolerated and ignored.
//!
//! Problems confined to one import or one site are collected into
//! [`ParseResult::errors`]; only malformed syntax aborts the parse.

mod blocks;
mod imports;
mod lexer;
mod site;

use std::path::{Path, PathBuf};

use gatehouse_core::caddy_import::ParseResult;

pub use imports::MAX_IMPORT_DEPTH;

use blocks::BlockParser;
use imports::Expander;

/// Fatal Caddyfile parse failures.
#[derive(Debug, thiserror::Error)]
pub enum CaddyfileError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{file}:{line}: {message}")]
    Syntax {
        file: String,
        line: usize,
        message: String,
    },
}

/// Parse the Caddyfile at `path` and every file it imports.
///
/// Imports are resolved relative to the importing file and must stay
/// inside the directory containing `path`.
pub fn import_file(path: &Path) -> Result<ParseResult, CaddyfileError> {
    let src = std::fs::read_to_string(path).map_err(|source| CaddyfileError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let root_dir = parent.canonicalize().map_err(|source| CaddyfileError::Io {
        path: parent.display().to_string(),
        source,
    })?;

    let mut expander = Expander::new(root_dir);
    let tokens = expander.expand_source(&src, path)?;

    let (sites, block_errors) = BlockParser::new(&tokens, &expander.files).parse()?;

    let mut result = ParseResult {
        errors: expander.errors,
        ..ParseResult::default()
    };
    result.errors.extend(block_errors);

    for site in &sites {
        let source_file = expander
            .files
            .get(site.file)
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        match site::to_parsed_host(site, &source_file) {
            Ok(host) => result.hosts.push(host),
            Err(message) => result.errors.push(message),
        }
    }

    tracing::debug!(
        root = %path.display(),
        files = expander.files.len(),
        hosts = result.hosts.len(),
        errors = result.errors.len(),
        "Parsed Caddyfile",
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::fs;

    fn write(dir: &Path, rel: &str, content: &str) -> PathBuf {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn domains(result: &ParseResult) -> Vec<&str> {
        result.hosts.iter().map(|h| h.domain_names.as_str()).collect()
    }

    #[test]
    fn single_site_with_reverse_proxy() {
        let dir = tempfile::tempdir().unwrap();
        let root = write(
            dir.path(),
            "Caddyfile",
            "example.com {\n  reverse_proxy app:8080\n}\n",
        );

        let result = import_file(&root).unwrap();
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert_eq!(result.hosts.len(), 1);
        let host = &result.hosts[0];
        assert_eq!(host.domain_names, "example.com");
        assert_eq!(host.forward_scheme, "http");
        assert_eq!(host.forward_host, "app");
        assert_eq!(host.forward_port, 8080);
        assert!(host.ssl_forced);
        assert!(result.conflicts.is_empty());
    }

    #[test]
    fn glob_import_pulls_in_sibling_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = write(dir.path(), "Caddyfile", "import sites/*\n");
        write(dir.path(), "sites/site1", "site1.com");
        write(dir.path(), "sites/site2", "site2.com");

        let result = import_file(&root).unwrap();
        assert_eq!(domains(&result), vec!["site1.com", "site2.com"]);
        assert!(result.hosts[0].source_file.ends_with("site1"));
        // Brace-less sites without upstreams are still candidates.
        assert!(!result.hosts[0].has_upstream());
        assert!(!result.hosts[0].warnings.is_empty());
    }

    #[test]
    fn snippets_expand_inside_sites() {
        let dir = tempfile::tempdir().unwrap();
        let root = write(
            dir.path(),
            "Caddyfile",
            "(proxy) {\n  reverse_proxy backend:9000\n}\na.com {\n  import proxy\n}\n",
        );

        let result = import_file(&root).unwrap();
        assert_eq!(result.hosts.len(), 1);
        assert_eq!(result.hosts[0].forward_host, "backend");
        assert_eq!(result.hosts[0].forward_port, 9000);
    }

    #[test]
    fn import_cycle_is_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let root = write(dir.path(), "Caddyfile", "import a.caddy\n");
        write(dir.path(), "a.caddy", "import b.caddy\na.com {\n  reverse_proxy x:1\n}\n");
        write(dir.path(), "b.caddy", "import a.caddy\n");

        let result = import_file(&root).unwrap();
        assert_eq!(domains(&result), vec!["a.com"]);
        assert!(result.errors.iter().any(|e| e.contains("cycle")), "{:?}", result.errors);
    }

    #[test]
    fn import_outside_root_directory_is_refused() {
        let outer = tempfile::tempdir().unwrap();
        write(outer.path(), "secret.caddy", "evil.com {\n  reverse_proxy x:1\n}\n");
        let root = write(outer.path(), "conf/Caddyfile", "import ../secret.caddy\n");

        let result = import_file(&root).unwrap();
        assert!(result.hosts.is_empty());
        assert!(
            result.errors.iter().any(|e| e.contains("outside")),
            "{:?}",
            result.errors
        );
    }

    #[test]
    fn unmatched_import_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let root = write(dir.path(), "Caddyfile", "import missing/*\na.com {\n}\n");

        let result = import_file(&root).unwrap();
        assert_eq!(result.hosts.len(), 1);
        assert!(result.errors.iter().any(|e| e.contains("matched no files")));
    }

    #[test]
    fn unbalanced_braces_fail_the_parse() {
        let dir = tempfile::tempdir().unwrap();
        let root = write(dir.path(), "Caddyfile", "a.com {\n  reverse_proxy x:1\n");

        assert_matches!(import_file(&root), Err(CaddyfileError::Syntax { .. }));
    }

    #[test]
    fn missing_root_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert_matches!(
            import_file(&dir.path().join("nope")),
            Err(CaddyfileError::Io { .. })
        );
    }

    #[test]
    fn port_only_site_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let root = write(
            dir.path(),
            "Caddyfile",
            ":8080 {\n  respond ok\n}\nb.com {\n  reverse_proxy y:2\n}\n",
        );

        let result = import_file(&root).unwrap();
        assert_eq!(domains(&result), vec!["b.com"]);
        assert_eq!(result.errors.len(), 1);
    }
}
