use std::path::PathBuf;

use gatehouse_pipeline::import::ImportConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the database URL have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Base URL of the Caddy admin API.
    pub caddy_admin_url: String,
    /// Root of the upload and backup directories.
    pub import_dir: PathBuf,
    /// Caddyfile mounted into the container, if any.
    pub import_caddyfile: Option<PathBuf>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `CADDY_ADMIN_URL`      | `http://localhost:2019`    |
    /// | `IMPORT_DIR`           | `data/imports`             |
    /// | `IMPORT_CADDYFILE`     | unset                      |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins = parse_origins(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".into()),
        );

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let caddy_admin_url =
            std::env::var("CADDY_ADMIN_URL").unwrap_or_else(|_| "http://localhost:2019".into());

        let import_dir = std::env::var("IMPORT_DIR")
            .unwrap_or_else(|_| "data/imports".into())
            .into();

        let import_caddyfile = std::env::var("IMPORT_CADDYFILE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            caddy_admin_url,
            import_dir,
            import_caddyfile,
        }
    }

    pub fn import_config(&self) -> ImportConfig {
        let config = ImportConfig::new(&self.import_dir);
        match &self.import_caddyfile {
            Some(path) => config.with_mounted_caddyfile(path),
            None => config,
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_trimmed_and_blank_entries_dropped() {
        assert_eq!(
            parse_origins(" http://a.test , ,http://b.test"),
            vec!["http://a.test", "http://b.test"]
        );
    }

    #[test]
    fn import_config_carries_mounted_caddyfile() {
        let config = ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            cors_origins: vec![],
            request_timeout_secs: 30,
            caddy_admin_url: "http://localhost:2019".into(),
            import_dir: "/data/imports".into(),
            import_caddyfile: Some("/etc/caddy/Caddyfile".into()),
        };
        let import = config.import_config();
        assert_eq!(import.uploads_dir(), PathBuf::from("/data/imports/uploads"));
        assert_eq!(
            import.mounted_caddyfile,
            Some(PathBuf::from("/etc/caddy/Caddyfile"))
        );
    }
}
