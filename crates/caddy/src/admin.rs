//! Client for the Caddy admin API.
//!
//! Two endpoints are wrapped: loading a complete configuration, and
//! reading the running one back, which startup uses to check that the
//! admin API is reachable.

/// HTTP client for a single Caddy admin endpoint.
pub struct CaddyAdmin {
    client: reqwest::Client,
    admin_url: String,
}

/// Errors from the Caddy admin API layer.
#[derive(Debug, thiserror::Error)]
pub enum CaddyAdminError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Caddy returned a non-2xx status code, usually with a description
    /// of why the configuration was rejected.
    #[error("Caddy admin API error ({status}): {body}")]
    Api { status: u16, body: String },
}

impl CaddyAdmin {
    /// * `admin_url` - Base URL of the admin API, e.g. `http://localhost:2019`.
    pub fn new(admin_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), admin_url)
    }

    pub fn with_client(client: reqwest::Client, admin_url: impl Into<String>) -> Self {
        Self {
            client,
            admin_url: admin_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn admin_url(&self) -> &str {
        &self.admin_url
    }

    /// Replace the running configuration (`POST /load`).
    pub async fn load(&self, config: &serde_json::Value) -> Result<(), CaddyAdminError> {
        let response = self
            .client
            .post(format!("{}/load", self.admin_url))
            .json(config)
            .send()
            .await?;

        Self::ensure_success(response).await?;
        Ok(())
    }

    /// Fetch the running configuration (`GET /config/`).
    pub async fn get_config(&self) -> Result<serde_json::Value, CaddyAdminError> {
        let response = self
            .client
            .get(format!("{}/config/", self.admin_url))
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        Ok(response.json().await?)
    }

    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, CaddyAdminError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(CaddyAdminError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn trailing_slash_is_trimmed() {
        let admin = CaddyAdmin::new("http://localhost:2019/");
        assert_eq!(admin.admin_url(), "http://localhost:2019");
    }

    /// Answer a single request with a canned HTTP response.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn local_admin(url: String) -> CaddyAdmin {
        CaddyAdmin::with_client(reqwest::Client::builder().no_proxy().build().unwrap(), url)
    }

    #[tokio::test]
    async fn get_config_returns_running_config() {
        let url = serve_once("200 OK", r#"{"apps":{"http":{}}}"#).await;
        let config = local_admin(url).get_config().await.unwrap();
        assert_eq!(config, serde_json::json!({ "apps": { "http": {} } }));
    }

    #[tokio::test]
    async fn non_success_status_is_api_error() {
        let url = serve_once("500 Internal Server Error", "admin endpoint disabled").await;
        let err = local_admin(url).get_config().await.unwrap_err();
        assert_matches!(err, CaddyAdminError::Api { status: 500, body } if body == "admin endpoint disabled");
    }

    #[test]
    fn api_error_message_carries_status_and_body() {
        let err = CaddyAdminError::Api {
            status: 400,
            body: "loading config: invalid".into(),
        };
        assert_eq!(
            err.to_string(),
            "Caddy admin API error (400): loading config: invalid"
        );
    }
}
