//! Upstream Fetcher
//!
//! HTTP client used by the sidecar to fill cache misses. A cache key maps
//! directly onto a path under the configured base URL.

use std::time::Duration;

use anyhow::{anyhow, Context};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: String,
}

impl UpstreamClient {
    /// Builds a client whose requests give up after `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to create upstream HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key.trim_start_matches('/'))
    }

    /// Fetches the JSON document for `key`.
    ///
    /// Takes `self` by value so the returned future owns everything it needs;
    /// clone the client per call.
    pub async fn fetch(self, key: String) -> anyhow::Result<Value> {
        let url = self.url_for(&key);
        debug!(%url, "Fetching from upstream");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("upstream returned {status} for {url}"));
        }

        response
            .json::<Value>()
            .await
            .with_context(|| format!("invalid JSON from {url}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Json, Router};
    use serde_json::json;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn test_url_for_joins_cleanly() {
        let client = UpstreamClient::new("http://localhost:8080/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(client.url_for("api/blog/all"), "http://localhost:8080/api/blog/all");
        assert_eq!(client.url_for("/api/user/1"), "http://localhost:8080/api/user/1");
    }

    #[tokio::test]
    async fn test_fetch_returns_json_body() {
        let base = serve(Router::new().route(
            "/api/user/1",
            get(|| async { Json(json!({"id": 1, "name": "ada"})) }),
        ))
        .await;

        let client = UpstreamClient::new(base, Duration::from_secs(5)).unwrap();
        let value = client.fetch("api/user/1".to_string()).await.unwrap();
        assert_eq!(value, json!({"id": 1, "name": "ada"}));
    }

    #[tokio::test]
    async fn test_fetch_rejects_error_status() {
        let base = serve(Router::new().route(
            "/api/missing",
            get(|| async { StatusCode::NOT_FOUND }),
        ))
        .await;

        let client = UpstreamClient::new(base, Duration::from_secs(5)).unwrap();
        let err = client.fetch("api/missing".to_string()).await.unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let base = serve(Router::new().route(
            "/api/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!(null))
            }),
        ))
        .await;

        let client = UpstreamClient::new(base, Duration::from_millis(50)).unwrap();
        assert!(client.fetch("api/slow".to_string()).await.is_err());
    }
}
