use std::time::Duration;

use reqwest::Url;
use tracing::{debug, error, info};

use crate::error::{AppError, Result};

/// Check an operator-supplied feed URL before any network traffic.
pub fn validate_feed_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|_| AppError::Config("Please enter a valid URL".to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(AppError::Config("URL must use HTTP or HTTPS protocol".to_string())),
    }
}

/// HTTP client for the odds feed. One per process, cloned into tasks.
#[derive(Debug, Clone)]
pub struct FeedClient {
    http: reqwest::Client,
}

impl FeedClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    /// GET the feed and return the raw body text.
    pub async fn fetch(&self, url: &Url) -> Result<String> {
        fetch_feed(&self.http, url).await
    }
}

/// GET `url` and return its body. Every failure is a `Transport` error with a
/// composed message.
pub async fn fetch_feed(client: &reqwest::Client, url: &Url) -> Result<String> {
    let resp = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| AppError::Transport(format!("Failed to reach feed at {url}: {e}")))?;

    let status = resp.status();
    if !status.is_success() {
        let detail = match resp.text().await {
            Ok(body) => error_detail(&body),
            Err(_) => status.canonical_reason().unwrap_or("Unknown status").to_string(),
        };
        error!(status = status.as_u16(), url = %url, "API error response: {detail}");
        return Err(AppError::Transport(format!(
            "API responded with status {}: {detail}",
            status.as_u16()
        )));
    }

    let body = resp
        .text()
        .await
        .map_err(|e| AppError::Transport(format!("Failed to read feed body: {e}")))?;

    let preview: String = body.chars().take(1000).collect();
    debug!(url = %url, bytes = body.len(), "Raw API response: {preview}");
    info!(url = %url, bytes = body.len(), "Fetched odds feed");
    Ok(body)
}

/// Message from a JSON error body, else the whole JSON, else the raw text.
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(v) => v
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| v.to_string()),
        Err(_) => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client() -> reqwest::Client {
        reqwest::Client::new()
    }

    #[test]
    fn url_validation() {
        assert!(validate_feed_url("https://example.com/draws").is_ok());
        assert!(validate_feed_url("http://localhost:8080/feed").is_ok());
        let err = validate_feed_url("ftp://example.com/feed").unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: URL must use HTTP or HTTPS protocol");
        let err = validate_feed_url("not a url").unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: Please enter a valid URL");
    }

    #[test]
    fn error_detail_prefers_message_field() {
        assert_eq!(error_detail(r#"{"message":"quota exceeded"}"#), "quota exceeded");
        assert_eq!(error_detail(r#"{"code":7}"#), r#"{"code":7}"#);
        assert_eq!(error_detail("Bad Gateway"), "Bad Gateway");
    }

    #[tokio::test]
    async fn returns_body_on_success() {
        let base = serve(Router::new().route("/feed", get(|| async { r#"{"draws":[]}"# }))).await;
        let url = validate_feed_url(&format!("{base}/feed")).unwrap();
        let body = fetch_feed(&client(), &url).await.unwrap();
        assert_eq!(body, r#"{"draws":[]}"#);
    }

    #[tokio::test]
    async fn non_2xx_composes_message() {
        let app = Router::new().route(
            "/feed",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, r#"{"message":"maintenance"}"#) }),
        );
        let base = serve(app).await;
        let url = validate_feed_url(&format!("{base}/feed")).unwrap();
        let err = fetch_feed(&client(), &url).await.unwrap_err();
        assert!(matches!(err, AppError::Transport(_)));
        assert_eq!(err.to_string(), "API responded with status 503: maintenance");
    }

    #[tokio::test]
    async fn connection_refused_is_transport() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let url = validate_feed_url(&format!("http://{addr}/feed")).unwrap();
        let err = fetch_feed(&client(), &url).await.unwrap_err();
        assert!(err.is_transport());
    }
}
