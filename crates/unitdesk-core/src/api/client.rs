//! API client for the console's REST backend.
//!
//! This module provides the `ApiClient` struct for listing and mutating
//! departments, positions, employees, vehicles and entry/exit requests.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::resource::{Resource, ResourceKind};
use super::ApiError;
use crate::cache::RequestCoalescer;
use crate::service::Backend;

// ============================================================================
// Constants
// ============================================================================

/// Backend used when nothing is configured (local development server)
pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";

/// HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Default initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Connection settings for `ApiClient`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub token: Option<String>,
    /// First wait after a 429; doubled on each further retry
    pub rate_limit_backoff: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            token: None,
            rate_limit_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        }
    }
}

/// API client for the console backend.
///
/// Clone is cheap: reqwest::Client uses Arc internally for connection
/// pooling, and clones share the same set of in-flight GET requests.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    rate_limit_backoff: Duration,
    in_flight_gets: RequestCoalescer<String, Value, ApiError>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self::with_client(client, config))
    }

    fn with_client(client: Client, config: &ApiConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            rate_limit_backoff: config.rate_limit_backoff,
            in_flight_gets: RequestCoalescer::new(),
        }
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    /// In-flight GETs are not shared across tokens.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token),
            rate_limit_backoff: self.rate_limit_backoff,
            in_flight_gets: RequestCoalescer::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self, kind: ResourceKind) -> String {
        format!("{}/{}", self.base_url, kind.path())
    }

    fn list_url(&self, kind: ResourceKind) -> String {
        format!("{}/list", self.collection_url(kind))
    }

    fn item_url(&self, kind: ResourceKind, id: &str) -> Result<String> {
        if !Self::is_valid_id(id) {
            return Err(anyhow::anyhow!("Invalid {} id: {:?}", kind, id));
        }
        Ok(format!("{}/{}", self.collection_url(kind), id))
    }

    /// Ids are interpolated into the path, so they must be a single
    /// non-empty path segment.
    fn is_valid_id(id: &str) -> bool {
        !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }

    /// Send a request and return its JSON body, retrying rate-limited
    /// responses with exponential backoff. Empty bodies (204) yield `Null`.
    async fn send_json(&self, method: Method, url: &str, body: Option<&Value>) -> Result<Value, ApiError> {
        let mut retries = 0;
        let mut backoff = self.rate_limit_backoff;

        loop {
            let mut request = self.client.request(method.clone(), url);
            if let Some(ref token) = self.token {
                request = request.bearer_auth(token);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                retries += 1;
                if retries > MAX_RATE_LIMIT_RETRIES {
                    return Err(ApiError::RateLimited);
                }
                warn!(url = url, retry = retries, backoff_ms = backoff.as_millis() as u64, "Rate limited, backing off");
                tokio::time::sleep(backoff).await;
                backoff *= 2; // Exponential backoff
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ApiError::from_status(status, &body));
            }

            let text = response.text().await?;
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&text)
                .map_err(|e| ApiError::InvalidResponse(format!("{} (from {})", e, url)));
        }
    }

    /// GET a JSON document. Identical GETs issued while one is running share
    /// its response.
    async fn get<T: DeserializeOwned>(&self, url: String) -> Result<T> {
        let this = self.clone();
        let target = url.clone();
        let value = self
            .in_flight_gets
            .run(format!("GET:{}", url), move || async move {
                this.send_json(Method::GET, &target, None).await
            })
            .await
            .map_err(anyhow::Error::new)
            .with_context(|| format!("Failed to send GET request to {}", url))?;

        T::deserialize(&*value).with_context(|| format!("Failed to parse JSON response from {}", url))
    }

    async fn send<T: DeserializeOwned, B: Serialize + ?Sized>(&self, method: Method, url: &str, body: &B) -> Result<T> {
        let body = serde_json::to_value(body).context("Failed to serialize request body")?;
        let value = self
            .send_json(method.clone(), url, Some(&body))
            .await
            .with_context(|| format!("Failed to send {} request to {}", method, url))?;

        serde_json::from_value(value).with_context(|| format!("Failed to parse JSON response from {}", url))
    }
}

#[async_trait]
impl Backend for ApiClient {
    async fn list<R: Resource>(&self) -> Result<Vec<R::Item>> {
        debug!(resource = %R::KIND, "Fetching collection");
        self.get(self.list_url(R::KIND)).await
    }

    async fn create<R: Resource>(&self, payload: &R::Payload) -> Result<R::Item> {
        let url = self.collection_url(R::KIND);
        self.send(Method::POST, &url, payload).await
    }

    async fn update<R: Resource>(&self, id: &str, payload: &R::Payload) -> Result<R::Item> {
        let url = self.item_url(R::KIND, id)?;
        self.send(Method::PUT, &url, payload).await
    }

    async fn delete<R: Resource>(&self, id: &str) -> Result<()> {
        let url = self.item_url(R::KIND, id)?;
        self.send_json(Method::DELETE, &url, None)
            .await
            .with_context(|| format!("Failed to delete {} {}", R::KIND, id))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use crate::api::resource::{Departments, Positions, Vehicles};

    fn client(base_url: &str) -> ApiClient {
        ApiClient::new(&ApiConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        })
        .expect("Failed to build test client")
    }

    #[test]
    fn test_is_valid_id() {
        assert!(ApiClient::is_valid_id("0e65066c-ab20-4da0-b3bf-79dfd0668049"));
        assert!(ApiClient::is_valid_id("42"));

        assert!(!ApiClient::is_valid_id(""));
        assert!(!ApiClient::is_valid_id("../admin"));
        assert!(!ApiClient::is_valid_id("1?force=true"));
        assert!(!ApiClient::is_valid_id("1#frag"));
    }

    #[test]
    fn test_urls_are_built_from_trimmed_base() {
        let api = client("http://backend.local:8080/api/");
        assert_eq!(api.base_url(), "http://backend.local:8080/api");
        assert_eq!(
            api.list_url(ResourceKind::Departments),
            "http://backend.local:8080/api/departments/list"
        );
        assert_eq!(
            api.item_url(ResourceKind::EntryExitRequests, "r-1").unwrap(),
            "http://backend.local:8080/api/entry-exit-requests/r-1"
        );
        assert!(api.item_url(ResourceKind::Vehicles, "a/b").is_err());
    }

    #[test]
    fn test_with_token_keeps_base_url() {
        let api = client(DEFAULT_API_URL);
        let authed = api.with_token("jwt".to_string());
        assert_eq!(authed.base_url(), DEFAULT_API_URL);
        assert_eq!(authed.token.as_deref(), Some("jwt"));
        assert!(api.token.is_none());
    }

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert_eq!(config.base_url, "http://localhost:8080/api");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.rate_limit_backoff, Duration::from_secs(1));
    }

    // ===== Against a local HTTP server =====

    type Seen = Arc<Mutex<Vec<String>>>;

    /// Serve one canned response per connection, in order, repeating the
    /// last one. Records the head of every request received.
    async fn stub_server(responses: Vec<(u16, &'static str)>, delay: Duration) -> (String, Seen) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);

        tokio::spawn(async move {
            let mut served = 0;
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut head = Vec::new();
                let mut chunk = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => head.extend_from_slice(&chunk[..n]),
                    }
                }
                log.lock().unwrap().push(String::from_utf8_lossy(&head).into_owned());

                let (status, body) = responses[served.min(responses.len() - 1)];
                served += 1;
                tokio::time::sleep(delay).await;

                let response = match status {
                    204 => "HTTP/1.1 204 No Content\r\nConnection: close\r\n\r\n".to_string(),
                    _ => format!(
                        "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    ),
                };
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{}/api", addr), seen)
    }

    fn local_client(base_url: &str, token: Option<&str>) -> ApiClient {
        let http = Client::builder().no_proxy().build().unwrap();
        ApiClient::with_client(
            http,
            &ApiConfig {
                base_url: base_url.to_string(),
                token: token.map(str::to_string),
                rate_limit_backoff: Duration::from_millis(1),
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_concurrent_identical_gets_send_one_request() {
        let (base_url, seen) = stub_server(
            vec![(200, r#"[{"id":"d1","name":"Headquarters"}]"#)],
            Duration::from_millis(50),
        )
        .await;
        let api = local_client(&base_url, None);

        let (a, b) = tokio::join!(api.list::<Departments>(), api.list::<Departments>());

        assert_eq!(a.unwrap()[0].name, "Headquarters");
        assert_eq!(b.unwrap().len(), 1);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].starts_with("GET /api/departments/list "));
        assert_eq!(api.in_flight_gets.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_sequential_gets_are_not_cached() {
        let (base_url, seen) = stub_server(vec![(200, "[]")], Duration::ZERO).await;
        let api = local_client(&base_url, None);

        api.list::<Vehicles>().await.unwrap();
        api.list::<Vehicles>().await.unwrap();

        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_accepts_no_content() {
        let (base_url, seen) = stub_server(vec![(204, "")], Duration::ZERO).await;
        let api = local_client(&base_url, Some("jwt-123"));

        api.delete::<Vehicles>("v-1").await.unwrap();

        let seen = seen.lock().unwrap();
        assert!(seen[0].starts_with("DELETE /api/vehicles/v-1 "));
        assert!(seen[0].to_lowercase().contains("authorization: bearer jwt-123"));
    }

    #[tokio::test]
    async fn test_rate_limit_retried_then_succeeds() {
        let (base_url, seen) = stub_server(vec![(429, ""), (200, "[]")], Duration::ZERO).await;
        let api = local_client(&base_url, None);

        let positions = api.list::<Positions>().await.unwrap();

        assert!(positions.is_empty());
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rate_limit_gives_up_after_three_retries() {
        let (base_url, seen) = stub_server(vec![(429, "")], Duration::ZERO).await;
        let api = local_client(&base_url, None);

        let err = api.list::<Positions>().await.unwrap_err();

        let api_err = err.downcast_ref::<Arc<ApiError>>().map(|e| &**e);
        assert!(matches!(api_err, Some(ApiError::RateLimited)), "unexpected error: {:#}", err);
        assert_eq!(seen.lock().unwrap().len(), 1 + MAX_RATE_LIMIT_RETRIES as usize);
    }

    #[tokio::test]
    async fn test_error_status_is_classified() {
        let (base_url, _seen) = stub_server(vec![(404, "no such vehicle")], Duration::ZERO).await;
        let api = local_client(&base_url, None);

        let err = api.delete::<Vehicles>("v-9").await.unwrap_err();

        assert!(matches!(err.downcast_ref::<ApiError>(), Some(ApiError::NotFound(_))));
        assert!(format!("{:#}", err).contains("no such vehicle"));
    }
}
