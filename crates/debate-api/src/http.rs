//! HTTP backend abstraction for the conversation API.
//!
//! Every endpoint is a `POST`. The production backend uses reqwest and
//! retries only failures that never produced a complete response (connect
//! and transport errors, timeouts while sending or reading the body). A
//! response with a non-2xx status is returned immediately.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::config::ApiClientConfig;
use crate::error::{ApiError, ApiResult};

/// A successful response body with its declared content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

// ============================================================================
// HTTP Backend Trait
// ============================================================================

/// Trait for HTTP backends that can post to the conversation API.
#[async_trait]
pub trait HttpBackend: Send + Sync {
    /// Post a JSON body and deserialize the JSON response.
    async fn post_json<B, T>(&self, url: &Url, body: &B) -> ApiResult<T>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned + Send;

    /// Post a JSON body and return the response body untouched.
    async fn post_raw<B>(&self, url: &Url, body: &B) -> ApiResult<RawResponse>
    where
        B: Serialize + Sync + ?Sized;

    /// Post without a body, ignoring any response body.
    async fn post_empty(&self, url: &Url) -> ApiResult<()>;
}

// ============================================================================
// Reqwest Backend
// ============================================================================

/// Backoff before retry number `attempt` (1-based): `base * 2^(attempt-1)`.
pub(crate) fn backoff_delay(base: Duration, attempt: u8) -> Duration {
    base.saturating_mul(2u32.saturating_pow(u32::from(attempt.saturating_sub(1))))
}

/// Production HTTP backend using reqwest with retry logic.
pub struct ReqwestBackend {
    client: reqwest::Client,
    user_agent: String,
    max_retries: u8,
    retry_base_delay: Duration,
}

impl ReqwestBackend {
    /// Create a new reqwest backend with the given configuration.
    pub fn new(config: &ApiClientConfig) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
            max_retries: config.max_retries,
            retry_base_delay: config.retry_base_delay,
        })
    }

    fn build_request(&self, url: &Url, payload: Option<&[u8]>) -> reqwest::RequestBuilder {
        let request = self
            .client
            .post(url.as_str())
            .header(USER_AGENT, &self.user_agent);
        match payload {
            Some(bytes) => request
                .header(CONTENT_TYPE, "application/json")
                .body(bytes.to_vec()),
            None => request,
        }
    }

    /// Send a request and read its body, retrying transient failures.
    ///
    /// The body read is part of the attempt, so a stall after the headers
    /// is retried like a stall before them.
    async fn fetch_with_retry(&self, url: &Url, payload: Option<&[u8]>) -> ApiResult<RawResponse> {
        let mut attempt: u8 = 0;
        loop {
            if attempt > 0 {
                let delay = backoff_delay(self.retry_base_delay, attempt);
                tokio::time::sleep(delay).await;
            }

            match self.fetch_once(url, payload).await {
                Err(Attempt::Transient(e)) if attempt < self.max_retries => {
                    attempt += 1;
                    warn!(%url, attempt, error = %e, "Retrying API request");
                }
                Err(Attempt::Transient(e) | Attempt::Fatal(e)) => {
                    return Err(classify(url, e));
                }
                Err(Attempt::Status(error)) => return Err(error),
                Ok(response) => return Ok(response),
            }
        }
    }

    async fn fetch_once(&self, url: &Url, payload: Option<&[u8]>) -> Result<RawResponse, Attempt> {
        let response = self
            .build_request(url, payload)
            .send()
            .await
            .map_err(Attempt::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), %url, "API returned error status");
            return Err(Attempt::Status(ApiError::Status {
                status: status.as_u16(),
                url: url.to_string(),
                body,
            }));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(Attempt::from)?.to_vec();
        Ok(RawResponse {
            content_type,
            bytes,
        })
    }
}

/// Outcome of one failed attempt.
enum Attempt {
    /// Connect, transport, body or timeout failure: worth another try.
    Transient(reqwest::Error),
    /// Builder, redirect or decode failure: retrying cannot help.
    Fatal(reqwest::Error),
    /// The server answered with a non-2xx status.
    Status(ApiError),
}

impl From<reqwest::Error> for Attempt {
    fn from(e: reqwest::Error) -> Self {
        if is_transient(&e) {
            Self::Transient(e)
        } else {
            Self::Fatal(e)
        }
    }
}

/// Failures that never produced a complete response.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
}

fn classify(url: &Url, e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout {
            url: url.to_string(),
        }
    } else {
        e.into()
    }
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn post_json<B, T>(&self, url: &Url, body: &B) -> ApiResult<T>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned + Send,
    {
        let payload = serde_json::to_vec(body)?;
        let response = self.fetch_with_retry(url, Some(&payload)).await?;
        Ok(serde_json::from_slice(&response.bytes)?)
    }

    async fn post_raw<B>(&self, url: &Url, body: &B) -> ApiResult<RawResponse>
    where
        B: Serialize + Sync + ?Sized,
    {
        let payload = serde_json::to_vec(body)?;
        self.fetch_with_retry(url, Some(&payload)).await
    }

    async fn post_empty(&self, url: &Url) -> ApiResult<()> {
        self.fetch_with_retry(url, None).await?;
        Ok(())
    }
}

// ============================================================================
// Fake Backend for Testing
// ============================================================================

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Canned response for the fake backend.
    #[derive(Clone)]
    pub struct CannedResponse {
        pub status: u16,
        pub content_type: Option<String>,
        pub body: Vec<u8>,
    }

    impl CannedResponse {
        pub fn json(value: &serde_json::Value) -> Self {
            Self {
                status: 200,
                content_type: Some("application/json".to_string()),
                body: value.to_string().into_bytes(),
            }
        }

        pub fn bytes(content_type: &str, body: &[u8]) -> Self {
            Self {
                status: 200,
                content_type: Some(content_type.to_string()),
                body: body.to_vec(),
            }
        }

        pub fn status(status: u16, body: &str) -> Self {
            Self {
                status,
                content_type: Some("application/json".to_string()),
                body: body.as_bytes().to_vec(),
            }
        }
    }

    /// A request seen by the fake backend.
    #[derive(Debug, Clone)]
    pub struct RecordedRequest {
        pub url: Url,
        pub body: Option<serde_json::Value>,
    }

    /// A fake HTTP backend that returns canned responses by URL substring.
    #[derive(Default)]
    pub struct FakeBackend {
        responses: Mutex<Vec<(String, CannedResponse)>>,
        requests: Arc<Mutex<Vec<RecordedRequest>>>,
    }

    impl FakeBackend {
        pub fn new() -> Self {
            Self::default()
        }

        /// Add a canned response for URLs containing `url_contains`.
        pub fn with_response(self, url_contains: &str, response: CannedResponse) -> Self {
            self.responses
                .lock()
                .unwrap()
                .push((url_contains.to_string(), response));
            self
        }

        /// Handle to the requests recorded so far.
        pub fn requests(&self) -> Arc<Mutex<Vec<RecordedRequest>>> {
            Arc::clone(&self.requests)
        }

        fn respond(&self, url: &Url, body: Option<serde_json::Value>) -> ApiResult<CannedResponse> {
            self.requests.lock().unwrap().push(RecordedRequest {
                url: url.clone(),
                body,
            });
            let canned = self
                .responses
                .lock()
                .unwrap()
                .iter()
                .find(|(pattern, _)| url.as_str().contains(pattern.as_str()))
                .map(|(_, r)| r.clone())
                .unwrap_or_else(|| CannedResponse::status(404, "not found"));
            if (200..300).contains(&canned.status) {
                Ok(canned)
            } else {
                Err(ApiError::Status {
                    status: canned.status,
                    url: url.to_string(),
                    body: String::from_utf8_lossy(&canned.body).into_owned(),
                })
            }
        }
    }

    #[async_trait]
    impl HttpBackend for FakeBackend {
        async fn post_json<B, T>(&self, url: &Url, body: &B) -> ApiResult<T>
        where
            B: Serialize + Sync + ?Sized,
            T: DeserializeOwned + Send,
        {
            let canned = self.respond(url, Some(serde_json::to_value(body)?))?;
            Ok(serde_json::from_slice(&canned.body)?)
        }

        async fn post_raw<B>(&self, url: &Url, body: &B) -> ApiResult<RawResponse>
        where
            B: Serialize + Sync + ?Sized,
        {
            let canned = self.respond(url, Some(serde_json::to_value(body)?))?;
            Ok(RawResponse {
                content_type: canned.content_type,
                bytes: canned.body,
            })
        }

        async fn post_empty(&self, url: &Url) -> ApiResult<()> {
            self.respond(url, None).map(|_| ())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_backoff_doubles() {
        let base = Duration::from_millis(300);
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(300));
        assert_eq!(backoff_delay(base, 2), Duration::from_millis(600));
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(1200));
    }

    #[test]
    fn test_reqwest_backend_creation() {
        let backend = assert_ok!(ReqwestBackend::new(&ApiClientConfig::default()));
        assert_eq!(backend.max_retries, 2);
        assert_eq!(backend.retry_base_delay, Duration::from_millis(300));
    }

    /// How the local test server treats each connection.
    #[derive(Clone, Copy)]
    enum Reply {
        /// Read the request and hang up without answering.
        HangUp,
        /// Send headers promising 100 bytes, one byte, then stall.
        StallBody,
        /// Answer `400 Bad Request` with body `bad`.
        BadRequest,
    }

    /// Serve `reply` on a local port, counting accepted connections.
    async fn serve(reply: Reply) -> (Url, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((mut stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf).await;
                match reply {
                    Reply::HangUp => drop(stream),
                    Reply::StallBody => {
                        let head = "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 100\r\n\r\n{";
                        let _ = stream.write_all(head.as_bytes()).await;
                        held.push(stream);
                    }
                    Reply::BadRequest => {
                        let response = "HTTP/1.1 400 Bad Request\r\ncontent-length: 3\r\nconnection: close\r\n\r\nbad";
                        let _ = stream.write_all(response.as_bytes()).await;
                    }
                }
            }
        });
        let url = Url::parse(&format!("http://{addr}/api/chat/message")).unwrap();
        (url, hits)
    }

    fn fast_backend() -> ReqwestBackend {
        let config = ApiClientConfig::new()
            .with_timeout(Duration::from_millis(200))
            .with_max_retries(2)
            .with_retry_delay(Duration::from_millis(1));
        ReqwestBackend::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_dropped_connection_is_retried_then_surfaces_network_error() {
        let (url, hits) = serve(Reply::HangUp).await;

        let result: ApiResult<serde_json::Value> = fast_backend().post_json(&url, &json!({})).await;
        let err = assert_err!(result);
        assert!(matches!(err, ApiError::Network(_)), "{err:?}");
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_stalled_body_is_retried_then_surfaces_timeout() {
        let (url, hits) = serve(Reply::StallBody).await;

        let result = fast_backend().post_raw(&url, &json!({})).await;
        let err = assert_err!(result);
        assert!(matches!(err, ApiError::Timeout { .. }), "{err:?}");
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_client_error_status_is_not_retried() {
        let (url, hits) = serve(Reply::BadRequest).await;

        let result: ApiResult<serde_json::Value> = fast_backend().post_json(&url, &json!({})).await;
        let err = assert_err!(result);
        assert!(
            matches!(err, ApiError::Status { status: 400, ref body, .. } if body == "bad"),
            "{err:?}"
        );
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fake_backend_returns_canned_response() {
        let backend = FakeBackend::new()
            .with_response("/start", CannedResponse::json(&json!({"ok": true})));
        let url = Url::parse("http://localhost/api/chat/start").unwrap();

        let result: serde_json::Value = backend.post_json(&url, &json!({"a": 1})).await.unwrap();
        assert_eq!(result["ok"], true);

        let requests = backend.requests();
        let recorded = requests.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].body.as_ref().unwrap()["a"], 1);
    }

    #[tokio::test]
    async fn test_fake_backend_status_error_keeps_body() {
        let backend =
            FakeBackend::new().with_response("/message", CannedResponse::status(500, "oops"));
        let url = Url::parse("http://localhost/api/chat/message").unwrap();

        let result: ApiResult<serde_json::Value> = backend.post_json(&url, &json!({})).await;
        assert!(matches!(
            result,
            Err(ApiError::Status { status: 500, ref body, .. }) if body == "oops"
        ));
    }
}
