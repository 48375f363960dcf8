//! Retrying JSON request client
//!
//! Every attempt runs under its own timeout. Non-2xx responses and transport
//! failures are retried a bounded number of times with a fixed delay; any
//! other failure surfaces immediately. A cancelled call lets its in-flight
//! attempt finish but never starts another.

use futures::future::BoxFuture;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::sleep::{Sleeper, TokioSleeper};

/// Default per-attempt timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default number of attempts (including the first)
pub const DEFAULT_RETRIES: u32 = 3;
/// Default wait between attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

// =============================================================================
// Errors
// =============================================================================

/// Request failures, classified by how the caller should react
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HttpError {
    /// Connection failure, abort or per-attempt timeout
    #[error("Network error: {0}")]
    Network(String),

    /// Server answered with a non-2xx status; `body` is the decoded payload
    #[error("HTTP {status}")]
    Status { status: u16, body: Value },

    /// Response could not be decoded or was missing required fields
    #[error("Invalid response: {0}")]
    Protocol(String),
}

impl HttpError {
    /// Only transport and status failures are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, HttpError::Network(_) | HttpError::Status { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failure reported by a [`Transport`] before any response arrived
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct TransportError(pub String);

// =============================================================================
// Transport
// =============================================================================

/// A single outgoing request, fully resolved
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

/// Undecoded response as the transport saw it
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }
}

/// Moves bytes to a server and back. Timeouts and retries are handled above it.
pub trait Transport: Send + Sync {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<RawResponse, TransportError>>;
}

/// Transport backed by `reqwest`
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<RawResponse, TransportError>> {
        Box::pin(async move {
            let mut builder = self
                .client
                .request(request.method, &request.url)
                .headers(request.headers);
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder
                .send()
                .await
                .map_err(|e| TransportError(e.to_string()))?;

            let status = response.status().as_u16();
            let headers = response.headers().clone();
            let body = response
                .text()
                .await
                .map_err(|e| TransportError(e.to_string()))?;

            Ok(RawResponse {
                status,
                headers,
                body,
            })
        })
    }
}

// =============================================================================
// Request Configuration
// =============================================================================

/// Per-call overrides; unset fields fall back to the client defaults
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub timeout: Option<Duration>,
    pub retries: Option<u32>,
    pub retry_delay: Option<Duration>,
    pub headers: HeaderMap,
    pub cancel: Option<CancellationToken>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    /// Stop retrying once `token` is cancelled
    pub fn cancel_on(mut self, token: &CancellationToken) -> Self {
        self.cancel = Some(token.clone());
        self
    }

    /// Add a header; invalid names or values are dropped with a warning
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (
            name.parse::<reqwest::header::HeaderName>(),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => warn!(header = name, "Dropping invalid request header"),
        }
        self
    }
}

/// Resolved configuration for one call
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub timeout: Duration,
    pub retries: u32,
    pub retry_delay: Duration,
    pub headers: HeaderMap,
    pub cancel: Option<CancellationToken>,
}

impl RequestConfig {
    /// Total attempts; zero is treated as a single attempt
    pub fn attempts(&self) -> u32 {
        self.retries.max(1)
    }
}

/// Decoded successful response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub data: Value,
    pub status: u16,
    pub headers: HeaderMap,
}

impl HttpResponse {
    /// Deserialize the payload into a typed response
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        serde_json::from_value(self.data.clone())
            .map_err(|e| HttpError::Protocol(format!("JSON parse error: {}", e)))
    }
}

// =============================================================================
// Client
// =============================================================================

/// JSON request client with timeout, header merging and fixed-delay retry
pub struct RequestClient {
    base_url: String,
    default_headers: HeaderMap,
    timeout: Duration,
    retries: u32,
    retry_delay: Duration,
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleeper>,
}

impl RequestClient {
    /// Create a client that talks to `base_url` over reqwest
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_transport(
            base_url,
            Arc::new(ReqwestTransport::new()),
            Arc::new(TokioSleeper),
        )
    }

    /// Create a client over a custom transport and sleeper (for testing)
    pub fn with_transport(
        base_url: impl Into<String>,
        transport: Arc<dyn Transport>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Self {
            base_url: base_url.into(),
            default_headers,
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            transport,
            sleeper,
        }
    }

    /// Replace the instance-wide timeout/retry defaults
    pub fn with_defaults(mut self, timeout: Duration, retries: u32, retry_delay: Duration) -> Self {
        self.timeout = timeout;
        self.retries = retries;
        self.retry_delay = retry_delay;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Update default headers; existing keys are overwritten
    pub fn set_default_headers(&mut self, headers: &HeaderMap) {
        for (name, value) in headers {
            self.default_headers.insert(name.clone(), value.clone());
        }
    }

    /// Copy of the current default headers
    pub fn default_headers(&self) -> HeaderMap {
        self.default_headers.clone()
    }

    /// Defaults overridden key-by-key by `headers`. Header names are
    /// case-insensitive, so `authorization` replaces `Authorization`.
    pub fn merge_headers(&self, headers: &HeaderMap) -> HeaderMap {
        let mut merged = self.default_headers.clone();
        for (name, value) in headers {
            merged.insert(name.clone(), value.clone());
        }
        merged
    }

    /// Resolve per-call options against the instance defaults
    pub fn resolve(&self, options: &RequestOptions) -> RequestConfig {
        RequestConfig {
            timeout: options.timeout.unwrap_or(self.timeout),
            retries: options.retries.unwrap_or(self.retries),
            retry_delay: options.retry_delay.unwrap_or(self.retry_delay),
            headers: self.merge_headers(&options.headers),
            cancel: options.cancel.clone(),
        }
    }

    pub async fn get(&self, endpoint: &str, options: RequestOptions) -> Result<HttpResponse, HttpError> {
        self.request(Method::GET, endpoint, None, options).await
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<HttpResponse, HttpError> {
        let body = encode_body(body)?;
        self.request(Method::POST, endpoint, Some(body), options).await
    }

    pub async fn put<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<HttpResponse, HttpError> {
        let body = encode_body(body)?;
        self.request(Method::PUT, endpoint, Some(body), options).await
    }

    pub async fn delete(&self, endpoint: &str, options: RequestOptions) -> Result<HttpResponse, HttpError> {
        self.request(Method::DELETE, endpoint, None, options).await
    }

    /// Issue a request, retrying retryable failures up to the configured
    /// number of attempts. The last failure is returned once they run out.
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<String>,
        options: RequestOptions,
    ) -> Result<HttpResponse, HttpError> {
        let config = self.resolve(&options);
        let request = HttpRequest {
            method,
            url: format!("{}{}", self.base_url, endpoint),
            headers: config.headers.clone(),
            body,
        };

        let attempts = config.attempts();
        let mut attempt = 1;

        loop {
            debug!(method = %request.method, url = %request.url, attempt, "Sending request");

            match self.attempt(&request, config.timeout).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() && attempt < attempts => {
                    warn!(url = %request.url, attempt, attempts, error = %err, "Request failed, retrying");
                    if !self.retry_wait(&config).await {
                        debug!(url = %request.url, attempt, "Request cancelled, not retrying");
                        return Err(err);
                    }
                    attempt += 1;
                }
                Err(err) => {
                    warn!(url = %request.url, attempt, error = %err, "Request failed");
                    return Err(err);
                }
            }
        }
    }

    /// Wait out the retry delay. False if the call was cancelled first.
    async fn retry_wait(&self, config: &RequestConfig) -> bool {
        let Some(cancel) = &config.cancel else {
            self.sleeper.sleep(config.retry_delay).await;
            return true;
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = self.sleeper.sleep(config.retry_delay) => true,
        }
    }

    async fn attempt(&self, request: &HttpRequest, timeout: Duration) -> Result<HttpResponse, HttpError> {
        let raw = match tokio::time::timeout(timeout, self.transport.send(request.clone())).await {
            Err(_) => {
                return Err(HttpError::Network(format!(
                    "no response within {}ms",
                    timeout.as_millis()
                )))
            }
            Ok(Err(e)) => return Err(HttpError::Network(e.0)),
            Ok(Ok(raw)) => raw,
        };

        decode(raw)
    }
}

fn encode_body<B: Serialize + ?Sized>(body: &B) -> Result<String, HttpError> {
    serde_json::to_string(body).map_err(|e| HttpError::Protocol(format!("Unencodable body: {}", e)))
}

fn decode(raw: RawResponse) -> Result<HttpResponse, HttpError> {
    if !(200..300).contains(&raw.status) {
        let body = if raw.body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&raw.body).unwrap_or(Value::String(raw.body))
        };
        return Err(HttpError::Status {
            status: raw.status,
            body,
        });
    }

    let data = if raw.body.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&raw.body)
            .map_err(|e| HttpError::Protocol(format!("JSON parse error: {}", e)))?
    };

    Ok(HttpResponse {
        data,
        status: raw.status,
        headers: raw.headers,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
