//! Test doubles shared by the integration tests
//!
//! A transport that replays a script, one that never answers, and a
//! sleeper that records what it was asked to wait for without waiting.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::mpsc;

use tvshell::api::http::{HttpRequest, RawResponse, Transport, TransportError};
use tvshell::api::{HomeSsoClient, RequestClient};
use tvshell::profile::{ProfileEvent, ProfileNotifier};
use tvshell::signin::{PollerSettings, SignInPoller};
use tvshell::sleep::Sleeper;

pub type Reply = Result<RawResponse, TransportError>;

pub fn ok(body: &str) -> Reply {
    Ok(RawResponse::new(200, body))
}

pub fn status(code: u16, body: &str) -> Reply {
    Ok(RawResponse::new(code, body))
}

pub fn net_err() -> Reply {
    Err(TransportError("connection refused".into()))
}

// =============================================================================
// Transports
// =============================================================================

/// Replays canned replies in order; falls back to `fallback` (or a network
/// error) once the script runs out
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Reply>>,
    fallback: Option<RawResponse>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn with_fallback(script: Vec<Reply>, fallback: RawResponse) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback: Some(fallback),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Request bodies parsed as JSON
    pub fn bodies(&self) -> Vec<serde_json::Value> {
        self.requests()
            .into_iter()
            .map(|r| serde_json::from_str(r.body.as_deref().unwrap_or("null")).unwrap())
            .collect()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<RawResponse, TransportError>> {
        self.requests.lock().unwrap().push(request);
        let reply = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| match &self.fallback {
                Some(response) => Ok(response.clone()),
                None => Err(TransportError("script exhausted".into())),
            });
        Box::pin(async move { reply })
    }
}

/// Never answers
#[derive(Default)]
pub struct HangingTransport {
    calls: AtomicUsize,
}

impl HangingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transport for HangingTransport {
    fn send(&self, _request: HttpRequest) -> BoxFuture<'_, Result<RawResponse, TransportError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(futures::future::pending())
    }
}

// =============================================================================
// Sleeper
// =============================================================================

/// Records requested waits and only yields to the scheduler
#[derive(Default)]
pub struct InstantSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl InstantSleeper {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

impl Sleeper for InstantSleeper {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        self.sleeps.lock().unwrap().push(duration);
        Box::pin(tokio::task::yield_now())
    }
}

// =============================================================================
// Builders
// =============================================================================

pub fn request_client(transport: Arc<dyn Transport>, sleeper: Arc<dyn Sleeper>) -> RequestClient {
    RequestClient::with_transport("http://sso.test", transport, sleeper)
}

pub fn sso_client(transport: Arc<dyn Transport>, sleeper: Arc<dyn Sleeper>) -> HomeSsoClient {
    HomeSsoClient::with_client(request_client(transport, sleeper), "dev-1")
}

pub fn poller(transport: Arc<dyn Transport>, sleeper: Arc<InstantSleeper>) -> SignInPoller {
    let sleeper: Arc<dyn Sleeper> = sleeper;
    SignInPoller::new(
        Arc::new(sso_client(transport, sleeper.clone())),
        sleeper,
        PollerSettings::default(),
    )
}

/// Notifier that forwards profile events to a channel the test drains
pub fn channel_notifier() -> (ProfileNotifier, mpsc::UnboundedReceiver<ProfileEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let notify: ProfileNotifier = Arc::new(move |event| {
        let _ = tx.send(event);
    });
    (notify, rx)
}
