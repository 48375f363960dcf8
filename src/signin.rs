//! Registration-code sign-in
//!
//! The handshake runs as a cancellable task: request a code, then poll the
//! status endpoint with a fixed pause between polls until it reports done,
//! fails, or runs out of attempts. The task only reports [`PollerEvent`]s;
//! the [`SignInSession`] state machine that consumes them lives with the
//! profile on the coordinating task.
//!
//! ```text
//!  Idle ─start─▶ CodeRequested ─code─▶ Polling ─done─▶ Succeeded
//!                     │                  │ ├─fail─▶ Failed
//!                     └──────fail────────┘ ├─max──▶ TimedOut
//!                                          └─cancel▶ Cancelled
//! ```

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{HomeSsoClient, HttpError, PollOutcome};
use crate::models::{Credentials, SignInInfo, SignInStatus, Video};
use crate::sleep::Sleeper;

/// Pause between the end of one poll and the start of the next
pub const POLL_INTERVAL: Duration = Duration::from_millis(2000);
/// Poll budget per session; large enough to be effectively unbounded
pub const MAX_POLL_ATTEMPTS: u32 = 9999;

// =============================================================================
// Errors
// =============================================================================

/// Why a sign-in session ended without credentials
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignInError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server returned HTTP {0}")]
    Status(u16),

    #[error("Unexpected response: {0}")]
    Protocol(String),

    #[error("User cancelled the sign-in")]
    UserCancelled,

    #[error("Sign-in timed out after {0} polls")]
    Timeout(u32),
}

impl From<HttpError> for SignInError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Network(msg) => SignInError::Network(msg),
            HttpError::Status { status, .. } => SignInError::Status(status),
            HttpError::Protocol(msg) => SignInError::Protocol(msg),
        }
    }
}

// =============================================================================
// Session State Machine
// =============================================================================

/// Lifecycle phase of a sign-in attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignInPhase {
    #[default]
    Idle,
    CodeRequested,
    Polling,
    Succeeded,
    Cancelled,
    Failed,
    TimedOut,
}

impl SignInPhase {
    pub fn is_in_progress(&self) -> bool {
        matches!(self, SignInPhase::CodeRequested | SignInPhase::Polling)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SignInPhase::Succeeded | SignInPhase::Cancelled | SignInPhase::Failed | SignInPhase::TimedOut
        )
    }
}

/// Generation number of a session; events tagged with an older one are stale
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SessionId(pub u64);

/// What the handshake task reports back
#[derive(Debug, Clone, PartialEq)]
pub enum PollerEvent {
    /// Registration code obtained; polling starts
    CodeIssued(String),
    /// Poll number `attempt` came back not done
    Pending { attempt: u32 },
    /// The code was redeemed
    Succeeded(Credentials),
    /// A request failed after the client exhausted its retries
    Failed(SignInError),
    /// Attempt budget used up
    TimedOut { attempts: u32 },
}

/// One sign-in attempt as seen by the profile
#[derive(Debug, Clone, Default)]
pub struct SignInSession {
    id: SessionId,
    phase: SignInPhase,
    reg_code: Option<String>,
    attempts: u32,
    pending_deeplink: Option<Video>,
    credentials: Option<Credentials>,
    mobile_signed_in: bool,
    sign_in_type: String,
    last_error: Option<SignInError>,
}

impl SignInSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn phase(&self) -> SignInPhase {
        self.phase
    }

    pub fn is_in_progress(&self) -> bool {
        self.phase.is_in_progress()
    }

    pub fn reg_code(&self) -> Option<&str> {
        self.reg_code.as_deref()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn pending_deeplink(&self) -> Option<&Video> {
        self.pending_deeplink.as_ref()
    }

    /// The companion device was already signed in, so nothing is shown on screen
    pub fn is_mobile_signed_in(&self) -> bool {
        self.mobile_signed_in
    }

    pub fn sign_in_type(&self) -> &str {
        &self.sign_in_type
    }

    pub fn last_error(&self) -> Option<&SignInError> {
        self.last_error.as_ref()
    }

    /// Start a fresh attempt. Terminal phases count as idle here.
    pub fn begin(&mut self, id: SessionId, info: &SignInInfo) {
        *self = Self {
            id,
            phase: SignInPhase::CodeRequested,
            mobile_signed_in: info.is_signed_in,
            sign_in_type: info.sign_in_type.clone(),
            ..Self::default()
        };
    }

    /// Queue a deeplink until the session settles. Returns it back when no
    /// session is running.
    pub fn defer_deeplink(&mut self, video: Video) -> Result<(), Video> {
        if !self.is_in_progress() {
            return Err(video);
        }
        if let Some(replaced) = self.pending_deeplink.replace(video) {
            debug!(title = %replaced.title, "Replacing queued deeplink");
        }
        Ok(())
    }

    /// Hand out the queued deeplink. Only yields once a session has settled,
    /// and only once.
    pub fn take_deeplink(&mut self) -> Option<Video> {
        if self.is_in_progress() {
            return None;
        }
        self.pending_deeplink.take()
    }

    /// Apply an event from the handshake task. Returns the status to report,
    /// if any. Events from other sessions or after settling are dropped.
    pub fn apply(&mut self, id: SessionId, event: PollerEvent) -> Option<SignInStatus> {
        if id != self.id || !self.is_in_progress() {
            debug!(session = id.0, current = self.id.0, "Dropping stale sign-in event");
            return None;
        }

        match event {
            PollerEvent::CodeIssued(code) => {
                if self.phase != SignInPhase::CodeRequested {
                    return None;
                }
                self.reg_code = Some(code.clone());
                self.phase = SignInPhase::Polling;
                Some(SignInStatus::Progress {
                    sign_in_type: self.sign_in_type.clone(),
                    reg_code: code,
                })
            }
            PollerEvent::Pending { attempt } => {
                self.attempts = attempt;
                None
            }
            PollerEvent::Succeeded(credentials) => {
                let email = credentials.email.clone();
                self.credentials = Some(credentials);
                self.settle(SignInPhase::Succeeded, None);
                Some(SignInStatus::Success {
                    sign_in_type: self.sign_in_type.clone(),
                    email,
                })
            }
            PollerEvent::Failed(err) => {
                let reason = match self.phase {
                    SignInPhase::CodeRequested => format!("Failed to get registration code: {}", err),
                    _ => format!("Sign-in polling failed: {}", err),
                };
                self.settle(SignInPhase::Failed, Some(err));
                Some(self.failure(reason, false))
            }
            PollerEvent::TimedOut { attempts } => {
                self.attempts = attempts;
                self.settle(SignInPhase::TimedOut, Some(SignInError::Timeout(attempts)));
                Some(self.failure("Sign in timeout".into(), false))
            }
        }
    }

    /// User-initiated cancel. Returns the status to report, or `None` if
    /// nothing was running.
    pub fn cancel(&mut self) -> Option<SignInStatus> {
        if !self.is_in_progress() {
            return None;
        }
        self.settle(SignInPhase::Cancelled, Some(SignInError::UserCancelled));
        Some(self.failure("User cancelled the signin".into(), true))
    }

    fn settle(&mut self, phase: SignInPhase, error: Option<SignInError>) {
        info!(session = self.id.0, ?phase, attempts = self.attempts, "Sign-in session settled");
        self.phase = phase;
        self.reg_code = None;
        self.last_error = error;
    }

    fn failure(&self, reason: String, is_user_cancelled: bool) -> SignInStatus {
        SignInStatus::Failure {
            sign_in_type: self.sign_in_type.clone(),
            reason,
            is_user_cancelled,
        }
    }
}

// =============================================================================
// Handshake Task
// =============================================================================

/// Poll timing
#[derive(Debug, Clone, Copy)]
pub struct PollerSettings {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval: POLL_INTERVAL,
            max_attempts: MAX_POLL_ATTEMPTS,
        }
    }
}

/// Runs registration-code handshakes
#[derive(Clone)]
pub struct SignInPoller {
    api: Arc<HomeSsoClient>,
    sleeper: Arc<dyn Sleeper>,
    settings: PollerSettings,
}

impl SignInPoller {
    pub fn new(api: Arc<HomeSsoClient>, sleeper: Arc<dyn Sleeper>, settings: PollerSettings) -> Self {
        Self {
            api,
            sleeper,
            settings,
        }
    }

    pub fn api(&self) -> &Arc<HomeSsoClient> {
        &self.api
    }

    pub fn settings(&self) -> PollerSettings {
        self.settings
    }

    /// Run the handshake on the tokio runtime
    pub fn spawn<F>(&self, token: CancellationToken, emit: F) -> JoinHandle<()>
    where
        F: Fn(PollerEvent) + Send + Sync + 'static,
    {
        let poller = self.clone();
        tokio::spawn(async move { poller.run(token, emit).await })
    }

    /// Request a code and poll until a terminal outcome. Nothing is emitted
    /// once `token` is cancelled; a request already in flight is allowed to
    /// finish but is not retried and its result is discarded.
    pub async fn run<F>(&self, token: CancellationToken, emit: F)
    where
        F: Fn(PollerEvent),
    {
        let code = self.api.request_reg_code_until(&token).await;
        if token.is_cancelled() {
            debug!("Sign-in cancelled while requesting code");
            return;
        }

        let reg_code = match code {
            Ok(code) => code,
            Err(err) => {
                warn!(error = %err, "Failed to get registration code");
                emit(PollerEvent::Failed(err.into()));
                return;
            }
        };
        info!(reg_code = %reg_code, "Registration code issued");
        emit(PollerEvent::CodeIssued(reg_code.clone()));

        let mut attempt = 0;
        while attempt < self.settings.max_attempts {
            if token.is_cancelled() {
                return;
            }

            attempt += 1;
            debug!(attempt, "Polling sign-in status");
            let outcome = self.api.poll_until(&reg_code, &token).await;
            if token.is_cancelled() {
                debug!(attempt, "Discarding poll result after cancel");
                return;
            }

            match outcome {
                Ok(PollOutcome::Done { email, auth_token }) => {
                    info!(attempt, "Sign-in completed");
                    emit(PollerEvent::Succeeded(Credentials { email, auth_token }));
                    return;
                }
                Ok(PollOutcome::Pending) => emit(PollerEvent::Pending { attempt }),
                Err(err) => {
                    warn!(attempt, error = %err, "Sign-in poll failed");
                    emit(PollerEvent::Failed(err.into()));
                    return;
                }
            }

            if attempt >= self.settings.max_attempts {
                break;
            }

            tokio::select! {
                _ = token.cancelled() => return,
                _ = self.sleeper.sleep(self.settings.interval) => {}
            }
        }

        warn!(attempts = attempt, "Sign-in poll budget exhausted");
        emit(PollerEvent::TimedOut { attempts: attempt });
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> SignInInfo {
        SignInInfo {
            sign_in_type: "MVPD".into(),
            is_signed_in: false,
        }
    }

    fn video() -> Video {
        crate::models::catalog().remove(1)
    }

    fn polling_session() -> SignInSession {
        let mut session = SignInSession::new();
        session.begin(SessionId(1), &info());
        session.apply(SessionId(1), PollerEvent::CodeIssued("AB12".into()));
        session
    }

    #[test]
    fn test_begin_enters_code_requested() {
        let mut session = SignInSession::new();
        assert_eq!(session.phase(), SignInPhase::Idle);

        session.begin(SessionId(1), &info());
        assert_eq!(session.phase(), SignInPhase::CodeRequested);
        assert!(session.is_in_progress());
        assert_eq!(session.reg_code(), None);
    }

    #[test]
    fn test_code_issued_reports_progress() {
        let mut session = SignInSession::new();
        session.begin(SessionId(1), &info());

        let status = session.apply(SessionId(1), PollerEvent::CodeIssued("AB12".into()));
        assert_eq!(
            status,
            Some(SignInStatus::Progress {
                sign_in_type: "MVPD".into(),
                reg_code: "AB12".into()
            })
        );
        assert_eq!(session.phase(), SignInPhase::Polling);
        assert_eq!(session.reg_code(), Some("AB12"));
    }

    #[test]
    fn test_pending_keeps_polling() {
        let mut session = polling_session();
        for attempt in 1..=3 {
            assert_eq!(session.apply(SessionId(1), PollerEvent::Pending { attempt }), None);
            assert_eq!(session.phase(), SignInPhase::Polling);
        }
        assert_eq!(session.attempts(), 3);
    }

    #[test]
    fn test_success_resets_fields() {
        let mut session = polling_session();
        let creds = Credentials {
            email: "a@b.com".into(),
            auth_token: "tok".into(),
        };

        let status = session.apply(SessionId(1), PollerEvent::Succeeded(creds.clone()));
        assert!(matches!(status, Some(SignInStatus::Success { ref email, .. }) if email == "a@b.com"));
        assert_eq!(session.phase(), SignInPhase::Succeeded);
        assert_eq!(session.credentials(), Some(&creds));
        assert_eq!(session.reg_code(), None);
        assert!(!session.is_in_progress());
    }

    #[test]
    fn test_code_failure_fails_session() {
        let mut session = SignInSession::new();
        session.begin(SessionId(1), &info());

        let status = session.apply(
            SessionId(1),
            PollerEvent::Failed(SignInError::Protocol("no code".into())),
        );
        match status {
            Some(SignInStatus::Failure {
                reason,
                is_user_cancelled,
                ..
            }) => {
                assert!(reason.starts_with("Failed to get registration code"));
                assert!(!is_user_cancelled);
            }
            other => panic!("Expected failure, got {:?}", other),
        }
        assert_eq!(session.phase(), SignInPhase::Failed);
    }

    #[test]
    fn test_timeout_reports_failure() {
        let mut session = polling_session();
        let status = session.apply(SessionId(1), PollerEvent::TimedOut { attempts: 5 });
        assert!(matches!(status, Some(SignInStatus::Failure { is_user_cancelled: false, .. })));
        assert_eq!(session.phase(), SignInPhase::TimedOut);
        assert_eq!(session.last_error(), Some(&SignInError::Timeout(5)));
    }

    #[test]
    fn test_cancel_drains_deeplink_once() {
        let mut session = polling_session();
        session.defer_deeplink(video()).unwrap();
        assert!(session.take_deeplink().is_none());

        let status = session.cancel();
        assert!(matches!(status, Some(SignInStatus::Failure { is_user_cancelled: true, .. })));
        assert_eq!(session.phase(), SignInPhase::Cancelled);
        assert_eq!(session.reg_code(), None);
        assert!(!session.is_in_progress());

        assert_eq!(session.take_deeplink(), Some(video()));
        assert_eq!(session.take_deeplink(), None);
    }

    #[test]
    fn test_cancel_when_idle_is_noop() {
        let mut session = SignInSession::new();
        assert_eq!(session.cancel(), None);
        assert_eq!(session.phase(), SignInPhase::Idle);
    }

    #[test]
    fn test_stale_events_dropped() {
        let mut session = polling_session();
        session.cancel();

        let status = session.apply(
            SessionId(1),
            PollerEvent::Succeeded(Credentials {
                email: "late@b.com".into(),
                auth_token: "tok".into(),
            }),
        );
        assert_eq!(status, None);
        assert_eq!(session.phase(), SignInPhase::Cancelled);

        session.begin(SessionId(2), &info());
        assert_eq!(session.apply(SessionId(1), PollerEvent::CodeIssued("OLD".into())), None);
        assert_eq!(session.phase(), SignInPhase::CodeRequested);
    }

    #[test]
    fn test_defer_without_session_returns_video() {
        let mut session = SignInSession::new();
        assert_eq!(session.defer_deeplink(video()), Err(video()));
    }

    #[test]
    fn test_terminal_phase_allows_restart() {
        let mut session = polling_session();
        session.cancel();
        session.begin(SessionId(2), &info());
        assert_eq!(session.id(), SessionId(2));
        assert!(session.is_in_progress());
        assert_eq!(session.pending_deeplink(), None);
    }

    #[test]
    fn test_http_error_mapping() {
        assert_eq!(
            SignInError::from(HttpError::Status {
                status: 500,
                body: serde_json::Value::Null
            }),
            SignInError::Status(500)
        );
        assert_eq!(
            SignInError::from(HttpError::Network("down".into())),
            SignInError::Network("down".into())
        );
    }
}
