//! Profile collaborator
//!
//! Owns the signed-in state, the current [`SignInSession`] and everything
//! hanging off it: the status channel back to the requester, the handshake
//! task's cancel token and the deeplink held back while a session runs.
//! All methods are called from the coordinating task; background work
//! reports back through the [`ProfileNotifier`].

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::api::{HomeSsoClient, HttpError};
use crate::models::{Credentials, SignInRequest, SignInStatus, UserInfo, Video};
use crate::signin::{PollerEvent, SessionId, SignInPhase, SignInPoller, SignInSession};
use crate::storage::CredentialStore;

/// Results of background profile work, delivered to the coordinating task
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileEvent {
    SignIn(SessionId, PollerEvent),
    SignedOut(Result<(), HttpError>),
}

/// Callback used by background tasks to post a [`ProfileEvent`]
pub type ProfileNotifier = Arc<dyn Fn(ProfileEvent) + Send + Sync>;

/// What the profile screen should show
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileView {
    /// Waiting for the registration code
    GeneratingCode,
    /// Code ready; user must enter it on another device
    ShowCode(String),
    SignedIn { email: String },
    SignedOut,
}

pub struct Profile {
    store: Box<dyn CredentialStore>,
    credentials: Option<Credentials>,
    session: SignInSession,
    next_session: u64,
    poller: SignInPoller,
    notify: ProfileNotifier,
    status_tx: Option<mpsc::UnboundedSender<SignInStatus>>,
    cancel: Option<CancellationToken>,
    signing_out: bool,
    user_info: watch::Sender<Vec<UserInfo>>,
}

impl Profile {
    /// Load persisted credentials. Anything short of a full record is
    /// treated as signed out and cleared.
    pub fn new(mut store: Box<dyn CredentialStore>, poller: SignInPoller, notify: ProfileNotifier) -> Self {
        let credentials = store.load();
        if credentials.is_none() {
            if let Err(e) = store.clear() {
                warn!(error = %e, "Failed to clear credential store");
            }
        }

        let (user_info, _) = watch::channel(vec![Self::info_for(credentials.as_ref())]);

        Self {
            store,
            credentials,
            session: SignInSession::new(),
            next_session: 0,
            poller,
            notify,
            status_tx: None,
            cancel: None,
            signing_out: false,
            user_info,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn email(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.email.as_str())
    }

    pub fn is_in_progress(&self) -> bool {
        self.session.is_in_progress()
    }

    pub fn is_signing_out(&self) -> bool {
        self.signing_out
    }

    pub fn session(&self) -> &SignInSession {
        &self.session
    }

    pub fn view(&self) -> ProfileView {
        if self.session.is_in_progress() && !self.session.is_mobile_signed_in() {
            return match self.session.reg_code() {
                Some(code) => ProfileView::ShowCode(code.to_string()),
                None => ProfileView::GeneratingCode,
            };
        }

        match &self.credentials {
            Some(c) => ProfileView::SignedIn {
                email: c.email.clone(),
            },
            None => ProfileView::SignedOut,
        }
    }

    /// Current answer to "who is signed in"
    pub fn user_info(&self) -> Vec<UserInfo> {
        vec![Self::info_for(self.credentials.as_ref())]
    }

    /// Observe account changes (used to answer the continuity layer)
    pub fn subscribe(&self) -> watch::Receiver<Vec<UserInfo>> {
        self.user_info.subscribe()
    }

    // -------------------------------------------------------------------------
    // Sign-in
    // -------------------------------------------------------------------------

    /// Start a handshake for `request`. No-op when already signed in, when a
    /// session is already running, or when the request carries no info.
    /// Returns whether a session started.
    pub fn start_sign_in(
        &mut self,
        request: SignInRequest,
        status_tx: mpsc::UnboundedSender<SignInStatus>,
    ) -> bool {
        if self.is_signed_in() {
            info!("Sign-in requested but user is already signed in");
            return false;
        }
        if self.session.is_in_progress() {
            debug!("Sign-in already in progress");
            return false;
        }
        let Some(info) = request.sinfo else {
            error!("Invalid sign in info");
            return false;
        };

        self.next_session += 1;
        let id = SessionId(self.next_session);
        self.session.begin(id, &info);
        self.status_tx = Some(status_tx);

        let token = CancellationToken::new();
        let notify = self.notify.clone();
        self.poller
            .spawn(token.clone(), move |event| notify(ProfileEvent::SignIn(id, event)));
        self.cancel = Some(token);

        info!(session = id.0, mobile_signed_in = info.is_signed_in, "Sign-in started");
        true
    }

    /// Apply a handshake event. Returns the deeplink to serve when the
    /// session has just settled with one queued.
    pub fn apply_sign_in_event(&mut self, id: SessionId, event: PollerEvent) -> Option<Video> {
        let status = self.session.apply(id, event)?;

        if self.session.phase() == SignInPhase::Succeeded {
            if let Some(credentials) = self.session.credentials().cloned() {
                self.persist(credentials);
            }
        }

        self.report(status);
        self.after_settle()
    }

    /// Cancel the running session. Returns the queued deeplink, if any.
    pub fn cancel_sign_in(&mut self) -> Option<Video> {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
        let status = self.session.cancel()?;
        info!(session = self.session.id().0, "Sign-in cancelled by user");
        self.report(status);
        self.after_settle()
    }

    /// Hold a deeplink until the running session settles. Gives it back when
    /// no session is running.
    pub fn defer_deeplink(&mut self, video: Video) -> Result<(), Video> {
        self.session.defer_deeplink(video)
    }

    fn after_settle(&mut self) -> Option<Video> {
        if self.session.phase().is_terminal() {
            self.cancel = None;
            self.status_tx = None;
            self.session.take_deeplink()
        } else {
            None
        }
    }

    fn report(&self, status: SignInStatus) {
        debug!(?status, "Reporting sign-in status");
        if let Some(tx) = &self.status_tx {
            if tx.send(status).is_err() {
                debug!("Sign-in requester went away");
            }
        }
    }

    fn persist(&mut self, credentials: Credentials) {
        if let Err(e) = self.store.save(&credentials) {
            error!(error = %e, "Failed to persist credentials");
        }
        info!(email = %credentials.email, "Signed in");
        self.credentials = Some(credentials);
        self.publish();
    }

    // -------------------------------------------------------------------------
    // Sign-out
    // -------------------------------------------------------------------------

    /// Sign out in the background. Credentials are only dropped once the
    /// server confirms. Returns whether a request was started.
    pub fn sign_out(&mut self) -> bool {
        if self.signing_out {
            return false;
        }
        let Some(token) = self.credentials.as_ref().map(|c| c.auth_token.clone()) else {
            return false;
        };

        self.signing_out = true;
        let api: Arc<HomeSsoClient> = self.poller.api().clone();
        let notify = self.notify.clone();
        tokio::spawn(async move {
            let result = api.sign_out(&token).await;
            notify(ProfileEvent::SignedOut(result));
        });
        true
    }

    /// Apply the server's answer to a sign-out
    pub fn finish_sign_out(&mut self, result: Result<(), HttpError>) {
        self.signing_out = false;
        match result {
            Ok(()) => {
                info!("Signed out");
                self.clear_user_info();
            }
            Err(e) => error!(error = %e, "Failed to sign out user"),
        }
    }

    fn clear_user_info(&mut self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear credential store");
        }
        self.credentials = None;
        self.publish();
    }

    fn publish(&self) {
        self.user_info.send_replace(self.user_info());
    }

    fn info_for(credentials: Option<&Credentials>) -> UserInfo {
        match credentials {
            Some(c) => UserInfo::signed_in(&c.email),
            None => UserInfo::signed_out(),
        }
    }
}

impl std::fmt::Debug for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Profile")
            .field("signed_in", &self.is_signed_in())
            .field("session", &self.session)
            .field("signing_out", &self.signing_out)
            .finish()
    }
}
