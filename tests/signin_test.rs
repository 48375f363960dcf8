//! Sign-in flow tests
//!
//! Drives a [`Profile`] through full registration-code handshakes with a
//! scripted account service, checking reported statuses, persistence and
//! deferred deeplinks.

mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use support::{
    channel_notifier, ok, poller, sso_client, status, HangingTransport, InstantSleeper, ScriptedTransport,
};
use tvshell::api::http::{HttpRequest, RawResponse, Transport, TransportError};
use tvshell::profile::{Profile, ProfileEvent, ProfileView};
use tvshell::signin::{PollerSettings, SignInError, SignInPhase, SignInPoller};
use tvshell::sleep::Sleeper;
use tvshell::storage::{CredentialStore, FileStore, MemoryStore};
use tvshell::{catalog, Credentials, SignInInfo, SignInRequest, SignInStatus, Video};

fn request(mobile_signed_in: bool) -> SignInRequest {
    SignInRequest::new(SignInInfo {
        sign_in_type: "MVPD".into(),
        is_signed_in: mobile_signed_in,
    })
}

fn pending() -> support::Reply {
    ok(r#"{"status":"pending"}"#)
}

fn done() -> support::Reply {
    ok(r#"{"status":"done","email":"a@b.com","authToken":"tok"}"#)
}

/// Let spawned tasks run until they block
async fn settle_tasks() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

fn drain(statuses: &mut mpsc::UnboundedReceiver<SignInStatus>) -> Vec<SignInStatus> {
    let mut out = Vec::new();
    while let Ok(status) = statuses.try_recv() {
        out.push(status);
    }
    out
}

/// Feed handshake events into the profile until the session settles.
/// Returns every deeplink released along the way and the phases seen.
async fn settle(
    profile: &mut Profile,
    events: &mut mpsc::UnboundedReceiver<ProfileEvent>,
) -> (Vec<Video>, Vec<SignInPhase>) {
    let mut released = Vec::new();
    let mut phases = Vec::new();

    while profile.is_in_progress() {
        match events.recv().await {
            Some(ProfileEvent::SignIn(id, event)) => {
                released.extend(profile.apply_sign_in_event(id, event));
                phases.push(profile.session().phase());
            }
            Some(other) => panic!("Unexpected profile event {:?}", other),
            None => panic!("Handshake task went away"),
        }
    }
    (released, phases)
}

// =============================================================================
// Successful Handshake
// =============================================================================

#[tokio::test]
async fn test_pending_three_times_then_done() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("credentials.toml");

    let transport = ScriptedTransport::new(vec![
        ok(r#"{"code":"ABCD"}"#),
        pending(),
        pending(),
        pending(),
        done(),
    ]);
    let sleeper = InstantSleeper::new();
    let (notify, mut events) = channel_notifier();
    let mut profile = Profile::new(
        Box::new(FileStore::at(&path)),
        poller(transport.clone(), sleeper.clone()),
        notify,
    );
    let (status_tx, mut statuses) = mpsc::unbounded_channel();

    assert!(profile.start_sign_in(request(false), status_tx));
    assert_eq!(profile.view(), ProfileView::GeneratingCode);

    let (released, phases) = settle(&mut profile, &mut events).await;

    assert!(released.is_empty());
    assert_eq!(
        phases,
        vec![
            SignInPhase::Polling,
            SignInPhase::Polling,
            SignInPhase::Polling,
            SignInPhase::Polling,
            SignInPhase::Succeeded,
        ]
    );
    assert_eq!(profile.session().attempts(), 3);
    assert!(profile.session().reg_code().is_none());
    assert_eq!(
        drain(&mut statuses),
        vec![
            SignInStatus::Progress {
                sign_in_type: "MVPD".into(),
                reg_code: "ABCD".into(),
            },
            SignInStatus::Success {
                sign_in_type: "MVPD".into(),
                email: "a@b.com".into(),
            },
        ]
    );

    assert!(profile.is_signed_in());
    assert_eq!(profile.email(), Some("a@b.com"));
    assert_eq!(
        profile.view(),
        ProfileView::SignedIn {
            email: "a@b.com".into()
        }
    );
    assert_eq!(
        FileStore::at(&path).load(),
        Some(Credentials {
            email: "a@b.com".into(),
            auth_token: "tok".into(),
        })
    );

    // One wait between each pair of polls
    assert_eq!(sleeper.sleeps(), vec![Duration::from_millis(2000); 3]);
    let bodies = transport.bodies();
    assert_eq!(bodies[0]["deviceId"], "dev-1");
    assert_eq!(bodies[1]["regCode"], "ABCD");
}

#[tokio::test]
async fn test_code_is_shown_while_polling() {
    let transport = ScriptedTransport::new(vec![ok(r#"{"code":"ABCD"}"#), pending(), done()]);
    let (notify, mut events) = channel_notifier();
    let mut profile = Profile::new(
        Box::new(MemoryStore::new()),
        poller(transport, InstantSleeper::new()),
        notify,
    );
    let (status_tx, _statuses) = mpsc::unbounded_channel();
    profile.start_sign_in(request(false), status_tx);

    let Some(ProfileEvent::SignIn(id, event)) = events.recv().await else {
        panic!("Expected handshake event");
    };
    profile.apply_sign_in_event(id, event);

    assert_eq!(profile.view(), ProfileView::ShowCode("ABCD".into()));
}

#[tokio::test]
async fn test_mobile_signed_in_hides_code() {
    let transport = ScriptedTransport::new(vec![ok(r#"{"code":"ABCD"}"#), done()]);
    let (notify, mut events) = channel_notifier();
    let mut profile = Profile::new(
        Box::new(MemoryStore::new()),
        poller(transport, InstantSleeper::new()),
        notify,
    );
    let (status_tx, _statuses) = mpsc::unbounded_channel();
    profile.start_sign_in(request(true), status_tx);

    let Some(ProfileEvent::SignIn(id, event)) = events.recv().await else {
        panic!("Expected handshake event");
    };
    profile.apply_sign_in_event(id, event);

    assert!(profile.is_in_progress());
    assert_eq!(profile.view(), ProfileView::SignedOut);
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_reg_code_failure_reports_failure() {
    let transport = ScriptedTransport::new(vec![ok(r#"{"nope":true}"#)]);
    let (notify, mut events) = channel_notifier();
    let mut profile = Profile::new(
        Box::new(MemoryStore::new()),
        poller(transport, InstantSleeper::new()),
        notify,
    );
    let (status_tx, mut statuses) = mpsc::unbounded_channel();
    profile.start_sign_in(request(false), status_tx);

    settle(&mut profile, &mut events).await;

    assert_eq!(profile.session().phase(), SignInPhase::Failed);
    assert!(matches!(
        profile.session().last_error(),
        Some(SignInError::Protocol(_))
    ));
    match drain(&mut statuses).as_slice() {
        [SignInStatus::Failure {
            reason,
            is_user_cancelled,
            ..
        }] => {
            assert!(reason.starts_with("Failed to get registration code"));
            assert!(!is_user_cancelled);
        }
        other => panic!("Unexpected statuses {:?}", other),
    }
    assert!(!profile.is_signed_in());
}

#[tokio::test]
async fn test_poll_failure_after_retries() {
    let mut script = vec![ok(r#"{"code":"ABCD"}"#)];
    script.extend(std::iter::repeat_with(|| status(500, "")).take(10));
    let transport = ScriptedTransport::new(script);
    let (notify, mut events) = channel_notifier();
    let mut profile = Profile::new(
        Box::new(MemoryStore::new()),
        poller(transport.clone(), InstantSleeper::new()),
        notify,
    );
    let (status_tx, mut statuses) = mpsc::unbounded_channel();
    profile.start_sign_in(request(false), status_tx);

    settle(&mut profile, &mut events).await;

    assert_eq!(profile.session().phase(), SignInPhase::Failed);
    assert_eq!(profile.session().last_error(), Some(&SignInError::Status(500)));
    // One code request plus the full retry budget of one poll
    assert_eq!(transport.calls(), 11);
    let statuses = drain(&mut statuses);
    assert_eq!(statuses.len(), 2);
    assert!(matches!(
        &statuses[1],
        SignInStatus::Failure { reason, .. } if reason.starts_with("Sign-in polling failed")
    ));
}

#[tokio::test]
async fn test_poll_budget_exhausted_times_out() {
    let transport = ScriptedTransport::with_fallback(
        vec![ok(r#"{"code":"ABCD"}"#)],
        RawResponse::new(200, r#"{"status":"pending"}"#),
    );
    let sleeper = InstantSleeper::new();
    let sleeper_dyn: Arc<dyn Sleeper> = sleeper.clone();
    let poller = SignInPoller::new(
        Arc::new(sso_client(transport.clone(), sleeper_dyn.clone())),
        sleeper_dyn,
        PollerSettings {
            interval: Duration::from_millis(500),
            max_attempts: 2,
        },
    );
    let (notify, mut events) = channel_notifier();
    let mut profile = Profile::new(Box::new(MemoryStore::new()), poller, notify);
    let (status_tx, mut statuses) = mpsc::unbounded_channel();
    profile.start_sign_in(request(false), status_tx);

    settle(&mut profile, &mut events).await;

    assert_eq!(profile.session().phase(), SignInPhase::TimedOut);
    assert_eq!(profile.session().attempts(), 2);
    assert_eq!(profile.session().last_error(), Some(&SignInError::Timeout(2)));
    // No wait after the final poll
    assert_eq!(sleeper.sleeps(), vec![Duration::from_millis(500)]);
    assert_eq!(transport.calls(), 3);
    assert!(matches!(
        drain(&mut statuses).last(),
        Some(SignInStatus::Failure { reason, is_user_cancelled: false, .. }) if reason == "Sign in timeout"
    ));
}

// =============================================================================
// Cancellation
// =============================================================================

#[tokio::test]
async fn test_cancel_while_requesting_code() {
    let (notify, _events) = channel_notifier();
    let mut profile = Profile::new(
        Box::new(MemoryStore::new()),
        poller(HangingTransport::new(), InstantSleeper::new()),
        notify,
    );
    let (status_tx, mut statuses) = mpsc::unbounded_channel();
    profile.start_sign_in(request(false), status_tx);
    assert_eq!(profile.session().phase(), SignInPhase::CodeRequested);

    let deeplink = catalog().remove(1);
    assert!(profile.defer_deeplink(deeplink.clone()).is_ok());

    assert_eq!(profile.cancel_sign_in(), Some(deeplink));
    assert_eq!(profile.session().phase(), SignInPhase::Cancelled);
    assert!(!profile.is_in_progress());
    assert!(profile.session().reg_code().is_none());
    assert_eq!(
        drain(&mut statuses),
        vec![SignInStatus::Failure {
            sign_in_type: "MVPD".into(),
            reason: "User cancelled the signin".into(),
            is_user_cancelled: true,
        }]
    );

    // Drained exactly once
    assert_eq!(profile.cancel_sign_in(), None);
}

#[tokio::test]
async fn test_events_after_cancel_are_dropped() {
    let transport = ScriptedTransport::with_fallback(
        vec![ok(r#"{"code":"ABCD"}"#)],
        RawResponse::new(200, r#"{"status":"pending"}"#),
    );
    let (notify, mut events) = channel_notifier();
    let mut profile = Profile::new(
        Box::new(MemoryStore::new()),
        poller(transport, InstantSleeper::new()),
        notify,
    );
    let (status_tx, mut statuses) = mpsc::unbounded_channel();
    profile.start_sign_in(request(false), status_tx);

    let Some(ProfileEvent::SignIn(id, event)) = events.recv().await else {
        panic!("Expected handshake event");
    };
    profile.apply_sign_in_event(id, event);
    assert_eq!(profile.session().phase(), SignInPhase::Polling);

    profile.cancel_sign_in();

    // Whatever the task already emitted is ignored
    while let Ok(ProfileEvent::SignIn(id, event)) = events.try_recv() {
        assert!(profile.apply_sign_in_event(id, event).is_none());
    }
    assert_eq!(profile.session().phase(), SignInPhase::Cancelled);
    assert_eq!(drain(&mut statuses).len(), 2);
}

/// Fails every request, cancelling the handshake while the first one is out
struct CancelOnSend {
    token: CancellationToken,
    calls: AtomicUsize,
}

impl Transport for CancelOnSend {
    fn send(&self, _request: HttpRequest) -> BoxFuture<'_, Result<RawResponse, TransportError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.token.cancel();
        Box::pin(async { Err(TransportError("connection reset".into())) })
    }
}

#[tokio::test]
async fn test_cancel_stops_request_retries() {
    let token = CancellationToken::new();
    let transport = Arc::new(CancelOnSend {
        token: token.clone(),
        calls: AtomicUsize::new(0),
    });
    let sleeper = InstantSleeper::new();
    let handshake = poller(transport.clone(), sleeper);

    let emitted = Arc::new(Mutex::new(Vec::new()));
    let sink = emitted.clone();
    handshake.run(token, move |event| sink.lock().unwrap().push(event)).await;

    // The in-flight attempt finished; none of the remaining retries went out
    assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    assert!(emitted.lock().unwrap().is_empty());
}

// =============================================================================
// Deferred Deeplinks
// =============================================================================

#[tokio::test]
async fn test_deeplink_released_after_success() {
    let transport = ScriptedTransport::new(vec![ok(r#"{"code":"ABCD"}"#), pending(), done()]);
    let (notify, mut events) = channel_notifier();
    let mut profile = Profile::new(
        Box::new(MemoryStore::new()),
        poller(transport, InstantSleeper::new()),
        notify,
    );
    let (status_tx, _statuses) = mpsc::unbounded_channel();
    profile.start_sign_in(request(false), status_tx);

    let first = catalog().remove(0);
    let second = catalog().remove(1).with_start_position(300_000);
    assert!(profile.defer_deeplink(first).is_ok());
    // The newest deeplink wins
    assert!(profile.defer_deeplink(second.clone()).is_ok());

    let (released, _) = settle(&mut profile, &mut events).await;

    assert_eq!(released, vec![second]);
    assert!(profile.is_signed_in());
}

#[tokio::test]
async fn test_deeplink_not_deferred_without_session() {
    let (notify, _events) = channel_notifier();
    let mut profile = Profile::new(
        Box::new(MemoryStore::new()),
        poller(HangingTransport::new(), InstantSleeper::new()),
        notify,
    );

    let video = catalog().remove(0);
    assert_eq!(profile.defer_deeplink(video.clone()), Err(video));
}

// =============================================================================
// Start Guards
// =============================================================================

#[tokio::test]
async fn test_start_ignored_when_signed_in() {
    let transport = HangingTransport::new();
    let (notify, _events) = channel_notifier();
    let mut profile = Profile::new(
        Box::new(MemoryStore::with(Credentials {
            email: "a@b.com".into(),
            auth_token: "tok".into(),
        })),
        poller(transport.clone(), InstantSleeper::new()),
        notify,
    );
    let (status_tx, _statuses) = mpsc::unbounded_channel();

    assert!(!profile.start_sign_in(request(false), status_tx));
    assert_eq!(profile.session().phase(), SignInPhase::Idle);
    settle_tasks().await;
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_start_ignored_while_in_progress() {
    let transport = HangingTransport::new();
    let (notify, _events) = channel_notifier();
    let mut profile = Profile::new(
        Box::new(MemoryStore::new()),
        poller(transport.clone(), InstantSleeper::new()),
        notify,
    );
    let (first_tx, _first) = mpsc::unbounded_channel();
    let (second_tx, _second) = mpsc::unbounded_channel();

    assert!(profile.start_sign_in(request(false), first_tx));
    let id = profile.session().id();
    assert!(!profile.start_sign_in(request(false), second_tx));
    assert_eq!(profile.session().id(), id);

    settle_tasks().await;
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_start_ignored_without_info() {
    let (notify, _events) = channel_notifier();
    let mut profile = Profile::new(
        Box::new(MemoryStore::new()),
        poller(HangingTransport::new(), InstantSleeper::new()),
        notify,
    );
    let (status_tx, _statuses) = mpsc::unbounded_channel();

    assert!(!profile.start_sign_in(SignInRequest::default(), status_tx));
    assert!(!profile.is_in_progress());
}

// =============================================================================
// Sign-out
// =============================================================================

#[tokio::test]
async fn test_sign_out_clears_credentials_on_success() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("credentials.toml");
    let credentials = Credentials {
        email: "a@b.com".into(),
        auth_token: "tok".into(),
    };
    FileStore::at(&path).save(&credentials).unwrap();

    let transport = ScriptedTransport::new(vec![ok("{}")]);
    let (notify, mut events) = channel_notifier();
    let mut profile = Profile::new(
        Box::new(FileStore::at(&path)),
        poller(transport.clone(), InstantSleeper::new()),
        notify,
    );
    let mut user_info = profile.subscribe();
    assert!(user_info.borrow()[0].is_signed_in);

    assert!(profile.sign_out());
    assert!(!profile.sign_out(), "second sign-out while one is running");

    let Some(ProfileEvent::SignedOut(result)) = events.recv().await else {
        panic!("Expected sign-out result");
    };
    profile.finish_sign_out(result);

    assert!(!profile.is_signed_in());
    assert!(FileStore::at(&path).load().is_none());
    assert!(user_info.has_changed().unwrap());
    assert!(!user_info.borrow_and_update()[0].is_signed_in);
    assert_eq!(transport.requests()[0].headers["authorization"], "tok");
}

#[tokio::test]
async fn test_sign_out_failure_keeps_credentials() {
    let transport = ScriptedTransport::new(vec![status(403, ""); 20]);
    let (notify, mut events) = channel_notifier();
    let mut profile = Profile::new(
        Box::new(MemoryStore::with(Credentials {
            email: "a@b.com".into(),
            auth_token: "tok".into(),
        })),
        poller(transport, InstantSleeper::new()),
        notify,
    );

    profile.sign_out();
    let Some(ProfileEvent::SignedOut(result)) = events.recv().await else {
        panic!("Expected sign-out result");
    };
    assert!(result.is_err());
    profile.finish_sign_out(result);

    assert!(profile.is_signed_in());
    assert!(!profile.is_signing_out());
}
