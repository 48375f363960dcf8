//! Cross-device continuity
//!
//! Companion devices reach the app through a [`ContinuitySink`]: they can
//! start a video, ask for a sign-in, or ask who is signed in. The app
//! reports playback back out through a [`ContinuityLayer`]. Videos cross
//! this boundary as [`WireVideo`].

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::models::{SignInRequest, SignInStatus, UserInfo, Video};
use crate::shell::AppEvent;

// =============================================================================
// Wire Format
// =============================================================================

/// Video metadata as exchanged with companion devices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireVideo {
    pub guid: String,
    pub title: String,
    pub img_url: String,
    pub is_live: bool,
    pub video_url: String,
    /// Resume position in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<u64>,
}

pub fn to_wire_video(video: &Video) -> WireVideo {
    WireVideo {
        guid: video.stream_id.clone(),
        title: video.title.clone(),
        img_url: video.image_url.clone(),
        is_live: video.is_live,
        video_url: video.stream_url.clone(),
        start_time: video.start_position_ms,
    }
}

pub fn from_wire_video(wire: WireVideo) -> Video {
    Video {
        title: wire.title,
        stream_id: wire.guid,
        stream_url: wire.video_url,
        image_url: wire.img_url,
        is_live: wire.is_live,
        start_position_ms: wire.start_time,
    }
}

// =============================================================================
// Hooks
// =============================================================================

/// Inbound requests from companion devices
pub trait ContinuitySink {
    /// Play `video`, resuming at its start time if it has one
    fn on_deeplink(&self, video: WireVideo);
    /// Start a sign-in; statuses arrive on the returned handle
    fn on_sign_in_requested(&self, request: SignInRequest) -> SignInHandle;
    fn on_sign_in_info_requested(&self) -> Vec<UserInfo>;
}

/// Outbound playback notifications
pub trait ContinuityLayer: Send + Sync {
    fn stop_video(&self);
    fn update_video_info(&self, video: &WireVideo);
}

/// Receiving end of a sign-in request. Yields statuses until a terminal one,
/// then `None`.
#[derive(Debug)]
pub struct SignInHandle {
    status: mpsc::UnboundedReceiver<SignInStatus>,
}

impl SignInHandle {
    pub fn new(status: mpsc::UnboundedReceiver<SignInStatus>) -> Self {
        Self { status }
    }

    pub async fn next(&mut self) -> Option<SignInStatus> {
        self.status.recv().await
    }

    /// Next status if one is already queued
    pub fn try_next(&mut self) -> Option<SignInStatus> {
        self.status.try_recv().ok()
    }
}

/// [`ContinuitySink`] that feeds the shell's event channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ContinuityHandle {
    events: mpsc::UnboundedSender<AppEvent>,
    user_info: watch::Receiver<Vec<UserInfo>>,
}

impl ContinuityHandle {
    pub fn new(events: mpsc::UnboundedSender<AppEvent>, user_info: watch::Receiver<Vec<UserInfo>>) -> Self {
        Self { events, user_info }
    }

    fn post(&self, event: AppEvent) {
        if self.events.send(event).is_err() {
            warn!("Shell is gone; dropping continuity request");
        }
    }
}

impl ContinuitySink for ContinuityHandle {
    fn on_deeplink(&self, video: WireVideo) {
        info!(guid = %video.guid, start_time = ?video.start_time, "Deeplink received");
        self.post(AppEvent::Deeplink(video));
    }

    fn on_sign_in_requested(&self, request: SignInRequest) -> SignInHandle {
        let (status_tx, status_rx) = mpsc::unbounded_channel();
        self.post(AppEvent::SignInRequested { request, status_tx });
        SignInHandle::new(status_rx)
    }

    fn on_sign_in_info_requested(&self) -> Vec<UserInfo> {
        self.user_info.borrow().clone()
    }
}

// =============================================================================
// Loopback Layer
// =============================================================================

/// Layer with no remote side: notifications are logged and the current
/// video is kept for display.
#[derive(Debug, Default)]
pub struct LoopbackContinuity {
    app_id: String,
    current: Mutex<Option<WireVideo>>,
}

impl LoopbackContinuity {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            current: Mutex::new(None),
        }
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Video last reported as playing
    pub fn current(&self) -> Option<WireVideo> {
        self.current.lock().ok().and_then(|c| c.clone())
    }
}

impl ContinuityLayer for LoopbackContinuity {
    fn stop_video(&self) {
        debug!(app_id = %self.app_id, "Continuity: stop video");
        if let Ok(mut current) = self.current.lock() {
            *current = None;
        }
    }

    fn update_video_info(&self, video: &WireVideo) {
        debug!(app_id = %self.app_id, guid = %video.guid, "Continuity: video info");
        if let Ok(mut current) = self.current.lock() {
            *current = Some(video.clone());
        }
    }
}
