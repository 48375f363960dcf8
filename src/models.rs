//! Data structures shared across tvshell
//!
//! Organized by domain:
//! - **Media**: catalog entries and the source descriptors handed to the player
//! - **Account**: credentials and the user info reported to the continuity layer
//! - **Sign-in**: requests from the companion device and the statuses sent back
//! - **Playback**: player state snapshots

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// =============================================================================
// Media Models
// =============================================================================

/// A playable media item as the app represents it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub title: String,
    pub stream_id: String,
    pub stream_url: String,
    pub image_url: String,
    pub is_live: bool,
    /// Resume position in milliseconds (deeplinks only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_position_ms: Option<u64>,
}

impl Video {
    pub fn new(
        title: impl Into<String>,
        stream_id: impl Into<String>,
        stream_url: impl Into<String>,
        image_url: impl Into<String>,
        is_live: bool,
    ) -> Self {
        Self {
            title: title.into(),
            stream_id: stream_id.into(),
            stream_url: stream_url.into(),
            image_url: image_url.into(),
            is_live,
            start_position_ms: None,
        }
    }

    /// Same video with a resume position attached
    pub fn with_start_position(mut self, ms: u64) -> Self {
        self.start_position_ms = Some(ms);
        self
    }

    /// Build the source handed to the player.
    ///
    /// A start offset is only set for on-demand content with a positive
    /// resume position; live streams always start at the live edge.
    pub fn source(&self) -> SourceDescriptor {
        let start_offset = match self.start_position_ms {
            Some(ms) if !self.is_live && ms > 0 => Some(Duration::from_millis(ms)),
            _ => None,
        };

        SourceDescriptor {
            title: self.title.clone(),
            hls: self.stream_url.clone(),
            start_offset,
            is_live: self.is_live,
        }
    }
}

impl fmt::Display for Video {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_live {
            write!(f, "{} [LIVE]", self.title)
        } else {
            write!(f, "{}", self.title)
        }
    }
}

/// What the player is asked to load
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDescriptor {
    pub title: String,
    /// HLS manifest URL
    pub hls: String,
    pub start_offset: Option<Duration>,
    pub is_live: bool,
}

impl SourceDescriptor {
    /// Start offset in whole seconds, if any
    pub fn start_offset_secs(&self) -> Option<f64> {
        self.start_offset.map(|d| d.as_secs_f64())
    }
}

/// Built-in media catalog shown in the grid
pub fn catalog() -> Vec<Video> {
    vec![
        Video::new(
            "Elephants Dream",
            "elephants",
            "https://commondatastorage.googleapis.com/gtv-videos-bucket/CastVideos/hls/ElephantsDream.m3u8",
            "https://vizbee.s3.amazonaws.com/images/demoapp/elephantsdream.jpg",
            false,
        ),
        Video::new(
            "Tears of Steel",
            "tears",
            "https://commondatastorage.googleapis.com/gtv-videos-bucket/CastVideos/hls/TearsOfSteel.m3u8",
            "https://vizbee.s3.amazonaws.com/images/demoapp/tearsofsteel.png",
            false,
        ),
        Video::new(
            "Akamai Live Stream",
            "akamai-live-stream",
            "https://livecmaftest1.akamaized.net/cmaf/live/2099281/abr6s/master.m3u8",
            "https://vizbee.s3.amazonaws.com/images/demoapp/akamai-live.jpg",
            true,
        ),
    ]
}

// =============================================================================
// Account Models
// =============================================================================

/// Persisted sign-in credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub auth_token: String,
}

/// Account summary reported when the companion device asks who is signed in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub user_login_type: String,
    pub is_signed_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_login: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
}

impl UserInfo {
    pub const LOGIN_TYPE: &'static str = "MVPD";

    pub fn signed_out() -> Self {
        Self {
            user_login_type: Self::LOGIN_TYPE.to_string(),
            is_signed_in: false,
            user_login: None,
            user_name: None,
        }
    }

    pub fn signed_in(email: &str) -> Self {
        Self {
            user_login_type: Self::LOGIN_TYPE.to_string(),
            is_signed_in: true,
            user_login: Some(email.to_string()),
            user_name: Some(email.to_string()),
        }
    }
}

impl Default for UserInfo {
    fn default() -> Self {
        Self::signed_out()
    }
}

// =============================================================================
// Sign-in Models
// =============================================================================

/// Details of a sign-in request sent by the companion device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignInInfo {
    /// Sign-in type, echoed back in every status
    #[serde(rename = "stype")]
    pub sign_in_type: String,
    /// The companion device is already signed in; no code needs to be shown
    #[serde(rename = "is_signed_in", default)]
    pub is_signed_in: bool,
}

/// Envelope the continuity layer delivers; `sinfo` may be missing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignInRequest {
    #[serde(default)]
    pub sinfo: Option<SignInInfo>,
}

impl SignInRequest {
    pub fn new(info: SignInInfo) -> Self {
        Self { sinfo: Some(info) }
    }
}

/// Status updates sent back to whoever requested a sign-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SignInStatus {
    /// A registration code is ready to show
    Progress { sign_in_type: String, reg_code: String },
    /// Sign-in completed
    Success { sign_in_type: String, email: String },
    /// Sign-in ended without credentials
    Failure {
        sign_in_type: String,
        reason: String,
        is_user_cancelled: bool,
    },
}

impl SignInStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SignInStatus::Progress { .. })
    }
}

// =============================================================================
// Playback Models
// =============================================================================

/// Player state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayState {
    Idle,
    Playing,
    Paused,
}

impl fmt::Display for PlayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayState::Idle => write!(f, "Idle"),
            PlayState::Playing => write!(f, "Playing"),
            PlayState::Paused => write!(f, "Paused"),
        }
    }
}

/// Snapshot of what the player is doing
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackStatus {
    pub state: PlayState,
    pub title: String,
    pub position: Duration,
}
