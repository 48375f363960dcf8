//! tvshell - remote-driven TV shell
//!
//! A grid of videos, a player, a profile screen and a sidebar, navigated
//! with remote-style intents, plus a registration-code sign-in that polls
//! an account service.
//!
//! # Modules
//!
//! - `app` - Focus router and navigation state
//! - `sidebar` - Sidebar expansion sub-state
//! - `api` - Retrying request client and sign-in endpoints
//! - `signin` - Sign-in session state machine and poll task
//! - `profile` - Signed-in state, credentials, deferred deeplinks
//! - `continuity` - Companion-device hooks and wire format
//! - `stream` - Player collaborator
//! - `shell` - Coordinating task wiring it all together
//! - `ui` - Terminal front-end

pub mod api;
pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod continuity;
pub mod models;
pub mod profile;
pub mod shell;
pub mod sidebar;
pub mod signin;
pub mod sleep;
pub mod storage;
pub mod stream;
pub mod ui;

// Re-export commonly used types
pub use models::{
    catalog, Credentials, PlayState, PlaybackStatus, SignInInfo, SignInRequest, SignInStatus,
    SourceDescriptor, UserInfo, Video,
};

pub use api::{HomeSsoClient, HttpError, RequestClient, RequestOptions};
pub use app::{BoundaryPolicy, Command, FocusRegion, Intent, NavigationState, ProfileFlags, Router};
pub use continuity::{ContinuityHandle, ContinuityLayer, ContinuitySink, SignInHandle, WireVideo};
pub use profile::{Profile, ProfileEvent, ProfileView};
pub use shell::{AppEvent, FocusSurface, Shell};
pub use signin::{SignInError, SignInPhase, SignInPoller, SignInSession};
