//! Player collaborator
//!
//! The shell hands sources to a [`Player`]; decoding is someone else's job.
//! [`HeadlessPlayer`] keeps track of what would be on screen so the terminal
//! front-end and the CLI have something real to drive.

use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::models::{PlayState, PlaybackStatus, SourceDescriptor};

/// Errors from player operations
#[derive(Debug, Error, PartialEq)]
pub enum PlayerError {
    #[error("No source loaded")]
    NothingLoaded,
    #[error("Invalid source: {0}")]
    InvalidSource(String),
    #[error("Live streams cannot seek")]
    LiveSeek,
}

/// Playback surface driven by the shell
pub trait Player: Send {
    /// Load and start a source, replacing whatever was playing
    fn load(&mut self, source: &SourceDescriptor) -> Result<(), PlayerError>;
    /// Move the playhead by `delta_secs` (negative seeks back)
    fn seek(&mut self, delta_secs: f64) -> Result<(), PlayerError>;
    fn toggle_play_pause(&mut self) -> Result<(), PlayerError>;
    fn unload(&mut self);
    fn status(&self) -> PlaybackStatus;
}

#[derive(Debug, Clone)]
struct Loaded {
    source: SourceDescriptor,
    position: Duration,
    state: PlayState,
}

/// Player without output
#[derive(Debug, Default)]
pub struct HeadlessPlayer {
    current: Option<Loaded>,
}

impl HeadlessPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source currently loaded
    pub fn source(&self) -> Option<&SourceDescriptor> {
        self.current.as_ref().map(|c| &c.source)
    }

    fn loaded_mut(&mut self) -> Result<&mut Loaded, PlayerError> {
        self.current.as_mut().ok_or(PlayerError::NothingLoaded)
    }
}

impl Player for HeadlessPlayer {
    fn load(&mut self, source: &SourceDescriptor) -> Result<(), PlayerError> {
        if source.hls.trim().is_empty() {
            return Err(PlayerError::InvalidSource(source.title.clone()));
        }

        debug!(title = %source.title, offset = ?source.start_offset, "Loading source");
        self.current = Some(Loaded {
            source: source.clone(),
            position: source.start_offset.unwrap_or_default(),
            state: PlayState::Playing,
        });
        Ok(())
    }

    fn seek(&mut self, delta_secs: f64) -> Result<(), PlayerError> {
        let loaded = self.loaded_mut()?;
        if loaded.source.is_live {
            return Err(PlayerError::LiveSeek);
        }

        let target = (loaded.position.as_secs_f64() + delta_secs).max(0.0);
        loaded.position = Duration::from_secs_f64(target);
        debug!(position = target, "Seeked");
        Ok(())
    }

    fn toggle_play_pause(&mut self) -> Result<(), PlayerError> {
        let loaded = self.loaded_mut()?;
        loaded.state = match loaded.state {
            PlayState::Playing => PlayState::Paused,
            PlayState::Paused | PlayState::Idle => PlayState::Playing,
        };
        Ok(())
    }

    fn unload(&mut self) {
        if self.current.take().is_some() {
            debug!("Player unloaded");
        }
    }

    fn status(&self) -> PlaybackStatus {
        match &self.current {
            Some(loaded) => PlaybackStatus {
                state: loaded.state,
                title: loaded.source.title.clone(),
                position: loaded.position,
            },
            None => PlaybackStatus {
                state: PlayState::Idle,
                title: String::new(),
                position: Duration::ZERO,
            },
        }
    }
}
