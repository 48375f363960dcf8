//! Playback collaborators

pub mod player;

pub use player::{HeadlessPlayer, Player, PlayerError};
