//! # Open Music Scheduler
//!
//! Playback scheduling core for a Discord music bot: per-guild fair queues,
//! vote skipping, repeat modes, default playlists and a periodically refreshed
//! "now playing" message.

pub mod audio;
pub mod config;
pub mod error;
pub mod settings;
pub mod status;

#[cfg(test)]
mod test_support;

pub use audio::{
    registry::{SessionRegistry, SessionServices},
    scheduler::{Enqueued, NowPlaying, SeekTarget, SessionScheduler, VoteOutcome},
    track::{QueuedItem, RequestMetadata, Track},
};
pub use config::Config;
pub use error::{QueueError, SessionError, SessionResult, StatusError};
pub use settings::{GuildSettings, MemorySettings, RepeatMode, SettingsProvider};
pub use status::StatusSyncer;
