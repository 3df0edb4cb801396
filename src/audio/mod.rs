//! # Audio Module
//!
//! Per-guild playback scheduling.
//!
//! Every guild with voice activity gets one [`scheduler::SessionScheduler`],
//! created on demand by the [`registry::SessionRegistry`]. The scheduler owns
//! the guild's queue, the active track and the skip votes, and drives the
//! playback engine through the track lifecycle.
//!
//! ## Architecture
//!
//! ### [`queue`] - Queue Policies
//! - Fair (round-robin by requester) and linear (FIFO) queues
//! - Type switches carry entries over in order
//!
//! ### [`scheduler`] - Session State Machine
//! - Enqueue, vote skip, repeat modes, default playlist fallback
//! - Reacts to engine callbacks on the engine's own thread
//! - Provides 20ms frames to the voice transport
//!
//! ### [`engine`], [`voice`], [`playlist`] - Collaborators
//! - Decoding, voice transport and playlist resolution live outside this
//!   crate and are reached only through these traits
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use open_music_scheduler::audio::{registry::SessionRegistry, track::{QueuedItem, Track}};
//!
//! let registry = SessionRegistry::new(engines, services);
//! let session = registry.get_or_create(guild_id)?;
//!
//! session.enqueue(QueuedItem::requested_by(Track::new("id", "Song"), user_id), false);
//! let outcome = session.request_vote_skip(user_id, listeners, session.skip_ratio())?;
//! ```

pub mod engine;
pub mod playlist;
pub mod queue;
pub mod registry;
pub mod scheduler;
pub mod track;
pub mod voice;
