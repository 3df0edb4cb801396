use serenity::model::id::{ChannelId, GuildId};
use std::time::Duration;
use thiserror::Error;

/// Errores de contrato al operar sobre una cola
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("index {index} is out of range for a queue of {len} entries")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Errores que una sesión devuelve al command layer
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("nothing is playing in guild {0}")]
    NothingPlaying(GuildId),

    #[error("the current track is not seekable")]
    NotSeekable,

    #[error("cannot seek to {requested:?}, the track is only {duration:?} long")]
    SeekOutOfRange { requested: Duration, duration: Duration },

    /// No se pudo construir el motor de reproducción del guild
    #[error("failed to create playback engine for guild {guild_id}: {source}")]
    Engine {
        guild_id: GuildId,
        #[source]
        source: anyhow::Error,
    },
}

/// Fallos del status message; la entrada afectada se descarta
#[derive(Debug, Error)]
pub enum StatusError {
    #[error("guild {0} is no longer available")]
    GuildUnavailable(GuildId),

    #[error("channel {0} is no longer available")]
    ChannelUnavailable(ChannelId),

    #[error("failed to edit status message: {0}")]
    EditFailed(String),
}

/// Fallo de carga o decodificación reportado por el playback engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("track {identifier} failed to play: {message}")]
pub struct PlaybackFailure {
    pub identifier: String,
    pub message: String,
}

impl PlaybackFailure {
    pub fn new(identifier: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            message: message.into(),
        }
    }
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;
