//! Seams toward the playback engine.
//!
//! The engine owns decoding and timing. It pulls nothing from us except the
//! next track to play; we pull frames from it through [`PlaybackEngine::provide`]
//! and it reports lifecycle changes back through [`TrackEventListener`] on its
//! own execution context.

use serenity::model::id::GuildId;
use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use super::track::{AudioFrame, Track};
use crate::error::PlaybackFailure;

/// Por qué terminó un track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// Sonó hasta el final; la única razón que activa repeat
    Finished,
    /// Falló la carga o el decode
    LoadFailed,
    /// Detenido con [`PlaybackEngine::stop`]
    Stopped,
    /// Reemplazado por otro `play`
    Replaced,
    /// El motor se cerró
    Cleanup,
}

/// Motor de reproducción de un guild.
///
/// Todos los métodos retornan enseguida. `play` y `stop` son fire-and-forget
/// y sus efectos llegan por los callbacks del listener.
pub trait PlaybackEngine: Send + Sync {
    fn play(&self, track: Track);

    fn stop(&self);

    fn is_paused(&self) -> bool;

    fn set_paused(&self, paused: bool);

    /// Posición dentro del track actual
    fn position(&self) -> Duration;

    fn set_position(&self, position: Duration);

    fn volume(&self) -> u8;

    fn set_volume(&self, volume: u8);

    /// Siguiente frame de 20ms, `None` si no hay ninguno listo. No debe bloquear.
    fn provide(&self) -> Option<AudioFrame>;

    fn add_listener(&self, listener: Weak<dyn TrackEventListener>);
}

/// Callbacks del ciclo de vida de un track.
///
/// Un track que falla se reporta una sola vez con `on_track_error`; el motor
/// no envía después un `on_track_end` del mismo track.
pub trait TrackEventListener: Send + Sync {
    fn on_track_start(&self, track: &Track);

    fn on_track_end(&self, track: &Track, reason: EndReason);

    fn on_track_error(&self, track: &Track, error: &PlaybackFailure);
}

/// Crea un motor por guild
pub trait EngineFactory: Send + Sync {
    fn create(&self, guild_id: GuildId) -> anyhow::Result<Arc<dyn PlaybackEngine>>;
}

/// Lado productor del contrato de frames, consumido por el transporte de voz
/// cada 20ms.
pub trait FrameProvider: Send + Sync {
    /// Pide el siguiente frame e indica si hay uno listo
    fn can_provide(&self) -> bool;

    /// Entrega el frame obtenido por el último `can_provide`
    fn provide_frame(&self) -> Option<AudioFrame>;
}
