use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Weak,
};
use tracing::debug;

use super::{scheduler::SessionScheduler, track::Track};

/// Resuelve playlists por defecto de forma asíncrona.
///
/// `load` empieza a resolver `name` y retorna de inmediato. Los tracks resueltos
/// llegan uno a uno por el sink, seguidos de un único
/// [`PlaylistSink::finished`].
pub trait PlaylistSource: Send + Sync {
    /// Devuelve `false` si no existe la playlist `name` o no tiene entradas;
    /// en ese caso el sink se descarta sin usar.
    fn load(&self, name: &str, sink: PlaylistSink) -> bool;
}

/// Devuelve los tracks resueltos a la sesión que los pidió.
///
/// Se ignoran los reportes para una sesión que se limpió después de empezar
/// la carga.
#[derive(Clone)]
pub struct PlaylistSink {
    session: Weak<SessionScheduler>,
    generation: u64,
    loaded: Arc<AtomicUsize>,
}

impl PlaylistSink {
    pub(crate) fn new(session: Weak<SessionScheduler>, generation: u64) -> Self {
        Self {
            session,
            generation,
            loaded: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn track_loaded(&self, track: Track) {
        self.loaded.fetch_add(1, Ordering::Relaxed);
        match self.session.upgrade() {
            Some(session) => session.default_track_loaded(self.generation, track),
            None => debug!("Sesión descartada, ignorando track de playlist: {}", track.title),
        }
    }

    pub fn finished(self) {
        let loaded = self.loaded.load(Ordering::Relaxed);
        if let Some(session) = self.session.upgrade() {
            session.default_playlist_finished(self.generation, loaded);
        }
    }

    pub fn loaded(&self) -> usize {
        self.loaded.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for PlaylistSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaylistSink")
            .field("generation", &self.generation)
            .field("loaded", &self.loaded())
            .finish()
    }
}
