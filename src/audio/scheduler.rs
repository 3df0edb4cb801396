use parking_lot::Mutex;
use serenity::model::id::{GuildId, UserId};
use std::{
    collections::{HashSet, VecDeque},
    sync::{Arc, Weak},
    time::Duration,
};
use tracing::{debug, error, info, warn};

use super::{
    engine::{EndReason, FrameProvider, PlaybackEngine, TrackEventListener},
    playlist::PlaylistSink,
    queue::{Queue, QueueType},
    registry::SessionServices,
    track::{AudioFrame, QueuedItem, Track},
};
use crate::{
    error::{PlaybackFailure, QueueError, SessionError, SessionResult},
    settings::{RepeatMode, MAX_VOLUME},
};

/// Resultado de `enqueue`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    /// La sesión estaba libre y el item empezó a sonar
    NowPlaying,
    /// Posición en la cola, desde 1
    Queued(usize),
}

/// Resultado de un voto para saltar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteOutcome {
    pub skipped: bool,
    pub votes: usize,
    pub required: usize,
    pub already_voted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekTarget {
    Absolute(Duration),
    Forward(Duration),
    Backward(Duration),
}

/// Foto del track activo para el status message
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlaying {
    pub item: QueuedItem,
    pub position: Duration,
    pub paused: bool,
    pub volume: u8,
}

impl NowPlaying {
    /// Fracción reproducida, `None` en streams en vivo
    pub fn progress(&self) -> Option<f64> {
        let duration = self.item.track().duration?;
        if duration.is_zero() {
            return None;
        }
        Some((self.position.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0))
    }
}

#[derive(Debug)]
struct SessionState {
    queue: Box<dyn Queue<QueuedItem>>,
    active: Option<QueuedItem>,
    votes: HashSet<UserId>,
    default_buffer: VecDeque<Track>,
    /// Sube en cada clear; los reportes de playlist atrasados se descartan
    playlist_generation: u64,
    /// Lo activa `stop_and_clear` hasta que el track detenido reporta su fin
    halted: bool,
}

impl SessionState {
    /// Marca `item` como activo; los votos del track anterior no cuentan
    fn activate(&mut self, item: QueuedItem) -> Track {
        self.votes.clear();
        let track = item.track().clone();
        self.active = Some(item);
        track
    }
}

enum Advance {
    Play(Track),
    Fallback,
    Idle,
}

/// Scheduler de reproducción de un guild.
///
/// Los comandos y los callbacks del motor pasan por un único lock de estado,
/// que nunca se retiene al llamar al motor, a la voz, al status o a las
/// playlists. El camino de frames (`can_provide` / `provide_frame`) no toca
/// ese lock.
pub struct SessionScheduler {
    guild_id: GuildId,
    engine: Arc<dyn PlaybackEngine>,
    services: SessionServices,
    state: Mutex<SessionState>,
    last_frame: Mutex<Option<AudioFrame>>,
    this: Weak<SessionScheduler>,
}

impl SessionScheduler {
    pub fn new(
        guild_id: GuildId,
        engine: Arc<dyn PlaybackEngine>,
        queue_type: QueueType,
        services: SessionServices,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            guild_id,
            engine,
            services,
            state: Mutex::new(SessionState {
                queue: queue_type.build(None),
                active: None,
                votes: HashSet::new(),
                default_buffer: VecDeque::new(),
                playlist_generation: 0,
                halted: false,
            }),
            last_frame: Mutex::new(None),
            this: this.clone(),
        })
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    /// Agrega un item; si no hay nada sonando lo reproduce de inmediato
    pub fn enqueue(&self, item: QueuedItem, at_front: bool) -> Enqueued {
        let mut state = self.state.lock();
        state.halted = false;

        if state.active.is_none() {
            let track = state.activate(item);
            drop(state);

            info!("🎵 Reproduciendo en guild {}: {}", self.guild_id, track.title);
            self.engine.play(track);
            return Enqueued::NowPlaying;
        }

        let title = item.track().title.clone();
        let index = if at_front {
            state.queue.add_front(item);
            0
        } else {
            state.queue.add(item)
        };
        info!(
            "➕ Agregado a la cola de guild {} en posición {}: {}",
            self.guild_id,
            index + 1,
            title
        );
        Enqueued::Queued(index + 1)
    }

    /// Reproduce desde la playlist por defecto si la sesión está libre.
    ///
    /// Devuelve si algo suena o está por sonar.
    pub fn play_from_default(&self) -> bool {
        let generation = {
            let mut state = self.state.lock();
            if state.active.is_some() {
                return true;
            }
            if let Some(track) = state.default_buffer.pop_front() {
                let track = state.activate(QueuedItem::autoplay(track));
                drop(state);
                info!("📻 Playlist por defecto en guild {}: {}", self.guild_id, track.title);
                self.engine.play(track);
                return true;
            }
            state.playlist_generation
        };

        let Some(name) = self.services.settings.settings(self.guild_id).default_playlist else {
            return false;
        };

        let sink = PlaylistSink::new(self.this.clone(), generation);
        let loading = self.services.playlists.load(&name, sink);
        if loading {
            info!("📻 Cargando playlist por defecto '{}' en guild {}", name, self.guild_id);
        } else {
            warn!("⚠️ Playlist por defecto '{}' vacía o inexistente en guild {}", name, self.guild_id);
        }
        loading
    }

    pub(crate) fn default_track_loaded(&self, generation: u64, track: Track) {
        let mut state = self.state.lock();
        if state.playlist_generation != generation {
            debug!("Ignorando track de una carga anterior en guild {}", self.guild_id);
            return;
        }

        if state.active.is_none() {
            let track = state.activate(QueuedItem::autoplay(track));
            drop(state);
            info!("📻 Playlist por defecto en guild {}: {}", self.guild_id, track.title);
            self.engine.play(track);
        } else {
            state.default_buffer.push_back(track);
        }
    }

    pub(crate) fn default_playlist_finished(&self, generation: u64, loaded: usize) {
        let idle = {
            let state = self.state.lock();
            state.playlist_generation == generation && loaded == 0 && state.active.is_none()
        };
        if idle {
            warn!("📭 La playlist por defecto no produjo tracks en guild {}", self.guild_id);
            self.go_idle();
        } else {
            debug!("Playlist por defecto cargada en guild {}: {} tracks", self.guild_id, loaded);
        }
    }

    /// Registra un voto para saltar el track activo
    pub fn request_vote_skip(
        &self,
        requester: UserId,
        eligible_listeners: usize,
        skip_ratio: f64,
    ) -> SessionResult<VoteOutcome> {
        let outcome = {
            let mut state = self.state.lock();
            let owner = match &state.active {
                Some(active) => active.request().owner,
                None => return Err(SessionError::NothingPlaying(self.guild_id)),
            };

            let already_voted = !state.votes.insert(requester);
            let votes = state.votes.len();
            let required = (eligible_listeners as f64 * skip_ratio).ceil() as usize;
            let skipped = owner == Some(requester) || skip_ratio <= 0.0 || votes >= required;

            VoteOutcome {
                skipped,
                votes,
                required,
                already_voted,
            }
        };

        debug!(
            "🗳️ Voto de {} en guild {}: {}/{} (ya votó: {})",
            requester, self.guild_id, outcome.votes, outcome.required, outcome.already_voted
        );
        if outcome.skipped {
            info!("⏭️ Track saltado por votación en guild {}", self.guild_id);
            self.engine.stop();
        }
        Ok(outcome)
    }

    /// Skip ratio efectivo: el del guild o el global
    pub fn skip_ratio(&self) -> f64 {
        self.services
            .settings
            .settings(self.guild_id)
            .skip_ratio
            .unwrap_or(self.services.config.skip_ratio)
    }

    /// Salta el track activo sin votación
    pub fn skip(&self) -> SessionResult<QueuedItem> {
        let active = self
            .active_item()
            .ok_or(SessionError::NothingPlaying(self.guild_id))?;
        info!("⏭️ Saltando en guild {}: {}", self.guild_id, active.track().title);
        self.engine.stop();
        Ok(active)
    }

    /// Descarta lo anterior a `position` (1-based) y salta el track activo,
    /// de modo que `position` suena a continuación
    pub fn skip_to(&self, position: usize) -> SessionResult<QueuedItem> {
        let target = {
            let mut state = self.state.lock();
            if state.active.is_none() {
                return Err(SessionError::NothingPlaying(self.guild_id));
            }
            let index = queue_index(position, state.queue.size())?;
            let target = state.queue.get(index)?.clone();
            state.queue.skip(index);
            target
        };

        info!("⏩ Saltando a '{}' en guild {}", target.track().title, self.guild_id);
        self.engine.stop();
        Ok(target)
    }

    pub fn remove_by_requester(&self, requester: UserId) -> usize {
        let removed = self.state.lock().queue.remove_all(Some(requester));
        if removed > 0 {
            info!("🗑️ Eliminadas {} canciones de {} en guild {}", removed, requester, self.guild_id);
        }
        removed
    }

    pub fn remove_at(&self, position: usize) -> Result<QueuedItem, QueueError> {
        let removed = {
            let mut state = self.state.lock();
            let index = queue_index(position, state.queue.size())?;
            state.queue.remove(index)?
        };
        debug!("❌ Track eliminado en posición {} de guild {}", position, self.guild_id);
        Ok(removed)
    }

    pub fn move_item(&self, from: usize, to: usize) -> Result<QueuedItem, QueueError> {
        let mut state = self.state.lock();
        let len = state.queue.size();
        let (from_index, to_index) = (queue_index(from, len)?, queue_index(to, len)?);
        let moved = state.queue.move_item(from_index, to_index)?.clone();
        debug!("📍 Track movido de posición {} a {} en guild {}", from, to, self.guild_id);
        Ok(moved)
    }

    pub fn shuffle_requester(&self, requester: UserId) -> usize {
        let shuffled = self.state.lock().queue.shuffle(Some(requester));
        debug!("🔀 Mezcladas {} canciones de {} en guild {}", shuffled, requester, self.guild_id);
        shuffled
    }

    /// Vacía la cola y el buffer por defecto y detiene el track activo
    pub fn stop_and_clear(&self) {
        let stopping = {
            let mut state = self.state.lock();
            state.queue.clear();
            state.default_buffer.clear();
            state.votes.clear();
            state.playlist_generation += 1;
            state.halted = state.active.is_some();
            state.halted
        };

        info!("⏹️ Reproducción detenida y cola limpiada en guild {}", self.guild_id);
        if stopping {
            self.engine.stop();
        }
    }

    pub fn set_paused(&self, paused: bool) {
        self.engine.set_paused(paused);
        if paused {
            info!("⏸️ Reproducción pausada en guild {}", self.guild_id);
        } else {
            info!("▶️ Reproducción reanudada en guild {}", self.guild_id);
        }
    }

    pub fn is_paused(&self) -> bool {
        self.engine.is_paused()
    }

    /// Mueve la posición del track activo y devuelve la nueva posición
    pub fn seek(&self, target: SeekTarget) -> SessionResult<Duration> {
        let track = self
            .active_item()
            .ok_or(SessionError::NothingPlaying(self.guild_id))?
            .track()
            .clone();

        let duration = match track.duration {
            Some(duration) if track.seekable => duration,
            _ => return Err(SessionError::NotSeekable),
        };

        let current = self.engine.position();
        let requested = match target {
            SeekTarget::Absolute(position) => position,
            SeekTarget::Forward(delta) => {
                current
                    .checked_add(delta)
                    .ok_or(SessionError::SeekOutOfRange {
                        requested: Duration::MAX,
                        duration,
                    })?
            }
            SeekTarget::Backward(delta) => current.saturating_sub(delta),
        };
        if requested > duration {
            return Err(SessionError::SeekOutOfRange { requested, duration });
        }

        self.engine.set_position(requested);
        debug!("⏩ Seek a {:?} en guild {}", requested, self.guild_id);
        Ok(requested)
    }

    pub fn volume(&self) -> u8 {
        self.engine.volume()
    }

    /// Ajusta el volumen y lo guarda en settings
    pub fn set_volume(&self, volume: u8) -> u8 {
        let volume = volume.min(MAX_VOLUME);
        self.engine.set_volume(volume);
        self.services.settings.set_volume(self.guild_id, volume);
        info!("🔊 Volumen de guild {} ajustado a {}", self.guild_id, volume);
        volume
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.services.settings.settings(self.guild_id).repeat_mode
    }

    pub fn set_repeat_mode(&self, mode: RepeatMode) {
        self.services.settings.set_repeat_mode(self.guild_id, mode);
        match mode {
            RepeatMode::Off => info!("➡️ Repetición desactivada en guild {}", self.guild_id),
            RepeatMode::All => info!("🔁 Repetir cola activado en guild {}", self.guild_id),
            RepeatMode::Single => info!("🔂 Repetir canción activado en guild {}", self.guild_id),
        }
    }

    pub fn queue_type(&self) -> QueueType {
        self.state.lock().queue.kind()
    }

    /// Cambia la política de la cola conservando su contenido
    pub fn set_queue_type(&self, queue_type: QueueType) {
        {
            let mut state = self.state.lock();
            if state.queue.kind() != queue_type {
                let previous = std::mem::replace(&mut state.queue, queue_type.build(None));
                state.queue = queue_type.build(Some(previous));
            }
        }
        self.services.settings.set_queue_type(self.guild_id, queue_type);
        info!("🔢 Cola de guild {} cambiada a {}", self.guild_id, queue_type);
    }

    pub fn queue_snapshot(&self) -> Vec<QueuedItem> {
        self.state.lock().queue.list().to_vec()
    }

    pub fn queue_len(&self) -> usize {
        self.state.lock().queue.size()
    }

    pub fn active_item(&self) -> Option<QueuedItem> {
        self.state.lock().active.clone()
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().active.is_some()
    }

    pub fn now_playing(&self) -> Option<NowPlaying> {
        let item = self.active_item()?;
        Some(NowPlaying {
            item,
            position: self.engine.position(),
            paused: self.engine.is_paused(),
            volume: self.engine.volume(),
        })
    }

    fn advance(&self, ended: &Track, reason: EndReason) {
        let repeat = self.repeat_mode();

        let next = {
            let mut state = self.state.lock();
            match &state.active {
                Some(active) if active.track().identifier == ended.identifier => {}
                _ => {
                    debug!("Ignorando fin de un track anterior en guild {}: {}", self.guild_id, ended.title);
                    return;
                }
            }

            let finished = state.active.take();
            if reason == EndReason::Finished {
                if let Some(item) = finished {
                    match repeat {
                        RepeatMode::Off => {}
                        RepeatMode::All => state.queue.add_back(item.replay()),
                        RepeatMode::Single => state.queue.add_front(item.replay()),
                    }
                }
            }

            if std::mem::take(&mut state.halted) {
                Advance::Idle
            } else if let Some(next) = state.queue.pull() {
                Advance::Play(state.activate(next))
            } else {
                Advance::Fallback
            }
        };

        match next {
            Advance::Play(track) => {
                info!("➡️ Siguiente en guild {}: {}", self.guild_id, track.title);
                self.engine.play(track);
            }
            Advance::Fallback => {
                if !self.play_from_default() {
                    self.go_idle();
                }
            }
            Advance::Idle => self.go_idle(),
        }
    }

    fn go_idle(&self) {
        // un enqueue pudo ganar la carrera desde que se soltó el lock
        if self.state.lock().active.is_some() {
            debug!("Sesión de guild {} activa de nuevo, no queda libre", self.guild_id);
            return;
        }
        info!("📭 Cola vacía en guild {}", self.guild_id);
        self.services.status.on_track_update(self.guild_id, None);
        // un track pausado y saltado no debe dejar el motor en pausa
        self.engine.set_paused(false);
        if !self.services.config.stay_in_channel {
            self.services.voice.disconnect(self.guild_id);
        }
    }
}

/// Posición 1-based a índice; los errores conservan la posición pedida
fn queue_index(position: usize, len: usize) -> Result<usize, QueueError> {
    match position.checked_sub(1) {
        Some(index) if index < len => Ok(index),
        _ => Err(QueueError::IndexOutOfRange { index: position, len }),
    }
}

impl TrackEventListener for SessionScheduler {
    fn on_track_start(&self, track: &Track) {
        self.state.lock().votes.clear();
        debug!("▶️ Track iniciado en guild {}: {}", self.guild_id, track.title);
        self.services.status.on_track_update(self.guild_id, Some(track));
    }

    fn on_track_end(&self, track: &Track, reason: EndReason) {
        debug!("Track terminado en guild {} ({:?}): {}", self.guild_id, reason, track.title);
        self.advance(track, reason);
    }

    fn on_track_error(&self, track: &Track, failure: &PlaybackFailure) {
        error!("❌ Error en track para guild {}: {}", self.guild_id, failure);
        self.advance(track, EndReason::LoadFailed);
    }
}

impl FrameProvider for SessionScheduler {
    fn can_provide(&self) -> bool {
        let frame = self.engine.provide();
        let ready = frame.is_some();
        *self.last_frame.lock() = frame;
        ready
    }

    fn provide_frame(&self) -> Option<AudioFrame> {
        self.last_frame.lock().take()
    }
}

impl std::fmt::Debug for SessionScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionScheduler")
            .field("guild_id", &self.guild_id)
            .finish_non_exhaustive()
    }
}
