//! Fakes compartidos por los tests del crate.

use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId, MessageId};
use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Weak,
    },
    time::Duration,
};

use crate::{
    audio::{
        engine::{EndReason, EngineFactory, FrameProvider, PlaybackEngine, TrackEventListener},
        playlist::{PlaylistSink, PlaylistSource},
        registry::{SessionRegistry, SessionServices},
        scheduler::SessionScheduler,
        track::{AudioFrame, Track},
        voice::VoiceLink,
    },
    config::Config,
    error::StatusError,
    settings::{MemorySettings, SettingsProvider},
    status::{StatusSurface, StatusSyncer, StatusView},
};

pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub(crate) fn track(id: &str) -> Track {
    Track::new(id, format!("Track {}", id)).with_duration(Duration::from_secs(180))
}

#[derive(Default)]
struct EngineLog {
    played: Vec<Track>,
    stops: usize,
    paused: bool,
    position: Duration,
    volume: u8,
    frames: VecDeque<AudioFrame>,
    listeners: Vec<Weak<dyn TrackEventListener>>,
}

/// Motor que sólo registra lo que se le pide
pub(crate) struct RecordingEngine {
    log: Mutex<EngineLog>,
}

impl RecordingEngine {
    pub(crate) fn new() -> Self {
        Self {
            log: Mutex::new(EngineLog {
                volume: 100,
                ..EngineLog::default()
            }),
        }
    }

    pub(crate) fn played(&self) -> Vec<Track> {
        self.log.lock().played.clone()
    }

    pub(crate) fn played_ids(&self) -> Vec<String> {
        self.log.lock().played.iter().map(|t| t.identifier.clone()).collect()
    }

    pub(crate) fn stops(&self) -> usize {
        self.log.lock().stops
    }

    pub(crate) fn push_frame(&self, frame: AudioFrame) {
        self.log.lock().frames.push_back(frame);
    }

    /// Reporta un fin natural a cada listener vivo
    pub(crate) fn emit_end(&self, track: &Track) {
        let listeners: Vec<_> = self
            .log
            .lock()
            .listeners
            .iter()
            .filter_map(Weak::upgrade)
            .collect();
        for listener in listeners {
            listener.on_track_end(track, EndReason::Finished);
        }
    }
}

impl PlaybackEngine for RecordingEngine {
    fn play(&self, track: Track) {
        let mut log = self.log.lock();
        log.position = track.position;
        log.played.push(track);
    }

    fn stop(&self) {
        self.log.lock().stops += 1;
    }

    fn is_paused(&self) -> bool {
        self.log.lock().paused
    }

    fn set_paused(&self, paused: bool) {
        self.log.lock().paused = paused;
    }

    fn position(&self) -> Duration {
        self.log.lock().position
    }

    fn set_position(&self, position: Duration) {
        self.log.lock().position = position;
    }

    fn volume(&self) -> u8 {
        self.log.lock().volume
    }

    fn set_volume(&self, volume: u8) {
        self.log.lock().volume = volume;
    }

    fn provide(&self) -> Option<AudioFrame> {
        self.log.lock().frames.pop_front()
    }

    fn add_listener(&self, listener: Weak<dyn TrackEventListener>) {
        self.log.lock().listeners.push(listener);
    }
}

/// Entrega siempre el mismo motor
pub(crate) struct FakeEngineFactory {
    engine: Arc<RecordingEngine>,
    created: AtomicUsize,
    fail: AtomicBool,
}

impl FakeEngineFactory {
    pub(crate) fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_next(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

impl EngineFactory for FakeEngineFactory {
    fn create(&self, guild_id: GuildId) -> anyhow::Result<Arc<dyn PlaybackEngine>> {
        if self.fail.swap(false, Ordering::SeqCst) {
            anyhow::bail!("no audio device for guild {}", guild_id);
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(self.engine.clone())
    }
}

/// Playlists que se resuelven cuando el test lo pide
#[derive(Default)]
pub(crate) struct FakePlaylists {
    known: Mutex<HashMap<String, Vec<Track>>>,
    pending: Mutex<Vec<(Vec<Track>, PlaylistSink)>>,
    loads: AtomicUsize,
}

impl FakePlaylists {
    pub(crate) fn add(&self, name: &str, tracks: Vec<Track>) {
        self.known.lock().insert(name.to_string(), tracks);
    }

    /// Playlist cuyas entradas fallan todas al resolverse
    pub(crate) fn add_unresolvable(&self, name: &str) {
        self.add(name, Vec::new());
    }

    pub(crate) fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub(crate) fn deliver_all(&self) {
        let pending = std::mem::take(&mut *self.pending.lock());
        for (tracks, sink) in pending {
            for track in tracks {
                sink.track_loaded(track);
            }
            sink.finished();
        }
    }
}

impl PlaylistSource for FakePlaylists {
    fn load(&self, name: &str, sink: PlaylistSink) -> bool {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let Some(tracks) = self.known.lock().get(name).cloned() else {
            return false;
        };
        self.pending.lock().push((tracks, sink));
        true
    }
}

#[derive(Default)]
pub(crate) struct RecordingVoice {
    attached: Mutex<Vec<GuildId>>,
    disconnects: Mutex<Vec<GuildId>>,
}

impl RecordingVoice {
    pub(crate) fn attached(&self) -> Vec<GuildId> {
        self.attached.lock().clone()
    }

    pub(crate) fn disconnects(&self) -> Vec<GuildId> {
        self.disconnects.lock().clone()
    }
}

impl VoiceLink for RecordingVoice {
    fn attach(&self, guild_id: GuildId, _provider: Arc<dyn FrameProvider>) {
        self.attached.lock().push(guild_id);
    }

    fn disconnect(&self, guild_id: GuildId) {
        self.disconnects.lock().push(guild_id);
    }
}

/// Superficie de chat en memoria
#[derive(Default)]
pub(crate) struct FakeSurface {
    missing_guilds: Mutex<HashSet<GuildId>>,
    missing_channels: Mutex<HashSet<ChannelId>>,
    fail: AtomicBool,
    edits: Mutex<Vec<(ChannelId, MessageId, StatusView)>>,
}

impl FakeSurface {
    pub(crate) fn remove_guild(&self, guild_id: GuildId) {
        self.missing_guilds.lock().insert(guild_id);
    }

    pub(crate) fn remove_channel(&self, channel_id: ChannelId) {
        self.missing_channels.lock().insert(channel_id);
    }

    pub(crate) fn fail_edits(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub(crate) fn edits(&self) -> Vec<(ChannelId, MessageId, StatusView)> {
        self.edits.lock().clone()
    }
}

#[async_trait]
impl StatusSurface for FakeSurface {
    fn guild_available(&self, guild_id: GuildId) -> bool {
        !self.missing_guilds.lock().contains(&guild_id)
    }

    fn channel_available(&self, _guild_id: GuildId, channel_id: ChannelId) -> bool {
        !self.missing_channels.lock().contains(&channel_id)
    }

    async fn edit(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        view: &StatusView,
    ) -> Result<(), StatusError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StatusError::EditFailed("Unknown Message".to_string()));
        }
        self.edits.lock().push((channel_id, message_id, view.clone()));
        Ok(())
    }
}

/// Todos los fakes cableados para un guild
pub(crate) struct Harness {
    pub guild_id: GuildId,
    pub config: Arc<Config>,
    pub settings: Arc<MemorySettings>,
    pub playlists: Arc<FakePlaylists>,
    pub voice: Arc<RecordingVoice>,
    pub surface: Arc<FakeSurface>,
    pub status: Arc<StatusSyncer>,
    pub engine: Arc<RecordingEngine>,
    pub factory: Arc<FakeEngineFactory>,
}

impl Harness {
    pub(crate) fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub(crate) fn with_config(config: Config) -> Self {
        init_tracing();

        let config = Arc::new(config);
        let surface = Arc::new(FakeSurface::default());
        let engine = Arc::new(RecordingEngine::new());

        Self {
            guild_id: GuildId::new(1),
            status: Arc::new(StatusSyncer::new(config.clone(), surface.clone())),
            config,
            settings: Arc::new(MemorySettings::new()),
            playlists: Arc::new(FakePlaylists::default()),
            voice: Arc::new(RecordingVoice::default()),
            surface,
            factory: Arc::new(FakeEngineFactory {
                engine: engine.clone(),
                created: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
            }),
            engine,
        }
    }

    pub(crate) fn services(&self) -> SessionServices {
        SessionServices {
            config: self.config.clone(),
            settings: self.settings.clone(),
            playlists: self.playlists.clone(),
            voice: self.voice.clone(),
            status: self.status.clone(),
        }
    }

    /// Sesión conectada directo al motor de prueba, fuera de cualquier registry
    pub(crate) fn session(&self) -> Arc<SessionScheduler> {
        let queue_type = self.settings.settings(self.guild_id).queue_type;
        SessionScheduler::new(self.guild_id, self.engine.clone(), queue_type, self.services())
    }

    pub(crate) fn registry(&self) -> SessionRegistry {
        SessionRegistry::new(self.factory.clone(), self.services())
    }

    pub(crate) fn finish_current(&self, session: &SessionScheduler) {
        self.end_current(session, EndReason::Finished);
    }

    pub(crate) fn end_current(&self, session: &SessionScheduler, reason: EndReason) {
        let Some(active) = session.active_item() else {
            panic!("nothing is playing in guild {}", self.guild_id);
        };
        session.on_track_end(active.track(), reason);
    }
}
