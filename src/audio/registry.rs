use dashmap::{mapref::entry::Entry, DashMap};
use parking_lot::Mutex;
use serenity::model::id::GuildId;
use std::sync::Arc;
use tracing::{debug, info};

use super::{
    engine::{EngineFactory, FrameProvider, TrackEventListener},
    playlist::PlaylistSource,
    scheduler::SessionScheduler,
    voice::VoiceLink,
};
use crate::{
    config::Config,
    error::{SessionError, SessionResult},
    settings::SettingsProvider,
    status::StatusSyncer,
};

/// Colaboradores compartidos por todas las sesiones
#[derive(Clone)]
pub struct SessionServices {
    pub config: Arc<Config>,
    pub settings: Arc<dyn SettingsProvider>,
    pub playlists: Arc<dyn PlaylistSource>,
    pub voice: Arc<dyn VoiceLink>,
    pub status: Arc<StatusSyncer>,
}

/// Una sesión por guild, creada bajo demanda
pub struct SessionRegistry {
    sessions: DashMap<GuildId, Arc<SessionScheduler>>,
    /// Serializa la creación por guild sin retener el shard de `sessions`
    creating: DashMap<GuildId, Arc<Mutex<()>>>,
    engines: Arc<dyn EngineFactory>,
    services: SessionServices,
}

impl SessionRegistry {
    pub fn new(engines: Arc<dyn EngineFactory>, services: SessionServices) -> Self {
        Self {
            sessions: DashMap::new(),
            creating: DashMap::new(),
            engines,
            services,
        }
    }

    pub fn services(&self) -> &SessionServices {
        &self.services
    }

    /// Devuelve la sesión del guild, creándola si no existe.
    ///
    /// Las llamadas concurrentes para un mismo guild reciben la misma sesión.
    /// El motor se construye sin ningún lock del mapa tomado y la voz sólo se
    /// conecta a la sesión que quedó guardada.
    pub fn get_or_create(&self, guild_id: GuildId) -> SessionResult<Arc<SessionScheduler>> {
        if let Some(session) = self.get(guild_id) {
            return Ok(session);
        }

        let gate = self.creating.entry(guild_id).or_default().clone();
        let _creating = gate.lock();
        if let Some(session) = self.get(guild_id) {
            return Ok(session);
        }

        let built = self.build(guild_id)?;
        let session = match self.sessions.entry(guild_id) {
            Entry::Occupied(entry) => return Ok(entry.get().clone()),
            Entry::Vacant(entry) => entry.insert(built).value().clone(),
        };

        let provider: Arc<dyn FrameProvider> = session.clone();
        self.services.voice.attach(guild_id, provider);
        info!("🎧 Sesión creada para guild {}", guild_id);
        Ok(session)
    }

    fn build(&self, guild_id: GuildId) -> SessionResult<Arc<SessionScheduler>> {
        let engine = self
            .engines
            .create(guild_id)
            .map_err(|source| SessionError::Engine { guild_id, source })?;

        let settings = self.services.settings.settings(guild_id);
        engine.set_volume(settings.volume);

        let session = SessionScheduler::new(
            guild_id,
            engine.clone(),
            settings.queue_type,
            self.services.clone(),
        );
        let weak = Arc::downgrade(&session);
        engine.add_listener(weak as std::sync::Weak<dyn TrackEventListener>);

        debug!(
            "Sesión de guild {} con cola {} y volumen {}",
            guild_id, settings.queue_type, settings.volume
        );
        Ok(session)
    }

    pub fn get(&self, guild_id: GuildId) -> Option<Arc<SessionScheduler>> {
        self.sessions.get(&guild_id).map(|entry| entry.value().clone())
    }

    /// Detiene y descarta la sesión del guild
    pub fn remove(&self, guild_id: GuildId) -> Option<Arc<SessionScheduler>> {
        self.creating.remove(&guild_id);
        let (_, session) = self.sessions.remove(&guild_id)?;
        session.stop_and_clear();
        self.services.status.clear(guild_id);
        info!("🗑️ Sesión eliminada para guild {}", guild_id);
        Some(session)
    }

    /// Cierra todas las conexiones y vacía cada sesión
    pub fn shutdown(&self) {
        let sessions: Vec<_> = self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        for session in &sessions {
            self.services.voice.disconnect(session.guild_id());
            session.stop_and_clear();
        }
        info!("👋 {} sesiones cerradas", sessions.len());
    }

    pub fn guild_ids(&self) -> Vec<GuildId> {
        self.sessions.iter().map(|entry| *entry.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        audio::{
            engine::PlaybackEngine,
            queue::QueueType,
            track::QueuedItem,
            voice::MockVoiceLink,
        },
        settings::GuildSettings,
        test_support::{track, FakeEngineFactory, Harness},
    };
    use mockall::predicate::eq;
    use pretty_assertions::assert_eq;
    use serenity::model::id::UserId;
    use std::sync::{Barrier, Weak};

    /// Fábrica que consulta el registry mientras construye el motor
    struct LookupFactory {
        inner: Arc<FakeEngineFactory>,
        registry: Mutex<Weak<SessionRegistry>>,
        lookups: Mutex<Vec<(bool, usize)>>,
    }

    impl EngineFactory for LookupFactory {
        fn create(&self, guild_id: GuildId) -> anyhow::Result<Arc<dyn PlaybackEngine>> {
            let registry = self.registry.lock().upgrade();
            if let Some(registry) = registry {
                let lookup = (registry.get(guild_id).is_some(), registry.len());
                self.lookups.lock().push(lookup);
            }
            self.inner.create(guild_id)
        }
    }

    #[test]
    fn same_guild_gets_same_session() {
        let h = Harness::new();
        let registry = h.registry();

        let first = registry.get_or_create(h.guild_id).unwrap();
        let second = registry.get_or_create(h.guild_id).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
        assert_eq!(h.voice.attached(), vec![h.guild_id]);
        assert_eq!(h.factory.created(), 1);
    }

    #[test]
    fn concurrent_first_access_builds_one_session() {
        let h = Harness::new();
        let registry = h.registry();
        let barrier = Barrier::new(8);
        let (shared, gate, guild_id) = (&registry, &barrier, h.guild_id);

        let sessions: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(move |_| {
                    scope.spawn(move || {
                        gate.wait();
                        shared.get_or_create(guild_id).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|handle| handle.join().unwrap()).collect()
        });

        assert!(sessions.iter().all(|s| Arc::ptr_eq(s, &sessions[0])));
        assert_eq!(h.factory.created(), 1);
        assert_eq!(h.voice.attached(), vec![h.guild_id]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn engine_factory_can_read_the_registry() {
        let h = Harness::new();
        let factory = Arc::new(LookupFactory {
            inner: h.factory.clone(),
            registry: Mutex::new(Weak::new()),
            lookups: Mutex::new(Vec::new()),
        });
        let registry = Arc::new(SessionRegistry::new(factory.clone(), h.services()));
        *factory.registry.lock() = Arc::downgrade(&registry);

        let session = registry.get_or_create(h.guild_id).unwrap();

        assert_eq!(*factory.lookups.lock(), vec![(false, 0)]);
        assert!(Arc::ptr_eq(&session, &registry.get(h.guild_id).unwrap()));
        assert_eq!(registry.len(), 1);
        assert_eq!(h.voice.attached(), vec![h.guild_id]);
    }

    #[test]
    fn new_session_follows_guild_settings() {
        let h = Harness::new();
        h.settings.insert(
            h.guild_id,
            GuildSettings {
                volume: 40,
                queue_type: QueueType::Linear,
                ..GuildSettings::default()
            },
        );
        let registry = h.registry();

        let session = registry.get_or_create(h.guild_id).unwrap();

        assert_eq!(session.queue_type(), QueueType::Linear);
        assert_eq!(session.volume(), 40);
    }

    #[test]
    fn engine_events_reach_the_session() {
        let h = Harness::new();
        let registry = h.registry();
        let session = registry.get_or_create(h.guild_id).unwrap();
        session.enqueue(QueuedItem::requested_by(track("a"), UserId::new(1)), false);
        session.enqueue(QueuedItem::requested_by(track("b"), UserId::new(1)), false);

        h.engine.emit_end(&track("a"));

        assert_eq!(h.engine.played_ids(), vec!["a", "b"]);
    }

    #[test]
    fn engine_failure_is_reported() {
        let h = Harness::new();
        h.factory.fail_next();
        let registry = h.registry();

        let result = registry.get_or_create(h.guild_id);

        assert!(matches!(result, Err(SessionError::Engine { .. })));
        assert!(registry.is_empty());
        assert!(h.voice.attached().is_empty());
    }

    #[test]
    fn remove_stops_playback() {
        let h = Harness::new();
        let registry = h.registry();
        let session = registry.get_or_create(h.guild_id).unwrap();
        session.enqueue(QueuedItem::requested_by(track("a"), UserId::new(1)), false);

        assert!(registry.remove(h.guild_id).is_some());
        assert!(registry.get(h.guild_id).is_none());
        assert_eq!(h.engine.stops(), 1);
        assert!(registry.remove(h.guild_id).is_none());
    }

    #[test]
    fn shutdown_disconnects_every_guild() {
        let h = Harness::new();
        let mut voice = MockVoiceLink::new();
        voice.expect_attach().times(2).return_const(());
        voice
            .expect_disconnect()
            .with(eq(GuildId::new(1)))
            .times(1)
            .return_const(());
        voice
            .expect_disconnect()
            .with(eq(GuildId::new(2)))
            .times(1)
            .return_const(());
        let registry = SessionRegistry::new(
            h.factory.clone(),
            SessionServices {
                voice: Arc::new(voice),
                ..h.services()
            },
        );

        registry.get_or_create(GuildId::new(1)).unwrap();
        registry.get_or_create(GuildId::new(2)).unwrap();
        registry.shutdown();

        let mut ids = registry.guild_ids();
        ids.sort();
        assert_eq!(ids, vec![GuildId::new(1), GuildId::new(2)]);
    }
}
