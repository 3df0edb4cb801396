//! # Status Module
//!
//! Keeps one "now playing" message per guild up to date.
//!
//! - [`StatusSyncer`] - tracks the message of every guild and refreshes it
//! - [`render`] - the text of the message
//! - [`discord`] - serenity backed surface and presence

pub mod discord;
pub mod render;

pub use render::StatusView;

use async_trait::async_trait;
use dashmap::DashMap;
use serenity::model::id::{ChannelId, GuildId, MessageId};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{audio::registry::SessionRegistry, audio::track::Track, config::Config, error::StatusError};

/// Donde vive el status message de un guild
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusMessage {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

/// Superficie de chat donde se editan los status messages
#[async_trait]
pub trait StatusSurface: Send + Sync {
    fn guild_available(&self, guild_id: GuildId) -> bool;

    fn channel_available(&self, guild_id: GuildId, channel_id: ChannelId) -> bool;

    async fn edit(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        view: &StatusView,
    ) -> Result<(), StatusError>;
}

/// Presencia del bot
#[cfg_attr(test, mockall::automock)]
pub trait PresenceSink: Send + Sync {
    fn listening(&self, title: String);

    /// Vuelve al juego configurado, o a nada
    fn reset(&self);
}

pub struct StatusSyncer {
    entries: DashMap<GuildId, StatusMessage>,
    playing: DashMap<GuildId, String>,
    surface: Arc<dyn StatusSurface>,
    presence: Option<Arc<dyn PresenceSink>>,
    config: Arc<Config>,
}

impl StatusSyncer {
    pub fn new(config: Arc<Config>, surface: Arc<dyn StatusSurface>) -> Self {
        Self {
            entries: DashMap::new(),
            playing: DashMap::new(),
            surface,
            presence: None,
            config,
        }
    }

    pub fn with_presence(mut self, presence: Arc<dyn PresenceSink>) -> Self {
        self.presence = Some(presence);
        self
    }

    /// Registra el último status message enviado en un guild
    pub fn set_last_message(&self, guild_id: GuildId, channel_id: ChannelId, message_id: MessageId) {
        self.entries.insert(
            guild_id,
            StatusMessage {
                channel_id,
                message_id,
            },
        );
        debug!("📌 Status message de guild {}: {}", guild_id, message_id);
    }

    pub fn last_message(&self, guild_id: GuildId) -> Option<StatusMessage> {
        self.entries.get(&guild_id).map(|entry| *entry.value())
    }

    pub fn clear(&self, guild_id: GuildId) {
        self.entries.remove(&guild_id);
    }

    /// Olvida la entrada sólo si apunta al mensaje borrado
    pub fn on_message_deleted(&self, guild_id: GuildId, message_id: MessageId) {
        if self
            .entries
            .remove_if(&guild_id, |_, entry| entry.message_id == message_id)
            .is_some()
        {
            debug!("🗑️ Status message borrado en guild {}", guild_id);
        }
    }

    pub fn is_playing(&self, guild_id: GuildId) -> bool {
        self.playing.contains_key(&guild_id)
    }

    /// Notificación de cambio de track; `None` cuando el guild queda libre
    pub fn on_track_update(&self, guild_id: GuildId, track: Option<&Track>) {
        match track {
            Some(track) => {
                self.playing.insert(guild_id, track.title.clone());
            }
            None => {
                self.playing.remove(&guild_id);
            }
        }

        if !self.config.song_in_status {
            return;
        }
        let Some(presence) = &self.presence else {
            return;
        };

        match track {
            Some(track) if self.playing.len() <= 1 => presence.listening(track.title.clone()),
            _ => presence.reset(),
        }
    }

    fn drop_entry(&self, guild_id: GuildId, stale: StatusMessage) {
        self.entries.remove_if(&guild_id, |_, entry| *entry == stale);
    }

    /// Refresca todos los status messages una vez
    pub async fn update_all(&self, registry: &SessionRegistry) {
        let snapshot: Vec<(GuildId, StatusMessage)> = self
            .entries
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();

        for (guild_id, message) in snapshot {
            if !self.surface.guild_available(guild_id) {
                debug!("Guild {} ya no está disponible, olvidando status", guild_id);
                self.drop_entry(guild_id, message);
                continue;
            }
            if !self.surface.channel_available(guild_id, message.channel_id) {
                debug!("Canal {} ya no está disponible, olvidando status", message.channel_id);
                self.drop_entry(guild_id, message);
                continue;
            }

            let session = registry.get(guild_id);
            let (view, last) = match session.as_ref().and_then(|s| s.now_playing()) {
                Some(now) => (StatusView::Playing(now), false),
                None => {
                    let volume = session
                        .as_ref()
                        .map(|s| s.volume())
                        .unwrap_or_else(|| self.idle_volume(registry, guild_id));
                    (StatusView::Idle { volume }, true)
                }
            };

            match self.surface.edit(message.channel_id, message.message_id, &view).await {
                Ok(()) if last => self.drop_entry(guild_id, message),
                Ok(()) => {}
                Err(e) => {
                    warn!("⚠️ No se pudo actualizar el status de guild {}: {}", guild_id, e);
                    self.drop_entry(guild_id, message);
                }
            }
        }
    }

    fn idle_volume(&self, registry: &SessionRegistry, guild_id: GuildId) -> u8 {
        registry.services().settings.settings(guild_id).volume
    }

    /// Arranca el refresco periódico; no hace nada en modo rich status
    pub fn spawn(self: &Arc<Self>, registry: Arc<SessionRegistry>) -> Option<JoinHandle<()>> {
        if self.config.rich_status {
            info!("🖼️ Rich status activo, sin refresco periódico");
            return None;
        }

        let syncer = Arc::clone(self);
        let interval = self.config.status_interval;
        info!("🔄 Refresco de status cada {}", humantime::format_duration(interval));

        Some(tokio::spawn(async move {
            loop {
                syncer.update_all(&registry).await;
                tokio::time::sleep(interval).await;
            }
        }))
    }
}
