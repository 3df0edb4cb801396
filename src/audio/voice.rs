use serenity::model::id::GuildId;
use std::sync::Arc;

use super::engine::FrameProvider;

/// Conexión de voz de cada guild.
///
/// Ambas llamadas son fire-and-forget: la implementación hace el trabajo en
/// su propio runtime sin bloquear a quien llama.
#[cfg_attr(test, mockall::automock)]
pub trait VoiceLink: Send + Sync {
    /// Registra `provider` como fuente del audio saliente del guild
    fn attach(&self, guild_id: GuildId, provider: Arc<dyn FrameProvider>);

    /// Cierra la conexión de voz del guild
    fn disconnect(&self, guild_id: GuildId);
}
