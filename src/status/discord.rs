use async_trait::async_trait;
use serenity::{
    all::{ActivityData, Cache, ChannelId, Context, GuildId, Http, MessageId, Timestamp},
    builder::{CreateEmbed, CreateEmbedFooter, EditMessage},
};
use std::sync::Arc;
use tracing::debug;

use super::{PresenceSink, StatusSurface, StatusView};
use crate::error::StatusError;

/// Paleta de colores del status message
pub mod colors {
    use serenity::all::Colour;

    pub const MUSIC_PURPLE: Colour = Colour::from_rgb(138, 43, 226);
    pub const WARNING_ORANGE: Colour = Colour::from_rgb(255, 193, 7);
    pub const NEUTRAL_GRAY: Colour = Colour::from_rgb(108, 117, 125);
}

/// Crea el embed de un status message
pub fn create_status_embed(view: &StatusView) -> CreateEmbed {
    let color = match view {
        StatusView::Playing(now) if now.paused => colors::WARNING_ORANGE,
        StatusView::Playing(_) => colors::MUSIC_PURPLE,
        StatusView::Idle { .. } => colors::NEUTRAL_GRAY,
    };

    let mut embed = CreateEmbed::new()
        .title(view.title())
        .description(view.description())
        .color(color);

    if let Some(url) = view.url() {
        embed = embed.url(url);
    }

    if let Some(user_id) = view.requester() {
        embed = embed.field("👤 Solicitado por", format!("<@{}>", user_id), true);
    }

    if let Some(footer) = view.footer() {
        embed = embed.footer(CreateEmbedFooter::new(footer));
    }

    embed.timestamp(Timestamp::now())
}

/// Status messages sobre el cache y la API HTTP de serenity
pub struct DiscordSurface {
    cache: Arc<Cache>,
    http: Arc<Http>,
}

impl DiscordSurface {
    pub fn new(cache: Arc<Cache>, http: Arc<Http>) -> Self {
        Self { cache, http }
    }
}

#[async_trait]
impl StatusSurface for DiscordSurface {
    fn guild_available(&self, guild_id: GuildId) -> bool {
        self.cache.guild(guild_id).is_some()
    }

    fn channel_available(&self, guild_id: GuildId, channel_id: ChannelId) -> bool {
        self.cache
            .guild(guild_id)
            .map(|guild| guild.channels.contains_key(&channel_id))
            .unwrap_or(false)
    }

    async fn edit(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        view: &StatusView,
    ) -> Result<(), StatusError> {
        let builder = EditMessage::new()
            .content(view.headline())
            .embed(create_status_embed(view));

        channel_id
            .edit_message(&self.http, message_id, builder)
            .await
            .map_err(|e| StatusError::EditFailed(e.to_string()))?;

        debug!("✏️ Status message {} actualizado", message_id);
        Ok(())
    }
}

/// Presencia del bot vía el gateway
pub struct DiscordPresence {
    ctx: Context,
    game: Option<String>,
}

impl DiscordPresence {
    pub fn new(ctx: Context, game: Option<String>) -> Self {
        Self { ctx, game }
    }
}

impl PresenceSink for DiscordPresence {
    fn listening(&self, title: String) {
        self.ctx.set_activity(Some(ActivityData::listening(title)));
    }

    fn reset(&self) {
        let activity = self.game.as_ref().map(|game| ActivityData::playing(game.clone()));
        self.ctx.set_activity(activity);
    }
}
