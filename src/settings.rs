//! Per-guild playback settings.
//!
//! Persistence lives outside this crate; [`SettingsProvider`] is the seam the
//! scheduler reads through and writes volume, repeat mode and queue type back
//! to. [`MemorySettings`] is the in-process provider.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serenity::model::id::GuildId;
use std::{fmt, str::FromStr};
use tracing::debug;

pub use crate::audio::queue::QueueType;

pub const MAX_VOLUME: u8 = 150;

/// Modo de repetición de un guild
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepeatMode {
    #[default]
    Off,
    /// Repite toda la rotación: lo terminado vuelve al final
    All,
    /// Repite el track actual: lo terminado vuelve al frente
    Single,
}

impl RepeatMode {
    pub fn display_name(&self) -> &'static str {
        match self {
            RepeatMode::Off => "Off",
            RepeatMode::All => "All",
            RepeatMode::Single => "Single",
        }
    }

    pub fn emoji(&self) -> Option<&'static str> {
        match self {
            RepeatMode::Off => None,
            RepeatMode::All => Some("🔁"),
            RepeatMode::Single => Some("🔂"),
        }
    }
}

impl fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for RepeatMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "false" => Ok(RepeatMode::Off),
            "all" | "on" | "true" => Ok(RepeatMode::All),
            "single" | "one" => Ok(RepeatMode::Single),
            other => anyhow::bail!("Unknown repeat mode: {}", other),
        }
    }
}

/// Configuración de reproducción de un servidor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildSettings {
    pub volume: u8,
    pub default_playlist: Option<String>,
    pub repeat_mode: RepeatMode,
    pub queue_type: QueueType,
    /// `None` usa el ratio global de [`crate::config::Config`]
    pub skip_ratio: Option<f64>,
}

impl Default for GuildSettings {
    fn default() -> Self {
        Self {
            volume: 100,
            default_playlist: None,
            repeat_mode: RepeatMode::Off,
            queue_type: QueueType::Fair,
            skip_ratio: None,
        }
    }
}

/// Fuente de settings por guild
pub trait SettingsProvider: Send + Sync {
    /// Los guilds sin entrada reciben [`GuildSettings::default`]
    fn settings(&self, guild_id: GuildId) -> GuildSettings;

    fn set_volume(&self, guild_id: GuildId, volume: u8);

    fn set_repeat_mode(&self, guild_id: GuildId, mode: RepeatMode);

    fn set_queue_type(&self, guild_id: GuildId, queue_type: QueueType);
}

/// Settings en memoria, uno por guild
#[derive(Debug, Default)]
pub struct MemorySettings {
    guilds: DashMap<GuildId, GuildSettings>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, guild_id: GuildId, settings: GuildSettings) {
        self.guilds.insert(guild_id, settings);
    }

    fn update(&self, guild_id: GuildId, apply: impl FnOnce(&mut GuildSettings)) {
        let mut entry = self.guilds.entry(guild_id).or_default();
        apply(entry.value_mut());
    }
}

impl SettingsProvider for MemorySettings {
    fn settings(&self, guild_id: GuildId) -> GuildSettings {
        self.guilds
            .get(&guild_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    fn set_volume(&self, guild_id: GuildId, volume: u8) {
        let volume = volume.min(MAX_VOLUME);
        self.update(guild_id, |s| s.volume = volume);
        debug!("💾 Volumen guardado para guild {}: {}", guild_id, volume);
    }

    fn set_repeat_mode(&self, guild_id: GuildId, mode: RepeatMode) {
        self.update(guild_id, |s| s.repeat_mode = mode);
        debug!("💾 Repeat guardado para guild {}: {}", guild_id, mode);
    }

    fn set_queue_type(&self, guild_id: GuildId, queue_type: QueueType) {
        self.update(guild_id, |s| s.queue_type = queue_type);
        debug!("💾 Tipo de cola guardado para guild {}: {}", guild_id, queue_type);
    }
}
