use serenity::model::id::UserId;
use std::time::Duration;

use crate::audio::scheduler::NowPlaying;

pub const PLAY_EMOJI: &str = "▶";
pub const PAUSE_EMOJI: &str = "⏸";
pub const STOP_EMOJI: &str = "⏹";

const BAR_SLOTS: usize = 12;

/// Lo que muestra el status message de un guild
#[derive(Debug, Clone, PartialEq)]
pub enum StatusView {
    Playing(NowPlaying),
    Idle { volume: u8 },
}

impl StatusView {
    pub fn headline(&self) -> &'static str {
        match self {
            StatusView::Playing(_) => "🎶 **Reproduciendo ahora...**",
            StatusView::Idle { .. } => "🎶 **Reproduciendo...**",
        }
    }

    pub fn title(&self) -> String {
        match self {
            StatusView::Playing(now) => now.item.track().title.clone(),
            StatusView::Idle { .. } => "No hay música sonando".to_string(),
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            StatusView::Playing(now) => now.item.track().uri.as_deref(),
            StatusView::Idle { .. } => None,
        }
    }

    /// Quién pidió el track; el autoplay no tiene a nadie
    pub fn requester(&self) -> Option<UserId> {
        match self {
            StatusView::Playing(now) => now.item.request().owner,
            StatusView::Idle { .. } => None,
        }
    }

    pub fn description(&self) -> String {
        match self {
            StatusView::Playing(now) => {
                let track = now.item.track();
                let emoji = if now.paused { PAUSE_EMOJI } else { PLAY_EMOJI };
                format!(
                    "{} {} `[{}/{}]` {}",
                    emoji,
                    progress_bar(now.progress()),
                    format_time(Some(now.position)),
                    format_time(track.duration),
                    volume_icon(now.volume)
                )
            }
            StatusView::Idle { volume } => {
                format!("{} {} {}", STOP_EMOJI, progress_bar(None), volume_icon(*volume))
            }
        }
    }

    pub fn footer(&self) -> Option<String> {
        match self {
            StatusView::Playing(now) => now
                .item
                .track()
                .author
                .as_deref()
                .filter(|author| !author.is_empty())
                .map(|author| format!("Fuente: {}", author)),
            StatusView::Idle { .. } => None,
        }
    }
}

/// `H:MM:SS` o `MM:SS`; `None` es un stream en vivo
pub fn format_time(duration: Option<Duration>) -> String {
    let Some(duration) = duration else {
        return "LIVE".to_string();
    };

    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

pub fn progress_bar(progress: Option<f64>) -> String {
    let marker = progress.map(|p| (p * BAR_SLOTS as f64) as usize);
    (0..BAR_SLOTS)
        .map(|slot| if Some(slot) == marker { "🔘" } else { "▬" })
        .collect()
}

pub fn volume_icon(volume: u8) -> &'static str {
    match volume {
        0 => "🔇",
        1..=29 => "🔈",
        30..=69 => "🔉",
        _ => "🔊",
    }
}
