use anyhow::Result;
use std::time::Duration;

/// Configuración global del bot para el scheduler de sesiones
#[derive(Debug, Clone)]
pub struct Config {
    /// Ratio de votos para saltar cuando el guild no tiene uno propio
    pub skip_ratio: f64,
    /// Mantiene la conexión de voz cuando la sesión queda libre
    pub stay_in_channel: bool,
    /// Muestra el track actual como presencia del bot
    pub song_in_status: bool,
    /// Status por eventos; desactiva el refresco periódico
    pub rich_status: bool,
    pub status_interval: Duration,
    /// Presencia que se restaura cuando no se anuncia un track
    pub game: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            skip_ratio: match std::env::var("SKIP_RATIO") {
                Ok(val) if !val.trim().is_empty() => val.trim().parse()?,
                _ => defaults.skip_ratio,
            },
            stay_in_channel: std::env::var("STAY_IN_CHANNEL")
                .unwrap_or_else(|_| "false".to_string())
                .parse()?,
            song_in_status: std::env::var("SONG_IN_STATUS")
                .unwrap_or_else(|_| "false".to_string())
                .parse()?,
            rich_status: std::env::var("RICH_STATUS")
                .unwrap_or_else(|_| "false".to_string())
                .parse()?,
            status_interval: match std::env::var("STATUS_INTERVAL") {
                Ok(val) if !val.trim().is_empty() => humantime::parse_duration(val.trim())?,
                _ => defaults.status_interval,
            },
            game: std::env::var("BOT_GAME")
                .ok()
                .filter(|game| !game.trim().is_empty() && !game.eq_ignore_ascii_case("none")),
        };

        config.validate()?;

        Ok(config)
    }

    /// Valida los valores de configuración.
    ///
    /// - El skip ratio debe estar en `0.0..=1.0`
    /// - El intervalo del status no puede ser cero
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.skip_ratio) {
            anyhow::bail!("Skip ratio must be between 0.0 and 1.0, got: {}", self.skip_ratio);
        }

        if self.status_interval.is_zero() {
            anyhow::bail!("Status interval must be greater than 0");
        }

        Ok(())
    }

    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Skip ratio: {:.2}\n  \
            Status: every {} (rich={}, song in presence={})\n  \
            Stay in channel: {}",
            self.skip_ratio,
            humantime::format_duration(self.status_interval),
            self.rich_status,
            self.song_in_status,
            self.stay_in_channel,
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            skip_ratio: 0.55,
            stay_in_channel: false,
            song_in_status: false,
            rich_status: false,
            status_interval: Duration::from_secs(5),
            game: None,
        }
    }
}
