use bytes::Bytes;
use serenity::model::id::UserId;
use std::time::Duration;

use super::queue::Queueable;

/// Referencia reproducible que se entrega al playback engine.
///
/// El motor avanza `position` sobre su propia copia; la copia encolada nunca
/// cambia. Los repeats usan [`Track::replay`] para obtener una instancia nueva.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub identifier: String,
    pub title: String,
    pub uri: Option<String>,
    pub author: Option<String>,
    /// `None` en streams en vivo
    pub duration: Option<Duration>,
    pub seekable: bool,
    pub position: Duration,
}

impl Track {
    pub fn new(identifier: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            title: title.into(),
            uri: None,
            author: None,
            duration: None,
            seekable: true,
            position: Duration::ZERO,
        }
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_seekable(mut self, seekable: bool) -> Self {
        self.seekable = seekable;
        self
    }

    /// Devuelve una instancia nueva con el estado de reproducción reiniciado
    pub fn replay(&self) -> Self {
        Self {
            position: Duration::ZERO,
            ..self.clone()
        }
    }

    pub fn is_stream(&self) -> bool {
        self.duration.is_none()
    }
}

/// Quién pidió un track. `owner == None` es autoplay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RequestMetadata {
    pub owner: Option<UserId>,
}

impl RequestMetadata {
    pub const AUTOPLAY: Self = Self { owner: None };

    pub fn user(user_id: UserId) -> Self {
        Self {
            owner: Some(user_id),
        }
    }

    pub fn is_autoplay(&self) -> bool {
        self.owner.is_none()
    }
}

/// Unidad de la cola: un track más la identidad de quien lo pidió
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedItem {
    track: Track,
    request: RequestMetadata,
}

impl QueuedItem {
    pub fn new(track: Track, request: RequestMetadata) -> Self {
        Self { track, request }
    }

    pub fn requested_by(track: Track, user_id: UserId) -> Self {
        Self::new(track, RequestMetadata::user(user_id))
    }

    pub fn autoplay(track: Track) -> Self {
        Self::new(track, RequestMetadata::AUTOPLAY)
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn request(&self) -> RequestMetadata {
        self.request
    }

    /// Copia lista para volver a la cola en modo repeat
    pub fn replay(&self) -> Self {
        Self {
            track: self.track.replay(),
            request: self.request,
        }
    }
}

impl Queueable for QueuedItem {
    fn requester(&self) -> Option<UserId> {
        self.request.owner
    }
}

/// Un frame opus de 20ms listo para el transporte de voz
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame(Bytes);

impl AudioFrame {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self(data.into())
    }

    pub fn data(&self) -> &Bytes {
        &self.0
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replay_resets_position_and_keeps_request() {
        let mut track = Track::new("abc", "Song").with_duration(Duration::from_secs(200));
        track.position = Duration::from_secs(120);
        let item = QueuedItem::requested_by(track, UserId::new(7));

        let again = item.replay();

        assert_eq!(again.track().position, Duration::ZERO);
        assert_eq!(again.track().identifier, "abc");
        assert_eq!(again.request(), item.request());
        assert_eq!(item.track().position, Duration::from_secs(120));
    }

    #[test]
    fn autoplay_has_no_requester() {
        let item = QueuedItem::autoplay(Track::new("x", "X"));
        assert!(item.request().is_autoplay());
        assert_eq!(item.requester(), None);
    }
}
