use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;
use url::Url;

use crate::error::DurationError;

/// Every strategy the resolver knows about.
///
/// Only the hosting platforms have a string key; `DirectMp4`, `Hls` and
/// `Unknown` are selected by URL shape or content type, never by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    YouTube,
    Vimeo,
    Twitch,
    Dailymotion,
    SoundCloud,
    DirectMp4,
    Hls,
    Unknown,
}

impl ProviderKind {
    pub const PLATFORMS: [ProviderKind; 5] = [
        ProviderKind::YouTube,
        ProviderKind::Vimeo,
        ProviderKind::Twitch,
        ProviderKind::Dailymotion,
        ProviderKind::SoundCloud,
    ];

    /// Look up a platform by its exact key (`youtube`, `vimeo`, ...).
    pub fn from_key(key: &str) -> Option<Self> {
        Self::PLATFORMS.into_iter().find(|kind| kind.key() == key)
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::YouTube => "youtube",
            Self::Vimeo => "vimeo",
            Self::Twitch => "twitch",
            Self::Dailymotion => "dailymotion",
            Self::SoundCloud => "soundcloud",
            Self::DirectMp4 => "mp4",
            Self::Hls => "hls",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_platform(self) -> bool {
        Self::PLATFORMS.contains(&self)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// An absolute video URL, optionally with an explicit provider and id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoLocator {
    url: Url,
    explicit: Option<(ProviderKind, String)>,
}

impl VideoLocator {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            explicit: None,
        }
    }

    /// Parse an absolute URL.
    pub fn parse(input: &str) -> Result<Self, DurationError> {
        let url = Url::parse(input.trim())
            .map_err(|e| DurationError::url_parse(input, e.to_string()))?;
        if url.cannot_be_a_base() {
            return Err(DurationError::url_parse(input, "URL must be absolute"));
        }
        Ok(Self::new(url))
    }

    /// Locator for a known provider id; the URL is the platform's canonical page.
    pub fn for_provider(provider: ProviderKind, id: &str) -> Result<Self, DurationError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(DurationError::url_parse(id, "provider id must not be empty"));
        }
        let url = crate::providers::canonical_url(provider, id)?;
        Ok(Self {
            url,
            explicit: Some((provider, id.to_owned())),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn explicit(&self) -> Option<(ProviderKind, &str)> {
        self.explicit
            .as_ref()
            .map(|(kind, id)| (*kind, id.as_str()))
    }
}

impl FromStr for VideoLocator {
    type Err = DurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VideoLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.explicit {
            Some((kind, id)) => write!(f, "{kind}:{id}"),
            None => write!(f, "{}", self.url),
        }
    }
}

/// Non-failing result of a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum Resolution {
    Resolved {
        #[serde(rename = "seconds", serialize_with = "as_secs_f64")]
        duration: Duration,
    },
    /// No duration is available (live stream, strategy not applicable, ...).
    Indeterminate,
}

fn as_secs_f64<S: serde::Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_secs_f64())
}

impl Resolution {
    pub fn resolved(duration: Duration) -> Self {
        Self::Resolved { duration }
    }

    pub fn duration(&self) -> Option<Duration> {
        match self {
            Self::Resolved { duration } => Some(*duration),
            Self::Indeterminate => None,
        }
    }

    pub fn seconds(&self) -> Option<f64> {
        self.duration().map(|d| d.as_secs_f64())
    }

    pub fn is_indeterminate(&self) -> bool {
        matches!(self, Self::Indeterminate)
    }
}

impl From<Option<Duration>> for Resolution {
    fn from(value: Option<Duration>) -> Self {
        value.map_or(Self::Indeterminate, Self::resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_keys() {
        assert_eq!(ProviderKind::from_key("youtube"), Some(ProviderKind::YouTube));
        assert_eq!(ProviderKind::from_key("soundcloud"), Some(ProviderKind::SoundCloud));
        assert_eq!(ProviderKind::from_key("SoundCloud"), None);
        assert_eq!(ProviderKind::from_key("YouTube"), None);
        assert_eq!(ProviderKind::from_key(" youtube"), None);
        assert_eq!(ProviderKind::from_key("dailymotion"), Some(ProviderKind::Dailymotion));
        assert_eq!(ProviderKind::from_key("mp4"), None);
        assert_eq!(ProviderKind::from_key("hls"), None);
        assert_eq!(ProviderKind::from_key("myspace"), None);
        assert_eq!(ProviderKind::Twitch.key(), "twitch");
    }

    #[test]
    fn test_locator_requires_absolute_url() {
        assert!(VideoLocator::parse("/relative/video.mp4").is_err());
        assert!(VideoLocator::parse("mailto:someone@example.com").is_err());
        let locator = VideoLocator::parse("https://example.com/a.mp4").unwrap();
        assert_eq!(locator.url().path(), "/a.mp4");
        assert!(locator.explicit().is_none());
    }

    #[test]
    fn test_locator_for_provider() {
        let locator = VideoLocator::for_provider(ProviderKind::Dailymotion, "x6h5cqp").unwrap();
        assert_eq!(
            locator.explicit(),
            Some((ProviderKind::Dailymotion, "x6h5cqp"))
        );
        assert_eq!(locator.to_string(), "dailymotion:x6h5cqp");
        assert!(VideoLocator::for_provider(ProviderKind::Vimeo, "  ").is_err());
    }

    #[test]
    fn test_resolution_serializes_seconds() {
        let json = serde_json::to_value(Resolution::resolved(Duration::from_millis(1500))).unwrap();
        assert_eq!(json, serde_json::json!({"status": "resolved", "seconds": 1.5}));
        let json = serde_json::to_value(Resolution::Indeterminate).unwrap();
        assert_eq!(json, serde_json::json!({"status": "indeterminate"}));
    }
}
