use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_USER_AGENT: &str =
    "duration-finder/0.1 (+https://github.com/hua0512/rust-srec)";

/// Bytes requested from the start of an MP4 file when scanning for `mvhd`.
pub const DEFAULT_MP4_RANGE_BYTES: u64 = 256;

/// Settings for a [`Resolver`](crate::Resolver) and the HTTP client behind it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// User agent sent with every request
    pub user_agent: String,

    /// Overall timeout for a single HTTP request (0 disables it)
    #[serde(with = "secs_f64")]
    pub timeout: Duration,

    /// Time allowed to establish a connection
    #[serde(with = "secs_f64")]
    pub connect_timeout: Duration,

    /// Whether to follow redirects (short links such as tinyurl rely on this)
    pub follow_redirects: bool,

    /// Size of the leading byte range fetched when scanning MP4 files
    pub mp4_range_bytes: u64,

    /// YouTube Data API v3 key; YouTube lookups are skipped without it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube_api_key: Option<String>,

    /// Twitch application client id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitch_client_id: Option<String>,

    /// Twitch application secret, exchanged for an app access token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitch_client_secret: Option<String>,

    /// Pre-issued Twitch bearer token, used instead of the secret when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitch_access_token: Option<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            follow_redirects: true,
            mp4_range_bytes: DEFAULT_MP4_RANGE_BYTES,
            youtube_api_key: None,
            twitch_client_id: None,
            twitch_client_secret: None,
            twitch_access_token: None,
        }
    }
}

impl ResolverConfig {
    pub fn with_youtube_api_key(mut self, key: impl Into<String>) -> Self {
        self.youtube_api_key = Some(key.into());
        self
    }

    pub fn with_twitch_client(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.twitch_client_id = Some(client_id.into());
        self.twitch_client_secret = Some(client_secret.into());
        self
    }

    pub fn with_mp4_range_bytes(mut self, bytes: u64) -> Self {
        self.mp4_range_bytes = bytes;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Durations as (fractional) seconds, which reads naturally in TOML.
mod secs_f64 {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ResolverConfig::default();
        assert_eq!(config.mp4_range_bytes, 256);
        assert!(config.follow_redirects);
        assert!(config.youtube_api_key.is_none());
    }

    #[test]
    fn test_deserialize_partial_json() {
        let config: ResolverConfig = serde_json::from_value(serde_json::json!({
            "timeout": 2.5,
            "youtube_api_key": "abc",
        }))
        .unwrap();
        assert_eq!(config.timeout, Duration::from_millis(2500));
        assert_eq!(config.youtube_api_key.as_deref(), Some("abc"));
        assert_eq!(config.mp4_range_bytes, DEFAULT_MP4_RANGE_BYTES);
    }

    #[test]
    fn test_negative_timeout_rejected() {
        let result = serde_json::from_value::<ResolverConfig>(serde_json::json!({
            "timeout": -1.0,
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_builders() {
        let config = ResolverConfig::default()
            .with_twitch_client("id", "secret")
            .with_mp4_range_bytes(1024)
            .with_timeout(Duration::ZERO);
        assert_eq!(config.twitch_client_id.as_deref(), Some("id"));
        assert_eq!(config.twitch_client_secret.as_deref(), Some("secret"));
        assert_eq!(config.mp4_range_bytes, 1024);
        assert!(config.timeout.is_zero());
    }
}
