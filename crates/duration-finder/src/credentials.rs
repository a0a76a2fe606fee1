//! Twitch credential capability.
//!
//! Helix calls need an app access token and the client id it was issued for.
//! [`StaticToken`] wraps a token obtained elsewhere; [`ClientCredentials`]
//! performs the OAuth client-credentials exchange and caches the result.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};
use url::Url;

use crate::error::DurationError;
use crate::fetcher::{FetchRequest, Fetcher};
use crate::providers::classify::{parse_json, read_body};

pub const TWITCH_TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";

/// Tokens are refreshed this long before Twitch says they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[async_trait]
pub trait TwitchCredentials: Send + Sync {
    /// Bearer token for Helix requests.
    async fn access_token(&self) -> Result<String, DurationError>;

    /// Client id sent alongside the token.
    fn client_id(&self) -> Option<&str>;

    /// Drop any cached token after Helix rejected it.
    async fn invalidate(&self) {}
}

/// A token issued out of band.
#[derive(Debug, Clone)]
pub struct StaticToken {
    token: String,
    client_id: Option<String>,
}

impl StaticToken {
    pub fn new(token: impl Into<String>, client_id: Option<String>) -> Self {
        Self {
            token: token.into(),
            client_id,
        }
    }
}

#[async_trait]
impl TwitchCredentials for StaticToken {
    async fn access_token(&self) -> Result<String, DurationError> {
        Ok(self.token.clone())
    }

    fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

/// OAuth client-credentials holder with a single-flight token cache.
pub struct ClientCredentials {
    client_id: String,
    client_secret: String,
    token_url: Url,
    fetcher: Arc<dyn Fetcher>,
    cached: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("token_url", &self.token_url)
            .finish_non_exhaustive()
    }
}

impl ClientCredentials {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self, DurationError> {
        let token_url = Url::parse(TWITCH_TOKEN_URL)
            .map_err(|e| DurationError::url_parse(TWITCH_TOKEN_URL, e.to_string()))?;
        Ok(Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_url,
            fetcher,
            cached: Mutex::new(None),
        })
    }

    pub fn with_token_url(mut self, token_url: Url) -> Self {
        self.token_url = token_url;
        self
    }

    async fn request_token(&self) -> Result<CachedToken, DurationError> {
        let mut url = self.token_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("client_secret", &self.client_secret)
            .append_pair("grant_type", "client_credentials");

        let response = self.fetcher.fetch(FetchRequest::post(url)).await?;
        let body = read_body("twitch", "twitch token endpoint", response).await?;
        let token: TokenResponse = parse_json("twitch", &body)?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(EXPIRY_MARGIN);
        info!(expires_in = token.expires_in, "Obtained Twitch app access token");
        Ok(CachedToken {
            value: token.access_token,
            refresh_at: Instant::now() + lifetime,
        })
    }
}

#[async_trait]
impl TwitchCredentials for ClientCredentials {
    async fn access_token(&self) -> Result<String, DurationError> {
        // Holding the lock across the exchange makes concurrent callers wait
        // for the one refresh in flight.
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && Instant::now() < token.refresh_at
        {
            return Ok(token.value.clone());
        }

        debug!("Refreshing Twitch access token");
        let token = self.request_token().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    fn client_id(&self) -> Option<&str> {
        Some(&self.client_id)
    }

    async fn invalidate(&self) {
        self.cached.lock().await.take();
    }
}
