//! Strategy dispatch.
//!
//! A URL goes through a fixed chain: path suffix (`.mp4`, `.m3u8`), host
//! suffix table, then a `HEAD` probe on the content type. A strategy that does
//! not apply yields `Indeterminate` and the chain moves on; the first failure
//! stops it.

use std::sync::Arc;

use tracing::{debug, info, instrument};
use url::Url;

use crate::config::ResolverConfig;
use crate::container::{hls, mp4};
use crate::credentials::{ClientCredentials, StaticToken, TwitchCredentials};
use crate::error::{DurationError, ErrorKind};
use crate::fetcher::{FetchRequest, Fetcher, HttpFetcher};
use crate::locator::{ProviderKind, Resolution, VideoLocator};
use crate::providers::classify::check_status;
use crate::providers::twitch::TwitchTarget;
use crate::providers::{self, dailymotion, soundcloud, twitch, vimeo, youtube};

const HLS_MEDIA_TYPES: &[&str] = &["application/vnd.apple.mpegurl", "application/x-mpegurl"];
const MP4_MEDIA_TYPE: &str = "video/mp4";

/// What a platform adapter is asked about.
#[derive(Debug)]
enum PlatformTarget<'a> {
    YouTube(&'a str),
    Vimeo(&'a Url),
    Twitch(TwitchTarget),
    Dailymotion(&'a str),
    SoundCloud(&'a str),
}

impl<'a> PlatformTarget<'a> {
    /// Run the platform's id extractor over `url`.
    fn from_url(kind: ProviderKind, url: &'a Url) -> Option<Result<Self, DurationError>> {
        let target = match kind {
            ProviderKind::YouTube => youtube::extract_id(url.as_str()).map(Self::YouTube),
            ProviderKind::Vimeo => Ok(Self::Vimeo(url)),
            ProviderKind::Twitch => twitch::extract_id(url.as_str()).map(Self::Twitch),
            ProviderKind::Dailymotion => {
                dailymotion::extract_id(url.as_str()).map(Self::Dailymotion)
            }
            ProviderKind::SoundCloud => soundcloud::extract_id(url.as_str()).map(Self::SoundCloud),
            ProviderKind::DirectMp4 | ProviderKind::Hls | ProviderKind::Unknown => return None,
        };
        Some(target)
    }

    /// Target for an id the caller already knows.
    fn from_id(kind: ProviderKind, id: &'a str, url: &'a Url) -> Option<Self> {
        let target = match kind {
            ProviderKind::YouTube => Self::YouTube(id),
            ProviderKind::Vimeo => Self::Vimeo(url),
            ProviderKind::Twitch if id.bytes().all(|b| b.is_ascii_digit()) => {
                Self::Twitch(TwitchTarget::Video(id.to_owned()))
            }
            ProviderKind::Twitch => Self::Twitch(TwitchTarget::Clip(id.to_owned())),
            ProviderKind::Dailymotion => Self::Dailymotion(id),
            ProviderKind::SoundCloud => Self::SoundCloud(id),
            ProviderKind::DirectMp4 | ProviderKind::Hls | ProviderKind::Unknown => return None,
        };
        Some(target)
    }
}

/// Which container readers already ran for a URL.
#[derive(Debug, Default, Clone, Copy)]
struct Attempted {
    mp4: bool,
    hls: bool,
}

/// Resolves video locators to durations.
///
/// Cheap to clone; clones share the fetcher and the Twitch token cache.
#[derive(Clone)]
pub struct Resolver {
    fetcher: Arc<dyn Fetcher>,
    config: Arc<ResolverConfig>,
    twitch: Option<Arc<dyn TwitchCredentials>>,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("mp4_range_bytes", &self.config.mp4_range_bytes)
            .field("youtube", &self.config.youtube_api_key.is_some())
            .field("twitch", &self.twitch.is_some())
            .finish_non_exhaustive()
    }
}

impl Resolver {
    pub fn new(fetcher: Arc<dyn Fetcher>, config: ResolverConfig) -> Self {
        Self {
            fetcher,
            config: Arc::new(config),
            twitch: None,
        }
    }

    /// Build the reqwest-backed fetcher and Twitch credentials described by `config`.
    ///
    /// A pre-issued access token takes precedence over a client secret.
    pub fn from_config(config: ResolverConfig) -> Result<Self, DurationError> {
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::from_config(&config)?);

        let twitch: Option<Arc<dyn TwitchCredentials>> = match (
            &config.twitch_access_token,
            &config.twitch_client_id,
            &config.twitch_client_secret,
        ) {
            (Some(token), client_id, _) => {
                Some(Arc::new(StaticToken::new(token.clone(), client_id.clone())))
            }
            (None, Some(client_id), Some(secret)) => Some(Arc::new(ClientCredentials::new(
                client_id.clone(),
                secret.clone(),
                fetcher.clone(),
            )?)),
            _ => None,
        };

        info!(
            youtube = config.youtube_api_key.is_some(),
            twitch = twitch.is_some(),
            "Resolver configured"
        );

        let mut resolver = Self::new(fetcher, config);
        resolver.twitch = twitch;
        Ok(resolver)
    }

    pub fn with_twitch_credentials(mut self, credentials: Arc<dyn TwitchCredentials>) -> Self {
        self.twitch = Some(credentials);
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve a locator, honouring an explicit provider and id when present.
    #[instrument(skip_all, fields(locator = %locator))]
    pub async fn resolve(&self, locator: &VideoLocator) -> Result<Resolution, DurationError> {
        if let Some((kind, id)) = locator.explicit()
            && let Some(target) = PlatformTarget::from_id(kind, id, locator.url())
        {
            return self.fetch_platform(target).await;
        }
        self.resolve_chain(locator.url()).await
    }

    /// Parse an absolute URL and resolve it.
    pub async fn resolve_url(&self, input: &str) -> Result<Resolution, DurationError> {
        let locator = VideoLocator::parse(input)?;
        self.resolve(&locator).await
    }

    /// Resolve a platform id. Unknown provider names are `Indeterminate`.
    pub async fn resolve_by_id(&self, provider: &str, id: &str) -> Result<Resolution, DurationError> {
        let Some(kind) = ProviderKind::from_key(provider) else {
            debug!(provider, "Unrecognized provider");
            return Ok(Resolution::Indeterminate);
        };
        let locator = VideoLocator::for_provider(kind, id)?;
        self.resolve(&locator).await
    }

    /// Resolve `input` with a caller-chosen strategy, skipping the chain.
    ///
    /// Unlike the chain, a URL the platform extractor rejects is a `UrlParse`
    /// failure here.
    #[instrument(skip(self))]
    pub async fn resolve_with_provider(
        &self,
        kind: ProviderKind,
        input: &str,
    ) -> Result<Resolution, DurationError> {
        let locator = VideoLocator::parse(input)?;
        let url = locator.url();
        match kind {
            ProviderKind::DirectMp4 => self.mp4(url).await,
            ProviderKind::Hls => hls::aggregate_playlist(self.fetcher.as_ref(), url).await,
            ProviderKind::Unknown => self.probe(url, Attempted::default()).await,
            platform => match PlatformTarget::from_url(platform, url) {
                Some(target) => self.fetch_platform(target?).await,
                None => Ok(Resolution::Indeterminate),
            },
        }
    }

    async fn resolve_chain(&self, url: &Url) -> Result<Resolution, DurationError> {
        let mut attempted = Attempted::default();
        let path = url.path().to_ascii_lowercase();

        if path.ends_with(".mp4") {
            debug!("Path names an MP4 file");
            attempted.mp4 = true;
            let result = self.mp4(url).await?;
            if !result.is_indeterminate() {
                return Ok(result);
            }
        } else if path.ends_with(".m3u8") {
            debug!("Path names an HLS playlist");
            attempted.hls = true;
            let result = hls::aggregate_playlist(self.fetcher.as_ref(), url).await?;
            if !result.is_indeterminate() {
                return Ok(result);
            }
        }

        if let Some(kind) = providers::provider_for_host(url) {
            debug!(provider = %kind, "Host matches platform");
            match PlatformTarget::from_url(kind, url) {
                Some(Ok(target)) => {
                    let result = self.fetch_platform(target).await?;
                    if !result.is_indeterminate() {
                        return Ok(result);
                    }
                }
                Some(Err(e)) if e.kind() == ErrorKind::UrlParse => {
                    debug!(provider = %kind, error = %e, "URL not recognized by platform extractor");
                }
                Some(Err(e)) => return Err(e),
                None => {}
            }
        }

        self.probe(url, attempted).await
    }

    /// `HEAD` the URL and pick a container reader from its content type.
    async fn probe(&self, url: &Url, attempted: Attempted) -> Result<Resolution, DurationError> {
        let response = self.fetcher.fetch(FetchRequest::head(url.clone())).await?;
        check_status("http", url.as_str(), response.status)?;

        let content_type = response.content_type();
        debug!(content_type = content_type.as_deref(), "Probed content type");

        match content_type.as_deref() {
            Some(ct) if HLS_MEDIA_TYPES.contains(&ct) && !attempted.hls => {
                hls::aggregate_playlist(self.fetcher.as_ref(), url).await
            }
            Some(MP4_MEDIA_TYPE) if !attempted.mp4 => self.mp4(url).await,
            _ => Ok(Resolution::Indeterminate),
        }
    }

    async fn mp4(&self, url: &Url) -> Result<Resolution, DurationError> {
        mp4::fetch_mp4_duration(self.fetcher.as_ref(), url, self.config.mp4_range_bytes).await
    }

    async fn fetch_platform(&self, target: PlatformTarget<'_>) -> Result<Resolution, DurationError> {
        let fetcher = self.fetcher.as_ref();
        match target {
            PlatformTarget::YouTube(id) => {
                youtube::fetch_duration(fetcher, self.config.youtube_api_key.as_deref(), id).await
            }
            PlatformTarget::Vimeo(url) => vimeo::fetch_duration(fetcher, url).await,
            PlatformTarget::Twitch(target) => {
                twitch::fetch_duration(fetcher, self.twitch.as_deref(), &target).await
            }
            PlatformTarget::Dailymotion(id) => dailymotion::fetch_duration(fetcher, id).await,
            PlatformTarget::SoundCloud(id) => soundcloud::fetch_duration(fetcher, id).await,
        }
    }
}
