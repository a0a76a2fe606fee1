//! Hosting-platform strategies.
//!
//! Each platform module exposes a `URL_REGEX`, an `extract_id` function and an
//! async adapter that asks the platform API (or page) for the duration.

pub mod classify;
pub mod dailymotion;
pub mod soundcloud;
pub mod twitch;
pub mod vimeo;
pub mod youtube;

use url::Url;

use crate::error::DurationError;
use crate::locator::ProviderKind;

/// Host suffixes routed to a platform. Matching is a plain suffix test on
/// `host[:port]`, so `notvimeo.com` routes to Vimeo as well.
pub const HOST_SUFFIXES: &[(&str, ProviderKind)] = &[
    ("vimeo.com", ProviderKind::Vimeo),
    ("youtube.com", ProviderKind::YouTube),
    ("youtu.be", ProviderKind::YouTube),
    ("dailymotion.com", ProviderKind::Dailymotion),
    ("dai.ly", ProviderKind::Dailymotion),
    ("twitch.tv", ProviderKind::Twitch),
    ("soundcloud.com", ProviderKind::SoundCloud),
];

fn authority(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    })
}

/// Platform owning `url`'s host, if any.
pub fn provider_for_host(url: &Url) -> Option<ProviderKind> {
    let authority = authority(url)?;
    HOST_SUFFIXES
        .iter()
        .find(|(suffix, _)| authority.ends_with(suffix))
        .map(|(_, kind)| *kind)
}

/// Public page URL for a platform id.
pub fn canonical_url(provider: ProviderKind, id: &str) -> Result<Url, DurationError> {
    let raw = match provider {
        ProviderKind::YouTube => {
            return Url::parse_with_params("https://www.youtube.com/watch", &[("v", id)])
                .map_err(|e| DurationError::url_parse(id, e.to_string()));
        }
        ProviderKind::Vimeo => format!("https://vimeo.com/{id}"),
        ProviderKind::Dailymotion => format!(
            "https://www.dailymotion.com/video/{}",
            urlencoding::encode(id)
        ),
        ProviderKind::Twitch => format!("https://www.twitch.tv/videos/{}", urlencoding::encode(id)),
        ProviderKind::SoundCloud => format!("https://soundcloud.com/{id}"),
        ProviderKind::DirectMp4 | ProviderKind::Hls | ProviderKind::Unknown => {
            return Err(DurationError::url_parse(
                id,
                format!("{provider} has no id-based URL"),
            ));
        }
    };
    Url::parse(&raw).map_err(|e| DurationError::url_parse(id, e.to_string()))
}
