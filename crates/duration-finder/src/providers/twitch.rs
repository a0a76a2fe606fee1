use std::sync::LazyLock;

use regex::Regex;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderName};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use crate::credentials::TwitchCredentials;
use crate::error::DurationError;
use crate::fetcher::{FetchRequest, Fetcher};
use crate::locator::Resolution;
use crate::providers::classify::{parse_json, read_body};
use crate::utils::{duration_from_secs, parse_twitch_duration};

const PROVIDER: &str = "twitch";
const HELIX_BASE: &str = "https://api.twitch.tv/helix/";

static CLIENT_ID: HeaderName = HeaderName::from_static("client-id");

pub static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:https?://)?(?:(?:www|m|go)\.)?(?:clips\.twitch\.tv/(?:embed\?clip=)?([\w-]+)|twitch\.tv/videos/(\d+)|twitch\.tv/\w+/clip/([\w-]+)|twitch\.tv/(\w+))",
    )
    .unwrap()
});

/// What a Twitch URL points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TwitchTarget {
    /// Past broadcast or highlight, by numeric id.
    Video(String),
    /// Clip, by slug.
    Clip(String),
    /// Channel page; live, so it has no fixed duration.
    Channel(String),
}

impl TwitchTarget {
    pub fn id(&self) -> &str {
        match self {
            Self::Video(id) | Self::Clip(id) | Self::Channel(id) => id,
        }
    }
}

pub fn extract_id(url: &str) -> Result<TwitchTarget, DurationError> {
    let caps = URL_REGEX
        .captures(url)
        .ok_or_else(|| DurationError::url_parse(url, "not a recognizable twitch URL"))?;

    let group = |i: usize| caps.get(i).map(|m| m.as_str().to_owned());
    let target = if let Some(slug) = group(1).or_else(|| group(3)) {
        TwitchTarget::Clip(slug)
    } else if let Some(id) = group(2) {
        TwitchTarget::Video(id)
    } else if let Some(channel) = group(4) {
        TwitchTarget::Channel(channel)
    } else {
        return Err(DurationError::url_parse(url, "not a recognizable twitch URL"));
    };
    Ok(target)
}

#[derive(Debug, Deserialize)]
struct HelixResponse<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct HelixVideo {
    duration: String,
}

#[derive(Debug, Deserialize)]
struct HelixClip {
    duration: f64,
}

async fn helix_first<T: DeserializeOwned>(
    fetcher: &dyn Fetcher,
    credentials: &dyn TwitchCredentials,
    endpoint: &str,
    id: &str,
) -> Result<T, DurationError> {
    let mut url = Url::parse(HELIX_BASE)
        .and_then(|base| base.join(endpoint))
        .map_err(|e| DurationError::url_parse(endpoint, e.to_string()))?;
    url.query_pairs_mut().append_pair("id", id);

    let token = credentials.access_token().await?;
    let mut request =
        FetchRequest::get(url).with_header(AUTHORIZATION, format!("Bearer {token}"));
    if let Some(client_id) = credentials.client_id() {
        request = request.with_header(CLIENT_ID.clone(), client_id);
    }

    let response = fetcher.fetch(request).await?;
    if response.status == StatusCode::UNAUTHORIZED {
        credentials.invalidate().await;
    }

    let resource = format!("twitch {endpoint} {id}");
    let body = read_body(PROVIDER, &resource, response).await?;
    let list: HelixResponse<T> = parse_json(PROVIDER, &body)?;
    list.data
        .into_iter()
        .next()
        .ok_or_else(|| DurationError::not_found(resource))
}

/// Ask Helix for a video or clip duration.
///
/// Channels are live and resolve to `Indeterminate` without a request, as does
/// any target when no credentials are configured.
#[instrument(skip(fetcher, credentials))]
pub async fn fetch_duration(
    fetcher: &dyn Fetcher,
    credentials: Option<&dyn TwitchCredentials>,
    target: &TwitchTarget,
) -> Result<Resolution, DurationError> {
    if let TwitchTarget::Channel(channel) = target {
        debug!(channel, "Channel URL is live; no fixed duration");
        return Ok(Resolution::Indeterminate);
    }
    let Some(credentials) = credentials else {
        debug!("No Twitch credentials configured; skipping lookup");
        return Ok(Resolution::Indeterminate);
    };

    let duration = match target {
        TwitchTarget::Video(id) => {
            let video: HelixVideo = helix_first(fetcher, credentials, "videos", id).await?;
            parse_twitch_duration(&video.duration).ok_or_else(|| {
                DurationError::provider(
                    PROVIDER,
                    format!("unparsable duration `{}`", video.duration),
                )
            })?
        }
        TwitchTarget::Clip(slug) => {
            let clip: HelixClip = helix_first(fetcher, credentials, "clips", slug).await?;
            duration_from_secs(clip.duration).ok_or_else(|| {
                DurationError::provider(PROVIDER, format!("invalid duration {}", clip.duration))
            })?
        }
        TwitchTarget::Channel(_) => return Ok(Resolution::Indeterminate),
    };
    Ok(Resolution::resolved(duration))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::ErrorKind;
    use crate::credentials::StaticToken;
    use crate::test_support::MockFetcher;

    const VIDEOS: &str = "https://api.twitch.tv/helix/videos?id=335921245";
    const CLIPS: &str = "https://api.twitch.tv/helix/clips?id=AwkwardHelplessSalamanderSwiftRage";

    fn creds() -> StaticToken {
        StaticToken::new("token", Some("client".to_string()))
    }

    #[test]
    fn test_extract_targets() {
        assert_eq!(
            extract_id("https://www.twitch.tv/videos/335921245").unwrap(),
            TwitchTarget::Video("335921245".to_string())
        );
        assert_eq!(
            extract_id("https://clips.twitch.tv/AwkwardHelplessSalamanderSwiftRage").unwrap(),
            TwitchTarget::Clip("AwkwardHelplessSalamanderSwiftRage".to_string())
        );
        assert_eq!(
            extract_id("https://clips.twitch.tv/embed?clip=Slug-abc123").unwrap(),
            TwitchTarget::Clip("Slug-abc123".to_string())
        );
        assert_eq!(
            extract_id("https://www.twitch.tv/shroud/clip/Slug-abc123?filter=clips").unwrap(),
            TwitchTarget::Clip("Slug-abc123".to_string())
        );
        assert_eq!(
            extract_id("https://m.twitch.tv/shroud").unwrap(),
            TwitchTarget::Channel("shroud".to_string())
        );
        assert!(extract_id("https://www.example.com/videos/1").is_err());
    }

    #[tokio::test]
    async fn test_video_duration() {
        let fetcher = MockFetcher::new().with_body(
            "GET",
            VIDEOS,
            200,
            "application/json",
            r#"{"data":[{"id":"335921245","duration":"3h8m33s","type":"upload"}],"pagination":{}}"#,
        );
        let target = TwitchTarget::Video("335921245".to_string());
        let result = fetch_duration(&fetcher, Some(&creds()), &target).await.unwrap();
        assert_eq!(result.duration(), Some(Duration::from_secs(11_313)));

        let requests = fetcher.requests();
        let request = &requests[0];
        assert_eq!(request.headers["authorization"], "Bearer token");
        assert_eq!(request.headers["client-id"], "client");
    }

    #[tokio::test]
    async fn test_clip_duration() {
        let fetcher = MockFetcher::new().with_body(
            "GET",
            CLIPS,
            200,
            "application/json",
            r#"{"data":[{"id":"AwkwardHelplessSalamanderSwiftRage","duration":29.5}]}"#,
        );
        let target = TwitchTarget::Clip("AwkwardHelplessSalamanderSwiftRage".to_string());
        let result = fetch_duration(&fetcher, Some(&creds()), &target).await.unwrap();
        assert_eq!(result.duration(), Some(Duration::from_millis(29_500)));
    }

    #[tokio::test]
    async fn test_empty_data_is_not_found() {
        let fetcher = MockFetcher::new().with_body("GET", VIDEOS, 200, "application/json", r#"{"data":[]}"#);
        let target = TwitchTarget::Video("335921245".to_string());
        let err = fetch_duration(&fetcher, Some(&creds()), &target).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let fetcher = MockFetcher::new().with_body(
            "GET",
            VIDEOS,
            429,
            "application/json",
            r#"{"error":"Too Many Requests","status":429,"message":"Request limit exceeded"}"#,
        );
        let target = TwitchTarget::Video("335921245".to_string());
        let err = fetch_duration(&fetcher, Some(&creds()), &target).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TooManyRequests);
    }

    #[tokio::test]
    async fn test_indeterminate_without_request() {
        let fetcher = MockFetcher::new();
        let video = TwitchTarget::Video("335921245".to_string());
        assert_eq!(
            fetch_duration(&fetcher, None, &video).await.unwrap(),
            Resolution::Indeterminate
        );
        let channel = TwitchTarget::Channel("shroud".to_string());
        assert_eq!(
            fetch_duration(&fetcher, Some(&creds()), &channel).await.unwrap(),
            Resolution::Indeterminate
        );
        assert!(fetcher.requests().is_empty());
    }
}
