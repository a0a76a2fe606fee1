use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use crate::error::DurationError;
use crate::fetcher::{FetchRequest, Fetcher};
use crate::locator::Resolution;
use crate::providers::classify::{parse_json, read_body};
use crate::utils::{capture_group_1_or_url_parse, parse_iso8601_duration, parse_twitch_duration};

const PROVIDER: &str = "youtube";
const API_URL: &str = "https://www.googleapis.com/youtube/v3/videos";

/// Placeholder that sits where an id would in playlist embeds.
const PLAYLIST_EMBED: &str = "videoseries";

pub static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:https?://)?(?:[\w-]+\.)*(?:youtube(?:-nocookie)?\.com/(?:.*?[?&](?:v|vi)=|(?:.*?/)?(?:v|vi|videos|embed|shorts|live)/)|youtu\.be/)([\w-]{11})",
    )
    .unwrap()
});

static VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\w-]{11}$").unwrap());

/// Extract the 11-character video id from any YouTube URL form.
pub fn extract_id(url: &str) -> Result<&str, DurationError> {
    let id = capture_group_1_or_url_parse(&URL_REGEX, url, PROVIDER)?;
    if id.eq_ignore_ascii_case(PLAYLIST_EMBED) {
        return Err(DurationError::url_parse(url, "playlist embed has no video id"));
    }
    Ok(id)
}

/// Id plus the playback options carried in a YouTube URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YouTubeUrlInfo {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<u64>,
    pub autoplay: bool,
}

fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Seconds from `90`, `90s` or `1h2m3s`.
fn parse_timestamp(value: &str) -> Option<u64> {
    value
        .parse::<u64>()
        .ok()
        .or_else(|| parse_twitch_duration(value).map(|d| d.as_secs()))
}

/// Break a `youtube.com` or `youtu.be` URL into id, start/end offsets and autoplay.
pub fn parse_url_info(input: &str) -> Result<YouTubeUrlInfo, DurationError> {
    let url = Url::parse(input.trim()).map_err(|e| DurationError::url_parse(input, e.to_string()))?;
    let host = url.host_str().unwrap_or_default();

    let (id, start, end, autoplay) = if host.ends_with("youtu.be") {
        let id = url
            .path_segments()
            .and_then(|mut segments| segments.next())
            .map(str::to_owned);
        let start = query_param(&url, "t").as_deref().and_then(parse_timestamp);
        (id, start, None, false)
    } else if host.ends_with("youtube.com") || host.ends_with("youtube-nocookie.com") {
        let id = query_param(&url, "v").or_else(|| {
            let mut segments = url.path_segments()?;
            match segments.next()? {
                "embed" | "shorts" | "live" | "v" => segments.next().map(str::to_owned),
                _ => None,
            }
        });
        let start = query_param(&url, "start")
            .or_else(|| query_param(&url, "t"))
            .as_deref()
            .and_then(parse_timestamp);
        let end = query_param(&url, "end").as_deref().and_then(parse_timestamp);
        let autoplay = query_param(&url, "autoplay").as_deref() == Some("1");
        (id, start, end, autoplay)
    } else {
        return Err(DurationError::url_parse(input, "not a YouTube URL"));
    };

    let id = id
        .filter(|id| VIDEO_ID.is_match(id) && !id.eq_ignore_ascii_case(PLAYLIST_EMBED))
        .ok_or_else(|| DurationError::url_parse(input, "no YouTube video id"))?;

    Ok(YouTubeUrlInfo {
        id,
        start,
        end,
        autoplay,
    })
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    content_details: ContentDetails,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    duration: String,
}

/// Ask the Data API v3 for `contentDetails.duration`.
///
/// Without an API key the platform is not asked at all.
#[instrument(skip(fetcher, api_key))]
pub async fn fetch_duration(
    fetcher: &dyn Fetcher,
    api_key: Option<&str>,
    id: &str,
) -> Result<Resolution, DurationError> {
    let Some(api_key) = api_key else {
        debug!("No YouTube API key configured; skipping lookup");
        return Ok(Resolution::Indeterminate);
    };

    let url = Url::parse_with_params(
        API_URL,
        &[("part", "contentDetails"), ("id", id), ("key", api_key)],
    )
    .map_err(|e| DurationError::url_parse(id, e.to_string()))?;

    let resource = format!("youtube video {id}");
    let response = fetcher.fetch(FetchRequest::get(url)).await?;
    let body = read_body(PROVIDER, &resource, response).await?;
    let list: VideoListResponse = parse_json(PROVIDER, &body)?;

    let item = list
        .items
        .into_iter()
        .next()
        .ok_or_else(|| DurationError::not_found(resource))?;
    let raw = item.content_details.duration;

    // Live broadcasts report a zero duration.
    if raw == "P0D" {
        debug!("Video is live; no fixed duration");
        return Ok(Resolution::Indeterminate);
    }

    parse_iso8601_duration(&raw)
        .map(Resolution::resolved)
        .ok_or_else(|| DurationError::provider(PROVIDER, format!("unparsable duration `{raw}`")))
}
