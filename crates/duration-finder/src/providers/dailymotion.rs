use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use crate::error::DurationError;
use crate::fetcher::{FetchRequest, Fetcher};
use crate::locator::Resolution;
use crate::providers::classify::{parse_json, read_body};
use crate::utils::{capture_group_1_or_url_parse, duration_from_secs};

const PROVIDER: &str = "dailymotion";
const API_BASE: &str = "https://api.dailymotion.com/video/";

pub static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:/video|dai\.ly)/([a-z0-9]+)").unwrap());

/// Video id from `dailymotion.com/video/<id>` or `dai.ly/<id>`.
pub fn extract_id(url: &str) -> Result<&str, DurationError> {
    capture_group_1_or_url_parse(&URL_REGEX, url, PROVIDER)
}

#[derive(Debug, Deserialize)]
struct VideoResponse {
    duration: Option<f64>,
}

#[instrument(skip(fetcher))]
pub async fn fetch_duration(fetcher: &dyn Fetcher, id: &str) -> Result<Resolution, DurationError> {
    let raw = format!("{API_BASE}{}?fields=duration", urlencoding::encode(id));
    let url = Url::parse(&raw).map_err(|e| DurationError::url_parse(id, e.to_string()))?;

    let resource = format!("dailymotion video {id}");
    let response = fetcher.fetch(FetchRequest::get(url)).await?;
    let body = read_body(PROVIDER, &resource, response).await?;
    let video: VideoResponse = parse_json(PROVIDER, &body)?;

    match video.duration {
        Some(secs) => duration_from_secs(secs)
            .map(Resolution::resolved)
            .ok_or_else(|| DurationError::provider(PROVIDER, format!("invalid duration {secs}"))),
        None => {
            debug!("Response has no duration");
            Ok(Resolution::Indeterminate)
        }
    }
}
