//! SoundCloud has no keyless API for track metadata; the public page carries an
//! ISO-8601 `itemprop="duration"` meta tag that is read instead.

use std::sync::LazyLock;

use regex::Regex;
use tokio::io::BufReader;
use tracing::{debug, instrument};

use crate::error::DurationError;
use crate::fetcher::{FetchRequest, Fetcher};
use crate::locator::{ProviderKind, Resolution};
use crate::providers::canonical_url;
use crate::providers::classify::check_status;
use crate::utils::{
    capture_group_1, capture_group_1_or_url_parse, next_line_lossy, parse_iso8601_duration,
};

const PROVIDER: &str = "soundcloud";

pub static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)soundcloud\.com/([\w-]+/(?:sets/)?[\w-]+)").unwrap());

static DURATION_META: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta\s+itemprop=["']duration["']\s+content=["'](P[0-9A-Z.]+)["']"#)
        .unwrap()
});

/// `<user>/<track>` or `<user>/sets/<playlist>`.
pub fn extract_id(url: &str) -> Result<&str, DurationError> {
    capture_group_1_or_url_parse(&URL_REGEX, url, PROVIDER)
}

/// Scan the track page for its duration meta tag, stopping at the first hit.
#[instrument(skip(fetcher))]
pub async fn fetch_duration(fetcher: &dyn Fetcher, id: &str) -> Result<Resolution, DurationError> {
    let url = canonical_url(ProviderKind::SoundCloud, id)?;
    let response = fetcher.fetch(FetchRequest::get(url.clone())).await?;
    check_status(PROVIDER, url.as_str(), response.status)?;

    let mut reader = BufReader::new(response.reader());
    let mut buf = Vec::new();
    while let Some(line) = next_line_lossy(&mut reader, &mut buf).await? {
        if let Some(raw) = capture_group_1(&DURATION_META, &line) {
            debug!(duration = raw, "Found duration meta tag");
            return parse_iso8601_duration(raw)
                .map(Resolution::resolved)
                .ok_or_else(|| {
                    DurationError::provider(PROVIDER, format!("unparsable duration `{raw}`"))
                });
        }
    }

    debug!("Page has no duration meta tag");
    Ok(Resolution::Indeterminate)
}
