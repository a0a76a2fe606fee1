//! HLS playlist duration aggregation.
//!
//! Only `#EXTINF` and `#EXT-X-ENDLIST` matter: the duration of a finished
//! (VOD) playlist is the sum of its segment durations, and a playlist without
//! an end marker is live and has no duration yet.

use tokio::io::{AsyncBufRead, BufReader};
use tracing::{debug, instrument};
use url::Url;

use crate::error::DurationError;
use crate::fetcher::{FetchRequest, Fetcher};
use crate::locator::Resolution;
use crate::providers::classify::check_status;
use crate::utils::{duration_from_secs, next_line_lossy};

const EXTINF: &str = "#EXTINF:";
const ENDLIST: &str = "#EXT-X-ENDLIST";

/// One media segment of a chunklist.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunklistEntry {
    pub seconds: f64,
}

impl ChunklistEntry {
    /// Parse an `#EXTINF:<seconds>[,<title>]` line; `None` for any other line.
    pub fn parse(line: &str) -> Option<Result<Self, DurationError>> {
        let value = line.strip_prefix(EXTINF)?;
        let raw = value.split(',').next().unwrap_or(value).trim();
        let entry = raw
            .parse::<f64>()
            .ok()
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(|seconds| Self { seconds })
            .ok_or_else(|| {
                DurationError::malformed("hls", format!("invalid segment duration `{raw}`"))
            });
        Some(entry)
    }
}

/// Sum the segments of a chunklist.
///
/// Stops at `#EXT-X-ENDLIST`; reaching the end of input first means the
/// playlist is live and yields `Indeterminate`. Lines are decoded lossily, so
/// stray non-UTF-8 bytes in segment titles do not fail the read.
pub async fn aggregate_chunklist<R>(mut reader: R) -> Result<Resolution, DurationError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let mut total = 0.0f64;
    let mut segments = 0usize;

    while let Some(line) = next_line_lossy(&mut reader, &mut buf).await? {
        let line = line.trim_end();
        if let Some(entry) = ChunklistEntry::parse(line) {
            total += entry?.seconds;
            segments += 1;
        } else if line == ENDLIST {
            debug!(segments, total, "Reached end of chunklist");
            return duration_from_secs(total)
                .map(Resolution::resolved)
                .ok_or_else(|| DurationError::malformed("hls", "segment durations overflow"));
        }
    }

    debug!(segments, "Chunklist has no end marker; treating as live");
    Ok(Resolution::Indeterminate)
}

/// Fetch and aggregate a chunklist.
#[instrument(skip(fetcher), fields(url = %url))]
pub async fn fetch_chunklist_duration(
    fetcher: &dyn Fetcher,
    url: &Url,
) -> Result<Resolution, DurationError> {
    let response = fetcher.fetch(FetchRequest::get(url.clone())).await?;
    check_status("hls", url.as_str(), response.status)?;
    aggregate_chunklist(BufReader::new(response.reader())).await
}

/// First non-comment line naming another playlist, resolved against `base`.
pub fn find_chunklist(manifest: &str, base: &Url) -> Option<Result<Url, DurationError>> {
    let line = manifest
        .lines()
        .map(str::trim)
        .find(|line| !line.starts_with('#') && line.ends_with(".m3u8"))?;

    Some(base.join(line).map_err(|e| {
        DurationError::malformed("hls", format!("invalid chunklist URI `{line}`: {e}"))
    }))
}

/// Resolve a master playlist (or a media playlist given directly).
///
/// The first chunklist listed wins; there is no variant selection.
#[instrument(skip(fetcher), fields(url = %url))]
pub async fn aggregate_playlist(
    fetcher: &dyn Fetcher,
    url: &Url,
) -> Result<Resolution, DurationError> {
    let response = fetcher.fetch(FetchRequest::get(url.clone())).await?;
    check_status("hls", url.as_str(), response.status)?;
    let manifest = response.text().await?;

    match find_chunklist(&manifest, url) {
        Some(chunklist) => {
            let chunklist = chunklist?;
            debug!(chunklist = %chunklist, "Following chunklist");
            fetch_chunklist_duration(fetcher, &chunklist).await
        }
        None if manifest.lines().any(|line| line.starts_with(EXTINF)) => {
            debug!("Manifest is a media playlist");
            aggregate_chunklist(manifest.as_bytes()).await
        }
        None => {
            debug!("Manifest lists no chunklist");
            Ok(Resolution::Indeterminate)
        }
    }
}
