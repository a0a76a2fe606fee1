//! Movie-header (`mvhd`) duration scanning.
//!
//! Instead of walking the ISOBMFF box tree this looks for the `mvhd` fourcc in
//! a forward-only byte stream and decodes the fields that follow it:
//!
//! ```text
//! "mvhd" | version+flags (4) | creation (4) | modification (4) | timescale (4) | duration (4)
//! ```
//!
//! Only a short prefix of the file is normally available, so a missing
//! signature is `Indeterminate`, not an error. A byte run equal to `mvhd` inside
//! an unrelated box would be taken as the header; the prefix scan accepts that.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, instrument};
use url::Url;

use crate::error::DurationError;
use crate::fetcher::{ByteRange, FetchRequest, Fetcher};
use crate::locator::Resolution;
use crate::providers::classify::check_status;

const MVHD: u32 = u32::from_be_bytes(*b"mvhd");
/// version/flags + creation time + modification time.
const SKIPPED_BYTES: usize = 12;
const FIELD_BYTES: usize = SKIPPED_BYTES + 8;

#[derive(Debug, Clone)]
enum State {
    Searching { window: u32, seen: usize },
    Reading { fields: [u8; FIELD_BYTES], filled: usize },
    Done,
}

/// Incremental `mvhd` matcher that keeps only the last four bytes seen.
#[derive(Debug, Clone)]
pub struct MvhdScanner {
    state: State,
    consumed: u64,
}

impl Default for MvhdScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl MvhdScanner {
    pub fn new() -> Self {
        Self {
            state: State::Searching { window: 0, seen: 0 },
            consumed: 0,
        }
    }

    /// Bytes fed so far.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Feed the next chunk. Returns `Some` once the header has been decoded;
    /// further input is ignored after that.
    pub fn feed(&mut self, chunk: &[u8]) -> Option<Result<Duration, DurationError>> {
        for &byte in chunk {
            self.consumed += 1;
            match &mut self.state {
                State::Searching { window, seen } => {
                    *window = (*window << 8) | u32::from(byte);
                    *seen += 1;
                    if *seen >= 4 && *window == MVHD {
                        debug!(offset = self.consumed - 4, "Found mvhd signature");
                        self.state = State::Reading {
                            fields: [0; FIELD_BYTES],
                            filled: 0,
                        };
                    }
                }
                State::Reading { fields, filled } => {
                    fields[*filled] = byte;
                    *filled += 1;
                    if *filled == FIELD_BYTES {
                        let result = decode_fields(fields);
                        self.state = State::Done;
                        return Some(result);
                    }
                }
                State::Done => return None,
            }
        }
        None
    }
}

fn decode_fields(fields: &[u8; FIELD_BYTES]) -> Result<Duration, DurationError> {
    let read_u32 = |at: usize| {
        u32::from_be_bytes([fields[at], fields[at + 1], fields[at + 2], fields[at + 3]])
    };
    let timescale = read_u32(SKIPPED_BYTES);
    let duration = read_u32(SKIPPED_BYTES + 4);

    if timescale == 0 {
        return Err(DurationError::malformed("mp4", "mvhd timescale is zero"));
    }

    debug!(timescale, duration, "Decoded mvhd");
    Ok(Duration::from_secs_f64(
        f64::from(duration) / f64::from(timescale),
    ))
}

/// Scan an in-memory buffer for the movie header.
pub fn scan_mp4_bytes(data: &[u8]) -> Result<Resolution, DurationError> {
    let mut scanner = MvhdScanner::new();
    match scanner.feed(data) {
        Some(result) => result.map(Resolution::resolved),
        None => Ok(Resolution::Indeterminate),
    }
}

/// Scan a forward-only reader until the movie header is decoded or the reader
/// is exhausted.
pub async fn scan_mp4<R>(mut reader: R) -> Result<Resolution, DurationError>
where
    R: AsyncRead + Unpin,
{
    let mut scanner = MvhdScanner::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            debug!(consumed = scanner.consumed(), "mvhd not found before end of stream");
            return Ok(Resolution::Indeterminate);
        }
        if let Some(result) = scanner.feed(&buf[..n]) {
            return result.map(Resolution::resolved);
        }
    }
}

/// Fetch the first `range_bytes` of `url` and scan them.
///
/// Servers that ignore the `Range` header are still read no further than
/// `range_bytes`.
#[instrument(skip(fetcher), fields(url = %url))]
pub async fn fetch_mp4_duration(
    fetcher: &dyn Fetcher,
    url: &Url,
    range_bytes: u64,
) -> Result<Resolution, DurationError> {
    if range_bytes == 0 {
        return Ok(Resolution::Indeterminate);
    }

    let request = FetchRequest::get(url.clone()).with_range(ByteRange::prefix(range_bytes));
    let response = fetcher.fetch(request).await?;

    if response.status == reqwest::StatusCode::RANGE_NOT_SATISFIABLE {
        debug!("Range not satisfiable; resource is empty");
        return Ok(Resolution::Indeterminate);
    }
    check_status("mp4", url.as_str(), response.status)?;

    scan_mp4(response.reader().take(range_bytes)).await
}
