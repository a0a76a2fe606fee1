use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::DurationError;

static ISO8601_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^P(?:(\d+)W)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+(?:\.\d+)?)S)?)?$",
    )
    .unwrap()
});

static TWITCH_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(\d+)h)?(?:(\d+)m)?(?:(\d+(?:\.\d+)?)s)?$").unwrap()
});

#[inline]
pub fn capture_group_1<'a>(re: &Regex, input: &'a str) -> Option<&'a str> {
    re.captures(input)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

#[inline]
pub fn capture_group_1_or_url_parse<'a>(
    re: &Regex,
    input: &'a str,
    provider: &str,
) -> Result<&'a str, DurationError> {
    capture_group_1(re, input).ok_or_else(|| {
        DurationError::url_parse(input, format!("not a recognizable {provider} URL"))
    })
}

/// Next line of `reader` without its terminator, decoding invalid UTF-8
/// lossily. `None` at end of input.
pub async fn next_line_lossy<R>(
    reader: &mut R,
    buf: &mut Vec<u8>,
) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(&buf[..]);
    Ok(Some(line.trim_end_matches(['\n', '\r']).to_owned()))
}

/// Seconds from an API field, rejecting negative and non-finite values.
pub fn duration_from_secs(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs).ok()
}

fn group_f64(caps: &regex::Captures<'_>, index: usize) -> f64 {
    caps.get(index)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Parse an ISO-8601 duration such as `PT7M4S` or `P1DT2H`.
///
/// Years and months are not accepted; video platforms never emit them.
pub fn parse_iso8601_duration(input: &str) -> Option<Duration> {
    let input = input.trim();
    if input == "P" || input.ends_with('T') {
        return None;
    }
    let caps = ISO8601_DURATION.captures(input)?;
    let secs = group_f64(&caps, 1) * 604_800.0
        + group_f64(&caps, 2) * 86_400.0
        + group_f64(&caps, 3) * 3_600.0
        + group_f64(&caps, 4) * 60.0
        + group_f64(&caps, 5);
    duration_from_secs(secs)
}

/// Parse Twitch's `3h8m33s` style duration.
pub fn parse_twitch_duration(input: &str) -> Option<Duration> {
    let input = input.trim().to_ascii_lowercase();
    if input.is_empty() {
        return None;
    }
    let caps = TWITCH_DURATION.captures(&input)?;
    let secs = group_f64(&caps, 1) * 3_600.0 + group_f64(&caps, 2) * 60.0 + group_f64(&caps, 3);
    duration_from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso8601() {
        assert_eq!(
            parse_iso8601_duration("PT7M4S"),
            Some(Duration::from_secs(424))
        );
        assert_eq!(
            parse_iso8601_duration("P1DT1H"),
            Some(Duration::from_secs(90_000))
        );
        assert_eq!(parse_iso8601_duration("PT4M40.5S"), Some(Duration::from_millis(280_500)));
        assert_eq!(parse_iso8601_duration("P0D"), Some(Duration::ZERO));
    }

    #[test]
    fn test_iso8601_rejects_garbage() {
        assert!(parse_iso8601_duration("").is_none());
        assert!(parse_iso8601_duration("P").is_none());
        assert!(parse_iso8601_duration("PT").is_none());
        assert!(parse_iso8601_duration("7M4S").is_none());
        assert!(parse_iso8601_duration("P1Y").is_none());
    }

    #[test]
    fn test_twitch_duration() {
        assert_eq!(
            parse_twitch_duration("3h9m31s"),
            Some(Duration::from_secs(11_371))
        );
        assert_eq!(parse_twitch_duration("45s"), Some(Duration::from_secs(45)));
        assert_eq!(parse_twitch_duration("2M"), Some(Duration::from_secs(120)));
        assert!(parse_twitch_duration("").is_none());
        assert!(parse_twitch_duration("abc").is_none());
    }

    #[tokio::test]
    async fn test_next_line_lossy() {
        let mut reader: &[u8] = b"a\r\nb\xffc\nlast";
        let mut buf = Vec::new();
        let mut lines = Vec::new();
        while let Some(line) = next_line_lossy(&mut reader, &mut buf).await.unwrap() {
            lines.push(line);
        }
        assert_eq!(lines, vec!["a", "b\u{fffd}c", "last"]);
    }

    #[test]
    fn test_duration_from_secs() {
        assert_eq!(duration_from_secs(1.5), Some(Duration::from_millis(1500)));
        assert!(duration_from_secs(-1.0).is_none());
        assert!(duration_from_secs(f64::NAN).is_none());
    }
}
