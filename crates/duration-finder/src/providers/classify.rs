//! Shared response classification for provider APIs and container fetches.

use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::DurationError;
use crate::fetcher::FetchResponse;

/// YouTube `errors[].reason` values that mean "slow down".
const RATE_LIMIT_REASONS: &[&str] = &["quotaExceeded", "rateLimitExceeded", "userRateLimitExceeded"];

/// Map a status to the failure it implies, before any body is read.
pub(crate) fn check_status(
    provider: &'static str,
    resource: &str,
    status: StatusCode,
) -> Result<(), DurationError> {
    match status {
        StatusCode::NOT_FOUND => Err(DurationError::not_found(resource)),
        StatusCode::TOO_MANY_REQUESTS => Err(DurationError::too_many_requests(
            provider,
            "HTTP 429 Too Many Requests",
        )),
        s if s.is_success() => Ok(()),
        s => Err(DurationError::provider_status(
            provider,
            s,
            format!("unexpected HTTP status {s}"),
        )),
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
    status: Option<u16>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Detailed {
        code: Option<u16>,
        message: Option<String>,
        #[serde(rename = "type")]
        kind: Option<String>,
        #[serde(default)]
        errors: Vec<ErrorItem>,
    },
    Text(String),
}

#[derive(Debug, Deserialize)]
struct ErrorItem {
    reason: Option<String>,
}

/// Error object found in a provider response body.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct ApiError {
    pub code: Option<u16>,
    pub message: Option<String>,
    pub reasons: Vec<String>,
}

impl ApiError {
    /// Recognises the YouTube/Dailymotion `{"error": {...}}` shape and the
    /// Twitch `{"error": "...", "status": n, "message": "..."}` shape.
    pub fn parse(body: &str) -> Option<Self> {
        let envelope: ErrorEnvelope = serde_json::from_str(body).ok()?;
        match envelope.error {
            Some(ErrorBody::Detailed {
                code,
                message,
                kind,
                errors,
            }) => Some(Self {
                code,
                message,
                reasons: kind
                    .into_iter()
                    .chain(errors.into_iter().filter_map(|e| e.reason))
                    .collect(),
            }),
            Some(ErrorBody::Text(text)) => Some(Self {
                code: envelope.status,
                message: envelope.message.or(Some(text)),
                reasons: Vec::new(),
            }),
            None => envelope.status.filter(|s| *s >= 400).map(|code| Self {
                code: Some(code),
                message: envelope.message,
                reasons: Vec::new(),
            }),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.code == Some(429)
            || self.reasons.iter().any(|reason| {
                RATE_LIMIT_REASONS.contains(&reason.as_str()) || reason.contains("rate_limit")
            })
    }

    fn into_error(self, provider: &'static str, resource: &str, status: StatusCode) -> DurationError {
        let reason = self
            .message
            .clone()
            .unwrap_or_else(|| format!("error payload with HTTP status {status}"));

        if self.is_rate_limited() {
            DurationError::too_many_requests(provider, reason)
        } else if self.code == Some(404) {
            DurationError::not_found(resource)
        } else {
            DurationError::provider_status(provider, status, reason)
        }
    }
}

/// Read a provider API body, turning statuses and error payloads into failures.
pub(crate) async fn read_body(
    provider: &'static str,
    resource: &str,
    response: FetchResponse,
) -> Result<String, DurationError> {
    let status = response.status;
    if matches!(status, StatusCode::NOT_FOUND | StatusCode::TOO_MANY_REQUESTS) {
        check_status(provider, resource, status)?;
    }

    let body = response.text().await?;
    if let Some(error) = ApiError::parse(&body) {
        debug!(provider, %status, ?error, "Provider returned an error payload");
        return Err(error.into_error(provider, resource, status));
    }
    check_status(provider, resource, status)?;
    Ok(body)
}

pub(crate) fn parse_json<T: DeserializeOwned>(
    provider: &'static str,
    body: &str,
) -> Result<T, DurationError> {
    serde_json::from_str(body)
        .map_err(|e| DurationError::provider(provider, format!("unparsable response: {e}")))
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderMap;

    use super::*;
    use crate::ErrorKind;

    fn response(status: u16, body: &str) -> FetchResponse {
        FetchResponse::from_bytes(
            StatusCode::from_u16(status).unwrap(),
            HeaderMap::new(),
            body.to_owned(),
        )
    }

    #[test]
    fn test_check_status() {
        assert!(check_status("hls", "x", StatusCode::OK).is_ok());
        assert!(check_status("hls", "x", StatusCode::PARTIAL_CONTENT).is_ok());
        assert_eq!(
            check_status("hls", "x", StatusCode::NOT_FOUND).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            check_status("hls", "x", StatusCode::TOO_MANY_REQUESTS)
                .unwrap_err()
                .kind(),
            ErrorKind::TooManyRequests
        );
        assert_eq!(
            check_status("hls", "x", StatusCode::BAD_GATEWAY).unwrap_err().kind(),
            ErrorKind::ProviderError
        );
    }

    #[test]
    fn test_parse_youtube_quota_payload() {
        let body = r#"{"error":{"code":403,"message":"The request cannot be completed because you have exceeded your quota.","errors":[{"domain":"youtube.quota","reason":"quotaExceeded"}]}}"#;
        let error = ApiError::parse(body).unwrap();
        assert_eq!(error.code, Some(403));
        assert!(error.is_rate_limited());
    }

    #[test]
    fn test_parse_twitch_payload() {
        let body = r#"{"error":"Unauthorized","status":401,"message":"Invalid OAuth token"}"#;
        let error = ApiError::parse(body).unwrap();
        assert_eq!(error.code, Some(401));
        assert_eq!(error.message.as_deref(), Some("Invalid OAuth token"));
        assert!(!error.is_rate_limited());
    }

    #[test]
    fn test_success_bodies_are_not_errors() {
        assert!(ApiError::parse(r#"{"duration":42}"#).is_none());
        assert!(ApiError::parse("<html></html>").is_none());
        assert!(ApiError::parse(r#"{"data":[],"status":200}"#).is_none());
    }

    #[tokio::test]
    async fn test_rate_limit_in_ok_body() {
        let body = r#"{"error":{"code":429,"message":"Rate limit exceeded","type":"rate_limit_exceeded"}}"#;
        let err = read_body("dailymotion", "video x", response(200, body))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TooManyRequests);
    }

    #[tokio::test]
    async fn test_error_message_becomes_detail() {
        let body = r#"{"error":{"code":400,"message":"API key not valid","errors":[{"reason":"badRequest"}]}}"#;
        let err = read_body("youtube", "video x", response(400, body))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderError);
        assert!(err.to_string().contains("API key not valid"));
    }

    #[tokio::test]
    async fn test_plain_server_error() {
        let err = read_body("vimeo", "video x", response(503, "Service Unavailable"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderError);
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_not_found_skips_body() {
        let err = read_body("vimeo", "video x", response(404, "{}"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_parse_json_failure() {
        let err = parse_json::<serde_json::Value>("youtube", "not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderError);
    }
}
