use reqwest::StatusCode;

/// Caller-actionable classification of a failed resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// The URL does not match the pattern of the provider that was requested.
    UrlParse,
    /// The remote resource is confirmed absent.
    NotFound,
    /// An upstream rate or quota limit was hit.
    TooManyRequests,
    /// Any other upstream failure.
    ProviderError,
    /// MP4/HLS data that cannot yield a duration.
    MalformedContainer,
}

#[derive(Debug, thiserror::Error)]
pub enum DurationError {
    #[error("could not parse video URL `{input}`: {reason}")]
    UrlParse { input: String, reason: String },

    #[error("resource not found: {resource}")]
    NotFound { resource: String },

    #[error("too many requests to {provider}: {reason}")]
    TooManyRequests {
        provider: &'static str,
        reason: String,
    },

    #[error("{provider} error: {reason}")]
    Provider {
        provider: &'static str,
        status: Option<StatusCode>,
        reason: String,
    },

    #[error("malformed {container} data: {reason}")]
    MalformedContainer {
        container: &'static str,
        reason: String,
    },

    #[error("HTTP request failed: {source}")]
    Network { source: reqwest::Error },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

/// Request URLs can carry API keys in their query string, so they are
/// dropped before the error is surfaced.
impl From<reqwest::Error> for DurationError {
    fn from(source: reqwest::Error) -> Self {
        Self::Network {
            source: source.without_url(),
        }
    }
}

impl DurationError {
    pub fn url_parse(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UrlParse {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn too_many_requests(provider: &'static str, reason: impl Into<String>) -> Self {
        Self::TooManyRequests {
            provider,
            reason: reason.into(),
        }
    }

    pub fn provider(provider: &'static str, reason: impl Into<String>) -> Self {
        Self::Provider {
            provider,
            status: None,
            reason: reason.into(),
        }
    }

    pub fn provider_status(
        provider: &'static str,
        status: StatusCode,
        reason: impl Into<String>,
    ) -> Self {
        Self::Provider {
            provider,
            status: Some(status),
            reason: reason.into(),
        }
    }

    pub fn malformed(container: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedContainer {
            container,
            reason: reason.into(),
        }
    }

    /// Collapse transport-specific variants into the five public kinds.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UrlParse { .. } => ErrorKind::UrlParse,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::TooManyRequests { .. } => ErrorKind::TooManyRequests,
            Self::MalformedContainer { .. } => ErrorKind::MalformedContainer,
            Self::Provider { .. } | Self::Network { .. } | Self::Io { .. } => {
                ErrorKind::ProviderError
            }
        }
    }

    /// Whether a caller-driven retry (with backoff) could succeed.
    ///
    /// Nothing in this crate retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::UrlParse { .. } | Self::NotFound { .. } | Self::MalformedContainer { .. } => {
                false
            }
            Self::TooManyRequests { .. } | Self::Network { .. } | Self::Io { .. } => true,
            Self::Provider { status, .. } => status.is_none_or(|s| s.is_server_error()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_errors_classify_as_provider_error() {
        let io = DurationError::from(std::io::Error::other("connection reset"));
        assert_eq!(io.kind(), ErrorKind::ProviderError);
        assert!(io.is_retryable());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ErrorKind::TooManyRequests.to_string(), "too_many_requests");
        assert_eq!(
            DurationError::malformed("mp4", "zero timescale").kind(),
            ErrorKind::MalformedContainer
        );
    }

    #[test]
    fn test_client_status_is_not_retryable() {
        let err = DurationError::provider_status("vimeo", StatusCode::FORBIDDEN, "private");
        assert!(!err.is_retryable());
        let err = DurationError::provider_status("vimeo", StatusCode::BAD_GATEWAY, "upstream");
        assert!(err.is_retryable());
        assert!(!DurationError::not_found("https://example.com/a.mp4").is_retryable());
    }
}
