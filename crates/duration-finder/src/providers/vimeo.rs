use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use crate::error::DurationError;
use crate::fetcher::{FetchRequest, Fetcher};
use crate::locator::Resolution;
use crate::providers::classify::{parse_json, read_body};
use crate::utils::duration_from_secs;

const PROVIDER: &str = "vimeo";
const OEMBED_URL: &str = "https://vimeo.com/api/oembed.json";

#[derive(Debug, Deserialize)]
struct OEmbedResponse {
    duration: Option<f64>,
}

/// Vimeo needs no id extraction: oEmbed accepts the page URL as is.
#[instrument(skip(fetcher), fields(url = %video_url))]
pub async fn fetch_duration(
    fetcher: &dyn Fetcher,
    video_url: &Url,
) -> Result<Resolution, DurationError> {
    let url = Url::parse_with_params(OEMBED_URL, &[("url", video_url.as_str())])
        .map_err(|e| DurationError::url_parse(video_url.as_str(), e.to_string()))?;

    let response = fetcher.fetch(FetchRequest::get(url)).await?;
    let body = read_body(PROVIDER, video_url.as_str(), response).await?;
    let embed: OEmbedResponse = parse_json(PROVIDER, &body)?;

    match embed.duration {
        Some(secs) => duration_from_secs(secs)
            .map(Resolution::resolved)
            .ok_or_else(|| DurationError::provider(PROVIDER, format!("invalid duration {secs}"))),
        None => {
            debug!("oEmbed response has no duration");
            Ok(Resolution::Indeterminate)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::ErrorKind;
    use crate::test_support::MockFetcher;

    const OEMBED: &str = "https://vimeo.com/api/oembed.json?url=https%3A%2F%2Fvimeo.com%2F76979871";

    fn video() -> Url {
        Url::parse("https://vimeo.com/76979871").unwrap()
    }

    #[tokio::test]
    async fn test_duration_from_oembed() {
        let fetcher = MockFetcher::new().with_body(
            "GET",
            OEMBED,
            200,
            "application/json",
            r#"{"type":"video","version":"1.0","provider_name":"Vimeo","title":"The New Vimeo Player","duration":62,"video_id":76979871}"#,
        );
        let result = fetch_duration(&fetcher, &video()).await.unwrap();
        assert_eq!(result.duration(), Some(Duration::from_secs(62)));
    }

    #[tokio::test]
    async fn test_missing_duration_is_indeterminate() {
        let fetcher = MockFetcher::new().with_body("GET", OEMBED, 200, "application/json", r#"{"type":"video"}"#);
        let result = fetch_duration(&fetcher, &video()).await.unwrap();
        assert_eq!(result, Resolution::Indeterminate);
    }

    #[tokio::test]
    async fn test_private_video() {
        let fetcher = MockFetcher::new().with_status("GET", OEMBED, 403);
        let err = fetch_duration(&fetcher, &video()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderError);

        let fetcher = MockFetcher::new();
        let err = fetch_duration(&fetcher, &video()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    #[ignore]
    async fn test_live_oembed() {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();

        let fetcher = crate::HttpFetcher::from_config(&crate::ResolverConfig::default()).unwrap();
        let result = fetch_duration(&fetcher, &video()).await.unwrap();
        assert!(result.duration().is_some());
    }
}
