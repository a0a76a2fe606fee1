//! HTTP access used by every resolution strategy.
//!
//! The engine only talks to the [`Fetcher`] trait so scanners and adapters can
//! be driven by canned responses in tests. [`HttpFetcher`] is the reqwest
//! implementation used in production.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;
use tracing::debug;
use url::Url;

use crate::config::ResolverConfig;
use crate::error::DurationError;

/// Forward-only response body.
pub type ByteStream = BoxStream<'static, Result<Bytes, std::io::Error>>;

/// Inclusive byte range sent as `Range: bytes=<start>-<end>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Range covering the first `len` bytes of a resource.
    pub fn prefix(len: u64) -> Self {
        Self {
            start: 0,
            end: len.saturating_sub(1),
        }
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start) + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub range: Option<ByteRange>,
}

impl FetchRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            range: None,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn head(url: Url) -> Self {
        Self::new(Method::HEAD, url)
    }

    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn with_range(mut self, range: ByteRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Insert a header, skipping values that are not valid header text.
    pub fn with_header<K: Into<HeaderName>>(mut self, key: K, value: impl AsRef<str>) -> Self {
        match HeaderValue::from_str(value.as_ref()) {
            Ok(value) => {
                self.headers.insert(key.into(), value);
            }
            Err(e) => {
                debug!(error = %e, "Invalid header value; skipping");
            }
        }
        self
    }
}

pub struct FetchResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ByteStream,
}

impl fmt::Debug for FetchResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

impl FetchResponse {
    /// Response with a fully buffered body.
    pub fn from_bytes(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        let body: Bytes = body.into();
        Self {
            status,
            headers,
            body: stream::once(async move { Ok::<_, std::io::Error>(body) }).boxed(),
        }
    }

    /// Media type of `Content-Type`, lowercased and without parameters.
    pub fn content_type(&self) -> Option<String> {
        let raw = self.headers.get(header::CONTENT_TYPE)?.to_str().ok()?;
        let media_type = raw.split(';').next().unwrap_or(raw).trim();
        if media_type.is_empty() {
            None
        } else {
            Some(media_type.to_ascii_lowercase())
        }
    }

    pub fn reader(self) -> impl AsyncRead + Send + Unpin {
        StreamReader::new(self.body)
    }

    /// Buffer the whole body as (lossy) UTF-8 text.
    pub async fn text(self) -> Result<String, DurationError> {
        let chunks: Vec<Bytes> = self.body.try_collect().await?;
        let mut buf = Vec::with_capacity(chunks.iter().map(Bytes::len).sum());
        for chunk in &chunks {
            buf.extend_from_slice(chunk);
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Issue one request. Non-2xx statuses are returned, not turned into errors;
    /// only transport failures are `Err`.
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, DurationError>;
}

/// [`Fetcher`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &ResolverConfig) -> Result<Self, DurationError> {
        let redirect = if config.follow_redirects {
            reqwest::redirect::Policy::limited(10)
        } else {
            reqwest::redirect::Policy::none()
        };

        let mut builder = Client::builder()
            .user_agent(config.user_agent.as_str())
            .connect_timeout(config.connect_timeout)
            .redirect(redirect);

        // Zero disables the overall timeout.
        if !config.timeout.is_zero() {
            builder = builder.timeout(config.timeout);
        }

        Ok(Self::new(builder.build()?))
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, DurationError> {
        let FetchRequest {
            method,
            url,
            mut headers,
            range,
        } = request;

        if let Some(range) = range {
            match HeaderValue::from_str(&range.header_value()) {
                Ok(value) => {
                    headers.insert(header::RANGE, value);
                }
                Err(e) => debug!(error = %e, "Invalid range header; skipping"),
            }
        }

        // Query strings may carry API keys; log only host and path.
        debug!(%method, host = url.host_str(), path = url.path(), "Sending request");
        let response = self
            .client
            .request(method, url)
            .headers(headers)
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        debug!(%status, path = response.url().path(), "Received response");

        let body = response
            .bytes_stream()
            .map_err(|e| std::io::Error::other(e.without_url()))
            .boxed();

        Ok(FetchResponse {
            status,
            headers,
            body,
        })
    }
}
