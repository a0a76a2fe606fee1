//! In-memory [`Fetcher`] for unit tests.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use reqwest::StatusCode;
use reqwest::header::{self, HeaderMap, HeaderValue};

use crate::error::DurationError;
use crate::fetcher::{FetchRequest, FetchResponse, Fetcher};

#[derive(Debug, Clone)]
struct Route {
    status: StatusCode,
    content_type: Option<String>,
    body: Bytes,
}

/// Routes keyed by `(METHOD, url)`; anything unrouted answers 404.
#[derive(Debug, Default)]
pub(crate) struct MockFetcher {
    routes: HashMap<(String, String), Route>,
    requests: Mutex<Vec<FetchRequest>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(
        mut self,
        method: &str,
        url: &str,
        status: u16,
        content_type: &str,
        body: impl Into<Bytes>,
    ) -> Self {
        self.routes.insert(
            (method.to_owned(), url.to_owned()),
            Route {
                status: StatusCode::from_u16(status).unwrap(),
                content_type: Some(content_type.to_owned()),
                body: body.into(),
            },
        );
        self
    }

    pub fn with_status(mut self, method: &str, url: &str, status: u16) -> Self {
        self.routes.insert(
            (method.to_owned(), url.to_owned()),
            Route {
                status: StatusCode::from_u16(status).unwrap(),
                content_type: None,
                body: Bytes::new(),
            },
        );
        self
    }

    /// Requests seen so far, in order.
    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .map(|r| format!("{} {}", r.method, r.url))
            .collect()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, DurationError> {
        let key = (request.method.to_string(), request.url.to_string());
        self.requests.lock().push(request);

        let Some(route) = self.routes.get(&key).cloned() else {
            return Ok(FetchResponse::from_bytes(
                StatusCode::NOT_FOUND,
                HeaderMap::new(),
                Bytes::new(),
            ));
        };

        let mut headers = HeaderMap::new();
        if let Some(content_type) = route.content_type {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_str(&content_type).unwrap());
        }
        Ok(FetchResponse::from_bytes(route.status, headers, route.body))
    }
}

/// Minimal MP4 prefix: an `ftyp` box followed by `moov` and an `mvhd` header.
pub(crate) fn mp4_prefix(timescale: u32, duration: u32) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&[0, 0, 0, 0x18]);
    data.extend_from_slice(b"ftypisom");
    data.extend_from_slice(&[0, 0, 2, 0]);
    data.extend_from_slice(b"isomiso2");
    data.extend_from_slice(&[0, 0, 0, 0x6c]);
    data.extend_from_slice(b"moov");
    data.extend_from_slice(&[0, 0, 0, 0x64]);
    data.extend_from_slice(b"mvhd");
    data.extend_from_slice(&[0; 12]);
    data.extend_from_slice(&timescale.to_be_bytes());
    data.extend_from_slice(&duration.to_be_bytes());
    data
}
