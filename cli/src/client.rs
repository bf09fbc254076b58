//! HTTP client for the collector API and for pprof targets

use anyhow::{bail, Context, Result};
use hyper::client::HttpConnector;
use hyper::header::CONTENT_TYPE;
use hyper::{Body, Client, Method, Request};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// CPU profiles block for the whole sample duration.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Clone, Default)]
pub struct HttpClient {
    inner: Client<HttpConnector>,
}

impl HttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, url: &str) -> Result<Vec<u8>> {
        let req = Request::builder()
            .method(Method::GET)
            .uri(url)
            .body(Body::empty())
            .with_context(|| format!("invalid url {}", url))?;
        self.send(req).await
    }

    pub async fn post(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>> {
        let req = Request::builder()
            .method(Method::POST)
            .uri(url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(Body::from(body))
            .with_context(|| format!("invalid url {}", url))?;
        self.send(req).await
    }

    async fn send(&self, req: Request<Body>) -> Result<Vec<u8>> {
        let uri = req.uri().clone();
        tracing::debug!(method = %req.method(), %uri, "request");

        let res = tokio::time::timeout(REQUEST_TIMEOUT, self.inner.request(req))
            .await
            .with_context(|| format!("request to {} timed out", uri))?
            .with_context(|| format!("request to {} failed", uri))?;
        let status = res.status();
        let body = hyper::body::to_bytes(res.into_body())
            .await
            .with_context(|| format!("read response from {}", uri))?;

        if !status.is_success() {
            bail!("status {}: {}", status.as_u16(), error_message(&body));
        }
        Ok(body.to_vec())
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// The `error` field of a JSON error body, else the body as text.
fn error_message(body: &[u8]) -> String {
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(e) => e.error,
        Err(_) => String::from_utf8_lossy(body).trim().to_string(),
    }
}

/// Client for a running perfkit collector.
#[derive(Clone)]
pub struct ApiClient {
    base: String,
    http: HttpClient,
}

impl ApiClient {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            http: HttpClient::new(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Ingest URL for `endpoint` ("pprof" or "k6") with query parameters.
    pub fn ingest_url(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<String> {
        let mut url = Url::parse(&self.url(&format!("/api/{}/ingest", endpoint)))
            .with_context(|| format!("invalid server url {}", self.base))?;
        url.query_pairs_mut().extend_pairs(params);
        Ok(url.into())
    }

    pub async fn get_bytes(&self, path: &str) -> Result<Vec<u8>> {
        self.http.get(&self.url(path)).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let body = self.get_bytes(path).await?;
        serde_json::from_slice(&body).with_context(|| format!("decode response of {}", path))
    }

    pub async fn post(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>> {
        self.http.post(url, body).await
    }
}

/// Percent-encode one path segment.
pub fn segment(value: &str) -> String {
    utf8_percent_encode(value, NON_ALPHANUMERIC).to_string()
}
