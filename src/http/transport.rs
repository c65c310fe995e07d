//! The transport seam: one request in, one response or failure out.

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::{
    Client, Method,
    header::{HeaderMap, HeaderName, HeaderValue},
};
use serde_json::Value;
use std::collections::HashMap;

use crate::config::Config;
use crate::error::TransportError;

/// A single request as handed to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
    /// Instance defaults with the per-call overlay already applied.
    pub config: Config,
}

/// A successful response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransportResponse {
    pub status: u16,
    /// Header names are lowercase; repeated headers are joined with `", "`.
    pub headers: HashMap<String, String>,
    pub data: Value,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs the request. Any non-success status must come back as
    /// [`TransportError::Response`].
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// [`Transport`] backed by a `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a transport wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Creates a transport with a default client.
    pub fn from_defaults() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("http-easy/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::new(client))
    }

    /// Returns a reference to the underlying reqwest Client.
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[tracing::instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let url = resolve_url(request.config.base_url.as_deref(), &request.url);
        debug!("{} {}...", request.method, url);

        if !request.config.extra.is_empty() {
            debug!(
                "Ignoring transport options not understood by reqwest: {:?}",
                request.config.extra.keys().collect::<Vec<_>>()
            );
        }

        let headers = build_headers(&request.config.headers)?;
        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .headers(headers);
        if let Some(timeout) = request.config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = collect_headers(response.headers());
        let bytes = response.bytes().await?;
        let data = decode_body(&bytes);

        debug!("{} {} -> {}", request.method, url, status.as_u16());

        if !status.is_success() {
            return Err(TransportError::Response {
                status: status.as_u16(),
                headers,
                data,
            });
        }

        Ok(TransportResponse {
            status: status.as_u16(),
            headers,
            data,
        })
    }
}

/// Joins a relative `url` onto `base_url`. Absolute URLs pass through.
pub fn resolve_url(base_url: Option<&str>, url: &str) -> String {
    match base_url {
        Some(base) if !is_absolute_url(url) => {
            let base = base.strip_suffix('/').unwrap_or(base);
            let path = url.trim_start_matches('/');
            if path.is_empty() {
                base.to_string()
            } else {
                format!("{}/{}", base, path)
            }
        }
        _ => url.to_string(),
    }
}

/// True for `scheme://...` and protocol-relative `//...` URLs.
fn is_absolute_url(url: &str) -> bool {
    if url.starts_with("//") {
        return true;
    }
    let Some((scheme, _)) = url.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Converts configured headers into a `HeaderMap`, one value per name.
///
/// Names compare case-insensitively; when two differ only in case the
/// later insert wins. Invalid names or values are local failures.
fn build_headers(headers: &HashMap<String, String>) -> Result<HeaderMap, TransportError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::other(format!("Invalid header name {:?}: {}", name, e)))?;
        let header_value = HeaderValue::from_str(value).map_err(|e| {
            TransportError::other(format!("Invalid value for header {:?}: {}", name, e))
        })?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

fn collect_headers(headers: &HeaderMap) -> HashMap<String, String> {
    let mut collected: HashMap<String, String> = HashMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        collected
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    collected
}

/// Empty bodies become `null`, JSON is parsed, anything else is kept as text.
fn decode_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}
