//! Request and response descriptors exchanged with the router.

use bytes::Bytes;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode, Url};
use saveit_core::{CacheKey, StoredResponse};

use super::url::{UrlError, canonicalize, origin_of};

/// An intercepted outbound request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    method: Method,
    url: Url,
    origin: String,
}

impl RequestDescriptor {
    /// Build a descriptor from a method and an absolute URL.
    pub fn new(method: Method, url: &str) -> Result<Self, UrlError> {
        let url = canonicalize(url)?;
        let origin = origin_of(&url);
        Ok(Self { method, url, origin })
    }

    pub fn get(url: &str) -> Result<Self, UrlError> {
        Self::new(Method::GET, url)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Host of the request URL; always present after canonicalization.
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::new(self.method.as_str(), self.url.as_str())
    }
}

/// A response produced by the network, a store, or synthesized offline.
#[derive(Debug, Clone)]
pub struct ResponseDescriptor {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ResponseDescriptor {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self { status, headers, body: body.into() }
    }

    /// Only plain `200 OK` responses are ever persisted.
    pub fn is_cacheable(&self) -> bool {
        self.status == StatusCode::OK
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// `503` served for a barcode that is neither cached nor reachable.
    pub fn barcode_offline() -> Self {
        Self::offline("Barcode unavailable offline", "text/plain; charset=utf-8")
    }

    /// `503` served for a page that is neither cached nor reachable.
    pub fn page_offline() -> Self {
        Self::offline("Page unavailable offline", "text/html; charset=utf-8")
    }

    fn offline(body: &'static str, content_type: &'static str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        Self::new(StatusCode::SERVICE_UNAVAILABLE, headers, Bytes::from_static(body.as_bytes()))
    }

    /// Storable form of this response. Header values that are not UTF-8 are dropped.
    pub fn to_stored(&self) -> StoredResponse {
        let headers = self
            .headers
            .iter()
            .filter_map(|(name, value)| match std::str::from_utf8(value.as_bytes()) {
                Ok(v) => Some((name.as_str().to_string(), v.to_string())),
                Err(_) => {
                    tracing::warn!(header = %name, "dropping non-UTF-8 header before storing");
                    None
                }
            })
            .collect();
        StoredResponse { status: self.status.as_u16(), headers, body: self.body.to_vec() }
    }
}

impl From<StoredResponse> for ResponseDescriptor {
    fn from(stored: StoredResponse) -> Self {
        // Only 200 responses are ever persisted.
        let status = StatusCode::from_u16(stored.status).unwrap_or_else(|_| {
            tracing::warn!(status = stored.status, "invalid stored status; serving as 200");
            StatusCode::OK
        });
        let mut headers = HeaderMap::with_capacity(stored.headers.len());
        for (name, value) in &stored.headers {
            match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => tracing::warn!(header = %name, "dropping undecodable stored header"),
            }
        }
        Self { status, headers, body: Bytes::from(stored.body) }
    }
}
