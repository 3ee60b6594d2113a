//! Cache key derivation.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Key of a cache entry: the request method and canonical URL, plus their digest.
///
/// Two requests with the same method and URL map to the same key, so the later
/// write overwrites the earlier one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    hash: String,
    method: String,
    url: String,
}

impl CacheKey {
    /// Build a key from a method and an already canonicalized URL.
    pub fn new(method: &str, canonical_url: &str) -> Self {
        let method = method.to_ascii_uppercase();
        let hash = compute_cache_key(&method, canonical_url);
        Self { hash, method, url: canonical_url.to_string() }
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// SHA-256 hex digest of `METHOD\nURL`.
pub fn compute_cache_key(method: &str, canonical_url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(canonical_url.as_bytes());
    hex::encode(hasher.finalize())
}
