//! Caching strategies.
//!
//! Each strategy takes a request and the stores of the active generation and
//! always produces an [`Outcome`]. Transport failures, store read errors, and
//! store write errors never escape: they become a fallback, a synthesized
//! offline response, or a log line.

mod cache_first;
mod network_first;
mod network_only;

use std::time::Duration;

use async_trait::async_trait;
use saveit_core::{CacheKey, CacheStore, GenerationStores, StoreClass};

use crate::classify::StrategyTag;
use crate::fetch::{FetchError, Network, RequestDescriptor, ResponseDescriptor};

pub use cache_first::CacheFirst;
pub use network_first::{DefaultNetworkFirst, NetworkFirstFallback};
pub use network_only::NetworkOnly;

/// What a strategy produced for one request.
#[derive(Debug)]
pub enum Outcome {
    /// Served from a store without touching the network.
    Cached(ResponseDescriptor),
    /// Live network response, whatever its status.
    Fetched(ResponseDescriptor),
    /// Network and cache both failed; a `503` was synthesized.
    Offline(ResponseDescriptor),
    /// Network failed and the strategy forwards the raw failure.
    Failed(FetchError),
    /// Network failed and no store held the request.
    NoMatch,
}

impl Outcome {
    pub fn response(&self) -> Option<&ResponseDescriptor> {
        match self {
            Outcome::Cached(r) | Outcome::Fetched(r) | Outcome::Offline(r) => Some(r),
            Outcome::Failed(_) | Outcome::NoMatch => None,
        }
    }

    pub fn into_response(self) -> Option<ResponseDescriptor> {
        match self {
            Outcome::Cached(r) | Outcome::Fetched(r) | Outcome::Offline(r) => Some(r),
            Outcome::Failed(_) | Outcome::NoMatch => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Cached(_) => "cached",
            Outcome::Fetched(_) => "fetched",
            Outcome::Offline(_) => "offline",
            Outcome::Failed(_) => "failed",
            Outcome::NoMatch => "no_match",
        }
    }
}

/// Everything a strategy may touch while handling one request.
pub struct Context<'a> {
    pub network: &'a dyn Network,
    pub stores: &'a GenerationStores,
    /// Upper bound on any single network fetch.
    pub fetch_timeout: Duration,
}

/// A caching policy.
#[async_trait]
pub trait Strategy: Send + Sync {
    fn tag(&self) -> StrategyTag;

    async fn execute(&self, request: &RequestDescriptor, ctx: &Context<'_>) -> Outcome;
}

/// The executor registered for `tag`.
pub fn for_tag(tag: StrategyTag) -> &'static dyn Strategy {
    match tag {
        StrategyTag::CacheFirst => &CacheFirst,
        StrategyTag::NetworkOnly => &NetworkOnly,
        StrategyTag::NetworkFirstFallback => &NetworkFirstFallback,
        StrategyTag::DefaultNetworkFirst => &DefaultNetworkFirst,
    }
}

/// Read `key` from `store`; a failed read counts as a miss.
async fn read(store: &CacheStore, key: &CacheKey) -> Option<ResponseDescriptor> {
    match store.get(key).await {
        Ok(entry) => entry.map(|e| ResponseDescriptor::from(e.response)),
        Err(e) => {
            tracing::warn!(store = store.name(), url = key.url(), error = %e, "cache read failed; treating as miss");
            None
        }
    }
}

/// Best-effort write of a cacheable GET response into the `class` store.
///
/// Non-200 responses and non-GET requests are skipped. Write errors, such as
/// an exceeded quota or a store deleted by activation while the fetch was
/// pending, are logged and dropped. The store is never created here.
async fn persist(ctx: &Context<'_>, class: StoreClass, request: &RequestDescriptor, response: &ResponseDescriptor) {
    if !response.is_cacheable() || !request.is_get() {
        return;
    }
    let store = ctx.stores.store(class);
    match store.put(&request.cache_key(), &response.to_stored()).await {
        Ok(()) => tracing::debug!(store = store.name(), url = %request.url(), "cached response"),
        Err(e) => tracing::warn!(store = store.name(), url = %request.url(), error = %e, "cache write failed"),
    }
}
