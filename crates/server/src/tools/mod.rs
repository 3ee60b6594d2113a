//! MCP tool implementations.
//!
//! This module contains all tools exposed by the saveit proxy server.

pub mod cache;
pub mod generation;
pub mod proxy_fetch;

#[cfg(test)]
pub(crate) mod test_support;

pub use cache::{CacheLookupParams, CacheStoresParams};
pub use generation::GenerationRolloutParams;
pub use proxy_fetch::ProxyFetchParams;
