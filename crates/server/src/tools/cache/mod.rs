//! Cache-related MCP tools.
//!
//! This module provides read-only views of the generation stores.

pub mod lookup;
pub mod stores;

pub use lookup::{CacheLookupParams, lookup_impl};
pub use stores::{CacheStoresParams, stores_impl};
