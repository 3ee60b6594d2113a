//! SQLite-backed cache stores for offline availability.
//!
//! This module provides named, generation-tagged stores using SQLite with
//! async access via tokio-rusqlite. It supports:
//!
//! - Request keys hashed from method and canonical URL
//! - Open-or-create stores, whole-store deletion with cascading entries
//! - Per-entry size quota
//! - Persisted active generation per namespace
//! - Automatic schema migrations

pub mod connection;
pub mod generation;
pub mod hash;
pub mod migrations;
pub mod state;
pub mod stores;

pub use crate::Error;

pub use connection::CacheDb;
pub use generation::{Generation, GenerationStores, StoreClass, store_name};
pub use hash::CacheKey;
pub use stores::{CacheEntry, CacheStore, StoredResponse};
