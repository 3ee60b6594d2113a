//! Core types and shared functionality for the saveit offline proxy.
//!
//! This crate provides:
//! - Versioned cache stores with a SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, CacheEntry, CacheKey, CacheStore, Generation, GenerationStores, StoreClass, StoredResponse};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
