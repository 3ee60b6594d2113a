//! Store classes, generation tags, and store naming.
//!
//! A store's full name is `{namespace}-{class}-{generation}`, e.g.
//! `saveit-barcodes-v4`. Every store of one generation shares the tag; bumping
//! it is the only way to invalidate all classes at once.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::connection::CacheDb;
use super::hash::CacheKey;
use super::stores::{CacheEntry, CacheStore};
use crate::Error;

/// Semantic partition of cache entries by resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum StoreClass {
    /// Shell assets pre-seeded at install.
    Static,
    /// Successfully fetched pages and catch-all GET responses.
    Dynamic,
    /// Barcode images, local or from the external asset host.
    Barcode,
}

impl StoreClass {
    /// Lookup order used when searching every store of a generation.
    pub const ALL: [StoreClass; 3] = [StoreClass::Static, StoreClass::Dynamic, StoreClass::Barcode];

    pub fn tag(self) -> &'static str {
        match self {
            StoreClass::Static => "static",
            StoreClass::Dynamic => "dynamic",
            StoreClass::Barcode => "barcodes",
        }
    }
}

impl fmt::Display for StoreClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Opaque version tag shared by every store class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Generation(String);

impl Generation {
    pub fn new(tag: impl Into<String>) -> Result<Self, Error> {
        let tag = tag.into();
        if tag.is_empty() || tag.chars().any(char::is_whitespace) {
            return Err(Error::InvalidGeneration(format!("{tag:?} must be non-empty without whitespace")));
        }
        Ok(Self(tag))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Generation {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Generation> for String {
    fn from(generation: Generation) -> Self {
        generation.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Full store name for one class of one generation.
pub fn store_name(namespace: &str, class: StoreClass, generation: &str) -> String {
    format!("{namespace}-{}-{generation}", class.tag())
}

/// The three stores of a single generation.
///
/// Stores are opened lazily; holding a `GenerationStores` creates nothing.
#[derive(Debug, Clone)]
pub struct GenerationStores {
    db: CacheDb,
    namespace: String,
    generation: Generation,
}

impl GenerationStores {
    pub fn new(db: CacheDb, namespace: impl Into<String>, generation: Generation) -> Self {
        Self { db, namespace: namespace.into(), generation }
    }

    pub fn name(&self, class: StoreClass) -> String {
        store_name(&self.namespace, class, self.generation.as_str())
    }

    /// Names of all three stores, in lookup order.
    pub fn names(&self) -> Vec<String> {
        StoreClass::ALL.iter().map(|class| self.name(*class)).collect()
    }

    /// Open (or create) the store for `class`.
    pub async fn open(&self, class: StoreClass) -> Result<CacheStore, Error> {
        self.db.open_store(&self.name(class)).await
    }

    /// Handle to the store for `class`; never creates it.
    ///
    /// Request-time writers go through this so that a generation deleted
    /// while their fetch was pending stays deleted.
    pub fn store(&self, class: StoreClass) -> CacheStore {
        self.db.store(&self.name(class))
    }

    /// Create every store of this generation that does not exist yet.
    pub async fn open_all(&self) -> Result<(), Error> {
        for class in StoreClass::ALL {
            self.open(class).await?;
        }
        Ok(())
    }

    /// Search every store of this generation without creating missing ones.
    ///
    /// Stores are checked in [`StoreClass::ALL`] order; the first hit wins.
    pub async fn lookup_any(&self, key: &CacheKey) -> Result<Option<(StoreClass, CacheEntry)>, Error> {
        for class in StoreClass::ALL {
            if let Some(entry) = self.db.get_entry(&self.name(class), key).await? {
                return Ok(Some((class, entry)));
            }
        }
        Ok(None)
    }
}
