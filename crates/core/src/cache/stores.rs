//! Named cache stores and their entries.
//!
//! A store is a plain key/value map from [`CacheKey`] to a stored response.
//! It carries no policy: no eviction, no freshness. Stores disappear only
//! when deleted as a whole, which cascades to their entries.

use std::collections::{BTreeMap, BTreeSet};

use super::connection::CacheDb;
use super::hash::CacheKey;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A response as persisted in a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub status: u16,
    /// Header pairs in received order. Names are compared case-insensitively
    /// by consumers.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl StoredResponse {
    /// First value of header `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A stored response together with its key and write time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub response: StoredResponse,
    pub stored_at: String,
}

/// Handle to one named store.
#[derive(Debug, Clone)]
pub struct CacheStore {
    db: CacheDb,
    name: String,
}

impl CacheStore {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, Error> {
        self.db.get_entry(&self.name, key).await
    }

    /// Insert or overwrite the entry for `key`.
    pub async fn put(&self, key: &CacheKey, response: &StoredResponse) -> Result<(), Error> {
        self.db.put_entry(&self.name, key, response).await
    }
}

impl CacheDb {
    /// Open the store called `name`, creating it if absent.
    ///
    /// Idempotent: opening an existing store leaves its entries untouched.
    pub async fn open_store(&self, name: &str) -> Result<CacheStore, Error> {
        if name.is_empty() {
            return Err(Error::InvalidInput("store name cannot be empty".into()));
        }

        let owned = name.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO cache_stores (name, created_at) VALUES (?1, ?2)",
                    params![owned, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(CacheStore { db: self.clone(), name: name.to_string() })
    }

    /// Handle to the store called `name` without creating it.
    ///
    /// Reads through the handle miss and writes fail once the store is gone,
    /// so a deleted store is never brought back by a late writer.
    pub fn store(&self, name: &str) -> CacheStore {
        CacheStore { db: self.clone(), name: name.to_string() }
    }

    /// Names of every existing store.
    pub async fn list_store_names(&self) -> Result<BTreeSet<String>, Error> {
        self.conn
            .call(|conn| -> Result<BTreeSet<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM cache_stores")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<BTreeSet<_>, rusqlite::Error>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Every existing store with its entry count, read in one query.
    pub async fn store_entry_counts(&self) -> Result<BTreeMap<String, u64>, Error> {
        self.conn
            .call(|conn| -> Result<BTreeMap<String, u64>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT s.name, COUNT(e.key_hash)
                     FROM cache_stores s LEFT JOIN cache_entries e ON e.store_name = s.name
                     GROUP BY s.name",
                )?;
                let counts = stmt
                    .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64)))?
                    .collect::<Result<BTreeMap<_, _>, rusqlite::Error>>()?;
                Ok(counts)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a store and every entry in it.
    ///
    /// Returns false if no store had that name.
    pub async fn delete_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM cache_stores WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Total number of entries across all stores.
    pub async fn entry_count(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Get the entry for `key` in store `store`.
    ///
    /// Returns None if either the store or the entry doesn't exist.
    pub async fn get_entry(&self, store: &str, key: &CacheKey) -> Result<Option<CacheEntry>, Error> {
        let store = store.to_string();
        let key = key.clone();
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT status, headers_json, body, stored_at
                     FROM cache_entries WHERE store_name = ?1 AND key_hash = ?2",
                )?;

                let row = stmt.query_row(params![store, key.hash()], |row| {
                    Ok((
                        row.get::<_, u16>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Vec<u8>>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                });

                let (status, headers_json, body, stored_at) = match row {
                    Ok(r) => r,
                    Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                    Err(e) => return Err(e.into()),
                };

                let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)?;
                Ok(Some(CacheEntry { key, response: StoredResponse { status, headers, body }, stored_at }))
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or overwrite the entry for `key` in store `store`.
    ///
    /// Fails if the store does not exist or the body exceeds the entry quota.
    pub async fn put_entry(&self, store: &str, key: &CacheKey, response: &StoredResponse) -> Result<(), Error> {
        if let Some(limit) = self.max_entry_bytes
            && response.body.len() > limit
        {
            return Err(Error::QuotaExceeded { size: response.body.len(), limit });
        }

        let store = store.to_string();
        let key = key.clone();
        let response = response.clone();
        let headers_json = serde_json::to_string(&response.headers)?;
        let stored_at = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO cache_entries (
                        store_name, key_hash, method, url, status, headers_json, body, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    ON CONFLICT(store_name, key_hash) DO UPDATE SET
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![
                        store,
                        key.hash(),
                        key.method(),
                        key.url(),
                        response.status,
                        headers_json,
                        response.body,
                        stored_at
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> StoredResponse {
        StoredResponse {
            status,
            headers: vec![("Content-Type".to_string(), "image/png".to_string())],
            body: body.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn test_open_store_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let key = CacheKey::new("GET", "https://x.supabase.co/storage/barcodes/1.png");

        let store = db.open_store("saveit-barcodes-v4").await.unwrap();
        store.put(&key, &response(200, "png")).await.unwrap();

        let reopened = db.open_store("saveit-barcodes-v4").await.unwrap();
        assert!(reopened.get(&key).await.unwrap().is_some());
        assert_eq!(db.list_store_names().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("saveit-dynamic-v4").await.unwrap();
        let key = CacheKey::new("GET", "http://localhost:8000/loyalty-cards/7/");

        store.put(&key, &response(200, "<html>card</html>")).await.unwrap();

        let entry = store.get(&key).await.unwrap().unwrap();
        assert_eq!(entry.key, key);
        assert_eq!(entry.response.status, 200);
        assert_eq!(entry.response.body, b"<html>card</html>");
        assert_eq!(entry.response.header("content-type"), Some("image/png"));
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("saveit-dynamic-v4").await.unwrap();
        let key = CacheKey::new("GET", "http://localhost:8000/");

        store.put(&key, &response(200, "first")).await.unwrap();
        store.put(&key, &response(200, "second")).await.unwrap();

        assert_eq!(db.entry_count().await.unwrap(), 1);
        assert_eq!(store.get(&key).await.unwrap().unwrap().response.body, b"second");
    }

    #[tokio::test]
    async fn test_get_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("saveit-dynamic-v4").await.unwrap();
        let key = CacheKey::new("GET", "http://localhost:8000/nothing");
        assert!(store.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stores_are_isolated() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let key = CacheKey::new("GET", "http://localhost:8000/");
        db.open_store("saveit-static-v4").await.unwrap().put(&key, &response(200, "shell")).await.unwrap();

        let dynamic = db.open_store("saveit-dynamic-v4").await.unwrap();
        assert!(dynamic.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_store_cascades() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("saveit-static-v3").await.unwrap();
        store.put(&CacheKey::new("GET", "http://localhost:8000/"), &response(200, "old")).await.unwrap();

        assert!(db.delete_store("saveit-static-v3").await.unwrap());
        assert!(!db.delete_store("saveit-static-v3").await.unwrap());
        assert!(db.list_store_names().await.unwrap().is_empty());
        assert_eq!(db.entry_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_put_into_deleted_store_fails() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("saveit-dynamic-v3").await.unwrap();
        db.delete_store("saveit-dynamic-v3").await.unwrap();

        let result = store.put(&CacheKey::new("GET", "http://localhost:8000/"), &response(200, "late")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_quota_exceeded() {
        let db = CacheDb::open_in_memory().await.unwrap().with_max_entry_bytes(4);
        let store = db.open_store("saveit-barcodes-v4").await.unwrap();
        let key = CacheKey::new("GET", "http://localhost:8000/media/barcodes/big.png");

        let result = store.put(&key, &response(200, "too large")).await;
        assert!(matches!(result, Err(Error::QuotaExceeded { size: 9, limit: 4 })));
        assert!(store.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_handle_does_not_create() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.store("saveit-dynamic-v4");
        let key = CacheKey::new("GET", "http://localhost:8000/");

        assert!(store.get(&key).await.unwrap().is_none());
        assert!(store.put(&key, &response(200, "late")).await.is_err());
        assert!(db.list_store_names().await.unwrap().is_empty());

        db.open_store("saveit-dynamic-v4").await.unwrap();
        store.put(&key, &response(200, "now")).await.unwrap();
        assert!(store.get(&key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_store_entry_counts() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("saveit-static-v4").await.unwrap();
        store.put(&CacheKey::new("GET", "http://localhost:8000/a"), &response(200, "a")).await.unwrap();
        store.put(&CacheKey::new("GET", "http://localhost:8000/b"), &response(200, "b")).await.unwrap();
        db.open_store("saveit-barcodes-v4").await.unwrap();

        let counts = db.store_entry_counts().await.unwrap();
        let counts: Vec<_> = counts.iter().map(|(name, n)| (name.as_str(), *n)).collect();
        assert_eq!(counts, vec![("saveit-barcodes-v4", 0), ("saveit-static-v4", 2)]);
        assert_eq!(db.list_store_names().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_open_store_rejects_empty_name() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(matches!(db.open_store("").await, Err(Error::InvalidInput(_))));
    }
}
