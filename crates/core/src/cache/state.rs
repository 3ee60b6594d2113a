//! Persisted lifecycle state.
//!
//! Records the last activated generation per namespace so a restarted proxy
//! keeps serving it until a newer generation installs and activates.

use super::connection::CacheDb;
use super::generation::Generation;
use crate::Error;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

impl CacheDb {
    /// Last activated generation for `namespace`, if any.
    pub async fn active_generation(&self, namespace: &str) -> Result<Option<Generation>, Error> {
        let namespace = namespace.to_string();
        let tag = self
            .conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let result = conn.query_row(
                    "SELECT active_generation FROM lifecycle_state WHERE namespace = ?1",
                    params![namespace],
                    |row| row.get(0),
                );
                match result {
                    Ok(tag) => Ok(Some(tag)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        tag.map(Generation::new).transpose()
    }

    /// Record `generation` as the active one for `namespace`.
    pub async fn set_active_generation(&self, namespace: &str, generation: &Generation) -> Result<(), Error> {
        let namespace = namespace.to_string();
        let tag = generation.as_str().to_string();
        let activated_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO lifecycle_state (namespace, active_generation, activated_at)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT(namespace) DO UPDATE SET
                        active_generation = excluded.active_generation,
                        activated_at = excluded.activated_at",
                    params![namespace, tag, activated_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}
