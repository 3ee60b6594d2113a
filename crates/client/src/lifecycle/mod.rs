//! Cache generation lifecycle.
//!
//! A generation goes live in two steps:
//!
//! 1. **Install** fetches every manifest asset and writes them into the new
//!    generation's static store. All or nothing: one failed or non-200 asset
//!    aborts the install and the previous generation keeps serving.
//! 2. **Activate** creates all three stores of the new generation, deletes
//!    every other store in this namespace, records the generation, and only
//!    then publishes it to the [`GenerationGate`] the router reads.
//!
//! Request-time writes never create stores. A request still holding an old
//! generation when activation deletes it fails its write instead of bringing
//! the store back.
//!
//! `install` hands back an [`InstalledGeneration`] that `activate` consumes,
//! so a generation cannot be activated without a successful install.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::try_join_all;
use reqwest::Url;
use saveit_core::{AppConfig, CacheDb, Error, Generation, GenerationStores, StoreClass};
use serde::Serialize;
use tokio::sync::{Mutex, watch};

use crate::fetch::{Network, RequestDescriptor, ResponseDescriptor, fetch_within};

/// Read side of the active generation.
///
/// `None` until the first activation (or restore) completes.
#[derive(Debug, Clone)]
pub struct GenerationGate {
    rx: watch::Receiver<Option<Generation>>,
}

impl GenerationGate {
    pub fn current(&self) -> Option<Generation> {
        self.rx.borrow().clone()
    }
}

/// Proof that a generation's static store was fully seeded.
#[derive(Debug)]
#[must_use = "an installed generation does nothing until activated"]
pub struct InstalledGeneration {
    generation: Generation,
    assets: usize,
}

/// Result of a completed activation.
#[derive(Debug, Clone, Serialize)]
pub struct ActivationReport {
    pub generation: String,
    pub assets: usize,
    pub deleted_stores: Vec<String>,
}

/// Drives install and activate for one store namespace.
pub struct LifecycleManager {
    db: CacheDb,
    network: Arc<dyn Network>,
    namespace: String,
    origin: Url,
    manifest: Vec<String>,
    fetch_timeout: Duration,
    tx: watch::Sender<Option<Generation>>,
    rollout: Mutex<()>,
}

impl LifecycleManager {
    pub fn new(
        db: CacheDb, network: Arc<dyn Network>, namespace: impl Into<String>, origin: Url, manifest: Vec<String>,
        fetch_timeout: Duration,
    ) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            db,
            network,
            namespace: namespace.into(),
            origin,
            manifest,
            fetch_timeout,
            tx,
            rollout: Mutex::new(()),
        }
    }

    pub fn from_config(config: &AppConfig, db: CacheDb, network: Arc<dyn Network>) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.origin)))?;
        Ok(Self::new(db, network, config.namespace.clone(), origin, config.manifest.clone(), config.timeout()))
    }

    pub fn gate(&self) -> GenerationGate {
        GenerationGate { rx: self.tx.subscribe() }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn active(&self) -> Option<Generation> {
        self.tx.borrow().clone()
    }

    /// Publish the generation recorded by a previous run, if any.
    pub async fn restore(&self) -> Result<Option<Generation>, Error> {
        let active = self.db.active_generation(&self.namespace).await?;
        if let Some(generation) = &active {
            GenerationStores::new(self.db.clone(), self.namespace.clone(), generation.clone())
                .open_all()
                .await?;
            tracing::info!(namespace = %self.namespace, %generation, "restored active cache generation");
            self.tx.send_replace(Some(generation.clone()));
        }
        Ok(active)
    }

    /// Pre-seed the static store of `generation` from the manifest.
    ///
    /// Every asset is fetched before anything is written. If a write fails
    /// part way, the new static store is dropped again unless it belongs to
    /// the generation that is currently active.
    pub async fn install(&self, generation: Generation) -> Result<InstalledGeneration, Error> {
        tracing::info!(
            namespace = %self.namespace,
            %generation,
            assets = self.manifest.len(),
            "installing cache generation"
        );

        let requests = self
            .manifest
            .iter()
            .map(|path| {
                let url = self
                    .origin
                    .join(path)
                    .map_err(|e| Error::InstallFailed(format!("{path}: {e}")))?;
                RequestDescriptor::get(url.as_str()).map_err(|e| Error::InstallFailed(format!("{path}: {e}")))
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let responses = try_join_all(requests.iter().map(|request| self.fetch_asset(request))).await?;

        let stores = GenerationStores::new(self.db.clone(), self.namespace.clone(), generation.clone());
        if let Err(e) = self.seed(&stores, &requests, &responses).await {
            if self.active().as_ref() != Some(&generation) {
                let name = stores.name(StoreClass::Static);
                if let Err(cleanup) = self.db.delete_store(&name).await {
                    tracing::warn!(store = %name, error = %cleanup, "failed to drop partially seeded store");
                }
            }
            return Err(Error::InstallFailed(e.to_string()));
        }

        tracing::info!(%generation, assets = requests.len(), "cache generation installed");
        Ok(InstalledGeneration { generation, assets: requests.len() })
    }

    async fn fetch_asset(&self, request: &RequestDescriptor) -> Result<ResponseDescriptor, Error> {
        let response = fetch_within(self.network.as_ref(), request, self.fetch_timeout)
            .await
            .map_err(|e| Error::InstallFailed(format!("{}: {e}", request.url())))?;
        if !response.is_cacheable() {
            return Err(Error::InstallFailed(format!("{}: status {}", request.url(), response.status.as_u16())));
        }
        Ok(response)
    }

    async fn seed(
        &self, stores: &GenerationStores, requests: &[RequestDescriptor], responses: &[ResponseDescriptor],
    ) -> Result<(), Error> {
        let store = stores.open(StoreClass::Static).await?;
        for (request, response) in requests.iter().zip(responses) {
            store.put(&request.cache_key(), &response.to_stored()).await?;
        }
        Ok(())
    }

    /// Make an installed generation the one the router serves.
    pub async fn activate(&self, installed: InstalledGeneration) -> Result<ActivationReport, Error> {
        let InstalledGeneration { generation, assets } = installed;
        let stores = GenerationStores::new(self.db.clone(), self.namespace.clone(), generation.clone());
        stores.open_all().await?;
        let keep = stores.names();
        let prefix = format!("{}-", self.namespace);

        let mut deleted_stores = Vec::new();
        for name in self.db.list_store_names().await? {
            if name.starts_with(&prefix) && !keep.contains(&name) {
                tracing::info!(store = %name, "deleting old cache store");
                if self.db.delete_store(&name).await? {
                    deleted_stores.push(name);
                }
            }
        }

        self.db.set_active_generation(&self.namespace, &generation).await?;
        self.tx.send_replace(Some(generation.clone()));
        tracing::info!(%generation, deleted = deleted_stores.len(), "cache generation activated");

        Ok(ActivationReport { generation: generation.to_string(), assets, deleted_stores })
    }

    /// Install then activate `generation`, serialized against other rollouts.
    pub async fn rollout(&self, generation: Generation) -> Result<ActivationReport, Error> {
        let _guard = self.rollout.lock().await;
        let installed = self.install(generation).await?;
        self.activate(installed).await
    }
}
