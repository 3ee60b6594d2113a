//! Shared fixtures for tool tests.

use std::sync::Arc;
use std::time::Duration;

use rmcp::model::CallToolResult;
use saveit_client::testing::ScriptedNetwork;
use saveit_client::{LifecycleManager, Network, Router};
use saveit_core::{AppConfig, CacheDb, Generation};
use serde::de::DeserializeOwned;

pub struct Fixture {
    pub db: CacheDb,
    pub scripted: Arc<ScriptedNetwork>,
    pub network: Arc<dyn Network>,
    pub lifecycle: LifecycleManager,
    pub router: Router,
    pub timeout: Duration,
}

impl Fixture {
    pub async fn new() -> Self {
        let config = AppConfig { manifest: vec!["/".to_string()], timeout_ms: 1_000, ..AppConfig::default() };
        let db = CacheDb::open_in_memory().await.unwrap();
        let scripted = Arc::new(ScriptedNetwork::new());
        let network: Arc<dyn Network> = scripted.clone();
        let lifecycle = LifecycleManager::from_config(&config, db.clone(), network.clone()).unwrap();
        let router = Router::from_config(&config, db.clone(), network.clone(), lifecycle.gate());
        Self { db, scripted, network, lifecycle, router, timeout: config.timeout() }
    }

    /// A fixture whose `v4` generation is already active.
    pub async fn activated() -> Self {
        let fixture = Self::new().await;
        fixture.db.set_active_generation("saveit", &Generation::new("v4").unwrap()).await.unwrap();
        fixture.lifecycle.restore().await.unwrap();
        fixture
    }
}

/// Decode the JSON text payload of a successful tool call.
pub fn output_of<T: DeserializeOwned>(result: &CallToolResult) -> T {
    let content_val = serde_json::to_value(&result.content[0]).unwrap();
    let text = content_val
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
