//! cache_stores tool implementation.
//!
//! Lists every store in the database and the active generation.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use saveit_client::LifecycleManager;
use saveit_core::{CacheDb, Error};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the cache_stores tool. Takes none.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheStoresParams {}

/// One store and its entry count.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StoreSummary {
    pub name: String,
    pub entries: u64,
}

/// Output from the cache_stores tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheStoresOutput {
    pub namespace: String,
    /// Generation the router currently serves from, if any.
    pub active_generation: Option<String>,
    /// All store names, sorted.
    pub stores: Vec<StoreSummary>,
}

/// Implementation of the cache_stores tool.
pub async fn stores_impl(
    cache: &CacheDb, lifecycle: &LifecycleManager, _params: CacheStoresParams,
) -> Result<CallToolResult, McpError> {
    let stores = cache
        .store_entry_counts()
        .await?
        .into_iter()
        .map(|(name, entries)| StoreSummary { name, entries })
        .collect();

    let output = CacheStoresOutput {
        namespace: lifecycle.namespace().to_string(),
        active_generation: lifecycle.active().map(|g| g.to_string()),
        stores,
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{Fixture, output_of};

    #[tokio::test]
    async fn test_stores_empty_before_activation() {
        let fixture = Fixture::new().await;

        let result = stores_impl(&fixture.db, &fixture.lifecycle, CacheStoresParams::default()).await.unwrap();
        let output: CacheStoresOutput = output_of(&result);
        assert_eq!(output.namespace, "saveit");
        assert!(output.active_generation.is_none());
        assert!(output.stores.is_empty());
    }

    #[tokio::test]
    async fn test_stores_lists_sorted_names_with_counts() {
        let fixture = Fixture::activated().await;
        fixture.db.open_store("saveit-static-v3").await.unwrap();

        let result = stores_impl(&fixture.db, &fixture.lifecycle, CacheStoresParams::default()).await.unwrap();
        let output: CacheStoresOutput = output_of(&result);
        assert_eq!(output.active_generation.as_deref(), Some("v4"));
        let names: Vec<_> = output.stores.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["saveit-barcodes-v4", "saveit-dynamic-v4", "saveit-static-v3", "saveit-static-v4"]
        );
        assert!(output.stores.iter().all(|s| s.entries == 0));
    }

    #[tokio::test]
    async fn test_stores_does_not_recreate_deleted_store() {
        let fixture = Fixture::activated().await;
        fixture.db.delete_store("saveit-dynamic-v4").await.unwrap();

        let result = stores_impl(&fixture.db, &fixture.lifecycle, CacheStoresParams::default()).await.unwrap();
        let output: CacheStoresOutput = output_of(&result);
        let names: Vec<_> = output.stores.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["saveit-barcodes-v4", "saveit-static-v4"]);
        assert!(!fixture.db.list_store_names().await.unwrap().contains("saveit-dynamic-v4"));
    }
}
