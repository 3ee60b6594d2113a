//! cache_lookup tool implementation.
//!
//! Finds which store of the active generation holds a request.

use reqwest::Method;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use saveit_client::{LifecycleManager, RequestDescriptor};
use saveit_core::{CacheDb, Error, GenerationStores, StoreClass};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the cache_lookup tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheLookupParams {
    /// Absolute URL of the cached request.
    pub url: String,

    /// HTTP method of the cached request (default: GET).
    #[serde(default = "default_method")]
    pub method: String,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the cache_lookup tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheLookupOutput {
    /// Full name of the store holding the entry.
    pub store: String,
    pub class: StoreClass,
    pub key: String,
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub bytes: usize,
    pub stored_at: String,
}

/// Implementation of the cache_lookup tool.
pub async fn lookup_impl(
    cache: &CacheDb, lifecycle: &LifecycleManager, params: CacheLookupParams,
) -> Result<CallToolResult, McpError> {
    let method = Method::from_bytes(params.method.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| Error::InvalidInput(format!("unsupported method: {}", params.method)))?;
    let request = RequestDescriptor::new(method, &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;

    let generation = lifecycle
        .active()
        .ok_or_else(|| Error::CacheMiss("no active cache generation".to_string()))?;
    let stores = GenerationStores::new(cache.clone(), lifecycle.namespace(), generation);

    let (class, entry) = stores
        .lookup_any(&request.cache_key())
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("{} {}", request.method(), request.url())))?;

    let output = CacheLookupOutput {
        store: stores.name(class),
        class,
        key: entry.key.hash().to_string(),
        url: entry.key.url().to_string(),
        status: entry.response.status,
        content_type: entry.response.header("content-type").map(String::from),
        bytes: entry.response.body.len(),
        stored_at: entry.stored_at,
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{Fixture, output_of};
    use saveit_core::StoredResponse;

    const CARD: &str = "http://localhost:8000/loyalty-cards/3/";

    fn params(url: &str) -> CacheLookupParams {
        CacheLookupParams { url: url.to_string(), method: default_method() }
    }

    #[tokio::test]
    async fn test_lookup_without_active_generation_is_miss() {
        let fixture = Fixture::new().await;

        let result = lookup_impl(&fixture.db, &fixture.lifecycle, params(CARD)).await;
        assert_eq!(result.unwrap_err().code.0, -32001);
    }

    #[tokio::test]
    async fn test_lookup_missing_entry_is_miss() {
        let fixture = Fixture::activated().await;

        let result = lookup_impl(&fixture.db, &fixture.lifecycle, params(CARD)).await;
        assert_eq!(result.unwrap_err().code.0, -32001);
    }

    #[tokio::test]
    async fn test_lookup_finds_dynamic_entry() {
        let fixture = Fixture::activated().await;
        let request = RequestDescriptor::get(CARD).unwrap();
        let stored = StoredResponse {
            status: 200,
            headers: vec![("Content-Type".to_string(), "text/html".to_string())],
            body: b"<h1>Card 3</h1>".to_vec(),
        };
        let store = fixture.db.open_store("saveit-dynamic-v4").await.unwrap();
        store.put(&request.cache_key(), &stored).await.unwrap();

        let uncanonical = params("http://LOCALHOST:8000/loyalty-cards/3/#top");
        let result = lookup_impl(&fixture.db, &fixture.lifecycle, uncanonical).await.unwrap();
        let output: CacheLookupOutput = output_of(&result);
        assert_eq!(output.store, "saveit-dynamic-v4");
        assert_eq!(output.class, StoreClass::Dynamic);
        assert_eq!(output.status, 200);
        assert_eq!(output.content_type.as_deref(), Some("text/html"));
        assert_eq!(output.bytes, 15);
    }

    #[tokio::test]
    async fn test_lookup_ignores_other_generations() {
        let fixture = Fixture::activated().await;
        let request = RequestDescriptor::get(CARD).unwrap();
        let stored = StoredResponse { status: 200, headers: vec![], body: b"old".to_vec() };
        let store = fixture.db.open_store("saveit-dynamic-v3").await.unwrap();
        store.put(&request.cache_key(), &stored).await.unwrap();

        let result = lookup_impl(&fixture.db, &fixture.lifecycle, params(CARD)).await;
        assert!(result.is_err());
    }
}
