//! generation_rollout tool implementation.
//!
//! Installs and activates a cache generation on demand.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use saveit_client::LifecycleManager;
use saveit_core::{Error, Generation};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the generation_rollout tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerationRolloutParams {
    /// Generation tag to install and activate, e.g. "v5".
    pub generation: String,
}

/// Output from the generation_rollout tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerationRolloutOutput {
    pub generation: String,
    /// Manifest assets seeded into the static store.
    pub assets: usize,
    /// Stores of older generations that were deleted.
    pub deleted_stores: Vec<String>,
}

/// Implementation of the generation_rollout tool.
///
/// A failed install leaves the previous generation active and its stores intact.
pub async fn rollout_impl(
    lifecycle: &LifecycleManager, params: GenerationRolloutParams,
) -> Result<CallToolResult, McpError> {
    let generation = Generation::new(params.generation)?;
    let report = lifecycle.rollout(generation).await?;

    let output = GenerationRolloutOutput {
        generation: report.generation,
        assets: report.assets,
        deleted_stores: report.deleted_stores,
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
