use async_trait::async_trait;

use super::{Context, Outcome, Strategy};
use crate::classify::StrategyTag;
use crate::fetch::{RequestDescriptor, fetch_within};

/// Forward mutating requests untouched. Never reads or writes a store.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkOnly;

#[async_trait]
impl Strategy for NetworkOnly {
    fn tag(&self) -> StrategyTag {
        StrategyTag::NetworkOnly
    }

    async fn execute(&self, request: &RequestDescriptor, ctx: &Context<'_>) -> Outcome {
        match fetch_within(ctx.network, request, ctx.fetch_timeout).await {
            Ok(response) => Outcome::Fetched(response),
            Err(e) => Outcome::Failed(e),
        }
    }
}
