use async_trait::async_trait;
use saveit_core::StoreClass;

use super::{Context, Outcome, Strategy, persist, read};
use crate::classify::StrategyTag;
use crate::fetch::{RequestDescriptor, ResponseDescriptor, fetch_within};

/// Serve barcodes from the barcode store, fetching only on a miss.
///
/// Barcode images never change once issued, so hits are returned without
/// revalidation.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheFirst;

#[async_trait]
impl Strategy for CacheFirst {
    fn tag(&self) -> StrategyTag {
        StrategyTag::CacheFirst
    }

    async fn execute(&self, request: &RequestDescriptor, ctx: &Context<'_>) -> Outcome {
        if let Some(cached) = read(&ctx.stores.store(StoreClass::Barcode), &request.cache_key()).await {
            tracing::debug!(path = request.path(), "serving barcode from cache");
            return Outcome::Cached(cached);
        }

        match fetch_within(ctx.network, request, ctx.fetch_timeout).await {
            Ok(response) => {
                persist(ctx, StoreClass::Barcode, request, &response).await;
                Outcome::Fetched(response)
            }
            Err(e) => {
                tracing::debug!(path = request.path(), error = %e, "barcode unavailable offline");
                Outcome::Offline(ResponseDescriptor::barcode_offline())
            }
        }
    }
}
