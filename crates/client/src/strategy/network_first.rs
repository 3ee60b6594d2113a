use async_trait::async_trait;
use saveit_core::StoreClass;

use super::{Context, Outcome, Strategy, persist, read};
use crate::classify::StrategyTag;
use crate::fetch::{RequestDescriptor, ResponseDescriptor, fetch_within};

/// Prefer the live card page; fall back to the dynamic store, then to an
/// HTML offline page.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkFirstFallback;

#[async_trait]
impl Strategy for NetworkFirstFallback {
    fn tag(&self) -> StrategyTag {
        StrategyTag::NetworkFirstFallback
    }

    async fn execute(&self, request: &RequestDescriptor, ctx: &Context<'_>) -> Outcome {
        let error = match fetch_within(ctx.network, request, ctx.fetch_timeout).await {
            Ok(response) => {
                persist(ctx, StoreClass::Dynamic, request, &response).await;
                return Outcome::Fetched(response);
            }
            Err(e) => e,
        };

        tracing::debug!(path = request.path(), error = %error, "network failed; trying dynamic store");

        if let Some(cached) = read(&ctx.stores.store(StoreClass::Dynamic), &request.cache_key()).await {
            tracing::debug!(path = request.path(), "serving cached page");
            return Outcome::Cached(cached);
        }

        Outcome::Offline(ResponseDescriptor::page_offline())
    }
}

/// Catch-all: network first, then whatever any store of the generation holds.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultNetworkFirst;

#[async_trait]
impl Strategy for DefaultNetworkFirst {
    fn tag(&self) -> StrategyTag {
        StrategyTag::DefaultNetworkFirst
    }

    async fn execute(&self, request: &RequestDescriptor, ctx: &Context<'_>) -> Outcome {
        let error = match fetch_within(ctx.network, request, ctx.fetch_timeout).await {
            Ok(response) => {
                persist(ctx, StoreClass::Dynamic, request, &response).await;
                return Outcome::Fetched(response);
            }
            Err(e) => e,
        };

        let key = request.cache_key();
        match ctx.stores.lookup_any(&key).await {
            Ok(Some((class, entry))) => {
                tracing::debug!(path = request.path(), store = %class, "serving cached response");
                Outcome::Cached(ResponseDescriptor::from(entry.response))
            }
            Ok(None) => {
                tracing::debug!(path = request.path(), error = %error, "no cached response");
                Outcome::NoMatch
            }
            Err(e) => {
                tracing::warn!(path = request.path(), error = %e, "cache lookup failed");
                Outcome::NoMatch
            }
        }
    }
}
