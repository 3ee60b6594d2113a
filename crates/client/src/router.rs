//! Request routing.
//!
//! The router is the single entry point for intercepted traffic. It decides
//! whether a request is handled at all, classifies it, and runs the matching
//! strategy against the stores of the active generation.

use std::sync::Arc;
use std::time::Duration;

use saveit_core::{AppConfig, CacheDb, GenerationStores};

use crate::classify::{Classifier, StrategyTag};
use crate::fetch::{Network, RequestDescriptor};
use crate::lifecycle::GenerationGate;
use crate::strategy::{Context, Outcome, for_tag};

/// What the router did with a request.
#[derive(Debug)]
pub enum Disposition {
    /// Not intercepted; the caller should go to the network directly.
    Passthrough,
    /// Handled by the strategy registered for `tag`.
    Handled { tag: StrategyTag, outcome: Outcome },
}

impl Disposition {
    pub fn tag(&self) -> Option<StrategyTag> {
        match self {
            Disposition::Passthrough => None,
            Disposition::Handled { tag, .. } => Some(*tag),
        }
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        match self {
            Disposition::Passthrough => None,
            Disposition::Handled { outcome, .. } => Some(outcome),
        }
    }
}

pub struct Router {
    classifier: Classifier,
    db: CacheDb,
    network: Arc<dyn Network>,
    gate: GenerationGate,
    namespace: String,
    fetch_timeout: Duration,
}

impl Router {
    pub fn new(
        classifier: Classifier, db: CacheDb, network: Arc<dyn Network>, gate: GenerationGate,
        namespace: impl Into<String>, fetch_timeout: Duration,
    ) -> Self {
        Self { classifier, db, network, gate, namespace: namespace.into(), fetch_timeout }
    }

    pub fn from_config(config: &AppConfig, db: CacheDb, network: Arc<dyn Network>, gate: GenerationGate) -> Self {
        Self::new(
            Classifier::from_config(config),
            db,
            network,
            gate,
            config.namespace.clone(),
            config.timeout(),
        )
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Route one request.
    ///
    /// Requests outside the intercepted set, and every request before the
    /// first activation, pass through untouched.
    pub async fn handle(&self, request: &RequestDescriptor) -> Disposition {
        if !self.classifier.intercepts(request) {
            return Disposition::Passthrough;
        }
        let Some(generation) = self.gate.current() else {
            tracing::debug!(url = %request.url(), "no active cache generation; passing through");
            return Disposition::Passthrough;
        };

        let tag = self.classifier.classify(request);
        let stores = GenerationStores::new(self.db.clone(), self.namespace.clone(), generation);
        let ctx = Context { network: self.network.as_ref(), stores: &stores, fetch_timeout: self.fetch_timeout };
        let outcome = for_tag(tag).execute(request, &ctx).await;

        match &outcome {
            Outcome::Failed(e) => {
                tracing::warn!(method = %request.method(), url = %request.url(), %tag, error = %e, "request failed")
            }
            other => tracing::debug!(
                method = %request.method(),
                url = %request.url(),
                %tag,
                outcome = other.kind(),
                "request handled"
            ),
        }

        Disposition::Handled { tag, outcome }
    }
}
