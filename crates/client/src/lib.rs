//! Client code for the saveit offline proxy.
//!
//! This crate provides request classification, the caching strategies, the
//! generation lifecycle, and the router that ties them together. The server
//! drives it through [`Router`] and [`LifecycleManager`].

pub mod classify;
pub mod fetch;
pub mod lifecycle;
pub mod router;
pub mod strategy;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use classify::{Classifier, ClassifierConfig, Condition, Rule, StrategyTag};
pub use fetch::{FetchClient, FetchConfig, FetchError, Network, RequestDescriptor, ResponseDescriptor};
pub use lifecycle::{ActivationReport, GenerationGate, InstalledGeneration, LifecycleManager};
pub use router::{Disposition, Router};
pub use strategy::{Outcome, Strategy};
