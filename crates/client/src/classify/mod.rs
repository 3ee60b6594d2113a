//! Request classification.
//!
//! Requests are labelled by an ordered rule table: the first rule whose
//! condition matches decides the strategy, and anything unmatched falls to
//! [`StrategyTag::DefaultNetworkFirst`]. Rules overlap (a barcode URL may also
//! sit under a card prefix), so the order is part of the contract and is
//! exposed through [`Classifier::rules`].
//!
//! Classification is pure. Whether a request is intercepted at all is a
//! separate question answered by [`Classifier::intercepts`], which the router
//! checks first.

use std::fmt;

use reqwest::Method;
use saveit_core::AppConfig;
use serde::Serialize;

use crate::fetch::{RequestDescriptor, origin_of};

/// Which executor handles a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyTag {
    CacheFirst,
    NetworkOnly,
    NetworkFirstFallback,
    DefaultNetworkFirst,
}

impl StrategyTag {
    pub fn as_str(self) -> &'static str {
        match self {
            StrategyTag::CacheFirst => "cache_first",
            StrategyTag::NetworkOnly => "network_only",
            StrategyTag::NetworkFirstFallback => "network_first_fallback",
            StrategyTag::DefaultNetworkFirst => "default_network_first",
        }
    }
}

impl fmt::Display for StrategyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Predicate over a request's origin, host, path, and method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Request origin equals this origin.
    SameOrigin(String),
    /// Request host is this host or one of its subdomains.
    HostWithin(String),
    PathPrefix(String),
    PathContains(String),
    Method(Method),
    All(Vec<Condition>),
    Any(Vec<Condition>),
}

impl Condition {
    pub fn matches(&self, request: &RequestDescriptor) -> bool {
        match self {
            Condition::SameOrigin(origin) => request.origin() == origin,
            Condition::HostWithin(host) => {
                let candidate = request.host();
                candidate == host
                    || candidate
                        .strip_suffix(host.as_str())
                        .is_some_and(|prefix| prefix.ends_with('.'))
            }
            Condition::PathPrefix(prefix) => request.path().starts_with(prefix.as_str()),
            Condition::PathContains(segment) => request.path().contains(segment.as_str()),
            Condition::Method(method) => request.method() == method,
            Condition::All(conditions) => conditions.iter().all(|c| c.matches(request)),
            Condition::Any(conditions) => conditions.iter().any(|c| c.matches(request)),
        }
    }
}

/// One row of the classification table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub name: &'static str,
    pub condition: Condition,
    pub tag: StrategyTag,
}

/// Origins, hosts, and path markers the classifier is built from.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Same-origin of the hosting application, e.g. `https://saveit.app`.
    pub origin: String,
    pub asset_host: String,
    pub local_media_prefix: String,
    pub barcode_segment: String,
    pub card_prefix: String,
    pub mutation_segments: Vec<String>,
}

impl From<&AppConfig> for ClassifierConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            origin: ::url::Url::parse(&config.origin)
                .map(|url| origin_of(&url))
                .unwrap_or_else(|_| config.origin.trim_end_matches('/').to_string()),
            asset_host: config.asset_host.to_ascii_lowercase(),
            local_media_prefix: config.local_media_prefix.clone(),
            barcode_segment: config.barcode_segment.clone(),
            card_prefix: config.card_prefix.clone(),
            mutation_segments: config.mutation_segments.clone(),
        }
    }
}

/// Maps requests to strategy tags.
#[derive(Debug, Clone)]
pub struct Classifier {
    interception: Condition,
    rules: Vec<Rule>,
}

impl Classifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        let same_origin = Condition::SameOrigin(config.origin.clone());
        let remote_barcode = Condition::All(vec![
            Condition::HostWithin(config.asset_host.clone()),
            Condition::PathContains(config.barcode_segment.clone()),
        ]);
        let local_barcode =
            Condition::All(vec![same_origin.clone(), Condition::PathPrefix(config.local_media_prefix.clone())]);

        let rules = vec![
            Rule {
                name: "barcode",
                condition: Condition::All(vec![
                    Condition::Method(Method::GET),
                    Condition::Any(vec![local_barcode, remote_barcode.clone()]),
                ]),
                tag: StrategyTag::CacheFirst,
            },
            Rule {
                name: "mutation",
                condition: Condition::Any(
                    config.mutation_segments.iter().cloned().map(Condition::PathContains).collect(),
                ),
                tag: StrategyTag::NetworkOnly,
            },
            Rule {
                name: "card_page",
                condition: Condition::All(vec![same_origin.clone(), Condition::PathPrefix(config.card_prefix.clone())]),
                tag: StrategyTag::NetworkFirstFallback,
            },
        ];

        Self { interception: Condition::Any(vec![same_origin, remote_barcode]), rules }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&ClassifierConfig::from(config))
    }

    /// Whether the proxy handles `request` at all.
    ///
    /// Same-origin requests and barcode paths on the asset host are
    /// intercepted; everything else goes straight to the network.
    pub fn intercepts(&self, request: &RequestDescriptor) -> bool {
        self.interception.matches(request)
    }

    /// Label `request` with the first matching rule's tag.
    pub fn classify(&self, request: &RequestDescriptor) -> StrategyTag {
        self.rules
            .iter()
            .find(|rule| rule.condition.matches(request))
            .map_or(StrategyTag::DefaultNetworkFirst, |rule| rule.tag)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::from_config(&AppConfig::default())
    }

    fn get(url: &str) -> RequestDescriptor {
        RequestDescriptor::get(url).unwrap()
    }

    fn request(method: Method, url: &str) -> RequestDescriptor {
        RequestDescriptor::new(method, url).unwrap()
    }

    #[test]
    fn test_rule_order() {
        let names: Vec<_> = classifier().rules().iter().map(|r| (r.name, r.tag)).collect();
        assert_eq!(
            names,
            vec![
                ("barcode", StrategyTag::CacheFirst),
                ("mutation", StrategyTag::NetworkOnly),
                ("card_page", StrategyTag::NetworkFirstFallback),
            ]
        );
    }

    #[test]
    fn test_local_barcode_is_cache_first() {
        let tag = classifier().classify(&get("http://localhost:8000/media/barcodes/card-1.png"));
        assert_eq!(tag, StrategyTag::CacheFirst);
    }

    #[test]
    fn test_remote_barcode_is_cache_first() {
        let url = "https://abc.supabase.co/storage/v1/object/public/barcodes/card-1.png";
        assert_eq!(classifier().classify(&get(url)), StrategyTag::CacheFirst);
    }

    #[test]
    fn test_barcode_requires_get() {
        let url = "http://localhost:8000/media/barcodes/card-1.png";
        assert_eq!(classifier().classify(&request(Method::POST, url)), StrategyTag::DefaultNetworkFirst);
    }

    #[test]
    fn test_barcode_wins_over_mutation() {
        let url = "http://localhost:8000/media/barcodes/delete/card-1.png";
        assert_eq!(classifier().classify(&get(url)), StrategyTag::CacheFirst);
    }

    #[test]
    fn test_mutations_are_network_only() {
        let c = classifier();
        let create = request(Method::POST, "http://localhost:8000/loyalty-cards/create/");
        assert_eq!(c.classify(&create), StrategyTag::NetworkOnly);
        assert_eq!(c.classify(&get("http://localhost:8000/loyalty-cards/4/delete/")), StrategyTag::NetworkOnly);
        assert_eq!(c.classify(&get("http://localhost:8000/expenses/create/")), StrategyTag::NetworkOnly);
    }

    #[test]
    fn test_card_page_is_network_first_fallback() {
        let tag = classifier().classify(&get("http://localhost:8000/loyalty-cards/4/"));
        assert_eq!(tag, StrategyTag::NetworkFirstFallback);
    }

    #[test]
    fn test_card_prefix_on_other_origin_is_default() {
        let tag = classifier().classify(&get("https://abc.supabase.co/loyalty-cards/4/"));
        assert_eq!(tag, StrategyTag::DefaultNetworkFirst);
    }

    #[test]
    fn test_everything_else_is_default() {
        let c = classifier();
        assert_eq!(c.classify(&get("http://localhost:8000/")), StrategyTag::DefaultNetworkFirst);
        let asset = get("http://localhost:8000/static/core/js/utils.js");
        assert_eq!(c.classify(&asset), StrategyTag::DefaultNetworkFirst);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let c = classifier();
        for url in [
            "http://localhost:8000/media/barcodes/1.png",
            "http://localhost:8000/loyalty-cards/1/",
            "http://localhost:8000/loyalty-cards/1/delete/",
            "http://localhost:8000/dashboard/",
        ] {
            let request = get(url);
            assert_eq!(c.classify(&request), c.classify(&request), "{url}");
        }
    }

    #[test]
    fn test_interception_allowlist() {
        let c = classifier();
        assert!(c.intercepts(&get("http://localhost:8000/anything")));
        assert!(c.intercepts(&get("https://abc.supabase.co/storage/barcodes/1.png")));
        assert!(c.intercepts(&request(Method::POST, "https://abc.supabase.co/storage/barcodes/1.png")));
        assert!(!c.intercepts(&get("https://abc.supabase.co/storage/avatars/1.png")));
        assert!(!c.intercepts(&get("https://cdn.jsdelivr.net/npm/chart.js")));
        assert!(!c.intercepts(&get("http://localhost:9000/media/barcodes/1.png")));
    }

    #[test]
    fn test_host_within_requires_label_boundary() {
        let condition = Condition::HostWithin("supabase.co".into());
        assert!(condition.matches(&get("https://supabase.co/x")));
        assert!(condition.matches(&get("https://abc.supabase.co/x")));
        assert!(!condition.matches(&get("https://evilsupabase.co/x")));
    }
}
