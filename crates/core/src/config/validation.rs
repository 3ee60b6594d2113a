//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use std::collections::HashSet;

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not a bare http(s) origin
    /// - `namespace` is empty or not ASCII alphanumeric
    /// - `generation` is empty or contains whitespace
    /// - a manifest entry or path prefix does not start with `/`
    /// - `timeout_ms` is outside 100ms..=5 minutes
    /// - `max_entry_bytes` is 0 or exceeds 50MB
    ///
    /// Returns `ConfigError::Missing` if the manifest or mutation segments are empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let origin = url::Url::parse(&self.origin).map_err(|e| invalid("origin", &e.to_string()))?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("origin", "scheme must be http or https"));
        }
        if origin.host_str().is_none() {
            return Err(invalid("origin", "must include a host"));
        }
        if origin.path() != "/" || origin.query().is_some() || origin.fragment().is_some() {
            return Err(invalid("origin", "must not carry a path, query, or fragment"));
        }

        if self.namespace.is_empty() || !self.namespace.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(invalid("namespace", "must be non-empty ASCII alphanumeric"));
        }

        if self.generation.is_empty() || self.generation.chars().any(char::is_whitespace) {
            return Err(invalid("generation", "must be non-empty without whitespace"));
        }

        if self.manifest.is_empty() {
            return Err(ConfigError::Missing {
                field: "manifest".into(),
                hint: "list at least the app shell path, e.g. \"/\"".into(),
            });
        }
        if let Some(entry) = self.manifest.iter().find(|p| !p.starts_with('/')) {
            return Err(invalid("manifest", &format!("entry {entry:?} must start with '/'")));
        }
        let unique: HashSet<&str> = self.manifest.iter().map(String::as_str).collect();
        if unique.len() != self.manifest.len() {
            tracing::warn!(
                entries = self.manifest.len(),
                unique = unique.len(),
                "manifest contains duplicate entries; later writes overwrite earlier ones"
            );
        }

        if self.asset_host.is_empty() || self.asset_host.contains('/') {
            return Err(invalid("asset_host", "must be a bare host name"));
        }

        for (field, value) in [
            ("local_media_prefix", &self.local_media_prefix),
            ("barcode_segment", &self.barcode_segment),
            ("card_prefix", &self.card_prefix),
        ] {
            if !value.starts_with('/') {
                return Err(invalid(field, "must start with '/'"));
            }
        }

        if self.mutation_segments.is_empty() {
            return Err(ConfigError::Missing {
                field: "mutation_segments".into(),
                hint: "set SAVEIT_MUTATION_SEGMENTS or list them in the config file".into(),
            });
        }
        if self.mutation_segments.iter().any(String::is_empty) {
            return Err(invalid("mutation_segments", "segments must not be empty"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.max_entry_bytes == 0 {
            return Err(invalid("max_entry_bytes", "must be greater than 0"));
        }
        if self.max_entry_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_entry_bytes", "must not exceed 50MB"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        Ok(())
    }
}
