//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SAVEIT_*)
//! 2. TOML config file (if SAVEIT_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SAVEIT_*)
/// 2. TOML config file (if SAVEIT_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database.
    ///
    /// Set via SAVEIT_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin of the hosting application; requests to it are same-origin.
    ///
    /// Set via SAVEIT_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Prefix shared by every store this proxy owns.
    ///
    /// Set via SAVEIT_NAMESPACE environment variable.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Current cache generation. Changing it invalidates every store.
    ///
    /// Set via SAVEIT_GENERATION environment variable.
    #[serde(default = "default_generation")]
    pub generation: String,

    /// Shell assets pre-seeded into the static store at install.
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// External host serving barcode images. Subdomains match.
    ///
    /// Set via SAVEIT_ASSET_HOST environment variable.
    #[serde(default = "default_asset_host")]
    pub asset_host: String,

    /// Same-origin path prefix for locally generated barcodes.
    #[serde(default = "default_local_media_prefix")]
    pub local_media_prefix: String,

    /// Path segment identifying barcode images on the asset host.
    #[serde(default = "default_barcode_segment")]
    pub barcode_segment: String,

    /// Same-origin path prefix for loyalty card pages.
    #[serde(default = "default_card_prefix")]
    pub card_prefix: String,

    /// Path segments marking mutating requests.
    #[serde(default = "default_mutation_segments")]
    pub mutation_segments: Vec<String>,

    /// User-Agent string for upstream requests.
    ///
    /// Set via SAVEIT_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Upstream request timeout in milliseconds.
    ///
    /// Set via SAVEIT_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Largest response body a store accepts.
    ///
    /// Set via SAVEIT_MAX_ENTRY_BYTES environment variable.
    #[serde(default = "default_max_entry_bytes")]
    pub max_entry_bytes: usize,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./saveit-cache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:8000".into()
}

fn default_namespace() -> String {
    "saveit".into()
}

fn default_generation() -> String {
    "v4".into()
}

fn default_manifest() -> Vec<String> {
    ["/", "/static/core/css/dashboard.css", "/static/core/js/utils.js", "/static/core/icons/icon-192.png"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_asset_host() -> String {
    "supabase.co".into()
}

fn default_local_media_prefix() -> String {
    "/media/barcodes/".into()
}

fn default_barcode_segment() -> String {
    "/barcodes/".into()
}

fn default_card_prefix() -> String {
    "/loyalty-cards/".into()
}

fn default_mutation_segments() -> Vec<String> {
    vec!["/create/".into(), "/delete/".into()]
}

fn default_user_agent() -> String {
    "saveit-proxy/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_entry_bytes() -> usize {
    5_242_880 // 5MB
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            namespace: default_namespace(),
            generation: default_generation(),
            manifest: default_manifest(),
            asset_host: default_asset_host(),
            local_media_prefix: default_local_media_prefix(),
            barcode_segment: default_barcode_segment(),
            card_prefix: default_card_prefix(),
            mutation_segments: default_mutation_segments(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_entry_bytes: default_max_entry_bytes(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SAVEIT_`
    /// 2. TOML file from `SAVEIT_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SAVEIT_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SAVEIT_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./saveit-cache.sqlite"));
        assert_eq!(config.namespace, "saveit");
        assert_eq!(config.generation, "v4");
        assert_eq!(config.manifest.len(), 4);
        assert_eq!(config.manifest[0], "/");
        assert_eq!(config.mutation_segments, vec!["/create/", "/delete/"]);
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.max_entry_bytes, 5_242_880);
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_load_from_toml_and_env() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "saveit.toml",
                r#"
                generation = "v7"
                manifest = ["/", "/app.js"]
                "#,
            )?;
            jail.set_env("SAVEIT_CONFIG_FILE", "saveit.toml");
            jail.set_env("SAVEIT_TIMEOUT_MS", "1500");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.generation, "v7");
            assert_eq!(config.manifest, vec!["/", "/app.js"]);
            assert_eq!(config.timeout_ms, 1500);
            assert_eq!(config.namespace, "saveit");
            Ok(())
        });
    }
}
