//! Sync configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOPKEEP_API_URL` - Base URL of the account API (cart, wishlist)
//!
//! ## Optional
//! - `SHOPKEEP_CATALOG_URL` - Base URL of the catalog service (default: `SHOPKEEP_API_URL`)
//! - `SHOPKEEP_STATE_DIR` - Directory for guest state files (default: .shopkeep)
//! - `SHOPKEEP_REQUEST_TIMEOUT_SECS` - Per-call timeout for remote calls (default: 10)
//! - `SHOPKEEP_CATALOG_CACHE_TTL_SECS` - Catalog cache TTL (default: 300)
//! - `SHOPKEEP_MERGE_POLICY` - `clear_always` or `retain_failed` (default: `clear_always`)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::reconciler::{MergePolicy, ReconcilerOptions};

const DEFAULT_STATE_DIR: &str = ".shopkeep";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CATALOG_CACHE_TTL_SECS: u64 = 300;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Client-side sync configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Account API base URL
    pub api_url: Url,
    /// Catalog service base URL
    pub catalog_url: Url,
    /// Directory holding guest state and the saved session
    pub state_dir: PathBuf,
    /// Upper bound on any single remote call
    pub request_timeout: Duration,
    /// How long catalog lookups stay cached
    pub catalog_cache_ttl: Duration,
    /// What happens to guest state that failed to merge on login
    pub merge_policy: MergePolicy,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl SyncConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = parse_url(
            "SHOPKEEP_API_URL",
            &lookup("SHOPKEEP_API_URL")
                .ok_or_else(|| ConfigError::MissingEnvVar("SHOPKEEP_API_URL".to_string()))?,
        )?;
        let catalog_url = match lookup("SHOPKEEP_CATALOG_URL") {
            Some(value) => parse_url("SHOPKEEP_CATALOG_URL", &value)?,
            None => api_url.clone(),
        };
        let state_dir = lookup("SHOPKEEP_STATE_DIR")
            .map_or_else(|| PathBuf::from(DEFAULT_STATE_DIR), PathBuf::from);
        let request_timeout = Duration::from_secs(parse_secs(
            &lookup,
            "SHOPKEEP_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?);
        let catalog_cache_ttl = Duration::from_secs(parse_secs(
            &lookup,
            "SHOPKEEP_CATALOG_CACHE_TTL_SECS",
            DEFAULT_CATALOG_CACHE_TTL_SECS,
        )?);
        let merge_policy = match lookup("SHOPKEEP_MERGE_POLICY") {
            Some(value) => value.parse::<MergePolicy>().map_err(|e| {
                ConfigError::InvalidEnvVar("SHOPKEEP_MERGE_POLICY".to_string(), e)
            })?,
            None => MergePolicy::default(),
        };
        let sentry_dsn = lookup("SENTRY_DSN").filter(|dsn| !dsn.is_empty());

        Ok(Self {
            api_url,
            catalog_url,
            state_dir,
            request_timeout,
            catalog_cache_ttl,
            merge_policy,
            sentry_dsn,
        })
    }

    /// Reconciler settings derived from this configuration.
    #[must_use]
    pub const fn reconciler_options(&self) -> ReconcilerOptions {
        ReconcilerOptions {
            remote_timeout: self.request_timeout,
            merge_policy: self.merge_policy,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn parse_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let url =
        Url::parse(value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "URL cannot carry API paths".to_string(),
        ));
    }
    Ok(url)
}

fn parse_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    let Some(value) = lookup(key) else {
        return Ok(default);
    };
    match value.parse::<u64>() {
        Ok(0) => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        )),
        Ok(secs) => Ok(secs),
        Err(e) => Err(ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
    }
}
