//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SAVERUSH_API_URL` - Base URL of the SaveRush backend (e.g., `https://api.saverush.in/api`)
//!
//! ## Optional
//! - `SAVERUSH_STATE_FILE` - Path of the local storage file (default: `.saverush/storage.json`)
//! - `SAVERUSH_CATALOG_CACHE_TTL_SECS` - Product lookup cache TTL (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_STATE_FILE: &str = ".saverush/storage.json";
const DEFAULT_CATALOG_CACHE_TTL_SECS: u64 = 300;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Backend API configuration
    pub backend: BackendConfig,
    /// File holding persisted guest carts and session tokens
    pub state_file: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// SaveRush backend API configuration.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL every endpoint path is resolved against
    pub api_url: Url,
    /// How long product lookups stay cached
    pub catalog_cache_ttl: Duration,
}

impl BackendConfig {
    /// Configuration pointing at `api_url` with default cache settings.
    #[must_use]
    pub const fn new(api_url: Url) -> Self {
        Self {
            api_url,
            catalog_cache_ttl: Duration::from_secs(DEFAULT_CATALOG_CACHE_TTL_SECS),
        }
    }
}

impl StorefrontConfig {
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
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw_url = lookup("SAVERUSH_API_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("SAVERUSH_API_URL".to_string()))?;
        let api_url = parse_api_url(&raw_url)?;

        let catalog_cache_ttl = lookup("SAVERUSH_CATALOG_CACHE_TTL_SECS")
            .map_or(Ok(DEFAULT_CATALOG_CACHE_TTL_SECS), |v| {
                v.parse::<u64>().map_err(|e| {
                    ConfigError::InvalidEnvVar(
                        "SAVERUSH_CATALOG_CACHE_TTL_SECS".to_string(),
                        e.to_string(),
                    )
                })
            })?;

        let state_file = lookup("SAVERUSH_STATE_FILE")
            .map_or_else(|| PathBuf::from(DEFAULT_STATE_FILE), PathBuf::from);

        Ok(Self {
            backend: BackendConfig {
                api_url,
                catalog_cache_ttl: Duration::from_secs(catalog_cache_ttl),
            },
            state_file,
            sentry_dsn: lookup("SENTRY_DSN"),
            sentry_environment: lookup("SENTRY_ENVIRONMENT"),
        })
    }
}

/// Parse the API base URL, normalizing it to end with `/` so relative
/// endpoint paths join underneath it instead of replacing the last segment.
fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidEnvVar("SAVERUSH_API_URL".to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "SAVERUSH_API_URL".to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_api_url() {
        let result = StorefrontConfig::from_lookup(lookup_from(&[]));
        assert!(
            matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "SAVERUSH_API_URL")
        );
    }

    #[test]
    fn test_defaults() {
        let config = StorefrontConfig::from_lookup(lookup_from(&[(
            "SAVERUSH_API_URL",
            "https://api.saverush.in/api",
        )]))
        .unwrap();

        assert_eq!(config.backend.api_url.as_str(), "https://api.saverush.in/api/");
        assert_eq!(config.backend.catalog_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.state_file, PathBuf::from(".saverush/storage.json"));
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_trailing_slash_preserved() {
        let url = parse_api_url("http://localhost:5000/").unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/");
    }

    #[test]
    fn test_invalid_scheme() {
        let result = parse_api_url("ftp://example.com");
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_invalid_cache_ttl() {
        let result = StorefrontConfig::from_lookup(lookup_from(&[
            ("SAVERUSH_API_URL", "http://localhost:5000"),
            ("SAVERUSH_CATALOG_CACHE_TTL_SECS", "soon"),
        ]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidEnvVar(ref v, _)) if v == "SAVERUSH_CATALOG_CACHE_TTL_SECS"
        ));
    }

    #[test]
    fn test_overrides() {
        let config = StorefrontConfig::from_lookup(lookup_from(&[
            ("SAVERUSH_API_URL", "http://localhost:5000"),
            ("SAVERUSH_STATE_FILE", "/tmp/saverush.json"),
            ("SAVERUSH_CATALOG_CACHE_TTL_SECS", "30"),
            ("SENTRY_DSN", "https://key@sentry.io/1"),
        ]))
        .unwrap();

        assert_eq!(config.state_file, PathBuf::from("/tmp/saverush.json"));
        assert_eq!(config.backend.catalog_cache_ttl, Duration::from_secs(30));
        assert_eq!(config.sentry_dsn.as_deref(), Some("https://key@sentry.io/1"));
    }
}
