//! Runtime configuration for the Plex client and the import matcher.
//!
//! Values come from command-line flags or their `PLEX_*` environment
//! fallbacks; this module only holds and validates them.

use reqwest::Url;
use std::time::Duration;
use thiserror::Error;

use crate::scoring::{MAX_ARTIST_ALTERNATIVES, MAX_PARTIAL_ALTERNATIVES};

/// Product name sent in `X-Plex-Product`.
pub const PRODUCT_NAME: &str = "Playlister";

/// Client identifier used when none is configured.
pub const DEFAULT_CLIENT_ID: &str = "plex-playlister-cli";

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Concurrent searches during import resolution.
pub const DEFAULT_WORKERS: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid server URL '{0}'")]
    InvalidUrl(String),

    #[error("Server URL must use http or https: {0}")]
    UnsupportedScheme(String),

    #[error("A Plex token is required")]
    MissingToken,

    #[error("Worker count must be at least 1")]
    NoWorkers,
}

#[derive(Debug, Clone)]
pub struct PlexConfig {
    pub base_url: Url,
    pub token: String,
    pub client_identifier: String,
    pub library_section: Option<String>, // Music section key; discovered when unset
    pub allow_insecure: bool,            // Accept self-signed certificates
    pub timeout: Duration,
}

impl PlexConfig {
    pub fn new(base_url: &str, token: &str) -> Result<Self, ConfigError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let url = Url::parse(trimmed).map_err(|_| ConfigError::InvalidUrl(base_url.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(base_url.to_string()));
        }
        if token.trim().is_empty() {
            return Err(ConfigError::MissingToken);
        }
        Ok(Self {
            base_url: url,
            token: token.trim().to_string(),
            client_identifier: DEFAULT_CLIENT_ID.to_string(),
            library_section: None,
            allow_insecure: false,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    pub fn with_client_identifier(mut self, id: &str) -> Self {
        self.client_identifier = id.to_string();
        self
    }

    pub fn with_library_section(mut self, key: Option<String>) -> Self {
        self.library_section = key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn with_insecure(mut self, allow: bool) -> Self {
        self.allow_insecure = allow;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Absolute URL for a server path such as `/playlists`.
    pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
        self.base_url
            .join(path)
            .map_err(|_| ConfigError::InvalidUrl(format!("{}{}", self.base_url, path)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchConfig {
    pub workers: usize,
    pub fold_diacritics: bool,
    pub max_partial_alternatives: usize,
    pub max_artist_alternatives: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            fold_diacritics: true,
            max_partial_alternatives: MAX_PARTIAL_ALTERNATIVES,
            max_artist_alternatives: MAX_ARTIST_ALTERNATIVES,
        }
    }
}

impl MatchConfig {
    pub fn with_workers(mut self, workers: usize) -> Result<Self, ConfigError> {
        if workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        self.workers = workers;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plex_config_valid() {
        let cfg = PlexConfig::new("http://192.168.1.10:32400/", " abc ").unwrap();
        assert_eq!(cfg.token, "abc");
        assert_eq!(
            cfg.endpoint("/playlists").unwrap().as_str(),
            "http://192.168.1.10:32400/playlists"
        );
        assert_eq!(cfg.client_identifier, DEFAULT_CLIENT_ID);
        assert!(!cfg.allow_insecure);
    }

    #[test]
    fn test_plex_config_rejects_bad_input() {
        assert!(matches!(PlexConfig::new("not a url", "t"), Err(ConfigError::InvalidUrl(_))));
        assert!(matches!(
            PlexConfig::new("ftp://host", "t"),
            Err(ConfigError::UnsupportedScheme(_))
        ));
        assert_eq!(
            PlexConfig::new("http://host:32400", "  ").unwrap_err(),
            ConfigError::MissingToken
        );
    }

    #[test]
    fn test_library_section_blank_is_unset() {
        let cfg = PlexConfig::new("http://host:32400", "t")
            .unwrap()
            .with_library_section(Some(" ".to_string()));
        assert_eq!(cfg.library_section, None);
    }

    #[test]
    fn test_match_config() {
        let cfg = MatchConfig::default();
        assert_eq!(cfg.workers, DEFAULT_WORKERS);
        assert!(cfg.fold_diacritics);
        assert_eq!(cfg.with_workers(0), Err(ConfigError::NoWorkers));
        assert_eq!(cfg.with_workers(8).unwrap().workers, 8);
    }
}
