//! Dispatcher configuration.
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration:
//!
//! ```toml
//! [cache]
//! enabled = false
//! max_entries = 4096
//!
//! [dispatch]
//! static_new_alias = true
//! capability_root_members = true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {message}")]
    Invalid { message: String },
}

/// Configuration for a [`Dispatcher`](crate::Dispatcher).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Resolution cache settings.
    pub cache: CacheConfig,

    /// Candidate collection and routing.
    pub dispatch: DispatchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            dispatch: DispatchConfig::default(),
        }
    }
}

/// Memoization of resolution outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache outcomes per (type, kind, name, static-ness, argument types).
    pub enabled: bool,

    /// Once this many outcomes are cached, new ones are not admitted.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_entries: 4096,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Route a static call named `new` to the type's constructors.
    pub static_new_alias: bool,

    /// Instance lookups on a capability type also see the root type's
    /// instance members.
    pub capability_root_members: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            static_new_alias: true,
            capability_root_members: true,
        }
    }
}

impl Config {
    /// Create a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Enable the resolution cache.
    pub fn with_cache(mut self, max_entries: usize) -> Self {
        self.cache.enabled = true;
        self.cache.max_entries = max_entries;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.enabled && self.cache.max_entries == 0 {
            return Err(ConfigError::Invalid {
                message: "cache.max_entries must be positive when the cache is enabled".to_string(),
            });
        }
        Ok(())
    }
}
