use std::env::{self, VarError};

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Environment variable overriding [`ResolverConfig::max_resolution_depth`]
pub const MAX_RESOLUTION_DEPTH_ENV: &str = "WIREBOX_MAX_RESOLUTION_DEPTH";

/// Environment variable overriding [`ResolverConfig::warn_on_overwrite`]
pub const WARN_ON_OVERWRITE_ENV: &str = "WIREBOX_WARN_ON_OVERWRITE";

/// Default for [`ResolverConfig::max_resolution_depth`]. A chain this deep
/// still fits the 2 MiB stack of a spawned thread in debug builds.
pub const DEFAULT_MAX_RESOLUTION_DEPTH: usize = 100;

/// Settings shared by a resolver and every container it produces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Deepest chain of nested constructions allowed, counting the frames a
    /// provider's worker thread inherits
    pub max_resolution_depth: usize,
    /// Emit a `tracing` warning when a registration replaces an earlier one.
    /// Overwrites are recorded as diagnostics either way.
    pub warn_on_overwrite: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_resolution_depth: DEFAULT_MAX_RESOLUTION_DEPTH,
            warn_on_overwrite: true,
        }
    }
}

impl ResolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_resolution_depth(mut self, depth: usize) -> Self {
        self.max_resolution_depth = depth;
        self
    }

    pub fn with_warn_on_overwrite(mut self, warn: bool) -> Self {
        self.warn_on_overwrite = warn;
        self
    }

    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = read_env(MAX_RESOLUTION_DEPTH_ENV)? {
            config.max_resolution_depth = raw.trim().parse().map_err(|_| {
                ConfigError::invalid_env(MAX_RESOLUTION_DEPTH_ENV, raw.as_str(), "a positive integer")
            })?;
        }

        if let Some(raw) = read_env(WARN_ON_OVERWRITE_ENV)? {
            config.warn_on_overwrite = parse_bool(&raw).ok_or_else(|| {
                ConfigError::invalid_env(
                    WARN_ON_OVERWRITE_ENV,
                    raw.as_str(),
                    "true, false, 1, 0, yes, no, on or off",
                )
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_resolution_depth == 0 {
            return Err(ConfigError::InvalidDepth {
                depth: self.max_resolution_depth,
            });
        }
        Ok(())
    }
}

fn read_env(key: &'static str) -> Result<Option<String>, ConfigError> {
    match env::var(key) {
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(raw)) => Err(ConfigError::invalid_env(
            key,
            raw.to_string_lossy(),
            "valid unicode",
        )),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
