//! Split engine configuration.
//!
//! Defaults work out of the box; `SplitConfig::from_env` lets a CI job tune
//! the engine without code changes:
//!
//! - `PARASPLIT_EXTENSIONS`: comma-separated file suffixes per class
//!   (default: `.java,.class`)
//! - `PARASPLIT_MAX_BUILDS`: cap on builds scanned per job (default: unbounded)
//! - `PARASPLIT_PRIMARY_FALLBACK`: `true`/`false`, fall back to the primary
//!   branch job when a branch has no history (default: `true`)

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_EXTENSIONS: &str = "PARASPLIT_EXTENSIONS";
pub const ENV_MAX_BUILDS: &str = "PARASPLIT_MAX_BUILDS";
pub const ENV_PRIMARY_FALLBACK: &str = "PARASPLIT_PRIMARY_FALLBACK";

/// Errors raised while reading configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: expected a positive integer, got {value:?}")]
    InvalidCount { var: &'static str, value: String },

    #[error("{var}: expected true or false, got {value:?}")]
    InvalidFlag { var: &'static str, value: String },

    #[error("{var}: at least one non-empty extension is required")]
    NoExtensions { var: &'static str },
}

/// Tunables for reference resolution and rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Suffixes appended to each class path when rendering patterns.
    pub file_extensions: Vec<String>,

    /// Maximum number of completed builds inspected per job.
    pub max_builds_scanned: Option<usize>,

    /// Whether branch jobs without history fall back to the primary branch.
    pub primary_fallback: bool,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            file_extensions: vec![".java".to_string(), ".class".to_string()],
            max_builds_scanned: None,
            primary_fallback: true,
        }
    }
}

impl SplitConfig {
    /// Load from the process environment, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_EXTENSIONS) {
            let extensions: Vec<String> = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            if extensions.is_empty() {
                return Err(ConfigError::NoExtensions { var: ENV_EXTENSIONS });
            }
            config.file_extensions = extensions;
        }

        if let Some(value) = lookup(ENV_MAX_BUILDS) {
            let max = value
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::InvalidCount {
                    var: ENV_MAX_BUILDS,
                    value: value.clone(),
                })?;
            config.max_builds_scanned = Some(max);
        }

        if let Some(value) = lookup(ENV_PRIMARY_FALLBACK) {
            config.primary_fallback = match value.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidFlag {
                        var: ENV_PRIMARY_FALLBACK,
                        value,
                    })
                }
            };
        }

        Ok(config)
    }

    pub fn with_max_builds_scanned(mut self, max: usize) -> Self {
        self.max_builds_scanned = Some(max);
        self
    }

    pub fn without_primary_fallback(mut self) -> Self {
        self.primary_fallback = false;
        self
    }
}
