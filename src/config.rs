//! # Router Configuration Module
//!
//! Build-time settings for an [`Application`](crate::app::Application): the default mount
//! scope mode, the slow-match warning threshold and whether the routing table is logged after
//! a build.
//!
//! ## Sources
//!
//! Configuration can be loaded from environment variables or from a YAML document. Every
//! field has a default, so an empty document (or an empty environment) is valid.
//!
//! ### `STRATA_MOUNT_SCOPE`
//!
//! Default [`ScopeMode`] for mounts that do not choose one: `pass-through` or `copy`.
//!
//! Default: `pass-through`
//!
//! ### `STRATA_SLOW_MATCH_US`
//!
//! Route lookups slower than this many microseconds log a warning.
//!
//! Default: `1000`
//!
//! ### `STRATA_LOG_ROUTES`
//!
//! `true` logs the full routing table at info level once the application is built.
//!
//! Default: `true`
//!
//! ## Usage
//!
//! ```rust
//! use strata_router::config::RouterConfig;
//! use strata_router::dispatcher::ScopeMode;
//!
//! let config = RouterConfig::from_yaml_str("default_mount_scope: copy\n").unwrap();
//! assert_eq!(config.default_mount_scope, ScopeMode::Copy);
//! assert_eq!(config.slow_match_threshold_us, 1000);
//! ```

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use crate::dispatcher::ScopeMode;

const DEFAULT_SLOW_MATCH_US: u64 = 1000;

/// Router settings shared by every application built with them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouterConfig {
    /// Scope mode used by mounts that do not set one
    pub default_mount_scope: ScopeMode,
    /// Lookups slower than this (in microseconds) are logged as slow
    pub slow_match_threshold_us: u64,
    /// Log the routing table after each build
    pub log_routes_on_build: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            default_mount_scope: ScopeMode::PassThrough,
            slow_match_threshold_us: DEFAULT_SLOW_MATCH_US,
            log_routes_on_build: true,
        }
    }
}

impl RouterConfig {
    /// Load configuration from environment variables.
    ///
    /// Unparsable values fall back to the default with a warning.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("STRATA_MOUNT_SCOPE") {
            match raw.parse() {
                Ok(mode) => config.default_mount_scope = mode,
                Err(err) => warn!(variable = "STRATA_MOUNT_SCOPE", error = %err, "Ignoring invalid value"),
            }
        }

        if let Some(raw) = lookup("STRATA_SLOW_MATCH_US") {
            match raw.trim().parse() {
                Ok(us) => config.slow_match_threshold_us = us,
                Err(_) => warn!(variable = "STRATA_SLOW_MATCH_US", value = %raw, "Ignoring invalid value"),
            }
        }

        if let Some(raw) = lookup("STRATA_LOG_ROUTES") {
            match parse_flag(&raw) {
                Some(flag) => config.log_routes_on_build = flag,
                None => warn!(variable = "STRATA_LOG_ROUTES", value = %raw, "Ignoring invalid value"),
            }
        }

        config
    }

    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        parse_yaml(yaml, "router configuration")
    }

    /// Read and parse a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        read_yaml_file(path.as_ref(), "router configuration")
    }

    #[must_use]
    pub fn slow_match_threshold(&self) -> Duration {
        Duration::from_micros(self.slow_match_threshold_us)
    }
}

/// Parse a YAML settings document; blank input yields the defaults
pub(crate) fn parse_yaml<T: DeserializeOwned + Default>(yaml: &str, what: &str) -> Result<T> {
    if yaml.trim().is_empty() {
        return Ok(T::default());
    }
    serde_yaml::from_str(yaml).with_context(|| format!("Failed to parse {what}"))
}

pub(crate) fn read_yaml_file<T: DeserializeOwned + Default>(path: &Path, what: &str) -> Result<T> {
    let yaml = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {what} {}", path.display()))?;
    parse_yaml(&yaml, what).with_context(|| format!("Invalid {what} in {}", path.display()))
}

pub(crate) fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
