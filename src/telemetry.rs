//! Structured logging setup
//!
//! The router only emits `tracing` events; embedding programs install a subscriber. This module
//! provides one configured the same way as [`RouterConfig`](crate::config::RouterConfig):
//! defaults for every field, `STRATA_LOG_*` environment variables, or a YAML document.
//!
//! | Variable | Field | Values |
//! |---|---|---|
//! | `STRATA_LOG_LEVEL` | `log_level` | `trace`, `debug`, `info`, `warn`, `error` |
//! | `STRATA_LOG_FORMAT` | `format` | `json`, `pretty` |
//! | `STRATA_LOG_SAMPLING_MODE` | `sampling_mode` | `all`, `error-only`, `sampled` |
//! | `STRATA_LOG_SAMPLING_RATE` | `sampling_rate` | `0.0` to `1.0` |
//! | `STRATA_LOG_ASYNC` | `async_logging` | flag |
//! | `STRATA_LOG_TARGET_FILTER` | `target_filter` | comma separated directives |
//! | `STRATA_LOG_INCLUDE_LOCATION` | `include_location` | flag |
//!
//! Invalid values keep the default. Since no subscriber exists while the configuration is read,
//! they are reported as warnings right after [`init_logging_with_config`] installs one.
//!
//! ```rust
//! use strata_router::telemetry::{LogConfig, LogFormat, SamplingMode};
//!
//! let config = LogConfig::from_yaml_str("format: pretty\nsampling_mode: error-only\n").unwrap();
//! assert_eq!(config.format, LogFormat::Pretty);
//! assert_eq!(config.sampling_mode, SamplingMode::ErrorOnly);
//! assert_eq!(config.log_level, "info");
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{warn, Level, Metadata, Subscriber};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::{Context as LayerContext, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::{parse_flag, parse_yaml, read_yaml_file};

/// Output format of the installed subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(format!("unknown log format '{other}', expected 'json' or 'pretty'")),
        }
    }
}

/// Which events pass the [`SamplingLayer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SamplingMode {
    All,
    /// WARN and ERROR only
    ErrorOnly,
    /// Every WARN and ERROR plus a fraction of the rest
    Sampled,
}

impl FromStr for SamplingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(SamplingMode::All),
            "error-only" | "error_only" => Ok(SamplingMode::ErrorOnly),
            "sampled" => Ok(SamplingMode::Sampled),
            other => Err(format!(
                "unknown sampling mode '{other}', expected 'all', 'error-only' or 'sampled'"
            )),
        }
    }
}

impl fmt::Display for SamplingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SamplingMode::All => "all",
            SamplingMode::ErrorOnly => "error-only",
            SamplingMode::Sampled => "sampled",
        })
    }
}

/// Logging settings.
///
/// `Default` is the production profile: info, JSON, sampled at 10%, buffered.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Base level when `RUST_LOG` is unset
    pub log_level: String,
    pub format: LogFormat,
    pub sampling_mode: SamplingMode,
    /// Fraction of sub-WARN events kept in [`SamplingMode::Sampled`]
    pub sampling_rate: f64,
    /// Write through a non-blocking background worker
    pub async_logging: bool,
    /// Extra filter directives, e.g. `strata_router::router=debug`
    pub target_filter: Option<String>,
    /// Include file and line in each event
    pub include_location: bool,
    /// Rejected settings, reported once a subscriber is installed
    #[serde(skip)]
    rejected: Vec<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::default_prod()
    }
}

impl LogConfig {
    /// Load from `STRATA_LOG_*` environment variables over the defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("STRATA_LOG_LEVEL") {
            match raw.trim().parse::<Level>() {
                Ok(level) => config.log_level = level.as_str().to_ascii_lowercase(),
                Err(_) => config.reject("STRATA_LOG_LEVEL", &raw),
            }
        }
        if let Some(raw) = lookup("STRATA_LOG_FORMAT") {
            match raw.parse() {
                Ok(format) => config.format = format,
                Err(_) => config.reject("STRATA_LOG_FORMAT", &raw),
            }
        }
        if let Some(raw) = lookup("STRATA_LOG_SAMPLING_MODE") {
            match raw.parse() {
                Ok(mode) => config.sampling_mode = mode,
                Err(_) => config.reject("STRATA_LOG_SAMPLING_MODE", &raw),
            }
        }
        if let Some(raw) = lookup("STRATA_LOG_SAMPLING_RATE") {
            match raw.trim().parse::<f64>() {
                Ok(rate) if (0.0..=1.0).contains(&rate) => config.sampling_rate = rate,
                _ => config.reject("STRATA_LOG_SAMPLING_RATE", &raw),
            }
        }
        if let Some(raw) = lookup("STRATA_LOG_ASYNC") {
            match parse_flag(&raw) {
                Some(flag) => config.async_logging = flag,
                None => config.reject("STRATA_LOG_ASYNC", &raw),
            }
        }
        if let Some(raw) = lookup("STRATA_LOG_INCLUDE_LOCATION") {
            match parse_flag(&raw) {
                Some(flag) => config.include_location = flag,
                None => config.reject("STRATA_LOG_INCLUDE_LOCATION", &raw),
            }
        }
        config.target_filter = lookup("STRATA_LOG_TARGET_FILTER");

        config
    }

    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        parse_yaml(yaml, "logging configuration")
    }

    /// Read and parse a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        read_yaml_file(path.as_ref(), "logging configuration")
    }

    /// Everything, pretty, synchronous, with locations
    #[must_use]
    pub fn default_dev() -> Self {
        Self {
            log_level: "debug".to_string(),
            format: LogFormat::Pretty,
            sampling_mode: SamplingMode::All,
            sampling_rate: 1.0,
            async_logging: false,
            target_filter: None,
            include_location: true,
            rejected: Vec::new(),
        }
    }

    #[must_use]
    pub fn default_prod() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            sampling_mode: SamplingMode::Sampled,
            sampling_rate: 0.1,
            async_logging: true,
            target_filter: None,
            include_location: false,
            rejected: Vec::new(),
        }
    }

    fn reject(&mut self, variable: &str, value: &str) {
        self.rejected.push(format!("{variable}={value}"));
    }

    fn level(&self) -> Level {
        self.log_level.trim().parse().unwrap_or(Level::INFO)
    }

    /// Base level plus `target_filter`; invalid directives are returned separately
    fn env_filter(&self) -> (EnvFilter, Vec<String>) {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level().as_str()));
        let mut invalid = Vec::new();

        let directives = self.target_filter.as_deref().unwrap_or_default();
        for directive in directives.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            match directive.parse() {
                Ok(parsed) => filter = filter.add_directive(parsed),
                Err(_) => invalid.push(directive.to_string()),
            }
        }
        (filter, invalid)
    }
}

/// Drops events below WARN according to a [`SamplingMode`].
///
/// In sampled mode one event out of every `1 / rate` is kept; a zero rate keeps none.
pub struct SamplingLayer {
    mode: SamplingMode,
    /// `None` when nothing below WARN is kept
    interval: Option<u64>,
    counter: AtomicU64,
}

impl SamplingLayer {
    #[must_use]
    pub fn new(mode: SamplingMode, sampling_rate: f64) -> Self {
        let rate = sampling_rate.clamp(0.0, 1.0);
        let interval = match mode {
            SamplingMode::All => Some(1),
            SamplingMode::ErrorOnly => None,
            SamplingMode::Sampled if rate > 0.0 => Some(((1.0 / rate).round() as u64).max(1)),
            SamplingMode::Sampled => None,
        };
        Self {
            mode,
            interval,
            counter: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn mode(&self) -> SamplingMode {
        self.mode
    }

    fn keeps(&self, level: Level) -> bool {
        if level <= Level::WARN {
            return true;
        }
        match self.interval {
            Some(1) => true,
            Some(interval) => self.counter.fetch_add(1, Ordering::Relaxed) % interval == 0,
            None => false,
        }
    }
}

impl<S> Layer<S> for SamplingLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn enabled(&self, metadata: &Metadata<'_>, _ctx: LayerContext<'_, S>) -> bool {
        // Spans always pass so sampled events keep their context
        metadata.is_span() || self.keeps(*metadata.level())
    }
}

/// Install the global subscriber described by `config`.
///
/// # Errors
///
/// Fails when a global subscriber is already installed.
///
/// ```no_run
/// use strata_router::telemetry::{init_logging_with_config, LogConfig};
///
/// init_logging_with_config(&LogConfig::from_env()).unwrap();
/// ```
pub fn init_logging_with_config(config: &LogConfig) -> Result<()> {
    let (filter, invalid_directives) = config.env_filter();

    let writer = if config.async_logging {
        let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());
        // The worker flushes until the process exits
        std::mem::forget(guard);
        BoxMakeWriter::new(non_blocking)
    } else {
        BoxMakeWriter::new(std::io::stdout)
    };

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_thread_ids(true)
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(SamplingLayer::new(config.sampling_mode, config.sampling_rate))
        .with(fmt_layer)
        .try_init()
        .context("Failed to install the logging subscriber")?;

    for setting in &config.rejected {
        warn!(setting = %setting, "Ignoring invalid logging setting");
    }
    for directive in &invalid_directives {
        warn!(directive = %directive, "Ignoring invalid log filter directive");
    }
    Ok(())
}
