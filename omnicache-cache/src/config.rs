//! Configuration for the range cache
//!
//! Values are read once at construction, either filled in directly or taken
//! from the environment with [`CacheConfig::from_env`]. Unparseable values
//! fall back to their defaults with a logged diagnostic; configuration
//! never aborts cache construction.

use omnicache_core::{Error, MetricRegistry};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Default size watermark: 8 MiB
pub const DEFAULT_MAX_SIZE_BYTES: usize = 1 << 23;

/// Default telemetry collector endpoint
pub const DEFAULT_PERF_SERVER: &str = "localhost:50051";

/// Durability policy for the eviction write-back path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteBackMode {
    /// Write evicted dirty entries with the store's WAL disabled.
    ///
    /// Fastest; a crash between eviction and the store's next flush loses
    /// those updates. This is the default because the cache is an
    /// accelerator, not a source of truth.
    BestEffort,
    /// Write evicted dirty entries through the store's WAL
    Durable,
}

impl FromStr for WriteBackMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "besteffort" | "best_effort" => Ok(WriteBackMode::BestEffort),
            "durable" | "strict" => Ok(WriteBackMode::Durable),
            other => Err(Error::Config(format!(
                "unknown write-back mode: {:?}",
                other
            ))),
        }
    }
}

/// Configuration options for the range cache
///
/// # Example
///
/// ```
/// use omnicache_cache::{CacheConfig, WriteBackMode};
///
/// let config = CacheConfig {
///     enabled: true,
///     max_size_bytes: 16 * 1024 * 1024,
///     write_back: WriteBackMode::Durable,
///     ..Default::default()
/// };
/// assert!(config.enabled);
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Master switch; a disabled cache answers every lookup with a miss
    pub enabled: bool,

    /// Size watermark in bytes; exceeding it triggers eviction
    pub max_size_bytes: usize,

    /// Emit metrics to the telemetry sink
    pub perf_enabled: bool,

    /// Telemetry collector endpoint (host:port)
    pub perf_server: String,

    /// Durability of evicted dirty entries
    pub write_back: WriteBackMode,

    /// Route eviction batches through a background worker instead of
    /// writing synchronously inside the eviction cycle.
    ///
    /// Queued batches survive an orderly shutdown (the worker is drained)
    /// but not a crash; installations that cannot tolerate the additional
    /// in-flight loss should leave this off.
    pub async_write_back: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
            perf_enabled: false,
            perf_server: DEFAULT_PERF_SERVER.to_string(),
            write_back: WriteBackMode::BestEffort,
            async_write_back: false,
        }
    }
}

impl CacheConfig {
    /// Builds a configuration from the process environment
    ///
    /// Recognized variables:
    ///
    /// | Variable | Effect |
    /// |---|---|
    /// | `OC_ENABLED` | master switch |
    /// | `OC_MAXSIZE` | size watermark in bytes |
    /// | `OC_PERF` | emit metrics |
    /// | `OC_PERFSERVER` | collector endpoint |
    /// | `OC_WRITEBACK` | `besteffort` or `durable` |
    /// | `OC_ASYNCWB` | background write-back worker |
    ///
    /// Boolean variables accept `TRUE`/`ON`/`1` and `FALSE`/`OFF`/`0`,
    /// case-insensitive.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(enabled) = env_flag("OC_ENABLED") {
            config.enabled = enabled;
        }
        if let Ok(raw) = std::env::var("OC_MAXSIZE") {
            match raw.trim().parse::<usize>() {
                Ok(size) => config.max_size_bytes = size,
                Err(_) => log::warn!(
                    "OC_MAXSIZE {:?} is not a byte count, using default {}",
                    raw,
                    DEFAULT_MAX_SIZE_BYTES
                ),
            }
        }
        if let Some(perf) = env_flag("OC_PERF") {
            config.perf_enabled = perf;
        }
        if let Ok(server) = std::env::var("OC_PERFSERVER") {
            if !server.is_empty() {
                config.perf_server = server;
            }
        }
        if let Ok(raw) = std::env::var("OC_WRITEBACK") {
            match raw.parse::<WriteBackMode>() {
                Ok(mode) => config.write_back = mode,
                Err(err) => log::warn!("{}, keeping {:?}", err, config.write_back),
            }
        }
        if let Some(async_wb) = env_flag("OC_ASYNCWB") {
            config.async_write_back = async_wb;
        }

        config
    }

    /// Builds the telemetry sink this configuration describes: enabled per
    /// `perf_enabled`, pointed at `perf_server`
    pub fn telemetry(&self) -> MetricRegistry {
        MetricRegistry::new(self.perf_enabled, self.perf_server.clone())
    }
}

/// Interprets a boolean environment variable.
///
/// Returns `None` when the variable is unset or its value is neither a
/// recognized truthy nor falsy token.
fn env_flag(name: &str) -> Option<bool> {
    let raw = std::env::var(name).ok()?;
    parse_flag(&raw)
}

fn parse_flag(raw: &str) -> Option<bool> {
    let token = raw.trim();
    if token.eq_ignore_ascii_case("true")
        || token.eq_ignore_ascii_case("on")
        || token == "1"
    {
        Some(true)
    } else if token.eq_ignore_ascii_case("false")
        || token.eq_ignore_ascii_case("off")
        || token == "0"
    {
        Some(false)
    } else {
        None
    }
}
