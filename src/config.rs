//! Configuration Module
//!
//! Resolves the cache root and TTL settings, optionally from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::CACHE_DIR_NAME;
use crate::error::{CacheError, Result};

/// Default interval between background sweeps, in seconds
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Cache configuration parameters.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory holding the entry files
    pub cache_dir: PathBuf,
    /// TTL applied to entries stored without an explicit TTL
    pub default_ttl: Option<Duration>,
    /// Background sweep task interval
    pub sweep_interval: Duration,
}

impl Config {
    /// Creates a Config rooted at `cache_dir` with default settings.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            default_ttl: None,
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }

    /// Creates a Config rooted at the platform cache directory.
    ///
    /// Fails with `DirectoryUnavailable` when the platform exposes no cache directory.
    pub fn platform() -> Result<Self> {
        Ok(Self::new(platform_cache_dir()?))
    }

    /// Sets the TTL used when `put` is called without one.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Sets the background sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Creates a new Config by loading values from environment variables.
    ///
    /// Unparseable or zero values fall back to the defaults.
    ///
    /// # Environment Variables
    /// - `OBJCACHE_DIR` - Cache root (default: platform cache dir + `objcache`)
    /// - `OBJCACHE_DEFAULT_TTL` - Default TTL in seconds (default: none)
    /// - `OBJCACHE_SWEEP_INTERVAL` - Sweep frequency in seconds (default: 60)
    pub fn from_env() -> Result<Self> {
        let cache_dir = match env::var_os("OBJCACHE_DIR") {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => platform_cache_dir()?,
        };

        Ok(Self {
            cache_dir,
            default_ttl: env_secs("OBJCACHE_DEFAULT_TTL").map(Duration::from_secs),
            sweep_interval: Duration::from_secs(
                env_secs("OBJCACHE_SWEEP_INTERVAL").unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS),
            ),
        })
    }
}

impl Default for Config {
    /// Roots the cache in the platform cache directory, or in the system temp
    /// directory when the platform has none.
    fn default() -> Self {
        let cache_dir =
            platform_cache_dir().unwrap_or_else(|_| env::temp_dir().join(CACHE_DIR_NAME));
        Self::new(cache_dir)
    }
}

/// Reads a positive number of seconds from an environment variable.
fn env_secs(name: &str) -> Option<u64> {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|&secs| secs > 0)
}

/// Returns the platform cache directory joined with the fixed cache subdirectory.
pub fn platform_cache_dir() -> Result<PathBuf> {
    dirs::cache_dir()
        .map(|base| base.join(CACHE_DIR_NAME))
        .ok_or_else(|| {
            CacheError::DirectoryUnavailable("no platform cache directory found".to_string())
        })
}
