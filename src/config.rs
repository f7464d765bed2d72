//! Configuration file support.
//!
//! All values have working defaults, so the service runs without any file.
//! A TOML file can override them; CLI flags and the `PORT` /
//! `CHROME_EXECUTABLE` environment variables are layered on top by the
//! binary (see `settings.rs`).
//!
//! ```toml
//! port = 3000
//! chrome_executable = "/usr/bin/chromium"
//!
//! [cache]
//! max_entries = 100
//! ttl = "1h"
//!
//! [render]
//! navigation_timeout = "30s"
//! user_agent = "Mozilla/5.0 (compatible; PrerenderBot/1.0)"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::cache::{DEFAULT_MAX_ENTRIES, DEFAULT_TTL};
use crate::error::{PrerenderError, Result};
use crate::render::{DEFAULT_NAVIGATION_TIMEOUT, DEFAULT_USER_AGENT};

/// Default listening port.
pub const DEFAULT_PORT: u16 = 3000;

/// Config file consulted when no `--config` path is given.
pub const DEFAULT_CONFIG_FILE: &str = "prerender.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub port: u16,
    /// Externally provided Chromium/Chrome binary. When absent, the system
    /// installation is auto-detected.
    pub chrome_executable: Option<PathBuf>,
    pub cache: CacheConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub max_entries: usize,
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    #[serde(with = "humantime_serde")]
    pub navigation_timeout: Duration,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            chrome_executable: None,
            cache: CacheConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            ttl: DEFAULT_TTL,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Config {
    /// Load from an explicit path, from `prerender.toml` in the working
    /// directory if present, or fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    Self::from_file(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PrerenderError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            PrerenderError::Config(format!("invalid config {}: {}", path.display(), e))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache.max_entries == 0 {
            return Err(PrerenderError::Config(
                "cache.max_entries must be at least 1".to_string(),
            ));
        }
        if self.cache.ttl.is_zero() {
            return Err(PrerenderError::Config(
                "cache.ttl must be non-zero".to_string(),
            ));
        }
        if self.render.navigation_timeout.is_zero() {
            return Err(PrerenderError::Config(
                "render.navigation_timeout must be non-zero".to_string(),
            ));
        }
        if self.render.user_agent.trim().is_empty() {
            return Err(PrerenderError::Config(
                "render.user_agent must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
