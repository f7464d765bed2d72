//! Resolution of the effective service settings from CLI flags, environment
//! variables, and the config file.
//!
//! Precedence, highest first: CLI flag, environment (`PORT`,
//! `CHROME_EXECUTABLE`), config file, built-in default.

use std::path::PathBuf;
use std::time::Duration;

use prerender_lib::Config;

use crate::cli::Cli;

/// Environment values honored for deployment compatibility.
#[derive(Debug, Default)]
pub struct EnvOverrides {
    pub port: Option<u16>,
    pub chrome_executable: Option<PathBuf>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("PORT").ok().and_then(|v| v.parse().ok()),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok().map(PathBuf::from),
        }
    }
}

/// Settings after merging all sources.
#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    pub port: u16,
    pub chrome_executable: Option<PathBuf>,
    pub max_entries: usize,
    pub ttl: Duration,
    pub navigation_timeout: Duration,
    pub user_agent: String,
}

pub fn resolve_settings(cli: &Cli, config: &Config, env: &EnvOverrides) -> ResolvedSettings {
    ResolvedSettings {
        port: cli.port.or(env.port).unwrap_or(config.port),
        chrome_executable: cli
            .chrome_executable
            .clone()
            .or_else(|| env.chrome_executable.clone())
            .or_else(|| config.chrome_executable.clone()),
        max_entries: cli.cache_entries.unwrap_or(config.cache.max_entries),
        ttl: cli
            .cache_ttl
            .map(Duration::from_secs)
            .unwrap_or(config.cache.ttl),
        navigation_timeout: cli
            .nav_timeout
            .map(Duration::from_secs)
            .unwrap_or(config.render.navigation_timeout),
        user_agent: config.render.user_agent.clone(),
    }
}

/// Format the effective configuration as a single line for the startup log.
pub fn format_effective_config(settings: &ResolvedSettings) -> String {
    let executable = settings
        .chrome_executable
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "auto-detect".to_string());
    format!(
        "Effective config: port={}, chrome={}, cache: max_entries={}, ttl={}s, render: nav_timeout={}s",
        settings.port,
        executable,
        settings.max_entries,
        settings.ttl.as_secs(),
        settings.navigation_timeout.as_secs(),
    )
}
