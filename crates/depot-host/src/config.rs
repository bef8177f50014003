use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_PORT: u16 = 3000;

/// Environment-driven configuration for the depot host.
#[derive(Debug, Clone)]
pub struct DepotConfig {
    pub packages_dir: PathBuf,
    pub stats_path: PathBuf,
    pub port: u16,
    /// Periodic rescan interval; `None` disables the background watcher.
    pub refresh_interval: Option<Duration>,
}

impl DepotConfig {
    /// Build a [`DepotConfig`] by reading the documented DEPOT_* variables.
    pub fn from_env() -> Result<Self> {
        let packages_dir = env::var("DEPOT_PACKAGES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("packages"));

        let stats_path = env::var("DEPOT_STATS_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("download-stats.json"));

        let port = env::var("DEPOT_PORT")
            .ok()
            .map(|raw| {
                raw.trim()
                    .parse::<u16>()
                    .with_context(|| format!("DEPOT_PORT `{raw}` is not a valid port"))
            })
            .transpose()?
            .unwrap_or(DEFAULT_PORT);

        let refresh_interval = env::var("DEPOT_REFRESH_INTERVAL")
            .ok()
            .map(|raw| parse_interval(&raw))
            .transpose()?
            .flatten();

        Ok(Self {
            packages_dir,
            stats_path,
            port,
            refresh_interval,
        })
    }

    pub fn with_packages_dir(mut self, dir: PathBuf) -> Self {
        self.packages_dir = dir;
        self
    }

    pub fn with_stats_path(mut self, path: PathBuf) -> Self {
        self.stats_path = path;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_refresh_interval(mut self, interval: Option<Duration>) -> Self {
        self.refresh_interval = interval;
        self
    }
}

/// Parse a humantime duration (`30s`, `5m`). Empty or zero disables refresh.
pub fn parse_interval(raw: &str) -> Result<Option<Duration>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let interval = humantime::parse_duration(raw)
        .with_context(|| format!("refresh interval `{raw}` is not a valid duration"))?;
    Ok(Some(interval).filter(|interval| !interval.is_zero()))
}
