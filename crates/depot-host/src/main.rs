use std::path::PathBuf;

use clap::Parser;
use depot_host::config::parse_interval;
use depot_host::{DepotConfig, run as run_host, telemetry};

#[derive(Debug, Parser)]
#[command(name = "depot", about = "Serve a directory of package archives over HTTP")]
struct Cli {
    /// Directory holding `<name>-<version>.tar.gz` archives (overrides DEPOT_PACKAGES_DIR)
    #[arg(long, value_name = "DIR")]
    packages_dir: Option<PathBuf>,

    /// JSON file used to persist download counters (overrides DEPOT_STATS_FILE)
    #[arg(long, value_name = "PATH")]
    stats_file: Option<PathBuf>,

    /// Port to serve the HTTP server on (overrides DEPOT_PORT, default 3000)
    #[arg(long)]
    port: Option<u16>,

    /// Rescan the package directory periodically, e.g. `5m` (overrides DEPOT_REFRESH_INTERVAL)
    #[arg(long, value_name = "DURATION")]
    refresh_interval: Option<String>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = telemetry::init_tracing() {
        eprintln!("{err:#}");
    }
    if let Err(err) = run().await {
        tracing::error!(error = %format!("{err:#}"), "depot failed");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut cfg = DepotConfig::from_env()?;
    if let Some(dir) = cli.packages_dir {
        cfg = cfg.with_packages_dir(dir);
    }
    if let Some(path) = cli.stats_file {
        cfg = cfg.with_stats_path(path);
    }
    if let Some(port) = cli.port {
        cfg = cfg.with_port(port);
    }
    if let Some(raw) = cli.refresh_interval {
        cfg = cfg.with_refresh_interval(parse_interval(&raw)?);
    }
    run_host(cfg).await
}
