//! sentinel: live host telemetry dashboard
//!
//! Run `sentinel` for the dashboard or `sentinel --service` for the headless
//! summary logger.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use sentinel_monitor::layout::LayoutMode;
use sentinel_monitor::theme::THEME_NAMES;
use sentinel_monitor::{debug, run_service, App, Config};

/// sentinel: live host telemetry dashboard
#[derive(Parser, Debug)]
#[command(name = "sentinel")]
#[command(version)]
#[command(about = "Terminal dashboard for host, container and security telemetry", long_about = None)]
struct Cli {
    /// Color theme
    #[arg(short, long, value_parser = THEME_NAMES)]
    theme: Option<String>,

    /// Layout mode (default, cpu, network, docker, security, minimal)
    #[arg(long)]
    layout: Option<LayoutMode>,

    /// Refresh rate in seconds
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..=10))]
    refresh: Option<u64>,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run headless, logging one summary line per tick
    #[arg(short, long)]
    service: bool,

    /// Write a default config file and exit
    #[arg(long)]
    init_config: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Debug log file used by the dashboard
    #[arg(long, default_value = "/tmp/sentinel-debug.log")]
    debug_log: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.debug {
        debug::enable();
    } else {
        debug::enable_from_env();
    }

    if cli.init_config {
        let path = Config::init_default().context("writing default config")?;
        println!("Created config: {}", path.display());
        return Ok(());
    }

    let mut config = Config::resolve(cli.config.as_deref());
    if let Some(theme) = cli.theme {
        config.theme = theme;
    }
    if let Some(layout) = cli.layout {
        config.layout = layout.to_string();
    }
    if let Some(refresh) = cli.refresh {
        config.refresh_rate = refresh;
    }
    config.validate().context("invalid configuration")?;

    if cli.service {
        run_service(config)?;
        return Ok(());
    }

    // Keep log lines off the alternate screen.
    if debug::is_enabled() {
        debug::log_to_file(&cli.debug_log)
            .with_context(|| format!("opening debug log {}", cli.debug_log.display()))?;
    }

    App::new(config).run()?;
    Ok(())
}
