use anyhow::{Context, Result};
use clap::Parser;
use std::io;
use tracing::info;

use winsnap_core::config::SnapConfig;
use winsnap_core::session::prompt;

mod capture;

#[derive(Parser, Debug)]
#[command(name = "winsnap")]
#[command(about = "Capture a window or the desktop to uncompressed BMP files")]
#[command(version)]
struct Cli {
    /// Window title to capture, or "desktop" (prompted for when omitted)
    #[arg(long)]
    target: Option<String>,

    /// Output path prefix; the second capture onward gets "(N)" appended
    #[arg(long)]
    output: Option<String>,

    /// Path to config file
    #[arg(long = "config", value_name = "PATH")]
    config_path: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Store rows top-down (negative height) instead of bottom-up
    #[arg(long)]
    top_down: bool,

    /// Capture this many times without prompting, then exit
    #[arg(long)]
    count: Option<u32>,

    /// Write the effective configuration back to the config file
    #[arg(long)]
    save_config: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    info!(
        "winsnap v{} starting (os={}, arch={})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH,
    );

    let config_path = cli
        .config_path
        .map(std::path::PathBuf::from)
        .unwrap_or_else(SnapConfig::default_path);

    let mut config = SnapConfig::load_or_default(&config_path)?;

    // CLI args override config file
    if let Some(target) = cli.target.clone() {
        config.target = target;
    }
    if let Some(output) = cli.output.clone() {
        config.output_prefix = output;
    }
    if cli.top_down {
        config.top_down = true;
    }

    // Interactive runs ask for whatever the command line left out
    if cli.count.is_none() {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut output = io::stdout();
        if cli.target.is_none() {
            config.target = prompt(
                &mut input,
                &mut output,
                "Enter window title to capture",
                &config.target,
            )
            .context("failed to read target")?;
        }
        if cli.output.is_none() {
            config.output_prefix = prompt(
                &mut input,
                &mut output,
                "Enter filepath to save",
                &config.output_prefix,
            )
            .context("failed to read output path")?;
        }
    }

    if cli.save_config {
        config.save(&config_path)?;
        info!("config saved to {}", config_path.display());
    }

    capture::run(&config, cli.count)
}
