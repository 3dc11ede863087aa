//! Native video bridge command line entry point.

use std::{error::Error, process};

use clap::Parser;
use native_video_bridge::{
    cli::{Cli, formatting::format_error},
    tracing_config,
};
use tracing::{Level, error, span};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config = cli.load_config();
    let level = config
        .as_ref()
        .map(|config| config.general.log_level)
        .unwrap_or_default();

    let _guard = if cli.log_file {
        Some(tracing_config::init_with_file(level)?)
    } else {
        tracing_config::init(level)?;
        None
    };
    let _span = span!(Level::INFO, "native_video_bridge").entered();

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            eprintln!("{}: {e}", format_error("Error"));
            process::exit(1);
        }
    };

    if let Err(e) = cli.execute(&config).await {
        eprintln!("{}: {e}", format_error("Error"));
        process::exit(1);
    }

    Ok(())
}
