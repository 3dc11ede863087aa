//! Command-line interface.
//!
//! `replay` drives the bridge against a simulated host described by a
//! scenario file; `config` and `schema` inspect the configuration.

pub mod formatting;
pub mod replay;
pub mod scenario;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use crate::{Result, config::Config};
use scenario::Scenario;

/// Native video bridge command line
#[derive(Debug, Parser)]
#[command(name = "native-video-bridge", version, about)]
pub struct Cli {
    /// Configuration file to use instead of the default location
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Also write logs to a daily-rolling file
    #[arg(long, global = true)]
    pub log_file: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Replay a scenario and print events and command results as JSON lines
    Replay {
        /// Scenario TOML file
        scenario: PathBuf,
    },

    /// Print the effective configuration as TOML
    Config,

    /// Print the configuration JSON schema
    Schema,
}

impl Cli {
    /// Loads the configuration selected by `--config`, or the default one.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_config(&self) -> Result<Config> {
        match &self.config {
            Some(path) => Config::load_from_path(path),
            None => Config::load(),
        }
    }

    /// Runs the selected subcommand, writing its output to stdout.
    ///
    /// # Errors
    ///
    /// Returns an error if the scenario is invalid or output cannot be
    /// serialized.
    pub async fn execute(&self, config: &Config) -> Result<()> {
        match &self.command {
            Commands::Replay { scenario } => {
                let scenario = Scenario::load(scenario)?;
                let (records, mut lines) = mpsc::unbounded_channel();

                let printer = tokio::spawn(async move {
                    while let Some(record) = lines.recv().await {
                        match serde_json::to_string(&record) {
                            Ok(line) => println!("{line}"),
                            Err(e) => tracing::warn!(error = %e, "Unprintable replay record"),
                        }
                    }
                });

                let outcome = replay::run(&scenario, config, records).await;
                let _ = printer.await;
                outcome
            }
            Commands::Config => {
                print!("{}", config.to_toml_string()?);
                Ok(())
            }
            Commands::Schema => {
                let schema = schemars::schema_for!(Config);
                println!("{}", serde_json::to_string_pretty(&schema)?);
                Ok(())
            }
        }
    }
}
