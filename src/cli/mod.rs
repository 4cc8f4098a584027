//! Command-line interface
//!
//! - `serve`: run the registration webhook ingester
//! - `import`: bulk-load registration responses from a delimited file
//! - `export`: write every team and its members to a delimited file

pub mod export;
pub mod import;
pub mod serve;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// Hackathon registration, verification and team formation
#[derive(Parser)]
#[command(name = "hackathon-registrar")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the registration webhook server
    Serve,

    /// Import registration responses from a CSV file
    Import(import::ImportArgs),

    /// Export teams to a CSV file
    Export(export::ExportArgs),
}

/// Load `.env`, layered configuration and logging for a subcommand
pub(crate) fn load_config() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    config.validate()?;

    logging::init_logging(&config.logging);
    Ok(config)
}
