use clap::Parser;
use hackathon_registrar::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => cli::serve::run().await,
        Command::Import(args) => cli::import::run(args).await,
        Command::Export(args) => cli::export::run(args).await,
    }
}
