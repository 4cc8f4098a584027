//! Export command - write teams and members to CSV

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use crate::infrastructure::team::export_to_file;

#[derive(Args, Clone, Debug)]
pub struct ExportArgs {
    /// Output file, replaced if it exists
    #[arg(default_value = "team_export.csv")]
    pub file: PathBuf,
}

pub async fn run(args: ExportArgs) -> anyhow::Result<()> {
    let config = super::load_config()?;
    let services = crate::create_services(&config).await?;

    let snapshots = services.teams.snapshot().await?;
    let rows = export_to_file(&args.file, &snapshots, services.teams.settings().max_size)
        .with_context(|| format!("Failed to export to {}", args.file.display()))?;

    println!("Exported {} teams to {}", rows, args.file.display());
    Ok(())
}
