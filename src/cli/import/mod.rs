//! Import command - bulk-load registration responses

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use tracing::{info, warn};

use crate::domain::Role;
use crate::infrastructure::registration::{import_file, ImportColumns};

#[derive(Args, Clone, Debug)]
pub struct ImportArgs {
    /// Comma- or semicolon-delimited file with a header row
    pub file: PathBuf,

    /// Track the rows register for: participant, mentor or judge
    #[arg(long, value_parser = parse_role)]
    pub role: Role,

    /// Header of the email column
    #[arg(long, default_value = "Email")]
    pub email_column: String,

    /// Header of the chat handle column
    #[arg(long, default_value = "Discord Username")]
    pub handle_column: String,
}

fn parse_role(value: &str) -> Result<Role, String> {
    value.parse().map_err(|e: crate::domain::DomainError| e.to_string())
}

pub async fn run(args: ImportArgs) -> anyhow::Result<()> {
    let config = super::load_config()?;
    let services = crate::create_services(&config).await?;

    let columns = ImportColumns {
        email: args.email_column,
        handle: args.handle_column,
    };

    let report = import_file(&services.registrations, &args.file, args.role, &columns)
        .await
        .with_context(|| format!("Failed to import {}", args.file.display()))?;

    for skipped in &report.skipped {
        warn!(line = skipped.line, reason = %skipped.reason, "Skipped row");
    }

    info!(
        file = %args.file.display(),
        role = %args.role,
        imported = report.imported,
        skipped = report.skipped.len(),
        "Import complete"
    );
    println!(
        "Imported {} {} registrations ({} skipped)",
        report.imported,
        args.role,
        report.skipped.len()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: ImportArgs,
    }

    #[test]
    fn test_parse_import_args() {
        let cli = TestCli::parse_from(["import", "responses.csv", "--role", "Mentor"]);

        assert_eq!(cli.args.role, Role::Mentor);
        assert_eq!(cli.args.email_column, "Email");
        assert_eq!(cli.args.handle_column, "Discord Username");
    }

    #[test]
    fn test_unknown_role_rejected() {
        let result = TestCli::try_parse_from(["import", "responses.csv", "--role", "organizer"]);
        assert!(result.is_err());
    }
}
