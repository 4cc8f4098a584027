//! Tabular export of team snapshots

use std::io::Write;
use std::path::Path;

use thiserror::Error;
use tracing::info;

use super::service::TeamSnapshot;
use crate::domain::identity::VerifiedIdentity;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write export file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode export row: {0}")]
    Csv(#[from] csv::Error),
}

/// Header row: `Team ID, Team name, Member1..MemberN`
pub fn export_headers(member_columns: usize) -> Vec<String> {
    let mut headers = vec!["Team ID".to_string(), "Team name".to_string()];
    headers.extend((1..=member_columns).map(|n| format!("Member{}", n)));
    headers
}

/// Write one row per team. Each member cell is `email (account id)`.
///
/// At least `member_columns` member columns are written; more if a team is
/// larger. Returns the number of team rows.
pub fn write_team_export<W: Write>(
    writer: W,
    snapshots: &[TeamSnapshot],
    member_columns: usize,
) -> Result<usize, ExportError> {
    let columns = snapshots
        .iter()
        .map(|snapshot| snapshot.members.len())
        .max()
        .unwrap_or_default()
        .max(member_columns);

    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(writer);
    writer.write_record(export_headers(columns))?;

    for snapshot in snapshots {
        let mut record = vec![
            snapshot.team.id().to_string(),
            snapshot.team.name().to_string(),
        ];
        record.extend(snapshot.members.iter().map(member_cell));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(snapshots.len())
}

fn member_cell(member: &VerifiedIdentity) -> String {
    format!("{} ({})", member.email(), member.user_id())
}

/// Write the export to `path`, replacing any existing file
pub fn export_to_file(
    path: &Path,
    snapshots: &[TeamSnapshot],
    member_columns: usize,
) -> Result<usize, ExportError> {
    let file = std::fs::File::create(path)?;
    let rows = write_team_export(file, snapshots, member_columns)?;

    info!(path = %path.display(), teams = rows, "Team export written");
    Ok(rows)
}
