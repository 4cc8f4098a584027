//! Bulk import of registration responses from delimited text

use std::path::Path;

use thiserror::Error;
use tracing::{info, warn};

use super::service::RegistrationService;
use crate::domain::{DomainError, RegistrationError, Role};

/// Header names of the columns holding the email and chat handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportColumns {
    pub email: String,
    pub handle: String,
}

impl Default for ImportColumns {
    fn default() -> Self {
        Self {
            email: "Email".to_string(),
            handle: "Discord Username".to_string(),
        }
    }
}

/// A row that was not imported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    /// 1-based line number in the source file
    pub line: u64,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: Vec<SkippedRow>,
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Failed to read import file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed delimited file: {0}")]
    Csv(#[from] csv::Error),

    #[error("Header has no '{0}' column")]
    MissingColumn(String),

    #[error("Import aborted after {imported} rows: {source}")]
    Storage {
        imported: usize,
        #[source]
        source: DomainError,
    },
}

/// Semicolon when the header has more semicolons than commas, else comma
pub fn detect_delimiter(content: &str) -> u8 {
    let header = content.lines().next().unwrap_or_default();
    if header.matches(';').count() > header.matches(',').count() {
        b';'
    } else {
        b','
    }
}

struct Row {
    line: u64,
    email: Option<String>,
    handle: Option<String>,
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Result<usize, ImportError> {
    headers
        .iter()
        .position(|header| {
            header
                .trim_start_matches('\u{feff}')
                .trim()
                .eq_ignore_ascii_case(name.trim())
        })
        .ok_or_else(|| ImportError::MissingColumn(name.to_string()))
}

fn read_rows(content: &str, columns: &ImportColumns) -> Result<Vec<Row>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(detect_delimiter(content))
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    let email_index = column_index(&headers, &columns.email)?;
    let handle_index = column_index(&headers, &columns.handle)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        rows.push(Row {
            line,
            email: record.get(email_index).map(str::to_string),
            handle: record.get(handle_index).map(str::to_string),
        });
    }

    Ok(rows)
}

/// Append one registration response per row of `content`.
///
/// Rows lacking an email or handle are skipped and reported. The first
/// storage failure stops the import.
pub async fn import_registrations(
    service: &RegistrationService,
    content: &str,
    role: Role,
    columns: &ImportColumns,
) -> Result<ImportReport, ImportError> {
    let mut report = ImportReport::default();

    for row in read_rows(content, columns)? {
        let email = row.email.unwrap_or_default();
        let handle = row.handle.unwrap_or_default();

        match service.submit(role, &email, &handle).await {
            Ok(_) => report.imported += 1,
            Err(RegistrationError::MissingField(field)) => report.skipped.push(SkippedRow {
                line: row.line,
                reason: format!("missing {}", field),
            }),
            Err(RegistrationError::Storage(source)) => {
                warn!(imported = report.imported, line = row.line, error = %source, "Import aborted");
                return Err(ImportError::Storage {
                    imported: report.imported,
                    source,
                });
            }
        }
    }

    info!(
        role = %role,
        imported = report.imported,
        skipped = report.skipped.len(),
        "Import finished"
    );
    Ok(report)
}

/// Reads `path` and imports it with [`import_registrations`]
pub async fn import_file(
    service: &RegistrationService,
    path: &Path,
    role: Role,
    columns: &ImportColumns,
) -> Result<ImportReport, ImportError> {
    let content = tokio::fs::read_to_string(path).await?;
    import_registrations(service, &content, role, columns).await
}
