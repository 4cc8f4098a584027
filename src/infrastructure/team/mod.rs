//! Team formation and export

mod export;
mod service;

pub use export::{export_headers, export_to_file, write_team_export, ExportError};
pub use service::{
    TeamService, TeamSettings, TeamSnapshot, DEFAULT_FORMATION_TIMEOUT, DEFAULT_MAX_TEAM_SIZE,
};
