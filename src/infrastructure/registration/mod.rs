//! Registration intake: service and bulk import

mod csv_import;
mod service;

pub use csv_import::{
    detect_delimiter, import_file, import_registrations, ImportColumns, ImportError, ImportReport,
    SkippedRow,
};
pub use service::RegistrationService;
