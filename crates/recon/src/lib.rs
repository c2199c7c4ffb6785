//! `assetlink-recon`: device / owner / employee / account record linkage.
//!
//! Pure engine crate: receives pre-loaded records, returns report rows.
//! No CLI or network dependencies.

pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod project;
pub mod sources;
pub mod table;

pub use classify::AccountStatus;
pub use config::{DuplicateHostPolicy, ReportConfig};
pub use engine::run;
pub use error::ReconError;
pub use model::{
    AccountRecord, DeviceRecord, EmployeeRecord, OwnerRecord, Report, ReportInput, ReportRow,
    ReportSummary, REPORT_HEADERS, REPORT_INTEGER_COLUMNS,
};
pub use table::Table;
