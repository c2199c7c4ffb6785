//! Typed source records, intermediate join rows and the report row.

use serde::Serialize;

use crate::classify::AccountStatus;

// ---------------------------------------------------------------------------
// Input records
// ---------------------------------------------------------------------------

/// One endpoint from the security vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceRecord {
    pub hostname: Option<String>,
    /// Raw vendor `last_seen`.
    pub last_seen: Option<String>,
    /// Raw vendor `first_seen`.
    pub first_seen: Option<String>,
    pub last_seen_utc: Option<String>,
    pub first_seen_utc: Option<String>,
    pub stale_period_days: Option<i64>,
}

/// Device-owner sheet row: which person holds which host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerRecord {
    pub host_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Employee sheet row. Rows with a blank name never reach the name join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmployeeRecord {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

impl EmployeeRecord {
    pub fn has_full_name(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.first_name) && present(&self.last_name)
    }
}

/// Credential-vendor user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountRecord {
    pub username: Option<String>,
    pub account_status: Option<AccountStatus>,
    pub last_login: Option<String>,
}

/// The four immutable inputs of one report run.
#[derive(Debug, Clone, Default)]
pub struct ReportInput {
    pub devices: Vec<DeviceRecord>,
    pub owners: Vec<OwnerRecord>,
    pub employees: Vec<EmployeeRecord>,
    pub accounts: Vec<AccountRecord>,
}

// ---------------------------------------------------------------------------
// Intermediate join rows
// ---------------------------------------------------------------------------

/// Device joined to its owner (stage 1). Owner fields are `None` when the
/// hostname had no owner row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRecord {
    pub host_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub last_seen_utc: Option<String>,
    pub first_seen_utc: Option<String>,
    pub stale_period_days: Option<i64>,
}

/// Outer-join row (stage 2). Both sides keep their own name fields; the
/// report decides which one to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameJoinRow {
    pub employee: Option<EmployeeRecord>,
    pub host: Option<HostRecord>,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Report headers in output order.
pub const REPORT_HEADERS: [&str; 9] = [
    "First Name",
    "Last Name",
    "Email",
    "Host Name",
    "CrowdStrike Last Seen (UTC)",
    "CrowdStrike First Seen (UTC)",
    "CrowdStrike Stale Period (days)",
    "LastPass Account Status",
    "LastPass Last Login",
];

/// Report columns holding whole numbers.
pub const REPORT_INTEGER_COLUMNS: [&str; 1] = ["CrowdStrike Stale Period (days)"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub host_name: Option<String>,
    pub last_seen_utc: Option<String>,
    pub first_seen_utc: Option<String>,
    pub stale_period_days: Option<i64>,
    pub account_status: Option<AccountStatus>,
    pub last_login: Option<String>,
}

impl ReportRow {
    /// Cells in [`REPORT_HEADERS`] order.
    pub fn cells(&self) -> Vec<Option<String>> {
        vec![
            self.first_name.clone(),
            self.last_name.clone(),
            self.email.clone(),
            self.host_name.clone(),
            self.last_seen_utc.clone(),
            self.first_seen_utc.clone(),
            self.stale_period_days.map(|d| d.to_string()),
            self.account_status.map(|s| s.to_string()),
            self.last_login.clone(),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub devices: usize,
    pub owners: usize,
    pub employees: usize,
    pub employees_dropped: usize,
    pub accounts: usize,
    pub hosts: usize,
    pub rows: usize,
    pub duplicate_rows_dropped: usize,
    pub unmatched_devices: usize,
    pub unmatched_employees: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub summary: ReportSummary,
    pub rows: Vec<ReportRow>,
}

impl Report {
    /// Flatten into a [`crate::table::Table`] with [`REPORT_HEADERS`].
    pub fn to_table(&self) -> crate::table::Table {
        let mut table =
            crate::table::Table::new(REPORT_HEADERS.iter().map(|h| h.to_string()).collect());
        for row in &self.rows {
            table.push_row(row.cells());
        }
        table
    }
}
