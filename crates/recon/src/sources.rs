//! Turn raw source tables and vendor payloads into typed records.
//!
//! Display values are copied verbatim; join keys are derived later by the
//! pipeline so nothing here rewrites what the report will show.

use chrono::{DateTime, Utc};

use crate::classify::{classify, read_flag};
use crate::config::{DeviceColumns, EmployeeColumns, OwnerColumns};
use crate::error::ReconError;
use crate::model::{AccountRecord, DeviceRecord, EmployeeRecord, OwnerRecord};
use crate::normalize::{normalize_timestamp, stale_days};
use crate::project::{project, ColumnSelector};
use crate::table::Table;

pub const SOURCE_DEVICES: &str = "devices";
pub const SOURCE_OWNERS: &str = "owners";
pub const SOURCE_EMPLOYEES: &str = "employees";
pub const SOURCE_ACCOUNTS: &str = "accounts";

// ---------------------------------------------------------------------------
// Devices
// ---------------------------------------------------------------------------

/// Build a device from the vendor's raw fields, computing display
/// timestamps and the stale period against `now`.
pub fn device_record(
    hostname: Option<&str>,
    last_seen: Option<&str>,
    first_seen: Option<&str>,
    now: DateTime<Utc>,
) -> Result<DeviceRecord, ReconError> {
    Ok(DeviceRecord {
        hostname: hostname.map(str::to_string),
        last_seen: last_seen.map(str::to_string),
        first_seen: first_seen.map(str::to_string),
        last_seen_utc: normalize_timestamp(SOURCE_DEVICES, "last_seen", last_seen)?,
        first_seen_utc: normalize_timestamp(SOURCE_DEVICES, "first_seen", first_seen)?,
        stale_period_days: stale_days(SOURCE_DEVICES, last_seen, now)?,
    })
}

/// Devices from a local export with vendor-shaped timestamps.
pub fn devices_from_table(
    table: &Table,
    columns: &DeviceColumns,
    now: DateTime<Utc>,
) -> Result<Vec<DeviceRecord>, ReconError> {
    let selected = project(
        SOURCE_DEVICES,
        table,
        &ColumnSelector::names(&[&columns.hostname, &columns.last_seen, &columns.first_seen]),
        false,
    )?;
    (0..selected.len())
        .map(|r| device_record(selected.cell(r, 0), selected.cell(r, 1), selected.cell(r, 2), now))
        .collect()
}

// ---------------------------------------------------------------------------
// Spreadsheets
// ---------------------------------------------------------------------------

pub fn owners_from_table(table: &Table, columns: &OwnerColumns) -> Result<Vec<OwnerRecord>, ReconError> {
    let selected = project(
        SOURCE_OWNERS,
        table,
        &ColumnSelector::names(&[&columns.host_name, &columns.first_name, &columns.last_name]),
        columns.header_row_override,
    )?;
    Ok(selected
        .rows
        .into_iter()
        .map(|mut row| {
            let last_name = row.pop().flatten();
            let first_name = row.pop().flatten();
            let host_name = row.pop().flatten();
            OwnerRecord {
                host_name,
                first_name,
                last_name,
            }
        })
        .collect())
}

pub fn employees_from_table(
    table: &Table,
    columns: &EmployeeColumns,
) -> Result<Vec<EmployeeRecord>, ReconError> {
    let selected = project(
        SOURCE_EMPLOYEES,
        table,
        &ColumnSelector::names(&[&columns.first_name, &columns.last_name, &columns.email]),
        columns.header_row_override,
    )?;
    Ok(selected
        .rows
        .into_iter()
        .map(|mut row| {
            let email = row.pop().flatten();
            let last_name = row.pop().flatten();
            let first_name = row.pop().flatten();
            EmployeeRecord {
                first_name,
                last_name,
                email,
            }
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Credential vendor
// ---------------------------------------------------------------------------

/// Accounts from a bulk user-data payload:
/// `{"Users": {id: {...}}, "invited": [username, ...]}`.
///
/// Invited usernames become accounts with no login history, which
/// classifies them as expired invitations.
pub fn accounts_from_user_data(payload: &serde_json::Value) -> Result<Vec<AccountRecord>, ReconError> {
    let users = payload
        .get("Users")
        .and_then(|u| u.as_object())
        .ok_or_else(|| ReconError::missing_column(SOURCE_ACCOUNTS, "Users"))?;

    let mut accounts: Vec<AccountRecord> = users
        .values()
        .map(|user| {
            let disabled = read_flag(user.get("disabled")).unwrap_or(false);
            let never_logged_in = read_flag(user.get("neverloggedin"));
            AccountRecord {
                username: json_text(user.get("username")),
                account_status: classify(disabled, never_logged_in),
                last_login: json_text(user.get("last_login")),
            }
        })
        .collect();

    if let Some(invited) = payload.get("invited").and_then(|i| i.as_array()) {
        for username in invited {
            accounts.push(AccountRecord {
                username: json_text(Some(username)),
                account_status: classify(false, None),
                last_login: None,
            });
        }
    }

    Ok(accounts)
}

fn json_text(value: Option<&serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) if s.is_empty() => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
