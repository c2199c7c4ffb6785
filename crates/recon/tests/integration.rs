use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;

use assetlink_recon::config::{DuplicateHostPolicy, ReportConfig};
use assetlink_recon::sources::{
    accounts_from_user_data, device_record, devices_from_table, employees_from_table,
    owners_from_table,
};
use assetlink_recon::{run, AccountStatus, ReconError, Report, ReportInput, Table, REPORT_HEADERS};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
}

fn s(v: &str) -> Option<String> {
    if v.is_empty() {
        None
    } else {
        Some(v.to_string())
    }
}

fn grid(rows: &[&[&str]]) -> Table {
    Table::from_grid(rows.iter().map(|r| r.iter().map(|c| s(c)).collect()).collect())
}

fn owners_sheet(rows: &[&[&str]]) -> Table {
    let mut all: Vec<&[&str]> = vec![&["Host Name", "First Name", "Last Name"]];
    all.extend_from_slice(rows);
    grid(&all)
}

fn employees_sheet(rows: &[&[&str]]) -> Table {
    let mut all: Vec<&[&str]> = vec![&["First Name", "Last Name", "Email"]];
    all.extend_from_slice(rows);
    grid(&all)
}

fn devices_sheet(rows: &[&[&str]]) -> Table {
    let mut all: Vec<&[&str]> = vec![&["hostname", "last_seen", "first_seen"]];
    all.extend_from_slice(rows);
    grid(&all)
}

fn build(
    config: &ReportConfig,
    devices: Table,
    owners: Table,
    employees: Table,
    users: serde_json::Value,
) -> Result<Report, ReconError> {
    let input = ReportInput {
        devices: devices_from_table(&devices, &config.devices, now())?,
        owners: owners_from_table(&owners, &config.owners)?,
        employees: employees_from_table(&employees, &config.employees)?,
        accounts: accounts_from_user_data(&users)?,
    };
    run(config, &input)
}

// -------------------------------------------------------------------------
// End to end
// -------------------------------------------------------------------------

#[test]
fn single_person_full_chain() {
    let config = ReportConfig::default();
    let report = build(
        &config,
        devices_sheet(&[&["WS-01", "2024-01-10T00:00:00Z", "2023-03-01T09:15:00Z"]]),
        owners_sheet(&[&["ws-01", "Jane", "Doe"]]),
        employees_sheet(&[&["jane", " doe ", "Jane.Doe@co.com"]]),
        json!({"Users": {"1": {
            "username": "jane.doe@co.com",
            "disabled": false,
            "neverloggedin": false,
            "last_login": "2024-01-09T08:00:00Z"
        }}}),
    )
    .unwrap();

    assert_eq!(report.rows.len(), 1);
    let row = &report.rows[0];
    assert_eq!(row.first_name.as_deref(), Some("jane"));
    assert_eq!(row.last_name.as_deref(), Some(" doe "));
    assert_eq!(row.email.as_deref(), Some("jane.doe@co.com"));
    assert_eq!(row.host_name.as_deref(), Some("WS-01"));
    assert_eq!(row.last_seen_utc.as_deref(), Some("2024-01-10 00:00:00"));
    assert_eq!(row.first_seen_utc.as_deref(), Some("2023-03-01 09:15:00"));
    assert_eq!(row.stale_period_days, Some(5));
    assert_eq!(row.account_status, Some(AccountStatus::Active));
    assert_eq!(row.last_login.as_deref(), Some("2024-01-09T08:00:00Z"));

    assert_eq!(report.summary.devices, 1);
    assert_eq!(report.summary.unmatched_devices, 0);
    assert_eq!(report.summary.unmatched_employees, 0);
}

#[test]
fn report_table_has_fixed_headers() {
    let config = ReportConfig::default();
    let report = build(
        &config,
        devices_sheet(&[&["WS-01", "2024-01-10T00:00:00Z", ""]]),
        owners_sheet(&[]),
        employees_sheet(&[]),
        json!({"Users": {}}),
    )
    .unwrap();
    let table = report.to_table();
    assert_eq!(table.headers, REPORT_HEADERS.to_vec());
    assert_eq!(table.rows.len(), 1);
    assert_eq!(table.cell(0, 3), Some("WS-01"));
    assert_eq!(table.cell(0, 6), Some("5"));
    assert_eq!(table.cell(0, 0), None);
}

// -------------------------------------------------------------------------
// Row preservation
// -------------------------------------------------------------------------

#[test]
fn unmatched_rows_survive_each_stage() {
    let config = ReportConfig::default();
    let report = build(
        &config,
        devices_sheet(&[
            &["WS-01", "2024-01-14T00:00:00Z", ""],
            &["WS-02", "2024-01-01T00:00:00Z", ""],
        ]),
        owners_sheet(&[&["WS-01", "Ada", "Lovelace"]]),
        employees_sheet(&[
            &["Ada", "Lovelace", "ada@co.com"],
            &["Grace", "Hopper", "grace@co.com"],
        ]),
        json!({"Users": {}, "invited": ["grace@co.com"]}),
    )
    .unwrap();

    // employee order first, then the host nobody claimed
    let hosts: Vec<_> = report.rows.iter().map(|r| r.host_name.as_deref()).collect();
    assert_eq!(hosts, vec![Some("WS-01"), None, Some("WS-02")]);

    let grace = &report.rows[1];
    assert_eq!(grace.first_name.as_deref(), Some("Grace"));
    assert_eq!(grace.account_status, Some(AccountStatus::ExpiredInvitation));

    let orphan = &report.rows[2];
    assert_eq!(orphan.first_name, None);
    assert_eq!(orphan.email, None);
    assert_eq!(orphan.stale_period_days, Some(14));

    assert_eq!(report.summary.unmatched_devices, 1);
    assert_eq!(report.summary.unmatched_employees, 1);
}

#[test]
fn employee_without_last_name_is_excluded() {
    let config = ReportConfig::default();
    let report = build(
        &config,
        devices_sheet(&[]),
        owners_sheet(&[]),
        employees_sheet(&[&["Cher", "", "cher@co.com"], &["Ada", "Lovelace", "ada@co.com"]]),
        json!({"Users": {}}),
    )
    .unwrap();
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].first_name.as_deref(), Some("Ada"));
    assert_eq!(report.summary.employees, 2);
    assert_eq!(report.summary.employees_dropped, 1);
}

#[test]
fn blank_hostnames_never_join() {
    let config = ReportConfig::default();
    let report = build(
        &config,
        devices_sheet(&[&["", "2024-01-14T00:00:00Z", ""]]),
        owners_sheet(&[&["", "Ada", "Lovelace"]]),
        employees_sheet(&[&["Ada", "Lovelace", "ada@co.com"]]),
        json!({"Users": {}}),
    )
    .unwrap();
    // the device row carries no owner so Ada has no host
    assert_eq!(report.rows.len(), 2);
    assert_eq!(report.rows[0].host_name, None);
    assert_eq!(report.rows[0].last_seen_utc, None);
    assert_eq!(report.rows[1].first_name, None);
    assert_eq!(report.rows[1].last_seen_utc.as_deref(), Some("2024-01-14 00:00:00"));
}

// -------------------------------------------------------------------------
// Deduplication
// -------------------------------------------------------------------------

fn shared_host_inputs() -> (Table, Table, Table) {
    (
        devices_sheet(&[&["WS-01", "2024-01-14T00:00:00Z", ""]]),
        owners_sheet(&[&["WS-01", "Ada", "Lovelace"]]),
        employees_sheet(&[
            &["Ada", "Lovelace", "ada@co.com"],
            &["ada", "LOVELACE (Contractor)", "ada.l@co.com"],
        ]),
    )
}

#[test]
fn duplicate_host_keeps_first() {
    let (devices, owners, employees) = shared_host_inputs();
    let report = build(&ReportConfig::default(), devices, owners, employees, json!({"Users": {}})).unwrap();
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].email.as_deref(), Some("ada@co.com"));
    assert_eq!(report.summary.duplicate_rows_dropped, 1);
}

#[test]
fn duplicate_host_error_policy() {
    let (devices, owners, employees) = shared_host_inputs();
    let mut config = ReportConfig::default();
    config.matching.duplicate_hosts = DuplicateHostPolicy::Error;
    let err = build(&config, devices, owners, employees, json!({"Users": {}})).unwrap_err();
    assert_eq!(
        err,
        ReconError::JoinAmbiguity {
            host_name: "WS-01".into(),
            rows: 2
        }
    );
}

#[test]
fn annotation_stripping_can_be_disabled() {
    let (devices, owners, employees) = shared_host_inputs();
    let config = ReportConfig::from_toml("[matching]\nstrip_name_annotations = false\n").unwrap();
    let report = build(&config, devices, owners, employees, json!({"Users": {}})).unwrap();
    assert_eq!(report.rows.len(), 2);
    assert_eq!(report.rows[1].host_name, None);
    assert_eq!(report.summary.duplicate_rows_dropped, 0);
}

// -------------------------------------------------------------------------
// Adversarial
// -------------------------------------------------------------------------

#[test]
fn adversarial_missing_column_names_source() {
    let config = ReportConfig::default();
    let err = build(
        &config,
        devices_sheet(&[]),
        grid(&[&["Host", "First Name", "Last Name"]]),
        employees_sheet(&[]),
        json!({"Users": {}}),
    )
    .unwrap_err();
    assert_eq!(
        err,
        ReconError::MissingColumn {
            source: "owners".into(),
            column: "Host Name".into()
        }
    );
}

#[test]
fn adversarial_malformed_timestamp_is_format_error() {
    let err = device_record(Some("WS-01"), Some("yesterday"), None, now()).unwrap_err();
    match err {
        ReconError::Format { source, field, value } => {
            assert_eq!(source, "devices");
            assert_eq!(field, "last_seen");
            assert_eq!(value, "yesterday");
        }
        other => panic!("expected format error, got {other:?}"),
    }
}

#[test]
fn banner_rows_above_header_are_skipped() {
    let mut config = ReportConfig::default();
    config.owners.header_row_override = true;
    let owners = grid(&[
        &["Asset register", "", ""],
        &["exported 2024-01-01", "", ""],
        &["Host Name", "First Name", "Last Name"],
        &["WS-01", "Ada", "Lovelace"],
    ]);
    let report = build(
        &config,
        devices_sheet(&[&["WS-01", "2024-01-14T00:00:00Z", ""]]),
        owners,
        employees_sheet(&[&["Ada", "Lovelace", "ada@co.com"]]),
        json!({"Users": {}}),
    )
    .unwrap();
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].host_name.as_deref(), Some("WS-01"));
    assert_eq!(report.rows[0].first_name.as_deref(), Some("Ada"));
}
