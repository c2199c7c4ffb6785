//! The report pipeline: host join, name join, account join, then
//! per-host deduplication of the projected rows.

use std::collections::{HashMap, HashSet};

use crate::config::{DuplicateHostPolicy, MatchingConfig, ReportConfig};
use crate::error::ReconError;
use crate::evidence::compute_summary;
use crate::matcher::{left_join, outer_join};
use crate::model::{
    AccountRecord, DeviceRecord, EmployeeRecord, HostRecord, NameJoinRow, OwnerRecord, Report,
    ReportInput, ReportRow,
};
use crate::normalize::{matchable, name_key, normalize_key};

/// Run the three joins and deduplication. Returns report rows + summary.
pub fn run(config: &ReportConfig, input: &ReportInput) -> Result<Report, ReconError> {
    let matching = &config.matching;

    // Stage 1: device -> owner on hostname
    let hosts = join_hosts(&input.devices, &input.owners);
    log::debug!("host join: {} devices -> {} host rows", input.devices.len(), hosts.len());

    // Employees without a full name never take part in matching.
    let employees: Vec<EmployeeRecord> = input
        .employees
        .iter()
        .filter(|e| e.has_full_name())
        .cloned()
        .collect();
    let employees_dropped = input.employees.len() - employees.len();
    if employees_dropped > 0 {
        log::info!("dropped {employees_dropped} employee row(s) with a blank first or last name");
    }

    // Stage 2: employee <-> host on (first, last)
    let named = join_names(&employees, &hosts, matching.strip_name_annotations);
    log::debug!("name join: {} employees x {} hosts -> {} rows", employees.len(), hosts.len(), named.len());

    // Stage 3: -> account on email
    let joined = join_accounts(&named, &input.accounts);
    let rows: Vec<ReportRow> = joined
        .iter()
        .map(|(row, account)| report_row(row, *account, matching))
        .collect();
    log::debug!("email join: {} rows", rows.len());

    let (rows, duplicate_rows_dropped) = dedupe_by_host(rows, matching.duplicate_hosts)?;

    let summary = compute_summary(
        input,
        employees_dropped,
        &hosts,
        &named,
        rows.len(),
        duplicate_rows_dropped,
    );

    Ok(Report { summary, rows })
}

// ---------------------------------------------------------------------------
// Stage 1: hosts
// ---------------------------------------------------------------------------

/// Left join devices to owners on normalized hostname. A device with k
/// owner rows yields k host rows; a device with none yields one row with
/// blank owner names.
pub fn join_hosts(devices: &[DeviceRecord], owners: &[OwnerRecord]) -> Vec<HostRecord> {
    let device_key = |d: &DeviceRecord| key(normalize_key(d.hostname.as_deref()));
    let owner_key = |o: &OwnerRecord| key(normalize_key(o.host_name.as_deref()));

    left_join(devices, owners, device_key, owner_key)
        .into_iter()
        .map(|(di, oi)| {
            let device = &devices[di];
            let owner = oi.map(|oi| &owners[oi]);
            HostRecord {
                host_name: device.hostname.clone(),
                first_name: owner.and_then(|o| o.first_name.clone()),
                last_name: owner.and_then(|o| o.last_name.clone()),
                last_seen_utc: device.last_seen_utc.clone(),
                first_seen_utc: device.first_seen_utc.clone(),
                stale_period_days: device.stale_period_days,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Stage 2: names
// ---------------------------------------------------------------------------

/// Full outer join employees to hosts on the normalized (first, last) pair.
pub fn join_names(employees: &[EmployeeRecord], hosts: &[HostRecord], strip_annotations: bool) -> Vec<NameJoinRow> {
    let employee_key = |e: &EmployeeRecord| {
        name_pair(e.first_name.as_deref(), e.last_name.as_deref(), strip_annotations)
    };
    let host_key = |h: &HostRecord| {
        name_pair(h.first_name.as_deref(), h.last_name.as_deref(), strip_annotations)
    };

    outer_join(employees, hosts, employee_key, host_key)
        .into_iter()
        .map(|(ei, hi)| NameJoinRow {
            employee: ei.map(|ei| employees[ei].clone()),
            host: hi.map(|hi| hosts[hi].clone()),
        })
        .collect()
}

fn name_pair(first: Option<&str>, last: Option<&str>, strip_annotations: bool) -> Option<(String, String)> {
    let first = key(normalize_key(first))?;
    let last = key(name_key(last, strip_annotations))?;
    Some((first, last))
}

// ---------------------------------------------------------------------------
// Stage 3: accounts
// ---------------------------------------------------------------------------

/// Left join name-join rows to accounts on normalized email = username.
pub fn join_accounts<'a>(
    rows: &'a [NameJoinRow],
    accounts: &'a [AccountRecord],
) -> Vec<(&'a NameJoinRow, Option<&'a AccountRecord>)> {
    let row_key = |r: &NameJoinRow| {
        key(normalize_key(r.employee.as_ref().and_then(|e| e.email.as_deref())))
    };
    let account_key = |a: &AccountRecord| key(normalize_key(a.username.as_deref()));

    left_join(rows, accounts, row_key, account_key)
        .into_iter()
        .map(|(ri, ai)| (&rows[ri], ai.map(|ai| &accounts[ai])))
        .collect()
}

// ---------------------------------------------------------------------------
// Projection + dedup
// ---------------------------------------------------------------------------

/// Final projection. Names come from the employee side only; a host with
/// no employee shows blank names.
pub fn report_row(row: &NameJoinRow, account: Option<&AccountRecord>, matching: &MatchingConfig) -> ReportRow {
    let employee = row.employee.as_ref();
    let host = row.host.as_ref();

    let display_name = |v: Option<&String>| {
        v.map(|s| {
            if matching.trim_display_names {
                s.trim().to_string()
            } else {
                s.clone()
            }
        })
    };
    let email = employee.and_then(|e| e.email.as_ref()).map(|e| {
        if matching.normalize_email_display {
            e.trim().to_lowercase()
        } else {
            e.clone()
        }
    });

    ReportRow {
        first_name: display_name(employee.and_then(|e| e.first_name.as_ref())),
        last_name: display_name(employee.and_then(|e| e.last_name.as_ref())),
        email,
        host_name: host.and_then(|h| h.host_name.clone()),
        last_seen_utc: host.and_then(|h| h.last_seen_utc.clone()),
        first_seen_utc: host.and_then(|h| h.first_seen_utc.clone()),
        stale_period_days: host.and_then(|h| h.stale_period_days),
        account_status: account.and_then(|a| a.account_status),
        last_login: account.and_then(|a| a.last_login.clone()),
    }
}

/// Keep the first row per host name, in order. Rows without a host are
/// never collapsed. Returns the surviving rows and how many were dropped.
pub fn dedupe_by_host(
    rows: Vec<ReportRow>,
    policy: DuplicateHostPolicy,
) -> Result<(Vec<ReportRow>, usize), ReconError> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for row in &rows {
        if let Some(host) = row.host_name.as_deref() {
            *counts.entry(host).or_insert(0) += 1;
        }
    }

    // Report duplicates in first-seen order so messages are stable.
    let mut duplicated: Vec<(String, usize)> = Vec::new();
    for row in &rows {
        if let Some(host) = row.host_name.as_deref() {
            let n = counts[host];
            if n > 1 && !duplicated.iter().any(|(h, _)| h == host) {
                duplicated.push((host.to_string(), n));
            }
        }
    }

    match policy {
        DuplicateHostPolicy::Error => {
            if let Some((host_name, rows)) = duplicated.into_iter().next() {
                return Err(ReconError::JoinAmbiguity { host_name, rows });
            }
        }
        DuplicateHostPolicy::Warn => {
            for (host, n) in &duplicated {
                log::warn!("host '{host}' matched {n} report rows; keeping the first");
            }
        }
        DuplicateHostPolicy::KeepFirst => {}
    }

    let before = rows.len();
    let mut seen: HashSet<String> = HashSet::new();
    let kept: Vec<ReportRow> = rows
        .into_iter()
        .filter(|row| match row.host_name.as_deref() {
            Some(host) => seen.insert(host.to_string()),
            None => true,
        })
        .collect();

    let dropped = before - kept.len();
    Ok((kept, dropped))
}

fn key(k: Option<String>) -> Option<String> {
    matchable(&k).map(str::to_string)
}
