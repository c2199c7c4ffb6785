use crate::model::{HostRecord, NameJoinRow, ReportInput, ReportSummary};

/// Compute summary statistics for one report run.
pub fn compute_summary(
    input: &ReportInput,
    employees_dropped: usize,
    hosts: &[HostRecord],
    named: &[NameJoinRow],
    rows: usize,
    duplicate_rows_dropped: usize,
) -> ReportSummary {
    let unmatched_devices = hosts
        .iter()
        .filter(|h| h.first_name.is_none() && h.last_name.is_none())
        .count();
    let unmatched_employees = named
        .iter()
        .filter(|r| r.employee.is_some() && r.host.is_none())
        .count();

    ReportSummary {
        devices: input.devices.len(),
        owners: input.owners.len(),
        employees: input.employees.len(),
        employees_dropped,
        accounts: input.accounts.len(),
        hosts: hosts.len(),
        rows,
        duplicate_rows_dropped,
        unmatched_devices,
        unmatched_employees,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EmployeeRecord;

    fn host(first: Option<&str>) -> HostRecord {
        HostRecord {
            host_name: Some("WS-01".into()),
            first_name: first.map(String::from),
            last_name: first.map(String::from),
            last_seen_utc: None,
            first_seen_utc: None,
            stale_period_days: None,
        }
    }

    fn employee() -> EmployeeRecord {
        EmployeeRecord {
            first_name: Some("Ada".into()),
            last_name: Some("Lovelace".into()),
            email: None,
        }
    }

    #[test]
    fn summary_counts() {
        let hosts = vec![host(Some("Ada")), host(None), host(None)];
        let named = vec![
            NameJoinRow { employee: Some(employee()), host: Some(hosts[0].clone()) },
            NameJoinRow { employee: Some(employee()), host: None },
            NameJoinRow { employee: None, host: Some(hosts[1].clone()) },
        ];
        let input = ReportInput::default();
        let summary = compute_summary(&input, 2, &hosts, &named, 3, 1);
        assert_eq!(summary.hosts, 3);
        assert_eq!(summary.unmatched_devices, 2);
        assert_eq!(summary.unmatched_employees, 1);
        assert_eq!(summary.employees_dropped, 2);
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.duplicate_rows_dropped, 1);
    }
}
