use serde::Deserialize;

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Report configuration. Every section has defaults, so an empty TOML
/// document is a valid config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub employees: EmployeeColumns,
    pub owners: OwnerColumns,
    pub devices: DeviceColumns,
    pub matching: MatchingConfig,
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Source column mappings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmployeeColumns {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// The sheet has a banner above the real header row.
    pub header_row_override: bool,
}

impl Default for EmployeeColumns {
    fn default() -> Self {
        Self {
            first_name: "First Name".into(),
            last_name: "Last Name".into(),
            email: "Email".into(),
            header_row_override: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OwnerColumns {
    pub host_name: String,
    pub first_name: String,
    pub last_name: String,
    pub header_row_override: bool,
}

impl Default for OwnerColumns {
    fn default() -> Self {
        Self {
            host_name: "Host Name".into(),
            first_name: "First Name".into(),
            last_name: "Last Name".into(),
            header_row_override: false,
        }
    }
}

/// Column names used when devices come from a local file instead of the
/// vendor API.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceColumns {
    pub hostname: String,
    pub last_seen: String,
    pub first_seen: String,
}

impl Default for DeviceColumns {
    fn default() -> Self {
        Self {
            hostname: "hostname".into(),
            last_seen: "last_seen".into(),
            first_seen: "first_seen".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// What to do when several report rows share a host name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateHostPolicy {
    /// Keep the first row silently.
    KeepFirst,
    /// Keep the first row and log a warning per host.
    #[default]
    Warn,
    /// Abort the run.
    Error,
}

impl std::fmt::Display for DuplicateHostPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KeepFirst => write!(f, "keep_first"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchingConfig {
    pub duplicate_hosts: DuplicateHostPolicy,
    /// Drop `(…)` annotations from last names when building name keys.
    pub strip_name_annotations: bool,
    /// Trim employee first/last names in the report itself.
    pub trim_display_names: bool,
    /// Trim and lower-case the email shown in the report.
    pub normalize_email_display: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            duplicate_hosts: DuplicateHostPolicy::default(),
            strip_name_annotations: true,
            trim_display_names: false,
            normalize_email_display: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub filename_prefix: String,
    pub sheet_name: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            filename_prefix: "Report_".into(),
            sheet_name: "main".into(),
        }
    }
}

impl OutputConfig {
    /// `Report_<YYYYMMDD>.xlsx` for the given run date.
    pub fn filename(&self, run_date: chrono::NaiveDate) -> String {
        format!("{}{}.xlsx", self.filename_prefix, run_date.format("%Y%m%d"))
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReportConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReportConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        check_columns(
            "employees",
            &[
                ("first_name", &self.employees.first_name),
                ("last_name", &self.employees.last_name),
                ("email", &self.employees.email),
            ],
        )?;
        check_columns(
            "owners",
            &[
                ("host_name", &self.owners.host_name),
                ("first_name", &self.owners.first_name),
                ("last_name", &self.owners.last_name),
            ],
        )?;
        check_columns(
            "devices",
            &[
                ("hostname", &self.devices.hostname),
                ("last_seen", &self.devices.last_seen),
                ("first_seen", &self.devices.first_seen),
            ],
        )?;

        if self.output.sheet_name.trim().is_empty() {
            return Err(ReconError::ConfigValidation(
                "output.sheet_name must not be empty".into(),
            ));
        }
        // Excel's own limit on sheet names.
        if self.output.sheet_name.chars().count() > 31 {
            return Err(ReconError::ConfigValidation(format!(
                "output.sheet_name '{}' is longer than 31 characters",
                self.output.sheet_name
            )));
        }

        Ok(())
    }
}

fn check_columns(section: &str, columns: &[(&str, &String)]) -> Result<(), ReconError> {
    for (i, (field, name)) in columns.iter().enumerate() {
        if name.trim().is_empty() {
            return Err(ReconError::ConfigValidation(format!(
                "{section}.{field} must not be empty"
            )));
        }
        for (other_field, other) in &columns[i + 1..] {
            if other.trim() == name.trim() {
                return Err(ReconError::ConfigValidation(format!(
                    "{section}.{field} and {section}.{other_field} both map to column '{name}'"
                )));
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
