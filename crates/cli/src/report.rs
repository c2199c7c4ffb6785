//! `assetlink run`, `assetlink build` and `assetlink config check`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};

use assetlink_io::xlsx::ExportOptions;
use assetlink_recon::sources::{
    accounts_from_user_data, devices_from_table, employees_from_table, owners_from_table,
};
use assetlink_recon::{Report, ReportConfig, ReportInput, Table, REPORT_INTEGER_COLUMNS};

use crate::exit_codes::{EXIT_ERROR, EXIT_REPORT_INVALID_CONFIG};
use crate::fetch::drive::DriveClient;
use crate::fetch::falcon::{FalconClient, FalconCredentials};
use crate::fetch::lastpass::{LastPassClient, LastPassCredentials};
use crate::fetch::secrets::SecretClient;
use crate::fetch::{load_json_file, resolve_token};
use crate::CliError;

pub const GOOGLE_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

// ── Arguments ───────────────────────────────────────────────────────

#[derive(Args)]
pub struct RunArgs {
    /// Google Cloud project holding the credential secrets
    #[arg(long)]
    pub project_id: String,

    /// Secret id of the CrowdStrike API credentials
    #[arg(long)]
    pub cs_secret_id: String,

    /// Secret id of the LastPass Enterprise credentials
    #[arg(long)]
    pub lp_secret_id: String,

    /// Drive file id of the employee sheet
    #[arg(long)]
    pub employees_id: String,

    /// Drive file id of the device owner sheet
    #[arg(long)]
    pub device_owner_id: String,

    /// Drive folder id the report is uploaded to
    #[arg(long)]
    pub output_id: String,

    /// Local CrowdStrike credentials JSON ({client_id, client_secret}) instead of the secret
    #[arg(long)]
    pub cs_credentials: Option<PathBuf>,

    /// Local LastPass credentials JSON ({cid, prov_hash}) instead of the secret
    #[arg(long)]
    pub lp_credentials: Option<PathBuf>,

    /// Google OAuth access token (default: GOOGLE_OAUTH_ACCESS_TOKEN env)
    #[arg(long)]
    pub google_token: Option<String>,

    /// Report config TOML
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Also write the report workbook to this path
    #[arg(long)]
    pub save_copy: Option<PathBuf>,

    /// Write the raw LastPass user data to this path (usable with `build --accounts`)
    #[arg(long)]
    pub save_users: Option<PathBuf>,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Suppress progress on stderr
    #[arg(long, short = 'q')]
    pub quiet: bool,
}

#[derive(Args)]
pub struct BuildArgs {
    /// Device export (csv/xlsx) with hostname, last_seen, first_seen columns
    #[arg(long)]
    pub devices: PathBuf,

    /// Device owner sheet (xlsx/ods/csv)
    #[arg(long)]
    pub owners: PathBuf,

    /// Employee sheet (xlsx/ods/csv)
    #[arg(long)]
    pub employees: PathBuf,

    /// LastPass user-data JSON ({"Users": {...}, "invited": [...]})
    #[arg(long)]
    pub accounts: PathBuf,

    /// Output file: .xlsx, .csv or .json
    #[arg(long)]
    pub out: PathBuf,

    /// Fixed clock for stale periods (RFC 3339, default: now)
    #[arg(long)]
    pub now: Option<String>,

    /// Report config TOML
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Suppress progress on stderr
    #[arg(long, short = 'q')]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Validate a report config without running
    #[command(after_help = "\
Examples:
  assetlink config check report.toml")]
    Check {
        /// Path to the report config TOML
        config: PathBuf,
    },
}

// ── Shared ──────────────────────────────────────────────────────────

fn load_config(path: Option<&Path>) -> Result<ReportConfig, CliError> {
    let Some(path) = path else {
        return Ok(ReportConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read config {}: {}", path.display(), e)))?;
    ReportConfig::from_toml(&text).map_err(|e| CliError {
        code: EXIT_REPORT_INVALID_CONFIG,
        message: format!("{}: {}", path.display(), e),
        hint: None,
    })
}

fn export_options(config: &ReportConfig) -> ExportOptions {
    ExportOptions {
        sheet_name: config.output.sheet_name.clone(),
        integer_columns: REPORT_INTEGER_COLUMNS.iter().map(|c| c.to_string()).collect(),
    }
}

fn write_xlsx(table: &Table, path: &Path, options: &ExportOptions) -> Result<(), CliError> {
    assetlink_io::xlsx::export_table(table, path, options)
        .map(|_| ())
        .map_err(|e| CliError::io(format!("cannot write {}: {}", path.display(), e)))
}

/// Render the report into a temp file under `dir` and upload that file.
/// The temp file is removed once the upload returns, whatever the outcome.
fn stage_and_upload(
    drive: &DriveClient,
    table: &Table,
    options: &ExportOptions,
    folder_id: &str,
    filename: &str,
    dir: &Path,
) -> Result<String, CliError> {
    let staged = tempfile::Builder::new()
        .prefix("assetlink-")
        .suffix(".xlsx")
        .tempfile_in(dir)
        .map_err(|e| CliError::io(format!("cannot create temp file in {}: {}", dir.display(), e)))?;
    write_xlsx(table, staged.path(), options)?;
    let bytes = std::fs::read(staged.path())
        .map_err(|e| CliError::io(format!("cannot read {}: {}", staged.path().display(), e)))?;
    tracing::debug!(path = %staged.path().display(), bytes = bytes.len(), "report staged");

    let uploaded = drive.upload(&bytes, folder_id, filename);
    drop(staged);
    uploaded
}

fn print_summary(report: &Report, output: &str, json: bool, quiet: bool) -> Result<(), CliError> {
    if json {
        let value = serde_json::json!({
            "output": output,
            "summary": report.summary,
        });
        let text = serde_json::to_string_pretty(&value).map_err(|e| CliError {
            code: EXIT_ERROR,
            message: format!("JSON serialization error: {}", e),
            hint: None,
        })?;
        println!("{}", text);
    }

    if !quiet {
        let s = &report.summary;
        eprintln!(
            "report: {} rows from {} devices, {} owners, {} employees, {} accounts",
            s.rows, s.devices, s.owners, s.employees, s.accounts,
        );
        if s.duplicate_rows_dropped > 0 || s.employees_dropped > 0 {
            eprintln!(
                "dropped: {} duplicate host rows, {} employees without a full name",
                s.duplicate_rows_dropped, s.employees_dropped,
            );
        }
    }

    Ok(())
}

// ── run ─────────────────────────────────────────────────────────────

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref())?;
    let now = Utc::now();
    let token = resolve_token(args.google_token, "Google", "--google-token", GOOGLE_TOKEN_ENV)?;

    let secrets = SecretClient::new(token.clone())?;
    let falcon_creds: FalconCredentials = match &args.cs_credentials {
        Some(path) => load_json_file(path, "CrowdStrike credentials")?,
        None => secrets.credentials(&args.project_id, &args.cs_secret_id)?,
    };
    let lastpass_creds: LastPassCredentials = match &args.lp_credentials {
        Some(path) => load_json_file(path, "LastPass credentials")?,
        None => secrets.credentials(&args.project_id, &args.lp_secret_id)?,
    };

    let drive = DriveClient::new(token)?;
    let employee_table = drive.download_table(&args.employees_id)?;
    let owner_table = drive.download_table(&args.device_owner_id)?;
    let employees = employees_from_table(&employee_table, &config.employees)
        .map_err(|e| CliError::recon("employee sheet", e))?;
    let owners = owners_from_table(&owner_table, &config.owners)
        .map_err(|e| CliError::recon("device owner sheet", e))?;

    let devices = FalconClient::connect(&falcon_creds)?.fetch_devices(now, args.quiet)?;
    let accounts = LastPassClient::new(lastpass_creds)?.fetch_accounts(args.save_users.as_deref())?;

    let input = ReportInput {
        devices,
        owners,
        employees,
        accounts,
    };
    let report = assetlink_recon::run(&config, &input).map_err(|e| CliError::recon("report", e))?;
    let table = report.to_table();
    let options = export_options(&config);
    let filename = config.output.filename(now.date_naive());

    if let Some(path) = &args.save_copy {
        write_xlsx(&table, path, &options)?;
    }

    let file_id = stage_and_upload(
        &drive,
        &table,
        &options,
        &args.output_id,
        &filename,
        &std::env::temp_dir(),
    )?;
    tracing::info!(file_id = %file_id, filename = %filename, "report uploaded");

    print_summary(&report, &filename, args.json, args.quiet)?;
    if !args.quiet {
        eprintln!("Report uploaded to Google Drive.");
    }

    Ok(())
}

// ── build ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Xlsx,
    Csv,
    Json,
}

impl OutputFormat {
    fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "xlsx" => Some(Self::Xlsx),
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

fn parse_now(value: Option<&str>) -> Result<DateTime<Utc>, CliError> {
    match value {
        None => Ok(Utc::now()),
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                CliError::args(format!("invalid --now '{}': {}", s, e))
                    .with_hint("use RFC 3339, e.g. 2024-01-15T00:00:00Z")
            }),
    }
}

fn read_table(path: &Path, what: &str) -> Result<Table, CliError> {
    assetlink_io::import_table(path)
        .map_err(|e| CliError::io(format!("cannot read {} {}: {}", what, path.display(), e)))
}

pub fn cmd_build(args: BuildArgs) -> Result<(), CliError> {
    let format = OutputFormat::from_path(&args.out).ok_or_else(|| {
        CliError::args(format!("unsupported output file: {}", args.out.display()))
            .with_hint("use a .xlsx, .csv or .json extension")
    })?;
    let now = parse_now(args.now.as_deref())?;
    let config = load_config(args.config.as_deref())?;

    let devices = devices_from_table(&read_table(&args.devices, "devices file")?, &config.devices, now)
        .map_err(|e| CliError::recon("devices file", e))?;
    let owners = owners_from_table(&read_table(&args.owners, "device owner sheet")?, &config.owners)
        .map_err(|e| CliError::recon("device owner sheet", e))?;
    let employees = employees_from_table(&read_table(&args.employees, "employee sheet")?, &config.employees)
        .map_err(|e| CliError::recon("employee sheet", e))?;

    let payload = assetlink_io::json::read_value(&args.accounts)
        .map_err(|e| CliError::io(format!("cannot read accounts {}: {}", args.accounts.display(), e)))?;
    let accounts =
        accounts_from_user_data(&payload).map_err(|e| CliError::recon("LastPass user data", e))?;

    if !args.quiet {
        eprintln!(
            "loaded {} devices, {} owners, {} employees, {} accounts",
            devices.len(),
            owners.len(),
            employees.len(),
            accounts.len(),
        );
    }

    let input = ReportInput {
        devices,
        owners,
        employees,
        accounts,
    };
    let report = assetlink_recon::run(&config, &input).map_err(|e| CliError::recon("report", e))?;
    let table = report.to_table();

    let written = match format {
        OutputFormat::Xlsx => {
            assetlink_io::xlsx::export_table(&table, &args.out, &export_options(&config)).map(|_| ())
        }
        OutputFormat::Csv => assetlink_io::csv::export_table(&table, &args.out),
        OutputFormat::Json => assetlink_io::json::export_table(&table, &args.out),
    };
    written.map_err(|e| CliError::io(format!("cannot write {}: {}", args.out.display(), e)))?;

    print_summary(&report, &args.out.display().to_string(), args.json, args.quiet)?;
    if !args.quiet {
        eprintln!("wrote {}", args.out.display());
    }

    Ok(())
}

// ── config check ────────────────────────────────────────────────────

pub fn cmd_config(cmd: ConfigCommands) -> Result<(), CliError> {
    match cmd {
        ConfigCommands::Check { config } => cmd_config_check(&config),
    }
}

fn cmd_config_check(path: &Path) -> Result<(), CliError> {
    let config = load_config(Some(path))?;
    eprintln!(
        "valid: duplicate_hosts = {}, output {} (sheet '{}')",
        config.matching.duplicate_hosts,
        config.output.filename(Utc::now().date_naive()),
        config.output.sheet_name,
    );
    Ok(())
}
