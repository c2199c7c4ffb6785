// assetlink CLI - device ownership report

mod exit_codes;
mod fetch;
mod logging;
mod report;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use assetlink_recon::ReconError;

use exit_codes::{EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "assetlink")]
#[command(about = "Join device inventory, owner and employee sheets, and account status into one report")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Debug-level diagnostics on stderr (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch all four sources, build the report and upload it to Drive
    #[command(after_help = "\
Examples:
  assetlink run --project-id acme-it --cs-secret-id crowdstrike --lp-secret-id lastpass \\
      --employees-id 1AbC --device-owner-id 1DeF --output-id 0GhI
  assetlink run ... --cs-credentials ~/.config/assetlink/falcon.json --save-copy report.xlsx
  GOOGLE_OAUTH_ACCESS_TOKEN=$(gcloud auth print-access-token) assetlink run ... --json")]
    Run(report::RunArgs),

    /// Build the report from local files
    #[command(after_help = "\
Examples:
  assetlink build --devices devices.csv --owners owners.xlsx --employees employees.xlsx \\
      --accounts users.json --out Report.xlsx
  assetlink build ... --out report.json --now 2024-01-15T00:00:00Z --json")]
    Build(report::BuildArgs),

    /// Report config utilities
    Config {
        #[command(subcommand)]
        command: report::ConfigCommands,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\ntarget:  ", env!("TARGET"),
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run(args) => report::cmd_run(args),
        Commands::Build(args) => report::cmd_build(args),
        Commands::Config { command } => report::cmd_config(command),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    /// Engine error raised while processing `stage`.
    pub fn recon(stage: &str, err: ReconError) -> Self {
        let hint = match &err {
            ReconError::MissingColumn { .. } => {
                Some("check the column names in the [employees] / [owners] / [devices] config sections".to_string())
            }
            ReconError::JoinAmbiguity { .. } => {
                Some("set [matching] duplicate_hosts = \"warn\" to keep the first row".to_string())
            }
            _ => None,
        };
        Self {
            code: exit_codes::recon_exit_code(&err),
            message: format!("{}: {}", stage, err),
            hint,
        }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
