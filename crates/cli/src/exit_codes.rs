//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 3       | Universal        | Local I/O error                          |
//! | 10-19   | report           | Source data and config problems          |
//! | 50-59   | fetch            | Vendor APIs and secret retrieval         |
//! | 60-69   | drive            | Spreadsheet download / report upload     |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use assetlink_recon::ReconError;

// =============================================================================
// Universal (0-3)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Local file could not be read or written (inputs, --out, temp file).
pub const EXIT_IO: u8 = 3;

// =============================================================================
// Report (10-19)
// =============================================================================

/// A vendor timestamp did not match the expected shape.
pub const EXIT_REPORT_FORMAT: u8 = 10;

/// A required column is absent from a source table.
pub const EXIT_REPORT_MISSING_COLUMN: u8 = 11;

/// Several report rows share a host and `duplicate_hosts = "error"`.
pub const EXIT_REPORT_DUPLICATE_HOST: u8 = 12;

/// Config file failed to parse or validate.
pub const EXIT_REPORT_INVALID_CONFIG: u8 = 13;

// =============================================================================
// Fetch (50-59): vendor APIs and secret retrieval
// =============================================================================

/// No credentials available (no flag, env var, file or secret).
pub const EXIT_FETCH_NOT_AUTH: u8 = 50;

/// Auth rejected by upstream (401/403, or a vendor-level auth failure).
pub const EXIT_FETCH_AUTH: u8 = 51;

/// Bad request rejected by upstream (400).
pub const EXIT_FETCH_VALIDATION: u8 = 52;

/// Rate limited (429). No retry is attempted.
pub const EXIT_FETCH_RATE_LIMIT: u8 = 53;

/// Upstream error (other 4xx, 5xx), network failure, or malformed payload.
pub const EXIT_FETCH_UPSTREAM: u8 = 54;

// =============================================================================
// Drive (60-69)
// =============================================================================

/// Source spreadsheet could not be downloaded or parsed.
pub const EXIT_DRIVE_DOWNLOAD: u8 = 60;

/// Report upload failed.
pub const EXIT_DRIVE_UPLOAD: u8 = 61;

// =============================================================================
// Engine error mapping
// =============================================================================

/// Map a ReconError to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_REPORT_INVALID_CONFIG,
        ReconError::Format { .. } => EXIT_REPORT_FORMAT,
        ReconError::MissingColumn { .. } => EXIT_REPORT_MISSING_COLUMN,
        ReconError::JoinAmbiguity { .. } => EXIT_REPORT_DUPLICATE_HOST,
    }
}
