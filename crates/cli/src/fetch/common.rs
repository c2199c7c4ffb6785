//! Shared infrastructure for the vendor clients.
//!
//! Each client (falcon, lastpass, secrets, drive) reuses:
//! - `FetchClient`: blocking HTTP client with error classification
//! - `resolve_token`: flag > env > error
//! - `load_json_file`: read a local credential file
//!
//! # Error classification
//!
//! | HTTP status   | Exit code                 |
//! |---------------|---------------------------|
//! | 401, 403      | `EXIT_FETCH_AUTH`         |
//! | 400           | `EXIT_FETCH_VALIDATION`   |
//! | 429           | `EXIT_FETCH_RATE_LIMIT`   |
//! | other 4xx/5xx | `EXIT_FETCH_UPSTREAM`     |
//! | network error | `EXIT_FETCH_UPSTREAM`     |
//!
//! Requests are sent once. A failure aborts the run.

use std::path::Path;
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::exit_codes;
use crate::CliError;

// ── Constants ───────────────────────────────────────────────────────

pub(crate) const USER_AGENT: &str = concat!("assetlink/", env!("CARGO_PKG_VERSION"));
const TIMEOUT_SECS: u64 = 60;

// ── FetchClient ─────────────────────────────────────────────────────

/// Shared HTTP client that handles error classification.
///
/// Clients own their credentials, base URL, and auth method. They build
/// a `RequestBuilder` from [`FetchClient::http`] and hand it to
/// [`FetchClient::send_json`] or [`FetchClient::send_bytes`], which map
/// HTTP status codes to the standard exit codes.
pub(crate) struct FetchClient {
    pub(crate) http: reqwest::blocking::Client,
    source_name: String,
    error_extractor: fn(&serde_json::Value, u16) -> String,
}

impl FetchClient {
    pub(crate) fn new(
        source_name: &str,
        error_extractor: fn(&serde_json::Value, u16) -> String,
    ) -> Result<Self, CliError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CliError {
                code: exit_codes::EXIT_ERROR,
                message: format!("failed to build HTTP client: {}", e),
                hint: None,
            })?;

        Ok(Self {
            http,
            source_name: source_name.to_string(),
            error_extractor,
        })
    }

    /// Send a request and parse the JSON body of a 2xx response.
    pub(crate) fn send_json(
        &self,
        req: reqwest::blocking::RequestBuilder,
    ) -> Result<serde_json::Value, CliError> {
        let resp = self.send(req)?;

        // Read as text first to handle BOM-prefixed responses
        let text = resp.text().map_err(|e| self.upstream(format!(
            "failed to read {} response body: {}",
            self.source_name, e,
        )))?;
        let trimmed = text.trim_start_matches('\u{feff}');
        serde_json::from_str(trimmed).map_err(|e| {
            self.upstream(format!(
                "failed to parse {} JSON response: {} (body: {})",
                self.source_name,
                e,
                truncate(trimmed, 200),
            ))
        })
    }

    /// Send a request and return the raw body of a 2xx response.
    pub(crate) fn send_bytes(
        &self,
        req: reqwest::blocking::RequestBuilder,
    ) -> Result<Vec<u8>, CliError> {
        let resp = self.send(req)?;
        resp.bytes().map(|b| b.to_vec()).map_err(|e| {
            self.upstream(format!(
                "failed to read {} response body: {}",
                self.source_name, e,
            ))
        })
    }

    fn send(
        &self,
        req: reqwest::blocking::RequestBuilder,
    ) -> Result<reqwest::blocking::Response, CliError> {
        let resp = req.send().map_err(|e| {
            self.upstream(format!("{} request failed: {}", self.source_name, e))
        })?;

        let status = resp.status().as_u16();
        if resp.status().is_success() {
            return Ok(resp);
        }

        let body: serde_json::Value = resp.json().unwrap_or(serde_json::Value::Null);
        let msg = (self.error_extractor)(&body, status);
        tracing::debug!(source = %self.source_name, status, "upstream rejected request");

        let (code, what) = match status {
            401 | 403 => (exit_codes::EXIT_FETCH_AUTH, "auth failed"),
            400 => (exit_codes::EXIT_FETCH_VALIDATION, "request rejected"),
            429 => (exit_codes::EXIT_FETCH_RATE_LIMIT, "rate limited"),
            _ => (exit_codes::EXIT_FETCH_UPSTREAM, "error"),
        };

        Err(CliError {
            code,
            message: format!("{} {} ({}): {}", self.source_name, what, status, msg),
            hint: None,
        })
    }

    pub(crate) fn upstream(&self, message: String) -> CliError {
        CliError {
            code: exit_codes::EXIT_FETCH_UPSTREAM,
            message,
            hint: None,
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ── Shared helpers ──────────────────────────────────────────────────

/// Resolve a bearer token: flag value > environment variable > error.
pub(crate) fn resolve_token(
    flag: Option<String>,
    source_name: &str,
    flag_name: &str,
    env_var: &str,
) -> Result<String, CliError> {
    let missing = || CliError {
        code: exit_codes::EXIT_FETCH_NOT_AUTH,
        message: format!(
            "missing {} access token (use {} or set {})",
            source_name, flag_name, env_var,
        ),
        hint: None,
    };

    if let Some(token) = flag {
        let trimmed = token.trim().to_string();
        if trimmed.is_empty() {
            return Err(missing());
        }
        return Ok(trimmed);
    }

    if let Ok(token) = std::env::var(env_var) {
        let trimmed = token.trim().to_string();
        if !trimmed.is_empty() {
            return Ok(trimmed);
        }
    }

    Err(missing())
}

/// Read a JSON credential file into `T`.
pub(crate) fn load_json_file<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T, CliError> {
    let content = std::fs::read_to_string(path).map_err(|e| CliError {
        code: exit_codes::EXIT_FETCH_NOT_AUTH,
        message: format!("cannot read {} file {}: {}", what, path.display(), e),
        hint: None,
    })?;

    // Warn if file is world-readable (Unix only)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(meta) = std::fs::metadata(path) {
            let mode = meta.permissions().mode();
            if mode & 0o077 != 0 {
                tracing::warn!(
                    "{} file {} is accessible by others (mode {:o}), consider chmod 600",
                    what,
                    path.display(),
                    mode & 0o777,
                );
            }
        }
    }

    serde_json::from_str(&content).map_err(|e| CliError {
        code: exit_codes::EXIT_FETCH_NOT_AUTH,
        message: format!("invalid {} JSON in {}: {}", what, path.display(), e),
        hint: None,
    })
}

// ── Tests ───────────────────────────────────────────────────────────
