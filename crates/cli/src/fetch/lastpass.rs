//! LastPass Enterprise API client: bulk `getuserdata`.

use std::path::Path;

use serde::Deserialize;

use assetlink_recon::sources::accounts_from_user_data;
use assetlink_recon::AccountRecord;

use crate::exit_codes;
use crate::CliError;

use super::common::FetchClient;

// ── Constants ───────────────────────────────────────────────────────

const LASTPASS_API_BASE: &str = "https://lastpass.com";

// ── Credentials ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct LastPassCredentials {
    pub cid: String,
    pub prov_hash: String,
}

fn extract_lastpass_error(body: &serde_json::Value, status: u16) -> String {
    error_text(body).unwrap_or_else(|| format!("HTTP {}", status))
}

/// The API reports failures as `{"status": "FAIL", "error": [...]}`.
fn error_text(body: &serde_json::Value) -> Option<String> {
    match &body["error"] {
        serde_json::Value::Array(items) => {
            let parts: Vec<&str> = items.iter().filter_map(|e| e.as_str()).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join("; "))
            }
        }
        serde_json::Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

// ── LastPass client ─────────────────────────────────────────────────

pub struct LastPassClient {
    client: FetchClient,
    creds: LastPassCredentials,
    base_url: String,
}

impl LastPassClient {
    pub fn new(creds: LastPassCredentials) -> Result<Self, CliError> {
        Self::with_base_url(creds, LASTPASS_API_BASE.to_string())
    }

    pub fn with_base_url(creds: LastPassCredentials, base_url: String) -> Result<Self, CliError> {
        Ok(Self {
            client: FetchClient::new("LastPass", extract_lastpass_error)?,
            creds,
            base_url,
        })
    }

    /// Fetch the raw user-data payload.
    pub fn get_user_data(&self) -> Result<serde_json::Value, CliError> {
        let url = format!("{}/enterpriseapi.php", self.base_url);
        let body = self.client.send_json(self.client.http.post(&url).json(&serde_json::json!({
            "cid": self.creds.cid,
            "provhash": self.creds.prov_hash,
            "cmd": "getuserdata",
        })))?;

        if body["status"].as_str() == Some("FAIL") {
            return Err(CliError {
                code: exit_codes::EXIT_FETCH_AUTH,
                message: format!(
                    "LastPass rejected getuserdata: {}",
                    error_text(&body).unwrap_or_else(|| "unknown error".into()),
                ),
                hint: Some("check the cid and prov_hash credentials".into()),
            });
        }

        Ok(body)
    }

    /// Fetch user data and classify accounts. With `save_to`, the raw
    /// payload is also written there as pretty JSON.
    pub fn fetch_accounts(&self, save_to: Option<&Path>) -> Result<Vec<AccountRecord>, CliError> {
        let body = self.get_user_data()?;

        if let Some(path) = save_to {
            let json = serde_json::to_string_pretty(&body).map_err(|e| CliError {
                code: exit_codes::EXIT_ERROR,
                message: format!("failed to serialize LastPass response: {}", e),
                hint: None,
            })?;
            std::fs::write(path, json)
                .map_err(|e| CliError::io(format!("cannot write {}: {}", path.display(), e)))?;
            tracing::info!("LastPass user data written to {}", path.display());
        }

        accounts_from_user_data(&body).map_err(|e| CliError::recon("LastPass user data", e))
    }
}

// ── Tests ───────────────────────────────────────────────────────────
