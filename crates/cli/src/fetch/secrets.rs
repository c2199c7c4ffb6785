//! Google Secret Manager: read the latest version of a secret.
//!
//! Vendor credentials are stored as JSON documents; the payload comes back
//! base64-encoded in `payload.data`.

use base64::Engine;
use serde::de::DeserializeOwned;

use crate::exit_codes;
use crate::CliError;

use super::common::FetchClient;

const SECRET_MANAGER_BASE: &str = "https://secretmanager.googleapis.com";

fn extract_google_error(body: &serde_json::Value, status: u16) -> String {
    body["error"]["message"]
        .as_str()
        .unwrap_or(&format!("HTTP {}", status))
        .to_string()
}

pub struct SecretClient {
    client: FetchClient,
    token: String,
    base_url: String,
}

impl SecretClient {
    pub fn new(token: String) -> Result<Self, CliError> {
        Self::with_base_url(token, SECRET_MANAGER_BASE.to_string())
    }

    pub fn with_base_url(token: String, base_url: String) -> Result<Self, CliError> {
        Ok(Self {
            client: FetchClient::new("Secret Manager", extract_google_error)?,
            token,
            base_url,
        })
    }

    /// Raw bytes of `projects/{project}/secrets/{secret}/versions/latest`.
    pub fn access_latest(&self, project: &str, secret: &str) -> Result<Vec<u8>, CliError> {
        let url = format!(
            "{}/v1/projects/{}/secrets/{}/versions/latest:access",
            self.base_url, project, secret,
        );
        let body = self
            .client
            .send_json(self.client.http.get(&url).bearer_auth(&self.token))?;

        let data = body["payload"]["data"].as_str().ok_or_else(|| {
            self.client
                .upstream(format!("secret '{}' response missing payload.data", secret))
        })?;

        base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(|e| {
                self.client
                    .upstream(format!("secret '{}' payload is not base64: {}", secret, e))
            })
    }

    /// Fetch a secret and parse it as a JSON credential document.
    pub fn credentials<T: DeserializeOwned>(&self, project: &str, secret: &str) -> Result<T, CliError> {
        let bytes = self.access_latest(project, secret)?;
        parse_credentials(&bytes, secret)
    }
}

/// Parse a JSON credential document. Malformed or incomplete credentials
/// count as missing ones.
pub(crate) fn parse_credentials<T: DeserializeOwned>(bytes: &[u8], what: &str) -> Result<T, CliError> {
    serde_json::from_slice(bytes).map_err(|e| CliError {
        code: exit_codes::EXIT_FETCH_NOT_AUTH,
        message: format!("invalid credentials in '{}': {}", what, e),
        hint: Some("expected a JSON object with the vendor's credential fields".into()),
    })
}
