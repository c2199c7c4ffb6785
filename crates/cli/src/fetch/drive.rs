//! Google Drive v3: download source spreadsheets and upload the report.
//!
//! Native Google Sheets are exported as xlsx; other files are downloaded
//! as-is. Failures are reported under the drive exit codes, except auth
//! and rate limiting which keep their fetch codes.

use assetlink_recon::Table;

use crate::exit_codes;
use crate::CliError;

use super::common::FetchClient;

// ── Constants ───────────────────────────────────────────────────────

const DRIVE_API_BASE: &str = "https://www.googleapis.com";
const GOOGLE_SHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";
pub(crate) const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const CSV_MIME: &str = "text/csv";
const BOUNDARY: &str = "assetlink_report_boundary";

fn extract_google_error(body: &serde_json::Value, status: u16) -> String {
    body["error"]["message"]
        .as_str()
        .unwrap_or(&format!("HTTP {}", status))
        .to_string()
}

/// A downloaded Drive file.
#[derive(Debug, Clone)]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl DriveFile {
    fn is_csv(&self) -> bool {
        self.mime_type == CSV_MIME || self.name.to_ascii_lowercase().ends_with(".csv")
    }
}

// ── Drive client ────────────────────────────────────────────────────

pub struct DriveClient {
    client: FetchClient,
    token: String,
    base_url: String,
}

impl DriveClient {
    pub fn new(token: String) -> Result<Self, CliError> {
        Self::with_base_url(token, DRIVE_API_BASE.to_string())
    }

    pub fn with_base_url(token: String, base_url: String) -> Result<Self, CliError> {
        Ok(Self {
            client: FetchClient::new("Google Drive", extract_google_error)?,
            token,
            base_url,
        })
    }

    /// Download a file by id. Google Sheets are exported as xlsx.
    pub fn download(&self, file_id: &str) -> Result<DriveFile, CliError> {
        self.try_download(file_id)
            .map_err(|e| remap(e, exit_codes::EXIT_DRIVE_DOWNLOAD))
    }

    fn try_download(&self, file_id: &str) -> Result<DriveFile, CliError> {
        let meta_url = format!("{}/drive/v3/files/{}", self.base_url, file_id);
        let meta = self.client.send_json(
            self.client
                .http
                .get(&meta_url)
                .bearer_auth(&self.token)
                .query(&[("fields", "id,name,mimeType"), ("supportsAllDrives", "true")]),
        )?;

        let name = meta["name"].as_str().unwrap_or(file_id).to_string();
        let mime_type = meta["mimeType"].as_str().unwrap_or_default().to_string();

        let req = if mime_type == GOOGLE_SHEET_MIME {
            self.client
                .http
                .get(format!("{}/export", meta_url))
                .query(&[("mimeType", XLSX_MIME)])
        } else {
            self.client
                .http
                .get(&meta_url)
                .query(&[("alt", "media"), ("supportsAllDrives", "true")])
        };
        let bytes = self.client.send_bytes(req.bearer_auth(&self.token))?;

        tracing::debug!(file_id, name = %name, mime = %mime_type, bytes = bytes.len(), "downloaded drive file");

        Ok(DriveFile {
            id: file_id.to_string(),
            name,
            mime_type,
            bytes,
        })
    }

    /// Download a file and read its first sheet as a table.
    pub fn download_table(&self, file_id: &str) -> Result<Table, CliError> {
        let file = self.download(file_id)?;
        let parsed = if file.is_csv() {
            assetlink_io::csv::import_table_from_bytes(&file.bytes)
        } else {
            assetlink_io::xlsx::import_table_from_bytes(&file.bytes).map(|(table, _)| table)
        };

        parsed.map_err(|e| CliError {
            code: exit_codes::EXIT_DRIVE_DOWNLOAD,
            message: format!("cannot read '{}' ({}): {}", file.name, file.id, e),
            hint: None,
        })
    }

    /// Upload `bytes` as `filename` into `folder_id`. Returns the new file id.
    pub fn upload(&self, bytes: &[u8], folder_id: &str, filename: &str) -> Result<String, CliError> {
        self.try_upload(bytes, folder_id, filename)
            .map_err(|e| remap(e, exit_codes::EXIT_DRIVE_UPLOAD))
    }

    fn try_upload(&self, bytes: &[u8], folder_id: &str, filename: &str) -> Result<String, CliError> {
        let url = format!("{}/upload/drive/v3/files", self.base_url);
        let metadata = serde_json::json!({
            "name": filename,
            "parents": [folder_id],
            "mimeType": XLSX_MIME,
        });

        let body = self.client.send_json(
            self.client
                .http
                .post(&url)
                .bearer_auth(&self.token)
                .query(&[("uploadType", "multipart"), ("supportsAllDrives", "true")])
                .header(
                    reqwest::header::CONTENT_TYPE,
                    format!("multipart/related; boundary={}", BOUNDARY),
                )
                .body(multipart_related(&metadata, XLSX_MIME, bytes)),
        )?;

        body["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| self.client.upstream("Google Drive upload response missing file id".into()))
    }
}

/// Two-part `multipart/related` body: JSON metadata, then the media.
fn multipart_related(metadata: &serde_json::Value, media_type: &str, media: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(media.len() + 512);
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata.to_string().as_bytes());
    body.extend_from_slice(format!("\r\n--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", media_type).as_bytes());
    body.extend_from_slice(media);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// Auth and rate-limit failures keep their fetch codes.
fn remap(err: CliError, code: u8) -> CliError {
    match err.code {
        exit_codes::EXIT_FETCH_VALIDATION | exit_codes::EXIT_FETCH_UPSTREAM => CliError { code, ..err },
        _ => err,
    }
}

// ── Tests ───────────────────────────────────────────────────────────
