//! CrowdStrike Falcon Hosts client: OAuth2 client-credentials login,
//! paginated device-id queries, and device detail lookups.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use assetlink_recon::sources::device_record;
use assetlink_recon::DeviceRecord;

use crate::exit_codes;
use crate::CliError;

use super::common::FetchClient;

// ── Constants ───────────────────────────────────────────────────────

const FALCON_API_BASE: &str = "https://api.crowdstrike.com";
pub(crate) const PAGE_LIMIT: u32 = 500;
const SORT: &str = "hostname.asc";

// ── Credentials ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct FalconCredentials {
    pub client_id: String,
    pub client_secret: String,
}

// ── Wire types ──────────────────────────────────────────────────────

/// One page of device ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevicePage {
    /// Offset reported by the vendor for this page.
    pub offset: u64,
    /// Total devices reported by the vendor.
    pub total: u64,
    pub ids: Vec<String>,
}

/// Raw device detail fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDevice {
    pub hostname: Option<String>,
    pub last_seen: Option<String>,
    pub first_seen: Option<String>,
}

fn extract_falcon_error(body: &serde_json::Value, status: u16) -> String {
    body["errors"][0]["message"]
        .as_str()
        .or_else(|| body["message"].as_str())
        .unwrap_or(&format!("HTTP {}", status))
        .to_string()
}

// ── Falcon client ───────────────────────────────────────────────────

pub struct FalconClient {
    client: FetchClient,
    access_token: String,
    base_url: String,
}

impl FalconClient {
    /// Log in against the production API.
    pub fn connect(creds: &FalconCredentials) -> Result<Self, CliError> {
        Self::with_base_url(creds, FALCON_API_BASE.to_string())
    }

    pub fn with_base_url(creds: &FalconCredentials, base_url: String) -> Result<Self, CliError> {
        let client = FetchClient::new("CrowdStrike", extract_falcon_error)?;
        let url = format!("{}/oauth2/token", base_url);
        let body = client.send_json(client.http.post(&url).form(&[
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.as_str()),
        ]))?;

        let access_token = body["access_token"]
            .as_str()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CliError {
                code: exit_codes::EXIT_FETCH_AUTH,
                message: "CrowdStrike token response missing access_token".into(),
                hint: None,
            })?
            .to_string();

        Ok(Self {
            client,
            access_token,
            base_url,
        })
    }

    /// Query one page of device ids, sorted by hostname.
    pub fn device_page(&self, offset: u64, limit: u32) -> Result<DevicePage, CliError> {
        let url = format!("{}/devices/queries/devices/v1", self.base_url);
        let body = self.client.send_json(
            self.client
                .http
                .get(&url)
                .bearer_auth(&self.access_token)
                .query(&[
                    ("limit", limit.to_string()),
                    ("offset", offset.to_string()),
                    ("sort", SORT.to_string()),
                ]),
        )?;

        let pagination = &body["meta"]["pagination"];
        let offset = pagination["offset"].as_u64().ok_or_else(|| {
            self.client.upstream("CrowdStrike response missing meta.pagination.offset".into())
        })?;
        let total = pagination["total"].as_u64().ok_or_else(|| {
            self.client.upstream("CrowdStrike response missing meta.pagination.total".into())
        })?;
        let ids = body["resources"]
            .as_array()
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| id.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        Ok(DevicePage { offset, total, ids })
    }

    /// Look up hostname and seen timestamps for a batch of device ids.
    pub fn device_details(&self, ids: &[String]) -> Result<Vec<RawDevice>, CliError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/devices/entities/devices/v2", self.base_url);
        let body = self.client.send_json(
            self.client
                .http
                .post(&url)
                .bearer_auth(&self.access_token)
                .json(&serde_json::json!({ "ids": ids })),
        )?;

        let resources = body["resources"].as_array().ok_or_else(|| {
            self.client.upstream("CrowdStrike detail response missing 'resources' array".into())
        })?;

        Ok(resources
            .iter()
            .map(|device| RawDevice {
                hostname: text(&device["hostname"]),
                last_seen: text(&device["last_seen"]),
                first_seen: text(&device["first_seen"]),
            })
            .collect())
    }

    /// Page through every device and build records against `now`.
    ///
    /// Prints `N: <host> was last seen on <timestamp>` per device unless
    /// `quiet`.
    pub fn fetch_devices(&self, now: DateTime<Utc>, quiet: bool) -> Result<Vec<DeviceRecord>, CliError> {
        let mut devices = Vec::new();
        let mut offset = 0u64;
        let mut page = 0u32;

        loop {
            page += 1;
            let result = self.device_page(offset, PAGE_LIMIT)?;
            let done = result.offset >= result.total;

            // Infinite loop protection: the next offset must move forward
            if !done && result.offset <= offset {
                return Err(self.client.upstream(format!(
                    "CrowdStrike pagination stuck: offset {} of {} did not advance",
                    offset, result.total,
                )));
            }

            tracing::debug!(page, ids = result.ids.len(), offset = result.offset, total = result.total, "device page");

            for raw in self.device_details(&result.ids)? {
                let record = device_record(
                    raw.hostname.as_deref(),
                    raw.last_seen.as_deref(),
                    raw.first_seen.as_deref(),
                    now,
                )
                .map_err(|e| CliError::recon("CrowdStrike devices", e))?;

                devices.push(record);
                if !quiet {
                    eprintln!(
                        "{}: {} was last seen on {}",
                        devices.len(),
                        raw.hostname.as_deref().unwrap_or(""),
                        raw.last_seen.as_deref().unwrap_or(""),
                    );
                }
            }

            if done {
                break;
            }
            offset = result.offset;
        }

        Ok(devices)
    }
}

fn text(value: &serde_json::Value) -> Option<String> {
    value.as_str().filter(|s| !s.is_empty()).map(str::to_string)
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use httpmock::prelude::*;

    fn creds() -> FalconCredentials {
        FalconCredentials {
            client_id: "cid".into(),
            client_secret: "secret".into(),
        }
    }

    fn mock_token(server: &MockServer) {
        server.mock(|when, then| {
            when.method(POST)
                .path("/oauth2/token")
                .body_includes("client_id=cid")
                .body_includes("client_secret=secret");
            then.status(201)
                .json_body(serde_json::json!({"access_token": "tok", "token_type": "bearer", "expires_in": 1799}));
        });
    }

    fn page_body(offset: u64, total: u64, ids: &[&str]) -> serde_json::Value {
        serde_json::json!({
            "meta": {"pagination": {"offset": offset, "limit": PAGE_LIMIT, "total": total}},
            "resources": ids,
            "errors": []
        })
    }

    fn detail(host: &str, last_seen: &str) -> serde_json::Value {
        serde_json::json!({
            "device_id": format!("id-{}", host),
            "hostname": host,
            "last_seen": last_seen,
            "first_seen": "2023-01-01T00:00:00Z"
        })
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_pagination_two_pages() {
        let server = MockServer::start();
        mock_token(&server);

        let page1 = server.mock(|when, then| {
            when.method(GET)
                .path("/devices/queries/devices/v1")
                .header("authorization", "Bearer tok")
                .query_param("offset", "0")
                .query_param("limit", "500")
                .query_param("sort", "hostname.asc");
            then.status(200).json_body(page_body(2, 3, &["a", "b"]));
        });
        let page2 = server.mock(|when, then| {
            when.method(GET)
                .path("/devices/queries/devices/v1")
                .query_param("offset", "2");
            then.status(200).json_body(page_body(3, 3, &["c"]));
        });
        let details1 = server.mock(|when, then| {
            when.method(POST)
                .path("/devices/entities/devices/v2")
                .json_body(serde_json::json!({"ids": ["a", "b"]}));
            then.status(200).json_body(serde_json::json!({
                "resources": [detail("WS-01", "2024-01-10T00:00:00Z"), detail("WS-02", "2024-01-14T12:00:00Z")]
            }));
        });
        let details2 = server.mock(|when, then| {
            when.method(POST)
                .path("/devices/entities/devices/v2")
                .json_body(serde_json::json!({"ids": ["c"]}));
            then.status(200).json_body(serde_json::json!({
                "resources": [detail("WS-03", "2023-12-15T00:00:00Z")]
            }));
        });

        let client = FalconClient::with_base_url(&creds(), server.base_url()).unwrap();
        let devices = client.fetch_devices(now(), true).unwrap();

        page1.assert();
        page2.assert();
        details1.assert();
        details2.assert();
        assert_eq!(devices.len(), 3);
        assert_eq!(devices[0].hostname.as_deref(), Some("WS-01"));
        assert_eq!(devices[0].last_seen_utc.as_deref(), Some("2024-01-10 00:00:00"));
        assert_eq!(devices[0].stale_period_days, Some(5));
        assert_eq!(devices[1].stale_period_days, Some(0));
        assert_eq!(devices[2].stale_period_days, Some(31));
    }

    #[test]
    fn test_empty_inventory() {
        let server = MockServer::start();
        mock_token(&server);
        server.mock(|when, then| {
            when.method(GET).path("/devices/queries/devices/v1");
            then.status(200).json_body(page_body(0, 0, &[]));
        });

        let client = FalconClient::with_base_url(&creds(), server.base_url()).unwrap();
        let devices = client.fetch_devices(now(), true).unwrap();
        assert!(devices.is_empty());
    }

    #[test]
    fn test_pagination_stuck() {
        let server = MockServer::start();
        mock_token(&server);
        let page = server.mock(|when, then| {
            when.method(GET).path("/devices/queries/devices/v1");
            then.status(200).json_body(page_body(0, 10, &[]));
        });

        let client = FalconClient::with_base_url(&creds(), server.base_url()).unwrap();
        let err = client.fetch_devices(now(), true).unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_UPSTREAM);
        assert!(err.message.contains("pagination stuck"), "message: {}", err.message);
        page.assert_calls(1);
    }

    #[test]
    fn test_pagination_ids_without_progress() {
        let server = MockServer::start();
        mock_token(&server);
        let page = server.mock(|when, then| {
            when.method(GET).path("/devices/queries/devices/v1");
            then.status(200).json_body(page_body(0, 10, &["a"]));
        });
        let details = server.mock(|when, then| {
            when.method(POST).path("/devices/entities/devices/v2");
            then.status(200).json_body(serde_json::json!({
                "resources": [detail("WS-01", "2024-01-10T00:00:00Z")]
            }));
        });

        let client = FalconClient::with_base_url(&creds(), server.base_url()).unwrap();
        let err = client.fetch_devices(now(), true).unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_UPSTREAM);
        assert!(err.message.contains("did not advance"), "message: {}", err.message);
        page.assert_calls(1);
        details.assert_calls(0);
    }

    #[test]
    fn test_auth_failure_exit_51() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/oauth2/token");
            then.status(401).json_body(serde_json::json!({
                "errors": [{"code": 401, "message": "access denied, invalid bearer token"}]
            }));
        });

        let err = FalconClient::with_base_url(&creds(), server.base_url())
            .err()
            .unwrap();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_AUTH);
        assert!(err.message.contains("access denied"), "message: {}", err.message);
    }

    #[test]
    fn test_malformed_timestamp_is_format_error() {
        let server = MockServer::start();
        mock_token(&server);
        server.mock(|when, then| {
            when.method(GET).path("/devices/queries/devices/v1");
            then.status(200).json_body(page_body(1, 1, &["a"]));
        });
        server.mock(|when, then| {
            when.method(POST).path("/devices/entities/devices/v2");
            then.status(200).json_body(serde_json::json!({
                "resources": [detail("WS-01", "01/10/2024")]
            }));
        });

        let client = FalconClient::with_base_url(&creds(), server.base_url()).unwrap();
        let err = client.fetch_devices(now(), true).unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_REPORT_FORMAT);
        assert!(err.message.contains("CrowdStrike devices"), "message: {}", err.message);
    }

    #[test]
    fn test_missing_pagination_meta() {
        let server = MockServer::start();
        mock_token(&server);
        server.mock(|when, then| {
            when.method(GET).path("/devices/queries/devices/v1");
            then.status(200).json_body(serde_json::json!({"resources": []}));
        });

        let client = FalconClient::with_base_url(&creds(), server.base_url()).unwrap();
        let err = client.device_page(0, PAGE_LIMIT).unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_UPSTREAM);
    }

    #[test]
    fn test_extract_falcon_error() {
        let body = serde_json::json!({"errors": [{"message": "boom"}]});
        assert_eq!(extract_falcon_error(&body, 500), "boom");
        assert_eq!(extract_falcon_error(&serde_json::Value::Null, 503), "HTTP 503");
    }
}
