//! Vendor clients used by `assetlink run`.
//!
//! - `falcon`: CrowdStrike Falcon device inventory
//! - `lastpass`: LastPass Enterprise user data
//! - `secrets`: Google Secret Manager credential documents
//! - `drive`: Google Drive spreadsheet download and report upload

mod common;
pub mod drive;
pub mod falcon;
pub mod lastpass;
pub mod secrets;

pub(crate) use common::{load_json_file, resolve_token};
