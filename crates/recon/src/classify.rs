use serde::Serialize;

/// Credential-vendor account state shown in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AccountStatus {
    Active,
    Disabled,
    Invited,
    #[serde(rename = "Expired Invitation")]
    ExpiredInvitation,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Disabled => "Disabled",
            Self::Invited => "Invited",
            Self::ExpiredInvitation => "Expired Invitation",
        }
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derive the account status from the vendor's flags.
///
/// `disabled` wins over everything; otherwise `never_logged_in` decides,
/// with a missing flag meaning the invitation lapsed.
pub fn classify(disabled: bool, never_logged_in: Option<bool>) -> Option<AccountStatus> {
    if disabled {
        return Some(AccountStatus::Disabled);
    }
    match never_logged_in {
        Some(true) => Some(AccountStatus::Invited),
        Some(false) => Some(AccountStatus::Active),
        None => Some(AccountStatus::ExpiredInvitation),
    }
}

/// Read a vendor flag that may be a bool, `0`/`1`, or their string forms.
pub fn read_flag(value: Option<&serde_json::Value>) -> Option<bool> {
    match value? {
        serde_json::Value::Bool(b) => Some(*b),
        serde_json::Value::Number(n) => n.as_i64().map(|n| n != 0),
        serde_json::Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" => Some(true),
            "0" | "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
