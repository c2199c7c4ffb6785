use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty column name, duplicate mapping, etc.).
    ConfigValidation(String),
    /// A vendor timestamp did not have the expected shape.
    Format {
        source: String,
        field: String,
        value: String,
    },
    /// A requested column (by name or position) is absent from a source table.
    MissingColumn { source: String, column: String },
    /// Several report rows claim the same host and the policy forbids picking one.
    JoinAmbiguity { host_name: String, rows: usize },
}

impl ReconError {
    pub(crate) fn missing_column(source: &str, column: impl Into<String>) -> Self {
        Self::MissingColumn {
            source: source.into(),
            column: column.into(),
        }
    }

    pub(crate) fn format(source: &str, field: &str, value: &str) -> Self {
        Self::Format {
            source: source.into(),
            field: field.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::Format { source, field, value } => {
                write!(f, "source '{source}', field '{field}': unexpected timestamp format '{value}'")
            }
            Self::MissingColumn { source, column } => {
                write!(f, "source '{source}': missing column '{column}'")
            }
            Self::JoinAmbiguity { host_name, rows } => {
                write!(f, "host '{host_name}' matched {rows} report rows")
            }
        }
    }
}

impl std::error::Error for ReconError {}
