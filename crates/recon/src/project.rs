//! Column selection by header name or position, with optional header
//! overrides on the output.

use crate::error::ReconError;
use crate::table::Table;

/// Data row promoted to the header when a sheet carries a banner above it.
pub const BANNER_HEADER_ROW: usize = 1;

/// Which columns to keep, in output order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSelector {
    Names(Vec<String>),
    Indices(Vec<usize>),
}

impl ColumnSelector {
    pub fn names<S: AsRef<str>>(names: &[S]) -> Self {
        Self::Names(names.iter().map(|n| n.as_ref().to_string()).collect())
    }
}

/// Select a subset of columns from `table`.
///
/// With `header_override`, data row [`BANNER_HEADER_ROW`] becomes the header
/// first. Selection by name keeps the requested names as output headers;
/// selection by position keeps the source headers.
pub fn project(
    source: &str,
    table: &Table,
    selector: &ColumnSelector,
    header_override: bool,
) -> Result<Table, ReconError> {
    let promoted;
    let table = if header_override {
        promoted = table.promote_header(source, BANNER_HEADER_ROW)?;
        &promoted
    } else {
        table
    };

    let (indices, headers): (Vec<usize>, Vec<String>) = match selector {
        ColumnSelector::Names(names) => {
            let mut indices = Vec::with_capacity(names.len());
            for name in names {
                indices.push(table.require_column(source, name)?);
            }
            (indices, names.clone())
        }
        ColumnSelector::Indices(positions) => {
            let mut headers = Vec::with_capacity(positions.len());
            for &pos in positions {
                let header = table.headers.get(pos).ok_or_else(|| {
                    ReconError::missing_column(
                        source,
                        format!("#{pos} (table has {} columns)", table.headers.len()),
                    )
                })?;
                headers.push(header.clone());
            }
            (positions.clone(), headers)
        }
    };

    let mut out = Table::new(headers);
    for row in &table.rows {
        out.push_row(indices.iter().map(|&i| row.get(i).cloned().flatten()).collect());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    fn owners() -> Table {
        Table::from_grid(vec![
            vec![s("Asset Tag"), s("Host Name"), s("First Name"), s("Last Name")],
            vec![s("A-1"), s("WS-01"), s("Jane"), s("Doe")],
            vec![s("A-2"), s("WS-02"), s("John"), None],
        ])
    }

    #[test]
    fn select_by_name_reorders() {
        let out = project(
            "owners",
            &owners(),
            &ColumnSelector::names(&["Last Name", "Host Name"]),
            false,
        )
        .unwrap();
        assert_eq!(out.headers, vec!["Last Name", "Host Name"]);
        assert_eq!(out.rows[0], vec![s("Doe"), s("WS-01")]);
        assert_eq!(out.rows[1], vec![None, s("WS-02")]);
    }

    #[test]
    fn select_by_index() {
        let out = project("owners", &owners(), &ColumnSelector::Indices(vec![1, 2]), false).unwrap();
        assert_eq!(out.headers, vec!["Host Name", "First Name"]);
        assert_eq!(out.rows[1], vec![s("WS-02"), s("John")]);
    }

    #[test]
    fn missing_name_fails() {
        let err = project(
            "owners",
            &owners(),
            &ColumnSelector::names(&["Host Name", "Department"]),
            false,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ReconError::MissingColumn {
                source: "owners".into(),
                column: "Department".into()
            }
        );
    }

    #[test]
    fn missing_index_fails() {
        let err = project("owners", &owners(), &ColumnSelector::Indices(vec![0, 9]), false).unwrap_err();
        assert!(err.to_string().contains("#9"));
    }

    #[test]
    fn header_override_promotes_second_row() {
        let sheet = Table::from_grid(vec![
            vec![s("Monday board export"), None, None],
            vec![None, None, None],
            vec![s("First Name"), s("Last Name"), s("Email")],
            vec![s("Ada"), s("Lovelace"), s("ada@co.com")],
        ]);
        let out = project(
            "employees",
            &sheet,
            &ColumnSelector::names(&["Email", "First Name"]),
            true,
        )
        .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.rows[0], vec![s("ada@co.com"), s("Ada")]);
    }

    #[test]
    fn projection_leaves_input_untouched() {
        let input = owners();
        let before = input.clone();
        let _ = project("owners", &input, &ColumnSelector::Indices(vec![3]), false).unwrap();
        assert_eq!(input, before);
    }
}
