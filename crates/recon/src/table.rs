//! Loosely-typed tabular data as it arrives from spreadsheets and vendor
//! exports: ordered headers plus rows of optional text cells.
//!
//! Every transform returns a new `Table`; nothing here mutates in place
//! once a table has been built.

use serde::Serialize;

use crate::error::ReconError;

/// Ordered headers plus rows aligned to them. Missing cells are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Build a table from raw grid rows where the first row is the header.
    ///
    /// Short rows are padded with `None`; cells past the header width are
    /// kept under generated `column_N` headers so positional selection still
    /// sees them.
    pub fn from_grid(grid: Vec<Vec<Option<String>>>) -> Self {
        let mut iter = grid.into_iter();
        let header_row = match iter.next() {
            Some(row) => row,
            None => return Self::default(),
        };
        let mut headers: Vec<String> = header_row
            .into_iter()
            .map(|h| h.unwrap_or_default())
            .collect();

        let rows: Vec<Vec<Option<String>>> = iter.collect();
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        while headers.len() < width {
            headers.push(format!("column_{}", headers.len()));
        }

        let mut table = Self::new(headers);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    /// Append a row, padding or truncating it to the header width.
    pub fn push_row(&mut self, mut row: Vec<Option<String>>) {
        row.resize(self.headers.len(), None);
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a header, ignoring surrounding whitespace in the header cell.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = name.trim();
        self.headers.iter().position(|h| h.trim() == wanted)
    }

    /// Resolve a header or fail with `MissingColumn` attributed to `source`.
    pub fn require_column(&self, source: &str, name: &str) -> Result<usize, ReconError> {
        self.column_index(name)
            .ok_or_else(|| ReconError::missing_column(source, name))
    }

    /// Cell text at (row, col), `None` when blank or out of range.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .and_then(|c| c.as_deref())
    }

    /// Promote the data row at `index` to the header.
    ///
    /// Data rows up to and including `index` are discarded: anything above
    /// the real header is a banner. The remaining rows keep their order.
    pub fn promote_header(&self, source: &str, index: usize) -> Result<Table, ReconError> {
        let header_row = self.rows.get(index).ok_or_else(|| {
            ReconError::missing_column(source, format!("header row {index} (table has {} rows)", self.rows.len()))
        })?;

        let headers = header_row
            .iter()
            .enumerate()
            .map(|(i, h)| h.clone().unwrap_or_else(|| format!("column_{i}")))
            .collect();

        let mut table = Table::new(headers);
        for row in &self.rows[index + 1..] {
            table.push_row(row.clone());
        }
        Ok(table)
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    #[test]
    fn from_grid_pads_short_rows() {
        let t = Table::from_grid(vec![
            vec![s("a"), s("b"), s("c")],
            vec![s("1")],
            vec![s("1"), s("2"), s("3")],
        ]);
        assert_eq!(t.headers, vec!["a", "b", "c"]);
        assert_eq!(t.rows[0], vec![s("1"), None, None]);
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn from_grid_names_extra_columns() {
        let t = Table::from_grid(vec![vec![s("a")], vec![s("1"), s("2")]]);
        assert_eq!(t.headers, vec!["a", "column_1"]);
        assert_eq!(t.cell(0, 1), Some("2"));
    }

    #[test]
    fn from_grid_empty() {
        let t = Table::from_grid(Vec::new());
        assert!(t.headers.is_empty());
        assert!(t.is_empty());
    }

    #[test]
    fn column_index_ignores_header_whitespace() {
        let t = Table::new(vec![" First Name ".into(), "Email".into()]);
        assert_eq!(t.column_index("First Name"), Some(0));
        assert_eq!(t.column_index("Missing"), None);
    }

    #[test]
    fn promote_header_drops_banner_rows() {
        let t = Table::from_grid(vec![
            vec![s("Company Directory"), None],
            vec![s("updated weekly"), None],
            vec![s("First Name"), s("Last Name")],
            vec![s("Ada"), s("Lovelace")],
            vec![s("Alan"), s("Turing")],
        ]);
        let promoted = t.promote_header("employees", 1).unwrap();
        assert_eq!(promoted.headers, vec!["First Name", "Last Name"]);
        assert_eq!(promoted.len(), 2);
        assert_eq!(promoted.cell(0, 0), Some("Ada"));
        assert_eq!(promoted.cell(1, 1), Some("Turing"));
    }

    #[test]
    fn promote_header_on_short_table_fails() {
        let t = Table::from_grid(vec![vec![s("a")], vec![s("1")]]);
        let err = t.promote_header("employees", 1).unwrap_err();
        assert!(matches!(err, ReconError::MissingColumn { .. }));
    }
}
