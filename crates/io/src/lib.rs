// Spreadsheet I/O for report sources and the report itself

pub mod csv;
pub mod json;
pub mod xlsx;

use std::path::Path;

use assetlink_recon::Table;

/// Source file kinds recognized by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Delimited,
    Workbook,
}

impl FileKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" | "tsv" | "txt" => Some(Self::Delimited),
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Some(Self::Workbook),
            _ => None,
        }
    }
}

/// Import a tabular source file, choosing the reader by extension.
pub fn import_table(path: &Path) -> Result<Table, String> {
    match FileKind::from_path(path) {
        Some(FileKind::Delimited) => csv::import_table(path),
        Some(FileKind::Workbook) => xlsx::import_table(path).map(|(table, _)| table),
        None => Err(format!(
            "Unsupported table format: {} (expected csv, tsv, xlsx, xls, xlsb or ods)",
            path.display()
        )),
    }
}
