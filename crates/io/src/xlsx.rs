// Excel import/export for source sheets and the report
//
// Import reads the first worksheet of xlsx, xlsm, xls, xlsb or ods through
// calamine. Export always writes a single-sheet xlsx through rust_xlsxwriter.

use std::io::Cursor;
use std::path::Path;
use std::time::Instant;

use assetlink_recon::Table;
use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use chrono::{Duration, NaiveDate};
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook, Worksheet};

/// Excel's hard row limit; anything beyond is not a real sheet.
const MAX_ROWS: usize = 1_048_576;

/// Statistics from importing a workbook.
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    /// Name of the worksheet that was read.
    pub sheet_name: String,
    /// Worksheets present but ignored (only the first is read).
    pub sheets_skipped: usize,
    /// Data rows below the header.
    pub rows_imported: usize,
    /// Non-empty cells, header included.
    pub cells_imported: usize,
    pub import_duration_ms: u128,
}

/// Import the first worksheet of a workbook file (xlsx, xls, xlsb, ods).
pub fn import_table(path: &Path) -> Result<(Table, ImportResult), String> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open Excel file: {}", e))?;
    import_first_sheet(&mut workbook)
}

/// Import the first worksheet of an in-memory workbook, e.g. a downloaded
/// drive file. The container format is detected from the bytes.
pub fn import_table_from_bytes(bytes: &[u8]) -> Result<(Table, ImportResult), String> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| format!("Failed to open Excel data: {}", e))?;
    import_first_sheet(&mut workbook)
}

fn import_first_sheet<RS>(workbook: &mut Sheets<RS>) -> Result<(Table, ImportResult), String>
where
    RS: std::io::Read + std::io::Seek,
{
    let start_time = Instant::now();

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let sheet_name = sheet_names
        .first()
        .cloned()
        .ok_or_else(|| "Excel file contains no sheets".to_string())?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| format!("Failed to read sheet '{}': {}", sheet_name, e))?;

    let (grid, cells_imported) = range_to_grid(&range);
    let table = Table::from_grid(grid);

    let result = ImportResult {
        sheet_name,
        sheets_skipped: sheet_names.len().saturating_sub(1),
        rows_imported: table.len(),
        cells_imported,
        import_duration_ms: start_time.elapsed().as_millis(),
    };
    log::debug!(
        "imported sheet '{}': {} rows, {} cells",
        result.sheet_name,
        result.rows_imported,
        result.cells_imported
    );
    Ok((table, result))
}

/// Flatten a calamine range into text rows. Leading empty columns before
/// the range start are padded so positions match the sheet.
fn range_to_grid(range: &Range<Data>) -> (Vec<Vec<Option<String>>>, usize) {
    let (_, data_start_col) = range.start().unwrap_or((0, 0));
    let mut cells = 0;

    let grid = range
        .rows()
        .take(MAX_ROWS)
        .map(|row| {
            let mut out: Vec<Option<String>> = vec![None; data_start_col as usize];
            for cell in row {
                let text = cell_text(cell);
                if text.is_some() {
                    cells += 1;
                }
                out.push(text);
            }
            out
        })
        .collect();

    (grid, cells)
}

/// Text form of a cell, `None` for blanks.
fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => {
            if s.is_empty() {
                None
            } else {
                Some(s.clone())
            }
        }
        Data::Float(n) => Some(format_number(*n)),
        Data::Int(n) => Some(format!("{}", n)),
        // Same spelling spreadsheet formulas use
        Data::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::Error(e) => Some(format!("#{:?}", e)),
        Data::DateTime(dt) => Some(format_serial(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
    }
}

/// Format nicely: integers without decimals.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Render an Excel serial date (1900 system) as `YYYY-MM-DD` or
/// `YYYY-MM-DD HH:MM:SS` when it carries a time part.
fn format_serial(serial: f64) -> String {
    let Some(epoch) = NaiveDate::from_ymd_opt(1899, 12, 30).and_then(|d| d.and_hms_opt(0, 0, 0)) else {
        return format_number(serial);
    };
    let millis = (serial * 86_400_000.0).round() as i64;
    let value = epoch + Duration::milliseconds(millis);
    // Small epsilon for float comparison
    if serial.fract().abs() > 0.00001 {
        value.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        value.format("%Y-%m-%d").to_string()
    }
}

// ============================================================================
// Export
// ============================================================================

/// Options for writing a table as a workbook.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub sheet_name: String,
    /// Columns whose cells are written as numbers when they parse as integers.
    pub integer_columns: Vec<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            sheet_name: "main".to_string(),
            integer_columns: Vec::new(),
        }
    }
}

/// Statistics from an export.
#[derive(Debug, Clone, Default)]
pub struct ExportResult {
    pub rows_exported: usize,
    pub cells_exported: usize,
    pub export_duration_ms: u128,
}

/// Export a table to an xlsx file.
pub fn export_table(table: &Table, path: &Path, options: &ExportOptions) -> Result<ExportResult, String> {
    let start_time = Instant::now();
    let (mut workbook, mut result) = build_workbook(table, options)?;
    workbook
        .save(path)
        .map_err(|e| format!("Failed to save XLSX file: {}", e))?;
    result.export_duration_ms = start_time.elapsed().as_millis();
    Ok(result)
}

/// Export a table to xlsx bytes.
pub fn export_table_to_buffer(table: &Table, options: &ExportOptions) -> Result<(Vec<u8>, ExportResult), String> {
    let start_time = Instant::now();
    let (mut workbook, mut result) = build_workbook(table, options)?;
    let bytes = workbook
        .save_to_buffer()
        .map_err(|e| format!("Failed to render XLSX data: {}", e))?;
    result.export_duration_ms = start_time.elapsed().as_millis();
    Ok((bytes, result))
}

fn build_workbook(table: &Table, options: &ExportOptions) -> Result<(XlsxWorkbook, ExportResult), String> {
    let mut workbook = XlsxWorkbook::new();
    let worksheet = workbook
        .add_worksheet()
        .set_name(&options.sheet_name)
        .map_err(|e| format!("Failed to create sheet '{}': {}", options.sheet_name, e))?;

    let result = write_table(worksheet, table, options)?;
    worksheet.autofit();

    Ok((workbook, result))
}

fn write_table(worksheet: &mut Worksheet, table: &Table, options: &ExportOptions) -> Result<ExportResult, String> {
    let mut result = ExportResult::default();
    let header_format = Format::new().set_bold();

    for (col, header) in table.headers.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, header, &header_format)
            .map_err(|e| format!("Failed to write header ({}): {}", header, e))?;
    }

    let integer_cols: Vec<bool> = table
        .headers
        .iter()
        .map(|h| options.integer_columns.iter().any(|c| c == h))
        .collect();

    for (row_idx, row) in table.rows.iter().enumerate() {
        let row32 = (row_idx + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            let Some(value) = cell else { continue };
            let col16 = col as u16;

            let number = if integer_cols.get(col).copied().unwrap_or(false) {
                value.trim().parse::<i64>().ok()
            } else {
                None
            };

            match number {
                Some(n) => worksheet
                    .write_number(row32, col16, n as f64)
                    .map_err(|e| format!("Failed to write cell ({}, {}): {}", row32, col, e))?,
                None => worksheet
                    .write_string(row32, col16, value)
                    .map_err(|e| format!("Failed to write cell ({}, {}): {}", row32, col, e))?,
            };
            result.cells_exported += 1;
        }
        result.rows_exported += 1;
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn s(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    fn sample() -> Table {
        let mut table = Table::new(vec!["Host Name".into(), "Days".into(), "Note".into()]);
        table.push_row(vec![s("WS-01"), s("5"), None]);
        table.push_row(vec![None, s("n/a"), s("loaner")]);
        table
    }

    fn options() -> ExportOptions {
        ExportOptions {
            integer_columns: vec!["Days".into()],
            ..ExportOptions::default()
        }
    }

    #[test]
    fn test_export_then_import_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.xlsx");

        let result = export_table(&sample(), &path, &options()).unwrap();
        assert_eq!(result.rows_exported, 2);
        assert_eq!(result.cells_exported, 4);

        let (table, stats) = import_table(&path).unwrap();
        assert_eq!(stats.sheet_name, "main");
        assert_eq!(stats.sheets_skipped, 0);
        assert_eq!(table.headers, vec!["Host Name", "Days", "Note"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, 0), Some("WS-01"));
        // integer column comes back as a number without decimals
        assert_eq!(table.cell(0, 1), Some("5"));
        assert_eq!(table.cell(0, 2), None);
        assert_eq!(table.cell(1, 0), None);
        assert_eq!(table.cell(1, 1), Some("n/a"));
        assert_eq!(table.cell(1, 2), Some("loaner"));
    }

    #[test]
    fn test_integer_column_written_as_number() {
        let (bytes, _) = export_table_to_buffer(&sample(), &options()).unwrap();
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).unwrap();
        let range = workbook.worksheet_range("main").unwrap();
        assert_eq!(range.get_value((1, 1)), Some(&Data::Float(5.0)));
        assert_eq!(range.get_value((1, 0)), Some(&Data::String("WS-01".into())));
    }

    #[test]
    fn test_import_from_bytes() {
        let (bytes, _) = export_table_to_buffer(&sample(), &ExportOptions::default()).unwrap();
        let (table, stats) = import_table_from_bytes(&bytes).unwrap();
        assert_eq!(stats.rows_imported, 2);
        // without the integer option the value stays text
        assert_eq!(table.cell(0, 1), Some("5"));
    }

    #[test]
    fn test_custom_sheet_name() {
        let opts = ExportOptions {
            sheet_name: "devices".into(),
            integer_columns: Vec::new(),
        };
        let (bytes, _) = export_table_to_buffer(&sample(), &opts).unwrap();
        let (_, stats) = import_table_from_bytes(&bytes).unwrap();
        assert_eq!(stats.sheet_name, "devices");
    }

    #[test]
    fn test_invalid_sheet_name_rejected() {
        let opts = ExportOptions {
            sheet_name: "bad[name]".into(),
            integer_columns: Vec::new(),
        };
        let err = export_table_to_buffer(&sample(), &opts).unwrap_err();
        assert!(err.contains("bad[name]"), "got: {err}");
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        let err = import_table_from_bytes(b"not a workbook").unwrap_err();
        assert!(err.starts_with("Failed to open Excel data"), "got: {err}");
    }

    #[test]
    fn test_format_serial() {
        assert_eq!(format_serial(45301.0), "2024-01-10");
        assert_eq!(format_serial(45301.5), "2024-01-10 12:00:00");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(42.0), "42");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(2.5), "2.5");
    }
}
