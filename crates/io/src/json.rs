// JSON import/export

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use assetlink_recon::Table;

/// Read a JSON document, e.g. a saved user-data payload.
pub fn read_value(path: &Path) -> Result<serde_json::Value, String> {
    let file = File::open(path).map_err(|e| e.to_string())?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| format!("Invalid JSON: {}", e))
}

/// Export a table as a JSON array of arrays: the header row first, then
/// one array per row with `null` for blank cells.
pub fn export_table(table: &Table, path: &Path) -> Result<(), String> {
    let file = File::create(path).map_err(|e| e.to_string())?;
    let writer = BufWriter::new(file);

    let mut rows: Vec<Vec<Option<&str>>> = Vec::with_capacity(table.len() + 1);
    rows.push(table.headers.iter().map(|h| Some(h.as_str())).collect());
    for row in &table.rows {
        rows.push(row.iter().map(|c| c.as_deref()).collect());
    }

    serde_json::to_writer_pretty(writer, &rows).map_err(|e| e.to_string())?;

    Ok(())
}
