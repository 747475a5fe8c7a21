use std::path::Path;

use anyhow::{Context, Result};
use calamine::{open_workbook_auto, Data, Reader};

use super::model::CellValue;
use crate::error::PipelineError;

// ---------------------------------------------------------------------------
// RawGrid – header-less two-dimensional cell grid
// ---------------------------------------------------------------------------

/// Cells exactly as the source produced them, anchored at the sheet's A1.
/// Rows may be ragged; reads past the end are `Missing`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawGrid {
    pub rows: Vec<Vec<CellValue>>,
}

static MISSING: CellValue = CellValue::Missing;

impl RawGrid {
    pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
        RawGrid { rows }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Length of the longest row.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&MISSING)
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Read a raw grid from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.xlsx` / `.xlsm` / `.xlsb` / `.xls` / `.ods` – spreadsheet workbooks
/// * `.csv` – a header-less export of the same sheet
pub fn load_grid(path: &Path, sheet: Option<&str>) -> Result<RawGrid> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => load_workbook(path, sheet),
        "csv" => load_csv(path),
        other => Err(PipelineError::UnsupportedFormat(other.to_string()).into()),
    }
}

// ---------------------------------------------------------------------------
// Workbook loader
// ---------------------------------------------------------------------------

fn load_workbook(path: &Path, sheet: Option<&str>) -> Result<RawGrid> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| PipelineError::Ingestion(e.to_string()))
        .with_context(|| format!("opening workbook {}", path.display()))?;

    let range = match sheet {
        Some(name) => workbook
            .worksheet_range(name)
            .map_err(|e| PipelineError::Ingestion(e.to_string()))
            .with_context(|| format!("reading sheet '{name}'"))?,
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| PipelineError::Ingestion("workbook has no sheets".to_string()))?
            .map_err(|e| PipelineError::Ingestion(e.to_string()))
            .context("reading first sheet")?,
    };

    // calamine trims leading empty rows/columns; re-anchor at A1 so the
    // layout offsets keep their meaning.
    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows: Vec<Vec<CellValue>> = vec![Vec::new(); row_offset];
    for source_row in range.rows() {
        let mut row = vec![CellValue::Missing; col_offset];
        row.extend(source_row.iter().map(convert_cell));
        rows.push(row);
    }

    log::debug!(
        "read {} rows x {} columns from {}",
        rows.len(),
        rows.iter().map(Vec::len).max().unwrap_or(0),
        path.display()
    );
    Ok(RawGrid { rows })
}

fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Missing,
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        other => CellValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: the sheet saved as-is, no header handling, ragged rows allowed.
/// Every non-empty field is kept as text; typing happens during cleaning.
fn load_csv(path: &Path) -> Result<RawGrid> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening CSV {}", path.display()))?;

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        rows.push(
            record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        CellValue::Missing
                    } else {
                        CellValue::Text(field.to_string())
                    }
                })
                .collect(),
        );
    }

    log::debug!("read {} CSV rows from {}", rows.len(), path.display());
    Ok(RawGrid { rows })
}
