use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::loader::{load_grid, RawGrid};
use super::model::{CellValue, Field, FieldKind, RecordSet, WasteRecord};
use crate::config::PipelineConfig;
use crate::error::PipelineError;

// ---------------------------------------------------------------------------
// LineNormalizationMap
// ---------------------------------------------------------------------------

/// Fixed correction table for production-line labels: variant → canonical.
///
/// Lookups are made on whitespace-normalised labels, so variants that differ
/// only in stray spaces need a single entry. Maps read from config go
/// through the same normalisation as [`LineNormalizationMap::from_pairs`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, String>",
    into = "BTreeMap<String, String>"
)]
pub struct LineNormalizationMap {
    variants: BTreeMap<String, String>,
}

impl Default for LineNormalizationMap {
    fn default() -> Self {
        LineNormalizationMap::from_pairs([
            ("سليتر 1", "سليتر1"),
            ("سليتر 2", "سليتر2"),
            ("تناية 1", "تناية1"),
            ("تناية 2", "تناية2"),
            ("تناية 3", "تناية3"),
            ("تناية 4", "تناية4"),
            ("تناية1 ", "تناية1"),
        ])
    }
}

impl LineNormalizationMap {
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        LineNormalizationMap {
            variants: pairs
                .into_iter()
                .map(|(variant, canonical)| {
                    (normalize_whitespace(variant), normalize_whitespace(canonical))
                })
                .collect(),
        }
    }

    /// The canonical label for `label`. Labels outside the map are returned
    /// whitespace-normalised but otherwise untouched.
    pub fn canonicalize(&self, label: &str) -> String {
        let label = normalize_whitespace(label);
        match self.variants.get(&label) {
            Some(canonical) => canonical.clone(),
            None => label,
        }
    }

    pub fn is_canonical(&self, label: &str) -> bool {
        self.variants.values().any(|c| c == label)
    }

    /// Reject maps where a canonical label is itself a variant, which would
    /// make normalisation order-dependent.
    pub fn validate(&self) -> std::result::Result<(), PipelineError> {
        for canonical in self.variants.values() {
            if let Some(next) = self.variants.get(canonical) {
                if next != canonical {
                    return Err(PipelineError::Config(format!(
                        "line label '{canonical}' is both canonical and a variant of '{next}'"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl From<BTreeMap<String, String>> for LineNormalizationMap {
    fn from(variants: BTreeMap<String, String>) -> Self {
        LineNormalizationMap::from_pairs(
            variants.iter().map(|(v, c)| (v.as_str(), c.as_str())),
        )
    }
}

impl From<LineNormalizationMap> for BTreeMap<String, String> {
    fn from(map: LineNormalizationMap) -> Self {
        map.variants
    }
}

// ---------------------------------------------------------------------------
// Cell coercion
// ---------------------------------------------------------------------------

/// Trim and collapse internal whitespace.
pub fn normalize_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_null_token(s: &str) -> bool {
    s.is_empty()
        || ["nan", "none", "null", "<na>", "nat"]
            .iter()
            .any(|t| s.eq_ignore_ascii_case(t))
}

/// Numeric coercion: unparseable or non-finite values become `None`.
pub fn coerce_number(cell: &CellValue) -> Option<f64> {
    let value = match cell {
        CellValue::Number(v) => *v,
        CellValue::Text(s) => s.trim().parse::<f64>().ok()?,
        CellValue::Missing => return None,
    };
    value.is_finite().then_some(value)
}

/// Text coercion: whitespace-normalised, null-like strings become `None`.
/// Integral numbers render without a fractional part.
pub fn coerce_text(cell: &CellValue) -> Option<String> {
    let text = match cell {
        CellValue::Text(s) => normalize_whitespace(s),
        CellValue::Number(v) if !v.is_finite() => return None,
        CellValue::Number(v) if v.fract() == 0.0 && v.abs() < 1e15 => format!("{}", *v as i64),
        CellValue::Number(v) => v.to_string(),
        CellValue::Missing => return None,
    };
    (!is_null_token(&text)).then_some(text)
}

fn header_label(cell: &CellValue) -> Option<String> {
    coerce_text(cell)
}

// ---------------------------------------------------------------------------
// Loader/Normalizer
// ---------------------------------------------------------------------------

/// Read `path` and return the cleaned waste log.
pub fn load_and_preprocess(path: &Path, config: &PipelineConfig) -> Result<RecordSet> {
    let grid = load_grid(path, config.layout.sheet.as_deref())?;
    let set = clean_grid(&grid, config)?;
    log::info!(
        "{}: {} cleaned records from {} raw rows",
        path.display(),
        set.len(),
        grid.height()
    );
    Ok(set)
}

/// Turn a raw template grid into a cleaned [`RecordSet`].
///
/// Guarantees on the result: required fields present in the source are never
/// missing, text is whitespace-normalised, line labels went through the line
/// map and waste values lie in `[0, max_waste_kg)`.
pub fn clean_grid(grid: &RawGrid, config: &PipelineConfig) -> Result<RecordSet, PipelineError> {
    let layout = &config.layout;

    // Locate whitelisted columns by their header label, ignoring metadata columns.
    let kept_columns: Vec<usize> = (0..grid.width())
        .filter(|c| !layout.dropped_columns.contains(c))
        .collect();
    let mut located: Vec<(Field, usize)> = Vec::new();
    for spec in &config.schema.fields {
        let position = kept_columns.iter().copied().find(|&c| {
            header_label(grid.cell(layout.header_row, c)).as_deref() == Some(spec.header.as_str())
        });
        if let Some(col) = position {
            located.push((spec.field, col));
        }
    }
    let columns: Vec<Field> = located.iter().map(|(f, _)| *f).collect();

    if columns.is_empty() {
        log::warn!(
            "no whitelisted column found in header row {} (layout {})",
            layout.header_row,
            layout.version
        );
    }

    let mut mandatory = Vec::new();
    for spec in config.schema.required() {
        if columns.contains(&spec.field) {
            mandatory.push(spec.field);
        } else if config.strict_schema {
            return Err(PipelineError::MissingMandatoryColumn {
                field: spec.field,
                header: spec.header.clone(),
            });
        } else {
            log::warn!(
                "mandatory column '{}' ({}) is absent; its row filter is skipped",
                spec.header,
                spec.field
            );
        }
    }

    let data_rows = grid.rows.len().saturating_sub(layout.data_start_row);
    let mut records = Vec::with_capacity(data_rows);
    let mut coerced = 0usize;
    let mut missing_mandatory = 0usize;
    let mut out_of_range = 0usize;

    for row in layout.data_start_row..grid.height() {
        let mut record = WasteRecord::new();
        for &(field, col) in &located {
            let cell = grid.cell(row, col);
            let value = match field.kind() {
                FieldKind::Numeric => {
                    let number = coerce_number(cell);
                    if number.is_none() && !cell.is_missing() {
                        coerced += 1;
                    }
                    number.map(CellValue::Number)
                }
                FieldKind::Text => coerce_text(cell).map(CellValue::Text),
            };
            if let Some(value) = value {
                record.set(field, value);
            }
        }

        if mandatory.iter().any(|f| record.is_missing(*f)) {
            missing_mandatory += 1;
            continue;
        }

        if let Some(line) = record.text(Field::Line) {
            let canonical = config.line_map.canonicalize(line);
            record.set(Field::Line, CellValue::Text(canonical));
        }

        if columns.contains(&Field::WasteKg) {
            let in_range = record
                .number(Field::WasteKg)
                .is_some_and(|waste| waste >= 0.0 && waste < config.max_waste_kg);
            if !in_range {
                out_of_range += 1;
                continue;
            }
        }

        records.push(record);
    }

    log::debug!(
        "cleaning: {data_rows} data rows, {coerced} unparseable numbers, \
         {missing_mandatory} missing mandatory fields, {out_of_range} out of range"
    );

    let set = RecordSet::new(columns, records);
    let unknown_lines: Vec<&str> = set
        .unique_text(Field::Line)
        .into_iter()
        .filter(|l| !config.line_map.is_canonical(l))
        .collect();
    if !unknown_lines.is_empty() {
        log::warn!("production lines outside the canonical set: {unknown_lines:?}");
    }

    Ok(set)
}

/// Lay a record set out as a raw grid in the configured template: metadata
/// columns left empty, labels on the header row, records from the data row.
///
/// Cleaning the result with the same config yields the same records.
pub fn render_template(set: &RecordSet, config: &PipelineConfig) -> RawGrid {
    let layout = &config.layout;

    let mut placement: Vec<(Field, &str, usize)> = Vec::new();
    let mut col = 0usize;
    for spec in &config.schema.fields {
        if !set.has_column(spec.field) {
            continue;
        }
        while layout.dropped_columns.contains(&col) {
            col += 1;
        }
        placement.push((spec.field, spec.header.as_str(), col));
        col += 1;
    }
    let width = col;

    let mut rows = vec![vec![CellValue::Missing; width]; layout.data_start_row];
    if let Some(header) = rows.get_mut(layout.header_row) {
        for &(_, label, c) in &placement {
            header[c] = CellValue::Text(label.to_string());
        }
    }
    for record in &set.records {
        let mut row = vec![CellValue::Missing; width];
        for &(field, _, c) in &placement {
            if let Some(value) = record.get(field) {
                row[c] = value.clone();
            }
        }
        rows.push(row);
    }
    RawGrid::new(rows)
}
