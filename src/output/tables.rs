use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::analysis::aggregate::AnalysisOutputs;
use crate::data::loader::RawGrid;
use crate::data::model::RecordSet;

/// Write the cleaned record set and the four summary tables into `out_dir`,
/// creating it if needed. Returns the written paths.
pub fn write_outputs(outputs: &AnalysisOutputs, out_dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;

    let cleaned = out_dir.join("cleaned_data.csv");
    write_record_set(&outputs.cleaned, &cleaned)?;
    let lines = out_dir.join("line_summary.csv");
    write_rows(&outputs.line_summary, &lines)?;
    let operators = out_dir.join("operator_summary.csv");
    write_rows(&outputs.operator_summary, &operators)?;
    let pairs = out_dir.join("line_operator_summary.csv");
    write_rows(&outputs.line_operator_summary, &pairs)?;
    let top = out_dir.join("top_waste_events.csv");
    write_record_set(&outputs.top_waste_events, &top)?;

    log::debug!("wrote analysis tables to {}", out_dir.display());
    Ok(vec![cleaned, lines, operators, pairs, top])
}

/// Write serialisable rows with a header taken from the field names.
pub fn write_rows<T: Serialize>(rows: &[T], path: &Path) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("writing row to {}", path.display()))?;
    }
    writer.flush().with_context(|| format!("flushing {}", path.display()))?;
    Ok(())
}

/// Write a record set with one column per field, missing cells left blank.
pub fn write_record_set(set: &RecordSet, path: &Path) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(set.columns.iter().map(|f| f.name()))?;
    for record in set.iter() {
        writer.write_record(
            set.columns
                .iter()
                .map(|f| record.get(*f).map(|v| v.to_string()).unwrap_or_default()),
        )?;
    }
    writer.flush().with_context(|| format!("flushing {}", path.display()))?;
    Ok(())
}

/// Write a raw grid without any header handling, padding ragged rows.
pub fn write_grid(grid: &RawGrid, path: &Path) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let width = grid.width().max(1);
    for row in &grid.rows {
        let mut cells: Vec<String> = row.iter().map(|c| c.to_string()).collect();
        cells.resize(width, String::new());
        writer.write_record(&cells)?;
    }
    writer.flush().with_context(|| format!("flushing {}", path.display()))?;
    Ok(())
}
