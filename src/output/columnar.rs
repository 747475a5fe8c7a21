use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field as ArrowField, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use crate::data::model::{FieldKind, RecordSet};

/// Arrow batch with one nullable column per record-set field. Numeric
/// fields become `Float64`, text fields `Utf8`.
pub fn to_record_batch(set: &RecordSet) -> Result<RecordBatch> {
    let mut fields = Vec::with_capacity(set.columns.len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(set.columns.len());

    for &field in &set.columns {
        match field.kind() {
            FieldKind::Numeric => {
                fields.push(ArrowField::new(field.name(), DataType::Float64, true));
                let values: Float64Array = set.iter().map(|r| r.number(field)).collect();
                arrays.push(Arc::new(values));
            }
            FieldKind::Text => {
                fields.push(ArrowField::new(field.name(), DataType::Utf8, true));
                let values: StringArray = set.iter().map(|r| r.text(field)).collect();
                arrays.push(Arc::new(values));
            }
        }
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
        .context("building record batch for cleaned data")
}

/// Write the cleaned record set as a single-batch parquet file.
pub fn write_parquet(set: &RecordSet, path: &Path) -> Result<()> {
    let batch = to_record_batch(set)?;
    let file =
        std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)
        .context("creating parquet writer")?;
    writer
        .write(&batch)
        .with_context(|| format!("writing {}", path.display()))?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}
