//! Run configuration: spreadsheet layout, business schema and thresholds.
//!
//! Every value has a default pinned to the `waste-log-v1` template, so a
//! config file only needs to name what differs.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::model::Field;
use crate::data::normalize::LineNormalizationMap;
use crate::error::PipelineError;

// ---------------------------------------------------------------------------
// TemplateLayout – where things sit in the raw sheet
// ---------------------------------------------------------------------------

/// Row and column roles of the raw spreadsheet export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateLayout {
    /// Template version this layout describes.
    pub version: String,
    /// Sheet to read; the first sheet when `None`.
    pub sheet: Option<String>,
    /// Zero-based columns holding metadata rather than business data.
    pub dropped_columns: Vec<usize>,
    /// Zero-based row holding the column labels.
    pub header_row: usize,
    /// Zero-based row of the first data record.
    pub data_start_row: usize,
}

impl Default for TemplateLayout {
    fn default() -> Self {
        TemplateLayout {
            version: "waste-log-v1".to_string(),
            sheet: None,
            dropped_columns: vec![0, 1, 9, 15],
            header_row: 2,
            data_start_row: 27,
        }
    }
}

// ---------------------------------------------------------------------------
// SchemaConfig – which business columns are kept and how
// ---------------------------------------------------------------------------

/// One whitelisted business column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub field: Field,
    /// Label of the column in the template header row.
    pub header: String,
    /// Records missing a required field are dropped.
    #[serde(default)]
    pub required: bool,
}

/// Whitelist of business columns, in output order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaConfig {
    pub fields: Vec<FieldSpec>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        let spec = |field, header: &str, required| FieldSpec {
            field,
            header: header.to_string(),
            required,
        };
        SchemaConfig {
            fields: vec![
                spec(Field::WasteKg, "بالكيلو", true),
                spec(Field::Weight, "الوزن", false),
                spec(Field::SecondGrade, "فرز تاني", false),
                spec(Field::Local, "محلي", false),
                spec(Field::Export, "تصدير", false),
                spec(Field::Thickness, "السمك", false),
                spec(Field::Size, "المقاس", false),
                spec(Field::Order, "الاوردر", false),
                spec(Field::Operator, "الفني", true),
                spec(Field::Quality, "الجوده", false),
                spec(Field::Line, "خط الانتاج", true),
                spec(Field::Shift, "الورديه", false),
            ],
        }
    }
}

impl SchemaConfig {
    pub fn required(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|s| s.required)
    }
}

// ---------------------------------------------------------------------------
// Stage settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierConfig {
    /// Groups smaller than this pass through unfiltered.
    pub min_group_size: usize,
    pub iqr_multiplier: f64,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        OutlierConfig {
            min_group_size: 4,
            iqr_multiplier: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub test_fraction: f64,
    pub cv_folds: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            test_fraction: 0.2,
            cv_folds: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub layout: TemplateLayout,
    pub schema: SchemaConfig,
    pub line_map: LineNormalizationMap,
    /// Exclusive upper bound for a physically valid waste value.
    pub max_waste_kg: f64,
    /// Number of rows in the top waste events table.
    pub top_events: usize,
    pub outliers: OutlierConfig,
    pub training: TrainingConfig,
    /// Treat an absent mandatory column as a fatal error.
    pub strict_schema: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            layout: TemplateLayout::default(),
            schema: SchemaConfig::default(),
            line_map: LineNormalizationMap::default(),
            max_waste_kg: 400.0,
            top_events: 25,
            outliers: OutlierConfig::default(),
            training: TrainingConfig::default(),
            strict_schema: false,
        }
    }
}

impl PipelineConfig {
    /// Read a JSON config file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: PipelineConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), PipelineError> {
        if self.layout.data_start_row <= self.layout.header_row {
            return Err(PipelineError::Config(format!(
                "data_start_row ({}) must come after header_row ({})",
                self.layout.data_start_row, self.layout.header_row
            )));
        }

        let mut seen = BTreeSet::new();
        for spec in &self.schema.fields {
            if !seen.insert(spec.field) {
                return Err(PipelineError::Config(format!(
                    "field {} listed twice in schema",
                    spec.field
                )));
            }
        }

        if !(self.max_waste_kg > 0.0) {
            return Err(PipelineError::Config(format!(
                "max_waste_kg must be positive, got {}",
                self.max_waste_kg
            )));
        }
        if !(self.training.test_fraction > 0.0 && self.training.test_fraction < 1.0) {
            return Err(PipelineError::Config(format!(
                "test_fraction must lie in (0, 1), got {}",
                self.training.test_fraction
            )));
        }
        if self.training.cv_folds < 2 {
            return Err(PipelineError::Config(format!(
                "cv_folds must be at least 2, got {}",
                self.training.cv_folds
            )));
        }
        self.line_map.validate()
    }
}
