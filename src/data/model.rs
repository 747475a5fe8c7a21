use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Field – the business columns of the waste log
// ---------------------------------------------------------------------------

/// Business columns known to the waste log template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Waste quantity in kilograms (the value analysed and predicted).
    WasteKg,
    /// Product weight.
    Weight,
    SecondGrade,
    Local,
    Export,
    Thickness,
    Size,
    /// Order identifier.
    Order,
    /// Operator (technician) identifier.
    Operator,
    /// Quality grade.
    Quality,
    /// Production line identifier.
    Line,
    Shift,
}

/// Storage type of a [`Field`] after cleaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Numeric,
    Text,
}

impl Field {
    pub fn kind(self) -> FieldKind {
        match self {
            Field::WasteKg
            | Field::Weight
            | Field::SecondGrade
            | Field::Local
            | Field::Export
            | Field::Thickness
            | Field::Size => FieldKind::Numeric,
            Field::Order | Field::Operator | Field::Quality | Field::Line | Field::Shift => {
                FieldKind::Text
            }
        }
    }

    /// Column name used in written tables.
    pub fn name(self) -> &'static str {
        match self {
            Field::WasteKg => "waste_kg",
            Field::Weight => "weight",
            Field::SecondGrade => "second_grade",
            Field::Local => "local",
            Field::Export => "export",
            Field::Thickness => "thickness",
            Field::Size => "size",
            Field::Order => "order",
            Field::Operator => "operator",
            Field::Quality => "quality",
            Field::Line => "line",
            Field::Shift => "shift",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// CellValue – a single cell, raw or cleaned
// ---------------------------------------------------------------------------

/// A dynamically-typed cell. Raw grids hold whatever the source produced;
/// cleaned records hold `Number` in numeric fields and `Text` in text fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Missing,
}

impl fmt::Display for CellValue {
    /// `Missing` renders as an empty string so tables written to CSV keep
    /// blank cells.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(v) => write!(f, "{v}"),
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Missing => Ok(()),
        }
    }
}

impl CellValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Number(v)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

// ---------------------------------------------------------------------------
// WasteRecord – one waste observation
// ---------------------------------------------------------------------------

/// One row of the waste log. Absent keys are missing values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WasteRecord {
    pub values: BTreeMap<Field, CellValue>,
}

impl WasteRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter, mostly for tests and sample generation.
    pub fn with(mut self, field: Field, value: impl Into<CellValue>) -> Self {
        self.set(field, value.into());
        self
    }

    pub fn set(&mut self, field: Field, value: CellValue) {
        if value.is_missing() {
            self.values.remove(&field);
        } else {
            self.values.insert(field, value);
        }
    }

    pub fn get(&self, field: Field) -> Option<&CellValue> {
        self.values.get(&field)
    }

    pub fn number(&self, field: Field) -> Option<f64> {
        self.get(field).and_then(CellValue::as_f64)
    }

    pub fn text(&self, field: Field) -> Option<&str> {
        self.get(field).and_then(CellValue::as_str)
    }

    pub fn is_missing(&self, field: Field) -> bool {
        self.get(field).is_none()
    }
}

// ---------------------------------------------------------------------------
// RecordSet – an ordered collection sharing one schema
// ---------------------------------------------------------------------------

/// The cleaned waste log. `columns` lists the business fields that existed in
/// the source, in template order; records never carry values outside it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    pub columns: Vec<Field>,
    pub records: Vec<WasteRecord>,
}

impl RecordSet {
    pub fn new(columns: Vec<Field>, records: Vec<WasteRecord>) -> Self {
        RecordSet { columns, records }
    }

    pub fn has_column(&self, field: Field) -> bool {
        self.columns.contains(&field)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WasteRecord> {
        self.records.iter()
    }

    /// A fresh set restricted to the `wanted` fields that exist here.
    pub fn project(&self, wanted: &[Field]) -> RecordSet {
        let columns: Vec<Field> = wanted
            .iter()
            .copied()
            .filter(|f| self.has_column(*f))
            .collect();
        let records = self
            .records
            .iter()
            .map(|r| WasteRecord {
                values: r
                    .values
                    .iter()
                    .filter(|(f, _)| columns.contains(f))
                    .map(|(f, v)| (*f, v.clone()))
                    .collect(),
            })
            .collect();
        RecordSet { columns, records }
    }

    /// Sorted distinct text values of `field`.
    pub fn unique_text(&self, field: Field) -> BTreeSet<&str> {
        self.records.iter().filter_map(|r| r.text(field)).collect()
    }
}
