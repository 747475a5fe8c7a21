//! Feature construction shared by every candidate model.
//!
//! Numeric columns are median-imputed then standardised; categorical columns
//! are imputed with their most frequent value then one-hot encoded. All
//! statistics come from the data passed to [`Preprocessor::fit`].

use std::collections::BTreeMap;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::analysis::stats;
use crate::data::model::{Field, RecordSet, WasteRecord};

pub const NUMERIC_FEATURES: [Field; 6] = [
    Field::Weight,
    Field::SecondGrade,
    Field::Local,
    Field::Export,
    Field::Thickness,
    Field::Size,
];

pub const CATEGORICAL_FEATURES: [Field; 4] =
    [Field::Operator, Field::Line, Field::Quality, Field::Shift];

// ---------------------------------------------------------------------------
// FeatureSchema / FeatureFrame
// ---------------------------------------------------------------------------

/// Which feature columns a model consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub numeric: Vec<Field>,
    pub categorical: Vec<Field>,
}

impl FeatureSchema {
    /// The known feature columns present in `set`.
    pub fn from_columns(set: &RecordSet) -> Self {
        FeatureSchema {
            numeric: NUMERIC_FEATURES
                .iter()
                .copied()
                .filter(|f| set.has_column(*f))
                .collect(),
            categorical: CATEGORICAL_FEATURES
                .iter()
                .copied()
                .filter(|f| set.has_column(*f))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.numeric.is_empty() && self.categorical.is_empty()
    }
}

/// Raw feature values for a batch of records, laid out by a [`FeatureSchema`].
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    pub numeric: Vec<Vec<Option<f64>>>,
    pub categorical: Vec<Vec<Option<String>>>,
}

impl FeatureFrame {
    pub fn from_records<'a>(
        schema: &FeatureSchema,
        records: impl IntoIterator<Item = &'a WasteRecord>,
    ) -> Self {
        let mut numeric = Vec::new();
        let mut categorical = Vec::new();
        for record in records {
            numeric.push(schema.numeric.iter().map(|f| record.number(*f)).collect());
            categorical.push(
                schema
                    .categorical
                    .iter()
                    .map(|f| record.text(*f).map(str::to_string))
                    .collect(),
            );
        }
        FeatureFrame {
            numeric,
            categorical,
        }
    }

    pub fn len(&self) -> usize {
        self.numeric.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numeric.is_empty()
    }

    /// Rows at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> FeatureFrame {
        FeatureFrame {
            numeric: indices.iter().map(|&i| self.numeric[i].clone()).collect(),
            categorical: indices.iter().map(|&i| self.categorical[i].clone()).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Preprocessor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct NumericColumn {
    fill: f64,
    mean: f64,
    scale: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CategoricalColumn {
    fill: Option<String>,
    /// Sorted categories seen during fit; one output column each.
    categories: Vec<String>,
}

/// Fitted feature transformer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    numeric: Vec<NumericColumn>,
    categorical: Vec<CategoricalColumn>,
}

impl Preprocessor {
    pub fn fit(frame: &FeatureFrame) -> Self {
        let n_numeric = frame.numeric.first().map_or(0, Vec::len);
        let numeric = (0..n_numeric)
            .map(|j| {
                let observed: Vec<f64> = frame.numeric.iter().filter_map(|row| row[j]).collect();
                let fill = stats::median(&observed).unwrap_or(0.0);
                let imputed: Vec<f64> =
                    frame.numeric.iter().map(|row| row[j].unwrap_or(fill)).collect();
                let mean = stats::mean(&imputed).unwrap_or(0.0);
                let std = stats::population_std(&imputed).unwrap_or(0.0);
                NumericColumn {
                    fill,
                    mean,
                    scale: if std > 0.0 { std } else { 1.0 },
                }
            })
            .collect();

        let n_categorical = frame.categorical.first().map_or(0, Vec::len);
        let categorical = (0..n_categorical)
            .map(|j| {
                let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
                for row in &frame.categorical {
                    if let Some(value) = &row[j] {
                        *counts.entry(value.as_str()).or_default() += 1;
                    }
                }
                // Most frequent; the smallest label wins ties.
                let mut fill: Option<&str> = None;
                let mut best = 0;
                for (value, count) in &counts {
                    if *count > best {
                        best = *count;
                        fill = Some(*value);
                    }
                }
                CategoricalColumn {
                    fill: fill.map(str::to_string),
                    categories: counts.keys().map(|k| k.to_string()).collect(),
                }
            })
            .collect();

        Preprocessor {
            numeric,
            categorical,
        }
    }

    /// Width of the transformed matrix.
    pub fn n_outputs(&self) -> usize {
        self.numeric.len() + self.categorical.iter().map(|c| c.categories.len()).sum::<usize>()
    }

    /// Encode `frame`. Categories unseen during fit encode as all zeros.
    pub fn transform(&self, frame: &FeatureFrame) -> Array2<f64> {
        let mut out = Array2::<f64>::zeros((frame.len(), self.n_outputs()));
        for (i, mut row) in out.rows_mut().into_iter().enumerate() {
            let mut col = 0;
            for (j, spec) in self.numeric.iter().enumerate() {
                let value = frame.numeric[i][j].unwrap_or(spec.fill);
                row[col] = (value - spec.mean) / spec.scale;
                col += 1;
            }
            for (j, spec) in self.categorical.iter().enumerate() {
                let value = frame.categorical[i][j].as_deref().or(spec.fill.as_deref());
                if let Some(value) = value {
                    if let Ok(k) = spec.categories.binary_search_by(|c| c.as_str().cmp(value)) {
                        row[col + k] = 1.0;
                    }
                }
                col += spec.categories.len();
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> FeatureFrame {
        FeatureFrame {
            numeric: vec![vec![Some(1.0)], vec![None], vec![Some(3.0)], vec![Some(5.0)]],
            categorical: vec![
                vec![Some("b".into())],
                vec![Some("a".into())],
                vec![None],
                vec![Some("b".into())],
            ],
        }
    }

    #[test]
    fn numeric_columns_are_imputed_and_standardised() {
        let pre = Preprocessor::fit(&frame());
        let x = pre.transform(&frame());
        assert_eq!(x.dim(), (4, 3));
        // Missing value filled with the median (3.0): column is 1, 3, 3, 5.
        let col: Vec<f64> = x.column(0).to_vec();
        let mean: f64 = col.iter().sum::<f64>() / 4.0;
        let var: f64 = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 4.0;
        assert!(mean.abs() < 1e-12);
        assert!((var - 1.0).abs() < 1e-12);
        assert_eq!(x[[1, 0]], x[[2, 0]]);
    }

    #[test]
    fn categorical_columns_are_one_hot() {
        let pre = Preprocessor::fit(&frame());
        let x = pre.transform(&frame());
        // categories [a, b]; missing imputed with "b"
        assert_eq!(x.row(0).to_vec()[1..], [0.0, 1.0]);
        assert_eq!(x.row(1).to_vec()[1..], [1.0, 0.0]);
        assert_eq!(x.row(2).to_vec()[1..], [0.0, 1.0]);
    }

    #[test]
    fn unseen_category_encodes_as_zeros() {
        let pre = Preprocessor::fit(&frame());
        let unseen = FeatureFrame {
            numeric: vec![vec![Some(2.0)]],
            categorical: vec![vec![Some("zzz".into())]],
        };
        let x = pre.transform(&unseen);
        assert_eq!(x.row(0).to_vec()[1..], [0.0, 0.0]);
        assert!(x[[0, 0]].is_finite());
    }

    #[test]
    fn constant_column_does_not_divide_by_zero() {
        let constant = FeatureFrame {
            numeric: vec![vec![Some(2.0)], vec![Some(2.0)]],
            categorical: vec![vec![], vec![]],
        };
        let x = Preprocessor::fit(&constant).transform(&constant);
        assert!(x.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn schema_only_lists_present_columns() {
        let set = RecordSet::new(vec![Field::WasteKg, Field::Thickness, Field::Line], vec![]);
        let schema = FeatureSchema::from_columns(&set);
        assert_eq!(schema.numeric, vec![Field::Thickness]);
        assert_eq!(schema.categorical, vec![Field::Line]);
    }
}
