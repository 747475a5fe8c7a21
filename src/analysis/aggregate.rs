use std::collections::BTreeMap;

use serde::Serialize;

use super::stats;
use crate::data::model::{Field, RecordSet};

/// Columns shown for each top waste event, when present.
pub const TOP_EVENT_COLUMNS: [Field; 6] = [
    Field::WasteKg,
    Field::Line,
    Field::Operator,
    Field::Order,
    Field::Thickness,
    Field::Size,
];

// ---------------------------------------------------------------------------
// Summary rows
// ---------------------------------------------------------------------------

/// Waste statistics for one production line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSummary {
    pub line: String,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation; absent for single-record lines.
    pub std: Option<f64>,
    pub count: usize,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperatorSummary {
    pub operator: String,
    pub avg_waste: f64,
    pub median: f64,
    pub records: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineOperatorSummary {
    pub line: String,
    pub operator: String,
    pub avg_waste: f64,
    pub records: usize,
}

/// Everything the management report is built from.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutputs {
    pub cleaned: RecordSet,
    pub line_summary: Vec<LineSummary>,
    pub operator_summary: Vec<OperatorSummary>,
    pub line_operator_summary: Vec<LineOperatorSummary>,
    pub top_waste_events: RecordSet,
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Waste values grouped by the text of `keys`, in key order. Records missing
/// a key or the waste value are left out.
fn group_waste<'a>(set: &'a RecordSet, keys: &[Field]) -> BTreeMap<Vec<&'a str>, Vec<f64>> {
    let mut groups: BTreeMap<Vec<&str>, Vec<f64>> = BTreeMap::new();
    if !keys.iter().all(|k| set.has_column(*k)) || !set.has_column(Field::WasteKg) {
        log::warn!("cannot group by {keys:?}: column absent");
        return groups;
    }
    for record in set.iter() {
        let Some(waste) = record.number(Field::WasteKg) else {
            continue;
        };
        let key: Option<Vec<&str>> = keys.iter().map(|k| record.text(*k)).collect();
        if let Some(key) = key {
            groups.entry(key).or_default().push(waste);
        }
    }
    groups
}

/// Per-line waste statistics, highest mean first.
pub fn line_summary(set: &RecordSet) -> Vec<LineSummary> {
    let mut rows: Vec<LineSummary> = group_waste(set, &[Field::Line])
        .into_iter()
        .filter_map(|(key, values)| {
            Some(LineSummary {
                line: key[0].to_string(),
                mean: stats::mean(&values)?,
                median: stats::median(&values)?,
                std: stats::sample_std(&values),
                count: values.len(),
                min: stats::min(&values)?,
                max: stats::max(&values)?,
            })
        })
        .collect();
    rows.sort_by(|a, b| b.mean.total_cmp(&a.mean));
    rows
}

/// Per-operator waste, ordered by average then record count, both descending.
pub fn operator_summary(set: &RecordSet) -> Vec<OperatorSummary> {
    let mut rows: Vec<OperatorSummary> = group_waste(set, &[Field::Operator])
        .into_iter()
        .filter_map(|(key, values)| {
            Some(OperatorSummary {
                operator: key[0].to_string(),
                avg_waste: stats::mean(&values)?,
                median: stats::median(&values)?,
                records: values.len(),
            })
        })
        .collect();
    rows.sort_by(|a, b| {
        b.avg_waste
            .total_cmp(&a.avg_waste)
            .then_with(|| b.records.cmp(&a.records))
    });
    rows
}

/// Per (line, operator) pair, highest average first.
pub fn line_operator_summary(set: &RecordSet) -> Vec<LineOperatorSummary> {
    let mut rows: Vec<LineOperatorSummary> = group_waste(set, &[Field::Line, Field::Operator])
        .into_iter()
        .filter_map(|(key, values)| {
            Some(LineOperatorSummary {
                line: key[0].to_string(),
                operator: key[1].to_string(),
                avg_waste: stats::mean(&values)?,
                records: values.len(),
            })
        })
        .collect();
    rows.sort_by(|a, b| b.avg_waste.total_cmp(&a.avg_waste));
    rows
}

/// The `n` heaviest waste records, projected to [`TOP_EVENT_COLUMNS`].
/// Ties keep input order; records without a waste value sort last.
pub fn top_waste_events(set: &RecordSet, n: usize) -> RecordSet {
    let mut order: Vec<usize> = (0..set.len()).collect();
    order.sort_by(|&a, &b| {
        match (
            set.records[a].number(Field::WasteKg),
            set.records[b].number(Field::WasteKg),
        ) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }
    });
    order.truncate(n);

    let top = RecordSet::new(
        set.columns.clone(),
        order.into_iter().map(|i| set.records[i].clone()).collect(),
    );
    top.project(&TOP_EVENT_COLUMNS)
}

/// Compute all four summary views. The cleaned set is copied into the output.
pub fn build_summaries(set: &RecordSet, top_events: usize) -> AnalysisOutputs {
    let outputs = AnalysisOutputs {
        cleaned: set.clone(),
        line_summary: line_summary(set),
        operator_summary: operator_summary(set),
        line_operator_summary: line_operator_summary(set),
        top_waste_events: top_waste_events(set, top_events),
    };
    log::info!(
        "summaries: {} lines, {} operators, {} line/operator pairs",
        outputs.line_summary.len(),
        outputs.operator_summary.len(),
        outputs.line_operator_summary.len()
    );
    outputs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::WasteRecord;

    fn rec(line: &str, operator: &str, waste: f64) -> WasteRecord {
        WasteRecord::new()
            .with(Field::WasteKg, waste)
            .with(Field::Operator, operator)
            .with(Field::Line, line)
            .with(Field::Shift, "A")
    }

    fn sample() -> RecordSet {
        RecordSet::new(
            vec![Field::WasteKg, Field::Operator, Field::Line, Field::Shift],
            vec![
                rec("L1", "ali", 10.0),
                rec("L1", "omar", 20.0),
                rec("L2", "ali", 40.0),
                rec("L2", "ali", 50.0),
                rec("L3", "sara", 5.0),
                rec("L1", "sara", 30.0),
            ],
        )
    }

    #[test]
    fn line_summary_is_sorted_by_mean() {
        let rows = line_summary(&sample());
        let lines: Vec<&str> = rows.iter().map(|r| r.line.as_str()).collect();
        assert_eq!(lines, vec!["L2", "L1", "L3"]);

        let l1 = &rows[1];
        assert_eq!(l1.mean, 20.0);
        assert_eq!(l1.median, 20.0);
        assert_eq!(l1.std, Some(10.0));
        assert_eq!((l1.count, l1.min, l1.max), (3, 10.0, 30.0));
        assert_eq!(rows[2].std, None);
    }

    #[test]
    fn operator_ties_prefer_more_records() {
        let set = RecordSet::new(
            vec![Field::WasteKg, Field::Operator, Field::Line],
            vec![
                rec("L1", "a", 10.0),
                rec("L1", "b", 9.0),
                rec("L1", "b", 11.0),
                rec("L1", "c", 12.0),
            ],
        );
        let names: Vec<String> = operator_summary(&set).into_iter().map(|r| r.operator).collect();
        assert_eq!(names, vec!["c", "b", "a"]);
    }

    #[test]
    fn line_operator_pairs() {
        let rows = line_operator_summary(&sample());
        assert_eq!(rows[0].line, "L2");
        assert_eq!(rows[0].operator, "ali");
        assert_eq!(rows[0].avg_waste, 45.0);
        assert_eq!(rows[0].records, 2);
        assert_eq!(rows.len(), 5);
    }

    #[test]
    fn top_events_are_projected_and_sorted() {
        let top = top_waste_events(&sample(), 3);
        assert_eq!(top.columns, vec![Field::WasteKg, Field::Line, Field::Operator]);
        let values: Vec<f64> = top.iter().filter_map(|r| r.number(Field::WasteKg)).collect();
        assert_eq!(values, vec![50.0, 40.0, 30.0]);
        assert!(top.iter().all(|r| r.is_missing(Field::Shift)));

        assert_eq!(top_waste_events(&sample(), 25).len(), 6);
    }

    #[test]
    fn build_summaries_leaves_input_untouched() {
        let input = sample();
        let outputs = build_summaries(&input, 25);
        assert_eq!(outputs.cleaned, input);
        assert_eq!(outputs.top_waste_events.len(), input.len());
    }
}
