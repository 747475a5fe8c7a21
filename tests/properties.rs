//! Property-based tests for the cleaning, filtering and aggregation stages.

use std::collections::BTreeMap;

use proptest::prelude::*;

use waste_insight::analysis::aggregate::{line_summary, operator_summary, top_waste_events};
use waste_insight::config::{OutlierConfig, PipelineConfig};
use waste_insight::data::filter::IqrFence;
use waste_insight::data::{
    clean_grid, remove_outliers_iqr_per_line, render_template, CellValue, Field,
    LineNormalizationMap, RecordSet, WasteRecord,
};

const LINE_LABELS: [&str; 5] = ["سليتر1", "سليتر 1", "تناية 2", "تناية2", "خط5"];
const OPERATORS: [&str; 3] = ["أحمد", "محمد", "سعيد"];

fn waste_log() -> impl Strategy<Value = RecordSet> {
    prop::collection::vec((0usize..5, 0usize..3, 0.0f64..390.0), 0..60).prop_map(|rows| {
        let records = rows
            .into_iter()
            .map(|(line, operator, waste)| {
                WasteRecord::new()
                    .with(Field::WasteKg, waste)
                    .with(Field::Operator, OPERATORS[operator])
                    .with(Field::Line, LINE_LABELS[line])
            })
            .collect();
        RecordSet::new(vec![Field::WasteKg, Field::Operator, Field::Line], records)
    })
}

fn by_line(set: &RecordSet) -> BTreeMap<String, Vec<f64>> {
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for record in set.iter() {
        if let (Some(line), Some(waste)) = (record.text(Field::Line), record.number(Field::WasteKg))
        {
            groups.entry(line.to_string()).or_default().push(waste);
        }
    }
    groups
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_outlier_filter_respects_group_fences(set in waste_log()) {
        let config = OutlierConfig::default();
        let filtered = remove_outliers_iqr_per_line(&set, Field::WasteKg, &config);
        let before = by_line(&set);
        let after = by_line(&filtered);

        prop_assert!(filtered.len() <= set.len());
        for (line, values) in &before {
            let kept = after.get(line).cloned().unwrap_or_default();
            if values.len() < config.min_group_size {
                prop_assert_eq!(&kept, values);
                continue;
            }
            let fence = IqrFence::from_values(values, config.iqr_multiplier).unwrap();
            prop_assert!(kept.iter().all(|v| fence.contains(*v)));
            let expected = values.iter().filter(|v| fence.contains(**v)).count();
            prop_assert_eq!(kept.len(), expected);
        }
    }

    #[test]
    fn prop_line_map_is_idempotent(label in "[ a-zتناية سليتر0-9]{0,12}") {
        let map = LineNormalizationMap::default();
        let once = map.canonicalize(&label);
        prop_assert_eq!(map.canonicalize(&once), once);
    }

    #[test]
    fn prop_cleaned_waste_is_in_range(set in waste_log(), extra in -50.0f64..900.0) {
        let config = PipelineConfig::default();
        let mut records = set.records.clone();
        records.push(
            WasteRecord::new()
                .with(Field::WasteKg, extra)
                .with(Field::Operator, "أحمد")
                .with(Field::Line, "سليتر 2"),
        );
        let raw = RecordSet::new(set.columns.clone(), records);
        let cleaned = clean_grid(&render_template(&raw, &config), &config).unwrap();

        for record in cleaned.iter() {
            let waste = record.number(Field::WasteKg).unwrap();
            prop_assert!(waste >= 0.0 && waste < config.max_waste_kg);
            let line = record.text(Field::Line).unwrap();
            prop_assert!(!line.contains("  ") && line.trim() == line);
        }
        let accepted = (0.0..config.max_waste_kg).contains(&extra);
        prop_assert_eq!(cleaned.len(), set.len() + usize::from(accepted));
    }

    #[test]
    fn prop_summaries_are_sorted_and_complete(set in waste_log()) {
        let lines = line_summary(&set);
        prop_assert!(lines.windows(2).all(|w| w[0].mean >= w[1].mean));
        prop_assert_eq!(lines.iter().map(|s| s.count).sum::<usize>(), set.len());
        for s in &lines {
            prop_assert!(s.min <= s.median && s.median <= s.max);
            prop_assert!(s.min <= s.mean + 1e-9 && s.mean <= s.max + 1e-9);
            prop_assert_eq!(s.std.is_none(), s.count == 1);
        }

        let operators = operator_summary(&set);
        prop_assert!(operators.windows(2).all(|w| w[0].avg_waste >= w[1].avg_waste));
        prop_assert_eq!(operators.iter().map(|s| s.records).sum::<usize>(), set.len());
    }

    #[test]
    fn prop_top_events_are_the_heaviest(set in waste_log(), n in 0usize..40) {
        let top = top_waste_events(&set, n);
        prop_assert_eq!(top.len(), n.min(set.len()));

        let values: Vec<f64> = top.iter().filter_map(|r| r.number(Field::WasteKg)).collect();
        prop_assert!(values.windows(2).all(|w| w[0] >= w[1]));
        if let Some(&smallest) = values.last() {
            let heavier = set
                .iter()
                .filter_map(|r| r.number(Field::WasteKg))
                .filter(|v| *v > smallest)
                .count();
            prop_assert!(heavier <= values.len());
        }
    }
}

#[test]
fn non_finite_cells_are_treated_as_missing() {
    let config = PipelineConfig::default();
    let set = RecordSet::new(
        vec![Field::WasteKg, Field::Operator, Field::Line],
        vec![
            WasteRecord::new()
                .with(Field::WasteKg, CellValue::Text("inf".into()))
                .with(Field::Operator, "أحمد")
                .with(Field::Line, "سليتر1"),
            WasteRecord::new()
                .with(Field::WasteKg, f64::NAN)
                .with(Field::Operator, "أحمد")
                .with(Field::Line, "سليتر1"),
            WasteRecord::new()
                .with(Field::WasteKg, 3.0)
                .with(Field::Operator, "أحمد")
                .with(Field::Line, "سليتر1"),
        ],
    );
    let cleaned = clean_grid(&render_template(&set, &config), &config).unwrap();
    assert_eq!(cleaned.len(), 1);
}
