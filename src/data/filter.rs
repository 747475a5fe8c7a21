use std::collections::BTreeMap;

use super::model::{Field, RecordSet, WasteRecord};
use crate::analysis::stats::quantile;
use crate::config::OutlierConfig;

// ---------------------------------------------------------------------------
// Per-line IQR outlier filter
// ---------------------------------------------------------------------------

/// Inclusive `[Q1 - k·IQR, Q3 + k·IQR]` fence for one group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IqrFence {
    pub lower: f64,
    pub upper: f64,
}

impl IqrFence {
    /// Fence for `values`, or `None` when there is nothing to estimate from.
    pub fn from_values(values: &[f64], multiplier: f64) -> Option<Self> {
        let q1 = quantile(values, 0.25)?;
        let q3 = quantile(values, 0.75)?;
        let iqr = q3 - q1;
        Some(IqrFence {
            lower: q1 - multiplier * iqr,
            upper: q3 + multiplier * iqr,
        })
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Remove outliers of `value_field` independently within each production line.
///
/// * Groups smaller than `min_group_size` are passed through unchanged.
/// * In filtered groups, records whose value is missing are dropped as well.
/// * The result is the per-line groups concatenated in line order, so input
///   order is not preserved across lines.
/// * When `value_field` or the line column is absent, the input is returned
///   as-is.
pub fn remove_outliers_iqr_per_line(
    set: &RecordSet,
    value_field: Field,
    config: &OutlierConfig,
) -> RecordSet {
    if !set.has_column(value_field) || !set.has_column(Field::Line) {
        log::warn!("outlier filter skipped: {value_field} or line column absent");
        return set.clone();
    }

    let mut groups: BTreeMap<Option<&str>, Vec<&WasteRecord>> = BTreeMap::new();
    for record in &set.records {
        groups.entry(record.text(Field::Line)).or_default().push(record);
    }

    let mut kept = Vec::with_capacity(set.len());
    for (line, group) in groups {
        if group.len() < config.min_group_size {
            log::debug!(
                "line {:?}: {} records, below {} - not filtered",
                line,
                group.len(),
                config.min_group_size
            );
            kept.extend(group.into_iter().cloned());
            continue;
        }

        let values: Vec<f64> = group.iter().filter_map(|r| r.number(value_field)).collect();
        let before = kept.len();
        if let Some(fence) = IqrFence::from_values(&values, config.iqr_multiplier) {
            kept.extend(
                group
                    .iter()
                    .filter(|r| r.number(value_field).is_some_and(|v| fence.contains(v)))
                    .map(|r| (*r).clone()),
            );
        }
        log::debug!(
            "line {:?}: removed {} of {} records",
            line,
            group.len() - (kept.len() - before),
            group.len()
        );
    }

    log::info!(
        "outlier filter kept {} of {} records",
        kept.len(),
        set.len()
    );
    RecordSet::new(set.columns.clone(), kept)
}
