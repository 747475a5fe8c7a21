//! Markdown reports and the model artifact bundle.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::tables::write_rows;
use crate::analysis::aggregate::AnalysisOutputs;
use crate::data::model::Field;
use crate::ml::trainer::{ModelResult, WastePipeline};

pub const MANAGEMENT_REPORT: &str = "MANAGEMENT_REPORT.md";
pub const MODEL_REPORT: &str = "ML_MODEL_REPORT.md";
pub const MODEL_METRICS: &str = "model_metrics.csv";
pub const BEST_MODEL: &str = "best_waste_model.json";

// ---------------------------------------------------------------------------
// Markdown helpers
// ---------------------------------------------------------------------------

/// A pipe table. Rows shorter than the header are padded with blanks.
pub fn markdown_table(header: &[&str], rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    out.push_str(&format!("| {} |\n", header.join(" | ")));
    out.push_str(&format!(
        "|{}\n",
        header.iter().map(|_| " --- |").collect::<String>()
    ));
    for row in rows {
        let mut cells: Vec<&str> = row.iter().map(String::as_str).collect();
        cells.resize(header.len(), "");
        out.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    out
}

fn number(value: f64) -> String {
    format!("{value:.3}")
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}

// ---------------------------------------------------------------------------
// Management report
// ---------------------------------------------------------------------------

/// Markdown body of the management report.
pub fn management_report(outputs: &AnalysisOutputs) -> String {
    let lines: Vec<Vec<String>> = outputs
        .line_summary
        .iter()
        .take(5)
        .map(|s| {
            vec![
                s.line.clone(),
                number(s.mean),
                number(s.median),
                s.std.map(number).unwrap_or_default(),
                s.count.to_string(),
                number(s.min),
                number(s.max),
            ]
        })
        .collect();
    let operators: Vec<Vec<String>> = outputs
        .operator_summary
        .iter()
        .take(10)
        .map(|s| {
            vec![
                s.operator.clone(),
                number(s.avg_waste),
                number(s.median),
                s.records.to_string(),
            ]
        })
        .collect();

    let mut report = String::from("# Management Waste Report (Auto-generated)\n\n");
    report.push_str(&format!(
        "- Total cleaned records: **{}**\n",
        outputs.cleaned.len()
    ));
    report.push_str(&format!(
        "- Distinct lines: **{}**\n",
        outputs.cleaned.unique_text(Field::Line).len()
    ));
    report.push_str(&format!(
        "- Distinct operators: **{}**\n\n",
        outputs.cleaned.unique_text(Field::Operator).len()
    ));
    report.push_str("## Highest-waste lines (Top 5)\n\n");
    report.push_str(&markdown_table(
        &["line", "mean", "median", "std", "count", "min", "max"],
        &lines,
    ));
    report.push_str("\n## Highest-waste operators (Top 10)\n\n");
    report.push_str(&markdown_table(
        &["operator", "avg_waste", "median", "records"],
        &operators,
    ));
    report.push_str("\n## Recommended next actions\n\n");
    report.push_str("1. Start maintenance and setup validation on the top 2 waste lines.\n");
    report.push_str("2. Review operator-line pairs with both high avg_waste and many records.\n");
    report.push_str("3. Track the weekly mean and median waste per line after interventions.\n");
    report
}

/// Write `MANAGEMENT_REPORT.md` into `out_dir` and return its path.
pub fn render_management_report(outputs: &AnalysisOutputs, out_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;
    let path = out_dir.join(MANAGEMENT_REPORT);
    write_text(&path, &management_report(outputs))?;
    Ok(path)
}

// ---------------------------------------------------------------------------
// Model artifacts
// ---------------------------------------------------------------------------

/// Markdown body of the model comparison report. `metrics` must be ranked.
pub fn model_report(metrics: &[ModelResult]) -> String {
    let rows: Vec<Vec<String>> = metrics
        .iter()
        .map(|m| {
            vec![
                m.name.clone(),
                number(m.mae),
                number(m.rmse),
                number(m.r2),
                number(m.cv_rmse_mean),
                number(m.cv_rmse_std),
            ]
        })
        .collect();

    let mut report = String::from("# Waste Prediction Model Report\n\n## Candidate models\n\n");
    report.push_str(&markdown_table(
        &["name", "mae", "rmse", "r2", "cv_rmse_mean", "cv_rmse_std"],
        &rows,
    ));
    if let Some(best) = metrics.first() {
        report.push_str(&format!("\nBest model by RMSE: **{}**\n", best.name));
    }
    report.push_str("\n## Interpretation\n\n");
    report.push_str("- Lower MAE/RMSE means better waste prediction accuracy.\n");
    report.push_str("- Positive R2 near 1 indicates stronger explanatory power.\n");
    report.push_str(
        "- Use the saved best model for monthly waste forecasting and scenario planning.\n",
    );
    report
}

/// Paths written by [`save_model_artifacts`].
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    pub metrics: PathBuf,
    pub model: PathBuf,
    pub report: PathBuf,
}

/// Write the metrics table, the fitted best pipeline and the model report.
pub fn save_model_artifacts(
    metrics: &[ModelResult],
    best: &WastePipeline,
    out_dir: &Path,
) -> Result<ModelArtifacts> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;
    let artifacts = ModelArtifacts {
        metrics: out_dir.join(MODEL_METRICS),
        model: out_dir.join(BEST_MODEL),
        report: out_dir.join(MODEL_REPORT),
    };
    write_rows(metrics, &artifacts.metrics)?;
    best.save(&artifacts.model)?;
    write_text(&artifacts.report, &model_report(metrics))?;
    log::info!("model artifacts written to {}", out_dir.display());
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_pads_short_rows() {
        let table = markdown_table(&["a", "b"], &[vec!["1".to_string()]]);
        assert_eq!(table, "| a | b |\n| --- | --- |\n| 1 |  |\n");
    }

    #[test]
    fn model_report_names_the_first_model() {
        let metrics = vec![
            ModelResult {
                name: "ridge".into(),
                mae: 1.0,
                rmse: 2.0,
                r2: 0.5,
                cv_rmse_mean: 2.1,
                cv_rmse_std: 0.1,
            },
            ModelResult {
                name: "linear_regression".into(),
                mae: 1.5,
                rmse: 2.5,
                r2: 0.3,
                cv_rmse_mean: 2.6,
                cv_rmse_std: 0.2,
            },
        ];
        let report = model_report(&metrics);
        assert!(report.contains("Best model by RMSE: **ridge**"));
        assert!(report.contains("| ridge | 1.000 | 2.000 | 0.500 | 2.100 | 0.100 |"));
    }
}
