//! Model Trainer/Comparator.
//!
//! Every candidate is wrapped in the same preprocessing, fit once on the
//! training split, scored on the held-out split and cross-validated on the
//! training split. The candidate with the lowest test RMSE wins; ties go to
//! the earlier candidate.

use std::path::Path;

use anyhow::{Context, Result as AnyResult};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use super::estimator::{build_model_candidates, Estimator, Regressor};
use super::features::{FeatureFrame, FeatureSchema, Preprocessor};
use super::metrics::{mean_absolute_error, r2_score, root_mean_squared_error};
use super::split::{test_size, train_test_split, KFold};
use crate::analysis::stats;
use crate::config::TrainingConfig;
use crate::data::model::{Field, RecordSet, WasteRecord};
use crate::error::{PipelineError, Result};

/// The predicted field.
pub const TARGET: Field = Field::WasteKg;

// ---------------------------------------------------------------------------
// ModelResult
// ---------------------------------------------------------------------------

/// Evaluation of one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResult {
    pub name: String,
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
    pub cv_rmse_mean: f64,
    pub cv_rmse_std: f64,
}

// ---------------------------------------------------------------------------
// WastePipeline – preprocessing + estimator
// ---------------------------------------------------------------------------

/// A feature encoder and a regression model bundled together, so predicting
/// only needs raw records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WastePipeline {
    schema: FeatureSchema,
    preprocessor: Option<Preprocessor>,
    estimator: Estimator,
}

impl WastePipeline {
    pub fn new(schema: FeatureSchema, estimator: Estimator) -> Self {
        WastePipeline {
            schema,
            preprocessor: None,
            estimator,
        }
    }

    pub fn name(&self) -> &'static str {
        self.estimator.name()
    }

    pub fn fit(&mut self, frame: &FeatureFrame, target: &[f64]) {
        let preprocessor = Preprocessor::fit(frame);
        let x = preprocessor.transform(frame);
        self.estimator.fit(&x, &Array1::from(target.to_vec()));
        self.preprocessor = Some(preprocessor);
    }

    pub fn predict(&self, frame: &FeatureFrame) -> Result<Vec<f64>> {
        let preprocessor = self.preprocessor.as_ref().ok_or(PipelineError::NotFitted)?;
        let x = preprocessor.transform(frame);
        Ok(self.estimator.predict(&x).to_vec())
    }

    /// Predict waste for raw records; feature columns are read by name.
    pub fn predict_records<'a>(
        &self,
        records: impl IntoIterator<Item = &'a WasteRecord>,
    ) -> Result<Vec<f64>> {
        self.predict(&FeatureFrame::from_records(&self.schema, records))
    }

    pub fn save(&self, path: &Path) -> AnyResult<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        serde_json::to_writer(std::io::BufWriter::new(file), self)
            .with_context(|| format!("writing model to {}", path.display()))?;
        Ok(())
    }

    pub fn load(path: &Path) -> AnyResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing model {}", path.display()))
    }
}

// ---------------------------------------------------------------------------
// Training
// ---------------------------------------------------------------------------

/// Ranked metrics (ascending test RMSE) and the fitted winning pipeline.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub metrics: Vec<ModelResult>,
    pub best: WastePipeline,
}

impl TrainingOutcome {
    pub fn best_result(&self) -> &ModelResult {
        &self.metrics[0]
    }
}

/// Smallest row count that leaves a non-empty test split and at least one
/// row per cross-validation fold.
pub fn min_rows(config: &TrainingConfig) -> usize {
    (config.cv_folds + 1..)
        .find(|&n| {
            let n_test = test_size(n, config.test_fraction);
            n_test >= 1 && n - n_test.min(n) >= config.cv_folds
        })
        .unwrap_or(usize::MAX)
}

/// Train every candidate on a seeded split of `set` and rank them.
pub fn train_and_compare_models(
    set: &RecordSet,
    seed: u64,
    config: &TrainingConfig,
) -> Result<TrainingOutcome> {
    train_candidates(set, build_model_candidates(seed), seed, config)
}

/// [`train_and_compare_models`] over an explicit candidate list.
pub fn train_candidates(
    set: &RecordSet,
    candidates: Vec<Estimator>,
    seed: u64,
    config: &TrainingConfig,
) -> Result<TrainingOutcome> {
    if !set.has_column(TARGET) {
        return Err(PipelineError::NoUsableTarget(TARGET));
    }
    let usable: Vec<&WasteRecord> = set.iter().filter(|r| r.number(TARGET).is_some()).collect();
    if usable.is_empty() {
        return Err(PipelineError::NoUsableTarget(TARGET));
    }
    let schema = FeatureSchema::from_columns(set);
    if schema.is_empty() {
        return Err(PipelineError::NoFeatureColumns);
    }
    if candidates.is_empty() {
        return Err(PipelineError::Config("no candidate models".to_string()));
    }
    let needed = min_rows(config);
    if usable.len() < needed {
        return Err(PipelineError::InsufficientRows {
            needed,
            found: usable.len(),
        });
    }

    let frame = FeatureFrame::from_records(&schema, usable.iter().copied());
    let target: Vec<f64> = usable.iter().filter_map(|r| r.number(TARGET)).collect();

    let split = train_test_split(frame.len(), config.test_fraction, seed);
    let train_frame = frame.select(&split.train);
    let test_frame = frame.select(&split.test);
    let train_y = pick(&target, &split.train);
    let test_y = pick(&target, &split.test);
    let folds = KFold::new(config.cv_folds, seed).split(train_frame.len());

    log::info!(
        "training {} candidates on {} rows ({} train / {} test), {} numeric + {} categorical features",
        candidates.len(),
        frame.len(),
        split.train.len(),
        split.test.len(),
        schema.numeric.len(),
        schema.categorical.len()
    );

    let mut evaluated: Vec<(ModelResult, WastePipeline)> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let mut pipeline = WastePipeline::new(schema.clone(), candidate.clone());
        pipeline.fit(&train_frame, &train_y);
        let predictions = pipeline.predict(&test_frame)?;

        let mut fold_rmse = Vec::with_capacity(folds.len());
        for (fold_train, fold_valid) in &folds {
            let mut fold_pipeline = WastePipeline::new(schema.clone(), candidate.clone());
            fold_pipeline.fit(&train_frame.select(fold_train), &pick(&train_y, fold_train));
            let fold_pred = fold_pipeline.predict(&train_frame.select(fold_valid))?;
            fold_rmse.push(root_mean_squared_error(&pick(&train_y, fold_valid), &fold_pred));
        }

        let result = ModelResult {
            name: pipeline.name().to_string(),
            mae: mean_absolute_error(&test_y, &predictions),
            rmse: root_mean_squared_error(&test_y, &predictions),
            r2: r2_score(&test_y, &predictions),
            cv_rmse_mean: stats::mean(&fold_rmse).unwrap_or(f64::NAN),
            cv_rmse_std: stats::population_std(&fold_rmse).unwrap_or(f64::NAN),
        };
        log::info!(
            "{}: rmse={:.4} mae={:.4} r2={:.4} cv_rmse={:.4}±{:.4}",
            result.name,
            result.rmse,
            result.mae,
            result.r2,
            result.cv_rmse_mean,
            result.cv_rmse_std
        );
        evaluated.push((result, pipeline));
    }

    // Stable sort: equal RMSE keeps candidate order.
    evaluated.sort_by(|a, b| a.0.rmse.total_cmp(&b.0.rmse));
    let mut evaluated = evaluated.into_iter();
    let (best_result, best) = evaluated
        .next()
        .ok_or_else(|| PipelineError::Config("no candidate models".to_string()))?;
    let mut metrics = vec![best_result];
    metrics.extend(evaluated.map(|(result, _)| result));

    log::info!("best model by test RMSE: {}", best.name());
    Ok(TrainingOutcome { metrics, best })
}

fn pick(values: &[f64], indices: &[usize]) -> Vec<f64> {
    indices.iter().map(|&i| values[i]).collect()
}
