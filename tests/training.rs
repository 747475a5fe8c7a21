use waste_insight::config::TrainingConfig;
use waste_insight::data::{Field, RecordSet, WasteRecord};
use waste_insight::ml::ensemble::{ExtraTrees, GradientBoosting, RandomForest};
use waste_insight::ml::linear::{LinearRegression, Ridge};
use waste_insight::ml::{
    train_and_compare_models, train_candidates, Estimator, ModelResult, WastePipeline,
};
use waste_insight::output::save_model_artifacts;
use waste_insight::PipelineError;

const LINES: [(&str, f64); 3] = [("سليتر1", 4.0), ("تناية1", 9.0), ("تناية2", 1.0)];
const OPERATORS: [&str; 4] = ["أحمد", "محمد", "سعيد", "خالد"];

/// Waste that depends exactly linearly on weight, thickness and line.
fn linear_log(n: usize) -> RecordSet {
    let records = (0..n)
        .map(|i| {
            let (line, effect) = LINES[i % LINES.len()];
            let weight = 800.0 + ((i * 37) % 101) as f64 * 13.0;
            let thickness = [0.2, 0.3, 0.4][(i / 3) % 3];
            let waste = 2.0 + 0.01 * weight + 5.0 * thickness + effect;
            WasteRecord::new()
                .with(Field::WasteKg, waste)
                .with(Field::Weight, weight)
                .with(Field::Thickness, thickness)
                .with(Field::Operator, OPERATORS[(i / 2) % OPERATORS.len()])
                .with(Field::Line, line)
        })
        .collect();
    RecordSet::new(
        vec![
            Field::WasteKg,
            Field::Weight,
            Field::Thickness,
            Field::Operator,
            Field::Line,
        ],
        records,
    )
}

/// All five model families with small ensembles.
fn quick_candidates(seed: u64) -> Vec<Estimator> {
    vec![
        Estimator::LinearRegression(LinearRegression::new()),
        Estimator::Ridge(Ridge::new(1.0)),
        Estimator::RandomForest(RandomForest::new(15, seed)),
        Estimator::GradientBoosting(GradientBoosting::new(seed)),
        Estimator::ExtraTrees(ExtraTrees::new(15, seed)),
    ]
}

fn names(metrics: &[ModelResult]) -> Vec<&str> {
    metrics.iter().map(|m| m.name.as_str()).collect()
}

#[test]
fn full_comparison_is_reproducible_for_a_seed() {
    let set = linear_log(40);
    let config = TrainingConfig::default();
    let first = train_and_compare_models(&set, 42, &config).unwrap();
    let second = train_and_compare_models(&set, 42, &config).unwrap();

    assert_eq!(first.metrics, second.metrics);
    assert_eq!(first.best, second.best);
    assert_eq!(first.metrics.len(), 5);
}

#[test]
fn ranking_is_ascending_by_test_rmse() {
    let outcome =
        train_candidates(&linear_log(60), quick_candidates(7), 7, &TrainingConfig::default())
            .unwrap();

    let rmse: Vec<f64> = outcome.metrics.iter().map(|m| m.rmse).collect();
    assert!(rmse.windows(2).all(|w| w[0] <= w[1]), "{rmse:?}");
    assert_eq!(outcome.best.name(), outcome.best_result().name);

    let mut sorted = names(&outcome.metrics);
    sorted.sort_unstable();
    assert_eq!(
        sorted,
        vec![
            "extra_trees",
            "gradient_boosting",
            "linear_regression",
            "random_forest",
            "ridge"
        ]
    );
    for m in &outcome.metrics {
        assert!(m.mae >= 0.0 && m.rmse >= m.mae - 1e-9);
        assert!(m.cv_rmse_mean.is_finite() && m.cv_rmse_std >= 0.0);
    }
}

#[test]
fn exact_linear_relation_is_won_by_least_squares() {
    let outcome =
        train_candidates(&linear_log(60), quick_candidates(3), 3, &TrainingConfig::default())
            .unwrap();
    let best = outcome.best_result();
    assert_eq!(best.name, "linear_regression");
    assert!(best.rmse < 1e-6, "rmse {}", best.rmse);
    assert!((best.r2 - 1.0).abs() < 1e-6);
}

#[test]
fn unseen_categories_still_predict() {
    let outcome =
        train_candidates(&linear_log(30), quick_candidates(1), 1, &TrainingConfig::default())
            .unwrap();
    let fresh = WasteRecord::new()
        .with(Field::Weight, 1500.0)
        .with(Field::Operator, "غير معروف")
        .with(Field::Line, "تناية9");
    let partial = WasteRecord::new().with(Field::Line, "سليتر1");

    let predictions = outcome.best.predict_records([&fresh, &partial]).unwrap();
    assert_eq!(predictions.len(), 2);
    assert!(predictions.iter().all(|p| p.is_finite()));
}

#[test]
fn saved_model_reloads_with_identical_predictions() {
    let set = linear_log(30);
    let outcome =
        train_candidates(&set, quick_candidates(5), 5, &TrainingConfig::default()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let artifacts = save_model_artifacts(&outcome.metrics, &outcome.best, dir.path()).unwrap();
    let reloaded = WastePipeline::load(&artifacts.model).unwrap();

    let before = outcome.best.predict_records(set.iter()).unwrap();
    let after = reloaded.predict_records(set.iter()).unwrap();
    for (a, b) in before.iter().zip(&after) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    let metrics_csv = std::fs::read_to_string(&artifacts.metrics).unwrap();
    assert!(metrics_csv.starts_with("name,mae,rmse,r2,cv_rmse_mean,cv_rmse_std\n"));
    assert_eq!(metrics_csv.lines().count(), 6);
    let report = std::fs::read_to_string(&artifacts.report).unwrap();
    assert!(report.contains(&format!(
        "Best model by RMSE: **{}**",
        outcome.best_result().name
    )));
}

#[test]
fn missing_target_is_fatal() {
    let set = linear_log(20);
    let no_column = set.project(&[Field::Weight, Field::Line]);
    assert!(matches!(
        train_and_compare_models(&no_column, 42, &TrainingConfig::default()),
        Err(PipelineError::NoUsableTarget(Field::WasteKg))
    ));

    let mut empty_target = set.clone();
    for record in &mut empty_target.records {
        record.values.remove(&Field::WasteKg);
    }
    assert!(matches!(
        train_and_compare_models(&empty_target, 42, &TrainingConfig::default()),
        Err(PipelineError::NoUsableTarget(_))
    ));
}

#[test]
fn no_feature_columns_is_fatal() {
    let set = linear_log(20).project(&[Field::WasteKg]);
    assert!(matches!(
        train_and_compare_models(&set, 42, &TrainingConfig::default()),
        Err(PipelineError::NoFeatureColumns)
    ));
}
