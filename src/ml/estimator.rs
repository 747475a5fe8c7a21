use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::ensemble::{ExtraTrees, GradientBoosting, RandomForest};
use super::linear::{LinearRegression, Ridge};

/// Common contract for every regression model compared by the trainer.
pub trait Regressor {
    fn name(&self) -> &'static str;

    /// Fit on an encoded feature matrix. `x` and `y` are non-empty and agree
    /// on the number of rows.
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>);

    fn predict(&self, x: &Array2<f64>) -> Array1<f64>;
}

/// The candidate models, as one serialisable type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Estimator {
    LinearRegression(LinearRegression),
    Ridge(Ridge),
    RandomForest(RandomForest),
    GradientBoosting(GradientBoosting),
    ExtraTrees(ExtraTrees),
}

macro_rules! each_estimator {
    ($value:expr, $model:ident => $body:expr) => {
        match $value {
            Estimator::LinearRegression($model) => $body,
            Estimator::Ridge($model) => $body,
            Estimator::RandomForest($model) => $body,
            Estimator::GradientBoosting($model) => $body,
            Estimator::ExtraTrees($model) => $body,
        }
    };
}

impl Regressor for Estimator {
    fn name(&self) -> &'static str {
        each_estimator!(self, m => m.name())
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) {
        each_estimator!(self, m => m.fit(x, y))
    }

    fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        each_estimator!(self, m => m.predict(x))
    }
}

/// Unfitted candidates with their fixed hyperparameters, in comparison order.
pub fn build_model_candidates(seed: u64) -> Vec<Estimator> {
    vec![
        Estimator::LinearRegression(LinearRegression::new()),
        Estimator::Ridge(Ridge::new(1.0)),
        Estimator::RandomForest(RandomForest::new(400, seed)),
        Estimator::GradientBoosting(GradientBoosting::new(seed)),
        Estimator::ExtraTrees(ExtraTrees::new(500, seed)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_have_distinct_names() {
        let names: Vec<&str> = build_model_candidates(42).iter().map(|e| e.name()).collect();
        assert_eq!(
            names,
            vec![
                "linear_regression",
                "ridge",
                "random_forest",
                "gradient_boosting",
                "extra_trees"
            ]
        );
    }

    #[test]
    fn estimator_round_trips_through_json() {
        let x = ndarray::array![[0.0], [1.0], [2.0]];
        let y = ndarray::array![1.0, 3.0, 5.0];
        let mut model = Estimator::Ridge(Ridge::new(1.0));
        model.fit(&x, &y);

        let json = serde_json::to_string(&model).unwrap();
        assert!(json.contains("\"kind\":\"ridge\""));
        let restored: Estimator = serde_json::from_str(&json).unwrap();
        let (a, b) = (restored.predict(&x), model.predict(&x));
        assert!(a.iter().zip(b.iter()).all(|(p, q)| (p - q).abs() < 1e-12));
    }
}
