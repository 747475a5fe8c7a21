/// Waste prediction: feature encoding, candidate regressors and comparison.
pub mod ensemble;
pub mod estimator;
pub mod features;
pub mod linear;
pub mod metrics;
pub mod split;
pub mod trainer;
pub mod tree;

pub use estimator::{build_model_candidates, Estimator, Regressor};
pub use features::{FeatureFrame, FeatureSchema, Preprocessor};
pub use trainer::{
    train_and_compare_models, train_candidates, ModelResult, TrainingOutcome, WastePipeline,
    TARGET,
};
