/// Artifact writing: CSV tables, the parquet copy of the cleaned data,
/// markdown reports and the serialised best model.
pub mod columnar;
pub mod report;
pub mod tables;

pub use columnar::write_parquet;
pub use report::{render_management_report, save_model_artifacts, ModelArtifacts};
pub use tables::{write_grid, write_outputs, write_record_set};
