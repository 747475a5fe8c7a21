//! Factory waste log pipeline.
//!
//! A raw spreadsheet export is cleaned into a [`data::RecordSet`], optionally
//! filtered for per-line outliers, summarised for management and used to
//! train and rank five waste regression models.

pub mod analysis;
pub mod config;
pub mod data;
pub mod error;
pub mod ml;
pub mod output;

pub use config::PipelineConfig;
pub use error::PipelineError;
