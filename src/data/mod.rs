/// Data layer: core types, loading, cleaning and outlier filtering.
///
/// Architecture:
/// ```text
///  .xlsx / .xls / .ods / .csv
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  read sheet → RawGrid (header-less cells)
///   └──────────┘
///        │
///        ▼
///   ┌────────────┐
///   │ normalize   │  layout + schema + line map → RecordSet
///   └────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  per-line IQR fence → RecordSet
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
pub mod normalize;

pub use filter::remove_outliers_iqr_per_line;
pub use loader::{load_grid, RawGrid};
pub use model::{CellValue, Field, FieldKind, RecordSet, WasteRecord};
pub use normalize::{clean_grid, load_and_preprocess, render_template, LineNormalizationMap};
