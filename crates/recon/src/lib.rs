//! `salesgrid-recon`: Target-vs-actual sales reconciliation engine.
//!
//! Pure engine crate: datasets arrive already loaded, every operation takes
//! the [`Registry`] explicitly. No CLI or file IO dependencies.

pub mod aggregate;
pub mod classify;
pub mod column;
pub mod config;
pub mod engine;
pub mod error;
pub mod mapping;
pub mod matcher;
pub mod metrics;
pub mod model;
pub mod registry;
pub mod summary;
pub mod tools;

pub use classify::{classify_all, classify_source, Classification, ClassificationReport, ClassifyResult};
pub use column::{find_column, ColumnMatch, ColumnRole};
pub use config::ReconRules;
pub use engine::reconcile;
pub use error::{ReconError, Side};
pub use mapping::{CodeMapping, CodeMatch, MappingRow};
pub use model::{Cell, Dataset, MergedRecord, ReconResult, Summary};
pub use registry::{merge_key, sheet_key, Registry};
pub use summary::summarize;
pub use tools::Session;
