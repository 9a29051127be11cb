//! # runscope
//!
//! `runscope` extracts run conditions and loading statistics from PacBio
//! Sequel IIe instrument XML (`*.consensusreadset.xml`, `*.subreadset.xml`
//! and `*.sts.xml`), aggregates one row per physical SMRT cell into a
//! tabular dataset backed by Polars, and performs exploratory statistical
//! analysis (correlation, nested linear regressions, figures) relating ZMW
//! loading metrics to sequencing yield.
//!
//! The vendor schemas are semi-structured and versioned, and several
//! element names occur at more than one nesting depth with different
//! meanings (a dataset-level `TotalLength` versus per-file totals under
//! `ExternalResources`). Every extracted field is therefore resolved
//! through an explicit ancestor chain declared in [`io::extract`]; the XML
//! layer in [`io::xml`] intentionally provides no document-wide search.
//!
//! ## Structure
//!
//! * [`data_structs`]: the [`RunRecord`] row type, run mode and yield
//!   provenance enums, and the run-table schema.
//! * [`io`]: the namespace-aware XML element tree, the metric extractors
//!   for the three schema variants, and the persisted run table.
//! * [`aggregate`]: recursive discovery of run files (excluding
//!   barcode-scoped subsets) and the per-cell merge.
//! * [`tools`]: the statistical reporter with correlations, nested OLS
//!   models and their F-test comparison, and descriptive summaries.
//! * [`plots`] (feature `plots`): SVG figures for the reporter.
//! * [`utils`]: Polars schema helpers and closed-form statistics.
//!
//! [`RunRecord`]: data_structs::RunRecord

pub mod aggregate;
pub mod data_structs;
pub mod io;
pub mod prelude;
pub mod tools;
pub mod utils;

#[cfg(feature = "plots")]
pub mod plots;

pub use crate::data_structs::{RunMode, RunRecord, YieldSource};
pub use crate::io::extract::SchemaKind;
pub use crate::io::table::RunTable;
