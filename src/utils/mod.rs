//! Shared helpers: Polars schema construction from parallel arrays and
//! closed-form statistical routines used by the reporter.

use itertools::Itertools;
use log::warn;
use polars::prelude::*;

mod stats;
pub use stats::*;

/// Creates a schema from separate arrays of names and data types.
pub(crate) fn schema_from_arrays(
    names: &[&str],
    dtypes: &[DataType],
) -> Schema {
    if names.len() != dtypes.len() {
        warn!(
            "Mismatch between names and dtypes array lengths: {} vs {}",
            names.len(),
            dtypes.len()
        );
    }
    Schema::from_iter(names.iter().cloned().map_into().zip(dtypes.iter().cloned()))
}

/// Rounds to two decimal places, the precision the vendor software
/// reports percentages at.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
