//! Fixed column layout of the persisted run table.

use polars::prelude::*;

use crate::utils::schema_from_arrays;

/// Column names of the run table, in persisted order.
pub const COL_NAMES: &[&str] = &[
    "context",
    "run_name",
    "instrument_id",
    "instrument_name",
    "created_at",
    "run_mode",
    "sample_name",
    "well_name",
    "application",
    "insert_size",
    "target_insert_size",
    "loading_concentration",
    "movie_length_min",
    "actual_movie_length_min",
    "binding_kit",
    "binding_kit_part",
    "cell_type",
    "total_length",
    "num_records",
    "source_bam",
    "yield_is_filtered",
    "num_sequencing_zmws",
    "p0_count",
    "p1_count",
    "p2_count",
    "p0_percent",
    "p1_percent",
    "p2_percent",
    "productive_zmws",
    "productivity_percent",
    "total_bases",
    "yield_gb",
    "mean_read_length",
    "median_read_length",
    "n50_read_length",
    "snr_a",
    "snr_c",
    "snr_g",
    "snr_t",
    "xml_file",
    "run_path",
    "sts_file",
];

/// Data types for each column, in the order of [`COL_NAMES`].
pub const fn col_types() -> &'static [DataType] {
    &[
        DataType::String,  // context
        DataType::String,  // run_name
        DataType::String,  // instrument_id
        DataType::String,  // instrument_name
        DataType::String,  // created_at
        DataType::String,  // run_mode
        DataType::String,  // sample_name
        DataType::String,  // well_name
        DataType::String,  // application
        DataType::Int64,   // insert_size
        DataType::Int64,   // target_insert_size
        DataType::Float64, // loading_concentration
        DataType::Float64, // movie_length_min
        DataType::Int64,   // actual_movie_length_min
        DataType::String,  // binding_kit
        DataType::String,  // binding_kit_part
        DataType::String,  // cell_type
        DataType::Int64,   // total_length
        DataType::Int64,   // num_records
        DataType::String,  // source_bam
        DataType::Boolean, // yield_is_filtered
        DataType::Int64,   // num_sequencing_zmws
        DataType::Int64,   // p0_count
        DataType::Int64,   // p1_count
        DataType::Int64,   // p2_count
        DataType::Float64, // p0_percent
        DataType::Float64, // p1_percent
        DataType::Float64, // p2_percent
        DataType::Int64,   // productive_zmws
        DataType::Float64, // productivity_percent
        DataType::Int64,   // total_bases
        DataType::Float64, // yield_gb
        DataType::Int64,   // mean_read_length
        DataType::Int64,   // median_read_length
        DataType::Int64,   // n50_read_length
        DataType::Float64, // snr_a
        DataType::Float64, // snr_c
        DataType::Float64, // snr_g
        DataType::Float64, // snr_t
        DataType::String,  // xml_file
        DataType::String,  // run_path
        DataType::String,  // sts_file
    ]
}

/// Creates the Polars schema of the run table.
pub fn schema() -> Schema {
    schema_from_arrays(COL_NAMES, col_types())
}
