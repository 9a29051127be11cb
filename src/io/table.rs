//! The persisted run table: a Polars DataFrame with the fixed schema of
//! [`crate::data_structs::schema`], written to and read back from CSV.

use std::fs::File;
use std::path::Path;

use anyhow::{ensure, Context as _};
use log::info;
use polars::prelude::*;
use serde::Serialize;

use crate::data_structs::schema;
use crate::data_structs::RunRecord;

/// One row per run, columns per [`schema::COL_NAMES`]. Missing fields
/// are nulls (empty CSV cells), never zeros.
#[derive(Debug, Clone)]
pub struct RunTable {
    df: DataFrame,
}

/// Headline numbers for the scan summary output.
#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub n_runs: usize,
    pub n_ccs_hifi: usize,
    pub n_clr: usize,
    pub total_yield_gb: f64,
    pub mean_yield_gb: Option<f64>,
    pub mean_p1_percent: Option<f64>,
    pub mean_productivity_percent: Option<f64>,
}

impl RunTable {
    /// Builds the table from aggregated records, sorted by creation time
    /// descending (most recent run first).
    pub fn from_records(records: &[RunRecord]) -> anyhow::Result<Self> {
        macro_rules! column {
            ($name:expr, $get:expr) => {
                Series::new(
                    $name.into(),
                    records.iter().map($get).collect::<Vec<_>>(),
                )
                .into_column()
            };
        }

        let columns = vec![
            column!("context", |r: &RunRecord| Some(r.context.clone())),
            column!("run_name", |r: &RunRecord| r.run_name.clone()),
            column!("instrument_id", |r: &RunRecord| r.instrument_id.clone()),
            column!("instrument_name", |r: &RunRecord| {
                r.instrument_name.clone()
            }),
            column!("created_at", |r: &RunRecord| r.created_at.clone()),
            column!("run_mode", |r: &RunRecord| {
                r.run_mode.map(|m| m.as_str().to_owned())
            }),
            column!("sample_name", |r: &RunRecord| r.sample_name.clone()),
            column!("well_name", |r: &RunRecord| r.well_name.clone()),
            column!("application", |r: &RunRecord| r.application.clone()),
            column!("insert_size", |r: &RunRecord| r.insert_size),
            column!("target_insert_size", |r: &RunRecord| {
                r.target_insert_size
            }),
            column!("loading_concentration", |r: &RunRecord| {
                r.loading_concentration
            }),
            column!("movie_length_min", |r: &RunRecord| r.movie_length_min),
            column!("actual_movie_length_min", |r: &RunRecord| {
                r.actual_movie_length_min
            }),
            column!("binding_kit", |r: &RunRecord| r.binding_kit.clone()),
            column!("binding_kit_part", |r: &RunRecord| {
                r.binding_kit_part.clone()
            }),
            column!("cell_type", |r: &RunRecord| r.cell_type.clone()),
            column!("total_length", |r: &RunRecord| r.total_length),
            column!("num_records", |r: &RunRecord| r.num_records),
            column!("source_bam", |r: &RunRecord| r.source_bam.clone()),
            column!("yield_is_filtered", |r: &RunRecord| r.yield_is_filtered()),
            column!("num_sequencing_zmws", |r: &RunRecord| {
                r.num_sequencing_zmws
            }),
            column!("p0_count", |r: &RunRecord| r.p0_count),
            column!("p1_count", |r: &RunRecord| r.p1_count),
            column!("p2_count", |r: &RunRecord| r.p2_count),
            column!("p0_percent", |r: &RunRecord| r.p0_percent),
            column!("p1_percent", |r: &RunRecord| r.p1_percent),
            column!("p2_percent", |r: &RunRecord| r.p2_percent),
            column!("productive_zmws", |r: &RunRecord| r.productive_zmws),
            column!("productivity_percent", |r: &RunRecord| {
                r.productivity_percent
            }),
            column!("total_bases", |r: &RunRecord| r.total_bases),
            column!("yield_gb", |r: &RunRecord| r.yield_gb),
            column!("mean_read_length", |r: &RunRecord| r.mean_read_length),
            column!("median_read_length", |r: &RunRecord| {
                r.median_read_length
            }),
            column!("n50_read_length", |r: &RunRecord| r.n50_read_length),
            column!("snr_a", |r: &RunRecord| r.snr_a),
            column!("snr_c", |r: &RunRecord| r.snr_c),
            column!("snr_g", |r: &RunRecord| r.snr_g),
            column!("snr_t", |r: &RunRecord| r.snr_t),
            column!("xml_file", |r: &RunRecord| r.xml_file.clone()),
            column!("run_path", |r: &RunRecord| r.run_path.clone()),
            column!("sts_file", |r: &RunRecord| r.sts_file.clone()),
        ];

        let df = DataFrame::new(columns)?
            .lazy()
            .cast(
                schema::COL_NAMES
                    .iter()
                    .copied()
                    .zip(schema::col_types().iter().cloned())
                    .collect(),
                true,
            )
            .collect()?;

        let df = df.sort(
            ["created_at"],
            SortMultipleOptions::default()
                .with_order_descending(true)
                .with_nulls_last(true),
        )?;

        Ok(RunTable { df })
    }

    /// Wraps an existing frame, verifying the expected columns exist.
    pub fn from_dataframe(df: DataFrame) -> anyhow::Result<Self> {
        for name in schema::COL_NAMES {
            ensure!(
                df.column(name).is_ok(),
                "run table is missing column {:?}",
                name
            );
        }
        Ok(RunTable { df })
    }

    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    pub fn into_dataframe(self) -> DataFrame {
        self.df
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Writes the table as CSV with a header row.
    pub fn write_csv(
        &self,
        path: &Path,
    ) -> anyhow::Result<()> {
        let mut file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let mut df = self.df.clone();
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut df)?;
        info!("Saved {} runs to {}", self.height(), path.display());
        Ok(())
    }

    /// Reads a table back with the fixed schema; every value round-trips
    /// unmodified (floats to full printed precision).
    pub fn read_csv(path: &Path) -> anyhow::Result<Self> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_schema(Some(SchemaRef::from(schema::schema())))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .with_context(|| format!("failed to open {}", path.display()))?
            .finish()?;
        Self::from_dataframe(df)
    }

    pub fn summary(&self) -> anyhow::Result<TableSummary> {
        let modes = self.df.column("run_mode")?.str()?;
        let n_ccs_hifi = modes
            .into_iter()
            .filter(|m| *m == Some("CCS/HiFi"))
            .count();
        let n_clr =
            modes.into_iter().filter(|m| *m == Some("CLR")).count();

        let yield_col = self.df.column("yield_gb")?.f64()?;
        Ok(TableSummary {
            n_runs: self.height(),
            n_ccs_hifi,
            n_clr,
            total_yield_gb: yield_col.sum().unwrap_or(0.0),
            mean_yield_gb: yield_col.mean(),
            mean_p1_percent: self.df.column("p1_percent")?.f64()?.mean(),
            mean_productivity_percent: self
                .df
                .column("productivity_percent")?
                .f64()?
                .mean(),
        })
    }
}
