use serde::Serialize;

use super::enums::{RunMode, YieldSource};

/// One row per physical SMRT cell, assembled from the dataset XML and the
/// run statistics XML that share a movie context.
///
/// Every field except the identity fields is optional: an element absent
/// from a given document is recorded as `None` (a missing-value marker in
/// the persisted table), never as zero. A record is constructed once by
/// the aggregator and immutable thereafter.
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    /// Movie context (e.g. `m64241e_240316_184724`), the de-dup key.
    pub context: String,
    /// Name of the dataset XML file the metadata came from.
    pub xml_file: Option<String>,
    /// Directory of the dataset XML file.
    pub run_path: Option<String>,
    /// Name of the `.sts.xml` file the statistics came from.
    pub sts_file: Option<String>,

    pub instrument_id: Option<String>,
    pub instrument_name: Option<String>,
    pub created_at: Option<String>,
    pub run_name: Option<String>,
    pub sample_name: Option<String>,
    pub well_name: Option<String>,
    pub application: Option<String>,

    /// Target insert size from the well sample, base pairs.
    pub insert_size: Option<i64>,
    /// Target insert size from the automation parameters, base pairs.
    pub target_insert_size: Option<i64>,
    /// On-plate loading concentration, pM.
    pub loading_concentration: Option<f64>,

    /// Requested movie length, minutes (automation parameter).
    pub movie_length_min: Option<f64>,
    /// Observed movie length, minutes (run statistics).
    pub actual_movie_length_min: Option<i64>,

    pub binding_kit: Option<String>,
    pub binding_kit_part: Option<String>,
    pub cell_type: Option<String>,

    pub run_mode: Option<RunMode>,

    /// Dataset-level total, bases. Always the `DataSetMetadata` value,
    /// never a per-resource total.
    pub total_length: Option<i64>,
    pub num_records: Option<i64>,

    /// Basename of the BAM the dataset primarily refers to.
    pub source_bam: Option<String>,
    /// Whether that BAM is the quality-filtered or the unfiltered set.
    pub yield_source: Option<YieldSource>,

    pub num_sequencing_zmws: Option<i64>,
    pub p0_count: Option<i64>,
    pub p1_count: Option<i64>,
    pub p2_count: Option<i64>,
    pub p0_percent: Option<f64>,
    pub p1_percent: Option<f64>,
    pub p2_percent: Option<f64>,
    pub productive_zmws: Option<i64>,
    pub productivity_percent: Option<f64>,

    /// Total base output of the movie (`SequencingUmy`), bases.
    pub total_bases: Option<i64>,
    /// Total base output, gigabases.
    pub yield_gb: Option<f64>,

    pub mean_read_length: Option<i64>,
    pub median_read_length: Option<i64>,
    pub n50_read_length: Option<i64>,

    pub snr_a: Option<f64>,
    pub snr_c: Option<f64>,
    pub snr_g: Option<f64>,
    pub snr_t: Option<f64>,
}

impl RunRecord {
    pub fn new<S: Into<String>>(context: S) -> Self {
        RunRecord {
            context: context.into(),
            xml_file: None,
            run_path: None,
            sts_file: None,
            instrument_id: None,
            instrument_name: None,
            created_at: None,
            run_name: None,
            sample_name: None,
            well_name: None,
            application: None,
            insert_size: None,
            target_insert_size: None,
            loading_concentration: None,
            movie_length_min: None,
            actual_movie_length_min: None,
            binding_kit: None,
            binding_kit_part: None,
            cell_type: None,
            run_mode: None,
            total_length: None,
            num_records: None,
            source_bam: None,
            yield_source: None,
            num_sequencing_zmws: None,
            p0_count: None,
            p1_count: None,
            p2_count: None,
            p0_percent: None,
            p1_percent: None,
            p2_percent: None,
            productive_zmws: None,
            productivity_percent: None,
            total_bases: None,
            yield_gb: None,
            mean_read_length: None,
            median_read_length: None,
            n50_read_length: None,
            snr_a: None,
            snr_c: None,
            snr_g: None,
            snr_t: None,
        }
    }

    /// Whether the record carries dataset metadata (as opposed to being
    /// built from a lone `.sts.xml`).
    pub fn has_dataset(&self) -> bool {
        self.xml_file.is_some()
    }

    /// Sum of the three loading-state percentages, when all are present.
    pub fn loading_percent_sum(&self) -> Option<f64> {
        match (self.p0_percent, self.p1_percent, self.p2_percent) {
            (Some(p0), Some(p1), Some(p2)) => Some(p0 + p1 + p2),
            _ => None,
        }
    }

    /// Checks the loading invariant: percentages are non-negative and sum
    /// to 100 +- the given tolerance. `None` when percentages are absent.
    pub fn loading_percents_consistent(
        &self,
        tolerance: f64,
    ) -> Option<bool> {
        let sum = self.loading_percent_sum()?;
        let non_negative = [self.p0_percent, self.p1_percent, self.p2_percent]
            .iter()
            .all(|p| p.unwrap_or(0.0) >= 0.0);
        Some(non_negative && (sum - 100.0).abs() <= tolerance)
    }

    /// Checks that the declared insert size is positive. `None` when
    /// the field is absent.
    pub fn insert_size_plausible(&self) -> Option<bool> {
        self.insert_size.map(|size| size > 0)
    }

    pub fn yield_is_filtered(&self) -> Option<bool> {
        self.yield_source.map(|s| s.is_filtered())
    }
}
