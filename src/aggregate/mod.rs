//! Sequential aggregation of run files into one record per SMRT cell.
//!
//! Files are merged keyed by movie context. A failed or unrecognized
//! file is skipped with a warning and traversal continues; only an
//! invalid root directory is fatal.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use hashbrown::HashMap;
use log::{debug, warn};

use crate::data_structs::{RunMode, RunRecord};
use crate::io::extract::{
    extract_dataset,
    extract_sts,
    DatasetMetrics,
    SchemaKind,
    StsMetrics,
};
use crate::io::xml::{parse_document, XmlElement};

mod discover;
pub use discover::{find_run_files, is_cell_scope, RunFiles};

/// Walks a directory tree and assembles one [`RunRecord`] per physical
/// cell.
pub struct RunAggregator {
    root: std::path::PathBuf,
}

impl RunAggregator {
    pub fn new<P: Into<std::path::PathBuf>>(root: P) -> Self {
        RunAggregator { root: root.into() }
    }

    /// Enumerates candidate files without parsing them. Useful for
    /// sizing progress reporting before [`collect_files`](Self::collect_files).
    pub fn discover(&self) -> anyhow::Result<RunFiles> {
        find_run_files(&self.root)
    }

    /// Enumerates, extracts and merges. Consensus datasets are processed
    /// before subread datasets so that, when both describe the same
    /// context, the quality-filtered (HiFi) dataset wins.
    pub fn collect(&self) -> anyhow::Result<Vec<RunRecord>> {
        let files = self.discover()?;
        self.collect_files(&files, |_| {})
    }

    /// Like [`collect`](Self::collect), invoking the callback for each
    /// file as it is processed.
    pub fn collect_with_progress<F: FnMut(&Path)>(
        &self,
        on_file: F,
    ) -> anyhow::Result<Vec<RunRecord>> {
        let files = self.discover()?;
        self.collect_files(&files, on_file)
    }

    /// Extracts and merges an already-discovered file set. The callback
    /// fires once per file, right before that file is parsed.
    pub fn collect_files<F: FnMut(&Path)>(
        &self,
        files: &RunFiles,
        mut on_file: F,
    ) -> anyhow::Result<Vec<RunRecord>> {
        let mut store = RecordStore::default();

        for path in &files.consensus {
            on_file(path);
            if let Err(e) = merge_dataset_file(path, RunMode::CcsHifi, &mut store)
            {
                warn!("Error parsing {}: {}", path.display(), e);
            }
        }
        for path in &files.subread {
            on_file(path);
            if let Err(e) = merge_dataset_file(path, RunMode::Clr, &mut store) {
                warn!("Error parsing {}: {}", path.display(), e);
            }
        }
        for path in &files.sts {
            on_file(path);
            if let Err(e) = merge_sts_file(path, &mut store) {
                warn!("Error parsing {}: {}", path.display(), e);
            }
        }

        let records = store.into_records();
        for record in &records {
            if record.loading_percents_consistent(0.5) == Some(false) {
                warn!(
                    "run {}: loading percentages sum to {:.2}, expected ~100",
                    record.context,
                    record.loading_percent_sum().unwrap_or_default()
                );
            }
            if record.insert_size_plausible() == Some(false) {
                warn!(
                    "run {}: non-positive insert size {}",
                    record.context,
                    record.insert_size.unwrap_or_default()
                );
            }
        }
        Ok(records)
    }
}

/// Records keyed by movie context, preserving first-seen order.
#[derive(Default)]
struct RecordStore {
    order: Vec<String>,
    by_context: HashMap<String, RunRecord>,
}

impl RecordStore {
    fn entry(
        &mut self,
        context: &str,
    ) -> &mut RunRecord {
        if !self.by_context.contains_key(context) {
            self.order.push(context.to_owned());
        }
        self.by_context
            .entry(context.to_owned())
            .or_insert_with(|| RunRecord::new(context))
    }

    fn into_records(mut self) -> Vec<RunRecord> {
        self.order
            .iter()
            .filter_map(|context| self.by_context.remove(context))
            .collect()
    }
}

fn merge_dataset_file(
    path: &Path,
    expected_mode: RunMode,
    store: &mut RecordStore,
) -> anyhow::Result<()> {
    let root = parse_xml_file(path)?;
    let kind = SchemaKind::detect(&root)?;
    let mode = match kind {
        SchemaKind::ConsensusReadSet => RunMode::CcsHifi,
        SchemaKind::SubreadSet => RunMode::Clr,
        SchemaKind::RunStats => {
            anyhow::bail!("expected a dataset document, found run statistics")
        },
    };
    if mode != expected_mode {
        debug!(
            "{}: file suffix suggests {:?} but schema is {:?}",
            path.display(),
            expected_mode,
            mode
        );
    }

    let metrics = extract_dataset(&root, kind)?;
    let context = metrics
        .context
        .clone()
        .unwrap_or_else(|| movie_context(path));

    let record = store.entry(&context);
    if record.has_dataset() {
        // One dataset per cell: the quality-filtered consensus dataset
        // takes precedence over the unfiltered subread dataset for the
        // same movie, never the other way around.
        if record.run_mode == Some(RunMode::Clr) && mode == RunMode::CcsHifi {
            debug!(
                "context {}: replacing subread metadata with consensus \
                 metadata",
                context
            );
        }
        else {
            debug!(
                "context {}: skipping duplicate dataset {}",
                context,
                path.display()
            );
            return Ok(());
        }
    }
    apply_dataset(record, metrics, mode, path);
    Ok(())
}

fn merge_sts_file(
    path: &Path,
    store: &mut RecordStore,
) -> anyhow::Result<()> {
    let root = parse_xml_file(path)?;
    match SchemaKind::detect(&root)? {
        SchemaKind::RunStats => {},
        other => {
            anyhow::bail!("expected run statistics, found {:?}", other)
        },
    }

    let metrics = extract_sts(&root);
    let context = movie_context(path);
    let record = store.entry(&context);
    if record.sts_file.is_some() {
        debug!(
            "context {}: skipping duplicate statistics file {}",
            context,
            path.display()
        );
        return Ok(());
    }
    apply_sts(record, metrics, path);
    Ok(())
}

fn apply_dataset(
    record: &mut RunRecord,
    metrics: DatasetMetrics,
    mode: RunMode,
    path: &Path,
) {
    record.xml_file = file_name(path);
    record.run_path = path
        .parent()
        .map(|p| p.to_string_lossy().into_owned());
    record.run_mode = Some(mode);

    record.instrument_id = metrics.instrument_id;
    record.instrument_name = metrics.instrument_name;
    record.created_at = metrics.created_at;
    record.run_name = metrics.run_name;
    record.sample_name = metrics.sample_name;
    record.well_name = metrics.well_name;
    record.application = metrics.application;
    record.insert_size = metrics.insert_size;
    record.target_insert_size = metrics.target_insert_size;
    record.loading_concentration = metrics.loading_concentration;
    record.movie_length_min = metrics.movie_length_min;
    record.binding_kit = metrics.binding_kit;
    record.binding_kit_part = metrics.binding_kit_part;
    record.cell_type = metrics.cell_type;
    record.total_length = metrics.total_length;
    record.num_records = metrics.num_records;
    record.source_bam = metrics.source_bam;
    record.yield_source = metrics.yield_source;
}

fn apply_sts(
    record: &mut RunRecord,
    metrics: StsMetrics,
    path: &Path,
) {
    record.sts_file = file_name(path);
    record.num_sequencing_zmws = metrics.num_sequencing_zmws;
    record.actual_movie_length_min = metrics.actual_movie_length_min;
    record.total_bases = metrics.total_bases;
    record.yield_gb = metrics.yield_gb;
    record.p0_count = metrics.p0_count;
    record.p1_count = metrics.p1_count;
    record.p2_count = metrics.p2_count;
    record.p0_percent = metrics.p0_percent;
    record.p1_percent = metrics.p1_percent;
    record.p2_percent = metrics.p2_percent;
    record.productive_zmws = metrics.productive_zmws;
    record.productivity_percent = metrics.productivity_percent;
    record.mean_read_length = metrics.mean_read_length;
    record.median_read_length = metrics.median_read_length;
    record.n50_read_length = metrics.n50_read_length;
    record.snr_a = metrics.snr_a;
    record.snr_c = metrics.snr_c;
    record.snr_g = metrics.snr_g;
    record.snr_t = metrics.snr_t;
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

fn parse_xml_file(path: &Path) -> anyhow::Result<XmlElement> {
    let file = File::open(path)?;
    parse_document(BufReader::new(file))
}

/// Movie context from a filename: the stem before the first dot
/// (`m64241e_240316_184724.sts.xml` -> `m64241e_240316_184724`).
fn movie_context(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
        .split('.')
        .next()
        .unwrap_or_default()
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_from_filename() {
        assert_eq!(
            movie_context(Path::new(
                "/data/run/m64241e_240316_184724.sts.xml"
            )),
            "m64241e_240316_184724"
        );
        assert_eq!(
            movie_context(Path::new(
                "m64241e_240316_184724.consensusreadset.xml"
            )),
            "m64241e_240316_184724"
        );
    }

    #[test]
    fn store_preserves_order() {
        let mut store = RecordStore::default();
        store.entry("m2");
        store.entry("m1");
        store.entry("m2");
        let records = store.into_records();
        let contexts: Vec<_> =
            records.iter().map(|r| r.context.as_str()).collect();
        assert_eq!(contexts, vec!["m2", "m1"]);
    }
}
