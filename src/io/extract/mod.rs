//! Metric extraction from the three vendor schema variants.
//!
//! Every field is resolved through the explicit ancestor chain declared
//! in [`paths`]; nothing is searched document-wide. This matters for
//! `TotalLength`/`NumRecords`, which exist both under `DataSetMetadata`
//! (the authoritative dataset-level aggregate) and once per entry under
//! `ExternalResources` (per-file totals): only the `DataSetMetadata`
//! chain is ever consulted.
//!
//! Absence of an optional element yields `None`, never an error; only a
//! document whose root is not one of the recognized vendor schemas is
//! rejected (and then skipped by the aggregator with a warning).

use std::str::FromStr;

use anyhow::{bail, ensure};
use log::{debug, warn};

use crate::data_structs::YieldSource;
use crate::io::xml::XmlElement;
use crate::utils::round2;

/// Vendor namespace prefix shared by all recognized schemas.
pub const VENDOR_NS_PREFIX: &str = "http://pacificbiosciences.com/";

/// Declared ancestor chains, one per extracted field group.
///
/// Chains under [`COLLECTION_METADATA`](paths::COLLECTION_METADATA) are
/// relative to that element; everything else is relative to the document
/// root.
pub mod paths {
    /// Authoritative dataset-level total, bases.
    pub const TOTAL_LENGTH: &[&str] = &["DataSetMetadata", "TotalLength"];
    /// Authoritative dataset-level record count.
    pub const NUM_RECORDS: &[&str] = &["DataSetMetadata", "NumRecords"];
    /// Collection metadata element carrying instrument and well info.
    pub const COLLECTION_METADATA: &[&str] =
        &["DataSetMetadata", "Collections", "CollectionMetadata"];
    /// Run name, relative to `COLLECTION_METADATA`.
    pub const RUN_NAME: &[&str] = &["RunDetails", "Name"];
    /// Well sample element, relative to `COLLECTION_METADATA`.
    pub const WELL_SAMPLE: &[&str] = &["WellSample"];
    /// Automation parameters, relative to `COLLECTION_METADATA`.
    pub const AUTOMATION_PARAMETERS: &[&str] =
        &["Automation", "AutomationParameters", "AutomationParameter"];
    /// Binding kit element, relative to `COLLECTION_METADATA`.
    pub const BINDING_KIT: &[&str] = &["BindingKit"];
    /// Cell pac element, relative to `COLLECTION_METADATA`.
    pub const CELL_PAC: &[&str] = &["CellPac"];
    /// Per-file references; their totals are never used as the dataset
    /// total.
    pub const EXTERNAL_RESOURCES: &[&str] =
        &["ExternalResources", "ExternalResource"];

    /// Run-statistics fields, all relative to the `.sts.xml` root.
    pub const NUM_SEQUENCING_ZMWS: &[&str] = &["NumSequencingZmws"];
    pub const MOVIE_LENGTH: &[&str] = &["MovieLength"];
    pub const SEQUENCING_UMY: &[&str] = &["SequencingUmy"];
    /// Loading distribution bins (newer layout with a wrapper element).
    pub const LOADING_BINS: &[&str] = &["LoadingDist", "BinCounts", "BinCount"];
    /// Loading distribution bins (older layout, bins directly nested).
    pub const LOADING_BINS_FLAT: &[&str] = &["LoadingDist", "BinCount"];
    pub const PROD_BINS: &[&str] = &["ProdDist", "BinCounts", "BinCount"];
    pub const PROD_BINS_FLAT: &[&str] = &["ProdDist", "BinCount"];
    pub const READ_LEN_DIST: &[&str] = &["ReadLenDist"];
    pub const SNR_DIST: &[&str] = &["HqRegionSnrDist"];
}

/// The recognized schema variants, detected from the root element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    /// `*.consensusreadset.xml`, a HiFi/CCS dataset.
    ConsensusReadSet,
    /// `*.subreadset.xml`, a CLR dataset.
    SubreadSet,
    /// `*.sts.xml`, per-movie run statistics.
    RunStats,
}

impl SchemaKind {
    /// Detects the schema variant from the root element name and
    /// namespace. An unrecognized root is a schema mismatch: the caller
    /// skips the file with a warning rather than guessing.
    pub fn detect(root: &XmlElement) -> anyhow::Result<SchemaKind> {
        let ns = root.namespace().unwrap_or("");
        ensure!(
            ns.starts_with(VENDOR_NS_PREFIX),
            "unrecognized root namespace: {:?}",
            ns
        );
        match root.name() {
            "ConsensusReadSet" => Ok(SchemaKind::ConsensusReadSet),
            "SubreadSet" => Ok(SchemaKind::SubreadSet),
            "PipeStats" => Ok(SchemaKind::RunStats),
            other => bail!("unrecognized root element: {}", other),
        }
    }

    pub const fn is_dataset(&self) -> bool {
        !matches!(self, SchemaKind::RunStats)
    }
}

/// Metadata extracted from a dataset document (consensus or subread).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetMetrics {
    pub context: Option<String>,
    pub instrument_id: Option<String>,
    pub instrument_name: Option<String>,
    pub created_at: Option<String>,
    pub run_name: Option<String>,
    pub sample_name: Option<String>,
    pub well_name: Option<String>,
    pub insert_size: Option<i64>,
    pub loading_concentration: Option<f64>,
    pub application: Option<String>,
    pub movie_length_min: Option<f64>,
    pub target_insert_size: Option<i64>,
    pub binding_kit: Option<String>,
    pub binding_kit_part: Option<String>,
    pub cell_type: Option<String>,
    pub total_length: Option<i64>,
    pub num_records: Option<i64>,
    pub source_bam: Option<String>,
    pub yield_source: Option<YieldSource>,
}

/// Statistics extracted from a `.sts.xml` document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StsMetrics {
    pub num_sequencing_zmws: Option<i64>,
    pub actual_movie_length_min: Option<i64>,
    pub total_bases: Option<i64>,
    pub yield_gb: Option<f64>,
    pub p0_count: Option<i64>,
    pub p1_count: Option<i64>,
    pub p2_count: Option<i64>,
    pub p0_percent: Option<f64>,
    pub p1_percent: Option<f64>,
    pub p2_percent: Option<f64>,
    pub productive_zmws: Option<i64>,
    pub productivity_percent: Option<f64>,
    pub mean_read_length: Option<i64>,
    pub median_read_length: Option<i64>,
    pub n50_read_length: Option<i64>,
    pub snr_a: Option<f64>,
    pub snr_c: Option<f64>,
    pub snr_g: Option<f64>,
    pub snr_t: Option<f64>,
}

/// Extracts run conditions from a dataset document. `kind` must be one
/// of the dataset variants.
pub fn extract_dataset(
    root: &XmlElement,
    kind: SchemaKind,
) -> anyhow::Result<DatasetMetrics> {
    ensure!(
        kind.is_dataset(),
        "extract_dataset called with non-dataset schema {:?}",
        kind
    );

    let mut metrics = DatasetMetrics {
        total_length: text_parse(root.resolve(paths::TOTAL_LENGTH)),
        num_records: text_parse(root.resolve(paths::NUM_RECORDS)),
        ..Default::default()
    };

    if let Some(collection) = root.resolve(paths::COLLECTION_METADATA) {
        metrics.instrument_id = attr_string(collection, "InstrumentId");
        metrics.instrument_name = attr_string(collection, "InstrumentName");
        metrics.context = attr_string(collection, "Context");
        metrics.created_at = attr_string(collection, "CreatedAt");
        metrics.run_name = collection
            .resolve(paths::RUN_NAME)
            .and_then(|e| e.text())
            .map(str::to_owned);

        if let Some(well) = collection.resolve(paths::WELL_SAMPLE) {
            metrics.sample_name = attr_string(well, "Name");
            metrics.well_name = well
                .resolve(&["WellName"])
                .and_then(|e| e.text())
                .map(str::to_owned);
            metrics.insert_size = text_parse(well.resolve(&["InsertSize"]));
            metrics.loading_concentration =
                text_parse(well.resolve(&["OnPlateLoadingConcentration"]));
            metrics.application = well
                .resolve(&["Application"])
                .and_then(|e| e.text())
                .map(str::to_owned);
        }

        for param in collection.resolve_all(paths::AUTOMATION_PARAMETERS) {
            match (param.attr("Name"), param.attr("SimpleValue")) {
                (Some("MovieLength"), Some(value)) => {
                    metrics.movie_length_min = parse_or_warn(value, "MovieLength");
                },
                (Some("InsertSize"), Some(value)) => {
                    metrics.target_insert_size =
                        parse_or_warn(value, "InsertSize");
                },
                _ => {},
            }
        }

        if let Some(kit) = collection.resolve(paths::BINDING_KIT) {
            metrics.binding_kit = attr_string(kit, "Name");
            metrics.binding_kit_part = attr_string(kit, "PartNumber");
        }
        if let Some(cell) = collection.resolve(paths::CELL_PAC) {
            metrics.cell_type = attr_string(cell, "Name");
        }
    }
    else {
        debug!("dataset document carries no collection metadata");
    }

    let (source_bam, yield_source) = select_primary_bam(root);
    metrics.source_bam = source_bam;
    metrics.yield_source = yield_source;

    // Subread datasets never describe a quality-filtered read set; if no
    // resource was classifiable, the dataset total is still unfiltered.
    if metrics.yield_source.is_none() && kind == SchemaKind::SubreadSet {
        metrics.yield_source = Some(YieldSource::Unfiltered);
    }

    Ok(metrics)
}

/// Classifies external file references by filename suffix and selects
/// the reference the dataset total derives from.
///
/// When both a quality-filtered (`*.hifi_reads.bam`) and an unfiltered
/// (`*.reads.bam` / `*.subreads.bam`) reference are present, the
/// filtered one is preferred and the selection is recorded so downstream
/// consumers can filter on it. Suffix conventions differ across software
/// versions.
fn select_primary_bam(
    root: &XmlElement
) -> (Option<String>, Option<YieldSource>) {
    let mut filtered: Option<String> = None;
    let mut unfiltered: Option<String> = None;

    for resource in root.resolve_all(paths::EXTERNAL_RESOURCES) {
        let Some(resource_id) = resource.attr("ResourceId") else {
            continue;
        };
        let name = resource_id
            .rsplit('/')
            .next()
            .unwrap_or(resource_id)
            .to_owned();
        match classify_bam(&name) {
            Some(YieldSource::Filtered) => {
                filtered.get_or_insert(name);
            },
            Some(YieldSource::Unfiltered) => {
                unfiltered.get_or_insert(name);
            },
            None => {},
        }
    }

    if let Some(name) = filtered {
        (Some(name), Some(YieldSource::Filtered))
    }
    else if let Some(name) = unfiltered {
        (Some(name), Some(YieldSource::Unfiltered))
    }
    else {
        (None, None)
    }
}

/// Suffix classification of a BAM filename. Index and scraps files are
/// not read sets and return `None`.
pub fn classify_bam(name: &str) -> Option<YieldSource> {
    if name.ends_with(".hifi_reads.bam") {
        Some(YieldSource::Filtered)
    }
    else if name.ends_with(".subreads.bam") || name.ends_with(".reads.bam") {
        Some(YieldSource::Unfiltered)
    }
    else {
        None
    }
}

/// Extracts per-movie statistics from a run-statistics document.
pub fn extract_sts(root: &XmlElement) -> StsMetrics {
    let mut metrics = StsMetrics {
        num_sequencing_zmws: text_parse(
            root.resolve(paths::NUM_SEQUENCING_ZMWS),
        ),
        actual_movie_length_min: text_parse_float_floor(
            root.resolve(paths::MOVIE_LENGTH),
        ),
        total_bases: text_parse(root.resolve(paths::SEQUENCING_UMY)),
        ..Default::default()
    };
    metrics.yield_gb = metrics
        .total_bases
        .map(|bases| round2(bases as f64 / 1e9));

    let loading = bin_counts(root, paths::LOADING_BINS, paths::LOADING_BINS_FLAT);
    if loading.len() >= 3 {
        metrics.p0_count = Some(loading[0]);
        metrics.p1_count = Some(loading[1]);
        metrics.p2_count = Some(loading[2]);
        if let Some(total) = metrics.num_sequencing_zmws.filter(|t| *t > 0) {
            metrics.p0_percent = Some(percent(loading[0], total));
            metrics.p1_percent = Some(percent(loading[1], total));
            metrics.p2_percent = Some(percent(loading[2], total));
        }
    }
    else if !loading.is_empty() {
        warn!(
            "loading distribution has {} bins, expected at least 3",
            loading.len()
        );
    }

    let productivity = bin_counts(root, paths::PROD_BINS, paths::PROD_BINS_FLAT);
    // Bin 1 of the productivity distribution is "productive".
    if productivity.len() >= 2 {
        metrics.productive_zmws = Some(productivity[1]);
        if let Some(total) = metrics.num_sequencing_zmws.filter(|t| *t > 0) {
            metrics.productivity_percent = Some(percent(productivity[1], total));
        }
    }

    if let Some(dist) = root.resolve(paths::READ_LEN_DIST) {
        metrics.mean_read_length =
            text_parse_float_floor(dist.resolve(&["SampleMean"]));
        metrics.median_read_length =
            text_parse_float_floor(dist.resolve(&["SampleMed"]));
        metrics.n50_read_length =
            text_parse_float_floor(dist.resolve(&["SampleN50"]));
    }

    for snr_dist in root.resolve_all(paths::SNR_DIST) {
        let mean: Option<f64> = text_parse(snr_dist.resolve(&["SampleMean"]));
        let Some(mean) = mean.map(round2) else { continue };
        let slot = match snr_dist.attr("Channel") {
            Some("A") => &mut metrics.snr_a,
            Some("C") => &mut metrics.snr_c,
            Some("G") => &mut metrics.snr_g,
            Some("T") => &mut metrics.snr_t,
            _ => continue,
        };
        slot.get_or_insert(mean);
    }

    metrics
}

fn percent(
    count: i64,
    total: i64,
) -> f64 {
    round2(100.0 * count as f64 / total as f64)
}

/// Resolves bin counts through the declared chain, falling back to the
/// older flat layout when the wrapped one is absent. Both chains are
/// explicit; this is version handling, not a document-wide search.
fn bin_counts(
    root: &XmlElement,
    wrapped: &[&str],
    flat: &[&str],
) -> Vec<i64> {
    let elements = {
        let found = root.resolve_all(wrapped);
        if found.is_empty() {
            root.resolve_all(flat)
        }
        else {
            found
        }
    };
    elements
        .iter()
        .filter_map(|e| e.text())
        .filter_map(|t| parse_or_warn::<i64>(t, "BinCount"))
        .collect()
}

fn attr_string(
    element: &XmlElement,
    name: &str,
) -> Option<String> {
    element.attr(name).map(str::to_owned)
}

fn text_parse<T: FromStr>(element: Option<&XmlElement>) -> Option<T>
where
    T::Err: std::fmt::Display, {
    let element = element?;
    let text = element.text()?;
    parse_or_warn(text, element.name())
}

/// Vendor files report some integer statistics with a decimal point;
/// parse as float and truncate, as the reference tooling does.
fn text_parse_float_floor(element: Option<&XmlElement>) -> Option<i64> {
    text_parse::<f64>(element).map(|v| v as i64)
}

fn parse_or_warn<T: FromStr>(
    text: &str,
    field: &str,
) -> Option<T>
where
    T::Err: std::fmt::Display, {
    match text.trim().parse() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("failed to parse {} value {:?}: {}", field, text, e);
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::io::xml::parse_str;

    #[rstest]
    #[case("m64241e_240316_184724.hifi_reads.bam", Some(YieldSource::Filtered))]
    #[case("m64241e_240316_184724.reads.bam", Some(YieldSource::Unfiltered))]
    #[case("m64012_190727_013602.subreads.bam", Some(YieldSource::Unfiltered))]
    #[case("m64012_190727_013602.scraps.bam", None)]
    #[case("m64241e_240316_184724.hifi_reads.bam.pbi", None)]
    fn bam_classification(
        #[case] name: &str,
        #[case] expected: Option<YieldSource>,
    ) {
        assert_eq!(classify_bam(name), expected);
    }

    #[test]
    fn schema_detection() {
        let consensus = parse_str(
            r#"<pbds:ConsensusReadSet
                xmlns:pbds="http://pacificbiosciences.com/PacBioDatasets.xsd"
            />"#,
        )
        .unwrap();
        assert_eq!(
            SchemaKind::detect(&consensus).unwrap(),
            SchemaKind::ConsensusReadSet
        );

        let foreign = parse_str(r#"<Run xmlns="http://example.com/x.xsd"/>"#)
            .unwrap();
        assert!(SchemaKind::detect(&foreign).is_err());

        let unversioned = parse_str("<ConsensusReadSet/>").unwrap();
        assert!(SchemaKind::detect(&unversioned).is_err());
    }
}
