//! End-to-end aggregation over a synthetic run directory tree.

use std::fs;
use std::path::Path;

use runscope::prelude::*;
use runscope::{RunMode, YieldSource};
use tempfile::TempDir;

const DS_NS: &str = "http://pacificbiosciences.com/PacBioDatasets.xsd";
const BASE_NS: &str = "http://pacificbiosciences.com/PacBioBaseDataModel.xsd";
const META_NS: &str =
    "http://pacificbiosciences.com/PacBioCollectionMetadata.xsd";
const STATS_NS: &str =
    "http://pacificbiosciences.com/PacBioPipelineStats.xsd";

fn write_consensus(
    dir: &Path,
    context: &str,
    run_name: &str,
) {
    let doc = format!(
        r#"<pbds:ConsensusReadSet xmlns:pbds="{DS_NS}"
                xmlns:pbbase="{BASE_NS}" xmlns:pbmeta="{META_NS}">
            <pbbase:ExternalResources>
                <pbbase:ExternalResource ResourceId="{context}.hifi_reads.bam" />
            </pbbase:ExternalResources>
            <pbds:DataSetMetadata>
                <pbds:TotalLength>420000000000</pbds:TotalLength>
                <pbds:NumRecords>2400000</pbds:NumRecords>
                <pbmeta:Collections>
                    <pbmeta:CollectionMetadata Context="{context}"
                            InstrumentId="64241e"
                            CreatedAt="2024-03-16T18:47:24Z">
                        <pbmeta:RunDetails>
                            <pbmeta:Name>{run_name}</pbmeta:Name>
                        </pbmeta:RunDetails>
                        <pbmeta:WellSample Name="sample">
                            <pbmeta:WellName>A01</pbmeta:WellName>
                            <pbmeta:InsertSize>15000</pbmeta:InsertSize>
                        </pbmeta:WellSample>
                    </pbmeta:CollectionMetadata>
                </pbmeta:Collections>
            </pbds:DataSetMetadata>
        </pbds:ConsensusReadSet>"#
    );
    fs::write(
        dir.join(format!("{}.consensusreadset.xml", context)),
        doc,
    )
    .unwrap();
}

fn write_subread(
    dir: &Path,
    context: &str,
) {
    let doc = format!(
        r#"<pbds:SubreadSet xmlns:pbds="{DS_NS}"
                xmlns:pbbase="{BASE_NS}" xmlns:pbmeta="{META_NS}">
            <pbbase:ExternalResources>
                <pbbase:ExternalResource ResourceId="{context}.subreads.bam" />
            </pbbase:ExternalResources>
            <pbds:DataSetMetadata>
                <pbds:TotalLength>90000000000</pbds:TotalLength>
                <pbmeta:Collections>
                    <pbmeta:CollectionMetadata Context="{context}"
                            CreatedAt="2019-07-27T01:36:02Z">
                        <pbmeta:RunDetails>
                            <pbmeta:Name>Legacy CLR run</pbmeta:Name>
                        </pbmeta:RunDetails>
                    </pbmeta:CollectionMetadata>
                </pbmeta:Collections>
            </pbds:DataSetMetadata>
        </pbds:SubreadSet>"#
    );
    fs::write(dir.join(format!("{}.subreadset.xml", context)), doc).unwrap();
}

fn write_sts(
    dir: &Path,
    context: &str,
) {
    let doc = format!(
        r#"<PipeStats xmlns="{STATS_NS}">
            <NumSequencingZmws>8000000</NumSequencingZmws>
            <MovieLength>1800</MovieLength>
            <SequencingUmy>423000000000</SequencingUmy>
            <LoadingDist>
                <BinCounts>
                    <BinCount>2000000</BinCount>
                    <BinCount>5000000</BinCount>
                    <BinCount>1000000</BinCount>
                </BinCounts>
            </LoadingDist>
        </PipeStats>"#
    );
    fs::write(dir.join(format!("{}.sts.xml", context)), doc).unwrap();
}

#[test]
fn one_record_per_cell_with_merged_statistics() {
    let tmp = TempDir::new().unwrap();
    let cell_dir = tmp.path().join("r64241e_20240316_114036/1_A01");
    fs::create_dir_all(&cell_dir).unwrap();

    write_consensus(&cell_dir, "m64241e_240316_184724", "Run 118");
    write_sts(&cell_dir, "m64241e_240316_184724");

    // Barcode-scoped subsets of the same cell must not produce rows.
    let bc_dir = cell_dir.join("bc2011--bc2011");
    fs::create_dir_all(&bc_dir).unwrap();
    write_consensus(&bc_dir, "m64241e_240316_184724", "Run 118");
    fs::write(
        cell_dir
            .join("m64241e_240316_184724.unbarcoded.consensusreadset.xml"),
        "<not-even-xml",
    )
    .unwrap();

    let records = RunAggregator::new(tmp.path()).collect().unwrap();
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert_eq!(record.context, "m64241e_240316_184724");
    assert_eq!(record.run_mode, Some(RunMode::CcsHifi));
    assert_eq!(record.run_name.as_deref(), Some("Run 118"));
    assert_eq!(record.yield_source, Some(YieldSource::Filtered));
    assert_eq!(record.total_length, Some(420_000_000_000));
    // Statistics from the sibling sts file landed on the same row.
    assert_eq!(record.num_sequencing_zmws, Some(8_000_000));
    assert_eq!(record.p1_percent, Some(62.5));
    assert_eq!(record.yield_gb, Some(423.0));
    assert_eq!(record.loading_percents_consistent(0.5), Some(true));
}

#[test]
fn consensus_takes_precedence_over_subread_for_same_cell() {
    let tmp = TempDir::new().unwrap();
    let cell_dir = tmp.path().join("run/2_B01");
    fs::create_dir_all(&cell_dir).unwrap();

    write_subread(&cell_dir, "m64241e_240317_101010");
    write_consensus(&cell_dir, "m64241e_240317_101010", "Run 119");

    let records = RunAggregator::new(tmp.path()).collect().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].run_mode, Some(RunMode::CcsHifi));
    assert_eq!(records[0].run_name.as_deref(), Some("Run 119"));
    assert_eq!(records[0].yield_source, Some(YieldSource::Filtered));
}

#[test]
fn unparseable_file_is_skipped_not_fatal() {
    let tmp = TempDir::new().unwrap();
    let cell_dir = tmp.path().join("run/3_C01");
    fs::create_dir_all(&cell_dir).unwrap();

    write_consensus(&cell_dir, "m64241e_240318_090000", "Run 120");
    fs::write(
        cell_dir.join("m64241e_240318_090001.consensusreadset.xml"),
        "<broken",
    )
    .unwrap();

    let records = RunAggregator::new(tmp.path()).collect().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].context, "m64241e_240318_090000");
}

#[test]
fn file_callback_ticks_once_per_discovered_file() {
    let tmp = TempDir::new().unwrap();
    let cell_a = tmp.path().join("run/1_A01");
    let cell_b = tmp.path().join("run/2_B01");
    fs::create_dir_all(&cell_a).unwrap();
    fs::create_dir_all(&cell_b).unwrap();

    write_consensus(&cell_a, "m64241e_240320_080000", "Run 121");
    write_sts(&cell_a, "m64241e_240320_080000");
    write_subread(&cell_b, "m64241e_240320_090000");

    let aggregator = RunAggregator::new(tmp.path());
    let total = aggregator.discover().unwrap().total();
    assert_eq!(total, 3);

    let mut seen = Vec::new();
    let records = aggregator
        .collect_with_progress(|path| {
            seen.push(path.file_name().unwrap().to_string_lossy().into_owned())
        })
        .unwrap();

    // One tick per file, in processing order: datasets first, then
    // statistics, so a bar sized from total() drains as parsing runs.
    assert_eq!(seen.len(), total);
    assert_eq!(
        seen,
        vec![
            "m64241e_240320_080000.consensusreadset.xml",
            "m64241e_240320_090000.subreadset.xml",
            "m64241e_240320_080000.sts.xml",
        ]
    );
    assert_eq!(records.len(), 2);
}

#[test]
fn sts_only_cell_still_yields_a_record() {
    let tmp = TempDir::new().unwrap();
    let cell_dir = tmp.path().join("run/4_D01");
    fs::create_dir_all(&cell_dir).unwrap();

    write_sts(&cell_dir, "m64241e_240319_120000");

    let records = RunAggregator::new(tmp.path()).collect().unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.context, "m64241e_240319_120000");
    assert!(!record.has_dataset());
    assert_eq!(record.run_mode, None);
    assert_eq!(record.p0_percent, Some(25.0));
}
