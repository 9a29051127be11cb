//! CSV persistence round-trip of the run table.

use runscope::{RunMode, RunRecord, RunTable, YieldSource};
use tempfile::TempDir;

fn full_record(
    context: &str,
    created_at: &str,
) -> RunRecord {
    let mut r = RunRecord::new(context);
    r.xml_file = Some(format!("{}.consensusreadset.xml", context));
    r.run_path = Some("/data/r64241e_20240316/1_A01".to_owned());
    r.sts_file = Some(format!("{}.sts.xml", context));
    r.instrument_id = Some("64241e".to_owned());
    r.instrument_name = Some("sequel-iie-01".to_owned());
    r.created_at = Some(created_at.to_owned());
    r.run_name = Some("Run 118".to_owned());
    r.sample_name = Some("HG002_shear".to_owned());
    r.well_name = Some("A01".to_owned());
    r.application = Some("HiFi Reads".to_owned());
    r.insert_size = Some(15_000);
    r.target_insert_size = Some(15_000);
    r.loading_concentration = Some(85.0);
    r.movie_length_min = Some(1800.0);
    r.actual_movie_length_min = Some(1799);
    r.binding_kit = Some("Polymerase Kit 2.2".to_owned());
    r.binding_kit_part = Some("101-894-200".to_owned());
    r.cell_type = Some("SMRT Cell 8M".to_owned());
    r.run_mode = Some(RunMode::CcsHifi);
    r.total_length = Some(420_000_000_000);
    r.num_records = Some(2_400_000);
    r.source_bam = Some(format!("{}.hifi_reads.bam", context));
    r.yield_source = Some(YieldSource::Filtered);
    r.num_sequencing_zmws = Some(8_000_000);
    r.p0_count = Some(2_000_000);
    r.p1_count = Some(5_000_000);
    r.p2_count = Some(1_000_000);
    r.p0_percent = Some(25.0);
    r.p1_percent = Some(62.5);
    r.p2_percent = Some(12.5);
    r.productive_zmws = Some(5_200_000);
    r.productivity_percent = Some(65.0);
    r.total_bases = Some(423_000_000_000);
    r.yield_gb = Some(423.0);
    r.mean_read_length = Some(102_354);
    r.median_read_length = Some(98_000);
    r.n50_read_length = Some(110_500);
    r.snr_a = Some(6.31);
    r.snr_c = Some(10.91);
    r.snr_g = Some(5.2);
    r.snr_t = Some(8.75);
    r
}

#[test]
fn csv_round_trip_is_lossless() {
    let mut sparse = RunRecord::new("m64012_190727_013602");
    sparse.created_at = Some("2019-07-27T01:36:02Z".to_owned());
    sparse.run_mode = Some(RunMode::Clr);
    sparse.yield_source = Some(YieldSource::Unfiltered);

    let records = vec![
        full_record("m64241e_240316_184724", "2024-03-16T18:47:24Z"),
        sparse,
    ];
    let table = RunTable::from_records(&records).unwrap();

    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("summary.csv");
    table.write_csv(&path).unwrap();

    let reread = RunTable::read_csv(&path).unwrap();
    assert_eq!(reread.height(), table.height());
    assert_eq!(
        reread.dataframe().get_column_names(),
        table.dataframe().get_column_names()
    );
    assert!(reread.dataframe().equals_missing(table.dataframe()));
}

#[test]
fn nulls_survive_the_round_trip() {
    let mut record = RunRecord::new("m64241e_240316_184724");
    record.run_mode = Some(RunMode::CcsHifi);

    let table = RunTable::from_records(&[record]).unwrap();
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("summary.csv");
    table.write_csv(&path).unwrap();

    let reread = RunTable::read_csv(&path).unwrap();
    let df = reread.dataframe();
    assert_eq!(df.column("insert_size").unwrap().null_count(), 1);
    assert_eq!(df.column("yield_gb").unwrap().null_count(), 1);
    assert_eq!(df.column("yield_is_filtered").unwrap().null_count(), 1);
    assert_eq!(
        df.column("run_mode").unwrap().str().unwrap().get(0),
        Some("CCS/HiFi")
    );
}

#[test]
fn summary_reflects_written_table() {
    let records = vec![
        full_record("m64241e_240316_184724", "2024-03-16T18:47:24Z"),
        full_record("m64241e_240317_101010", "2024-03-17T10:10:10Z"),
    ];
    let table = RunTable::from_records(&records).unwrap();
    let summary = table.summary().unwrap();
    assert_eq!(summary.n_runs, 2);
    assert_eq!(summary.n_ccs_hifi, 2);
    assert_eq!(summary.total_yield_gb, 846.0);
    assert_eq!(summary.mean_p1_percent, Some(62.5));
}
