//! Recovery of known relationships from noisy synthetic run data.

use assert_approx_eq::assert_approx_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use runscope::prelude::*;
use runscope::{RunMode, RunRecord, RunTable, YieldSource};

const SLOPE: f64 = 0.4;
const INTERCEPT: f64 = 2.0;

fn synthetic_records(
    n: usize,
    noise_sd: f64,
    seed: u64,
) -> Vec<RunRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, noise_sd).unwrap();

    (0..n)
        .map(|i| {
            let p1: f64 = rng.gen_range(30.0..75.0);
            let p2: f64 = rng.gen_range(1.0..6.0);
            // A sliver of ZMWs is unclassified, as in real sts files.
            let p0 = 100.0 - p1 - p2 - rng.gen_range(0.0..0.5);
            let insert = rng.gen_range(8_000..22_000);

            let mut r = RunRecord::new(&format!("m64241e_{:06}", i));
            r.run_name = Some(format!("Production run {}", i));
            r.created_at = Some(format!("2024-03-{:02}T10:00:00Z", i % 28 + 1));
            r.run_mode = Some(RunMode::CcsHifi);
            r.yield_source = Some(YieldSource::Filtered);
            r.p0_percent = Some(p0);
            r.p1_percent = Some(p1);
            r.p2_percent = Some(p2);
            r.insert_size = Some(insert);
            r.yield_gb =
                Some(INTERCEPT + SLOPE * p1 + noise.sample(&mut rng));
            r
        })
        .collect()
}

#[test]
fn pearson_detects_strong_loading_yield_relation() {
    let records = synthetic_records(200, 1.0, 7);
    let table = RunTable::from_records(&records).unwrap();
    let report =
        StatReport::build(&table, &ReportConfig::default()).unwrap();

    let p1_corr = report
        .correlations
        .iter()
        .find(|c| c.metric == "p1_percent")
        .unwrap();
    assert!(p1_corr.r > 0.9, "r = {}", p1_corr.r);
    assert!(p1_corr.p < 1e-10);
}

#[test]
fn simple_model_recovers_generating_coefficients() {
    let records = synthetic_records(400, 0.5, 42);
    let table = RunTable::from_records(&records).unwrap();
    let report =
        StatReport::build(&table, &ReportConfig::default()).unwrap();

    let m1 = report
        .models
        .iter()
        .find(|m| m.name == "yield ~ p1")
        .unwrap();
    assert_approx_eq!(m1.coefficient("p1_percent").unwrap(), SLOPE, 0.05);
    assert_approx_eq!(m1.coefficient("intercept").unwrap(), INTERCEPT, 1.5);
    assert!(m1.r_squared > 0.95);
}

#[test]
fn interaction_term_found_when_present() {
    let mut rng = StdRng::seed_from_u64(11);
    let noise = Normal::new(0.0, 0.5).unwrap();

    let records: Vec<RunRecord> = (0..300)
        .map(|i| {
            let p1: f64 = rng.gen_range(30.0..75.0);
            let p2: f64 = rng.gen_range(1.0..6.0);
            let insert: i64 = rng.gen_range(8_000..22_000);

            let mut r = RunRecord::new(&format!("m64241e_{:06}", i));
            r.run_name = Some("Production run".to_owned());
            r.run_mode = Some(RunMode::CcsHifi);
            r.yield_source = Some(YieldSource::Filtered);
            r.p0_percent = Some(100.0 - p1 - p2 - rng.gen_range(0.0..0.5));
            r.p1_percent = Some(p1);
            r.p2_percent = Some(p2);
            r.insert_size = Some(insert);
            // Yield improves with loading, more steeply for long inserts.
            r.yield_gb = Some(
                2.0 + 0.2 * p1
                    + 2e-5 * p1 * insert as f64
                    + noise.sample(&mut rng),
            );
            r
        })
        .collect();

    let table = RunTable::from_records(&records).unwrap();
    let report =
        StatReport::build(&table, &ReportConfig::default()).unwrap();

    let interaction_test = report
        .comparisons
        .iter()
        .find(|t| t.full.contains("p1:insert"))
        .unwrap();
    assert!(interaction_test.f_statistic > 10.0);
    assert!(interaction_test.p_value < 1e-4);
}

#[test]
fn diagnostic_runs_do_not_influence_the_fit() {
    let mut records = synthetic_records(100, 0.5, 3);
    // Diagnostic runs with wild values; their names exclude them.
    for i in 0..20 {
        let mut r = RunRecord::new(&format!("m64241e_diag{:02}", i));
        r.run_name = Some(format!("loading DIAG {}", i));
        r.run_mode = Some(RunMode::CcsHifi);
        r.yield_source = Some(YieldSource::Filtered);
        r.p0_percent = Some(30.0);
        r.p1_percent = Some(65.0);
        r.p2_percent = Some(5.0);
        r.yield_gb = Some(0.01);
        records.push(r);
    }

    let table = RunTable::from_records(&records).unwrap();
    let report =
        StatReport::build(&table, &ReportConfig::default()).unwrap();
    assert_eq!(report.n_input, 120);
    assert_eq!(report.n_analyzed, 100);

    let m1 = report
        .models
        .iter()
        .find(|m| m.name == "yield ~ p1")
        .unwrap();
    assert_approx_eq!(m1.coefficient("p1_percent").unwrap(), SLOPE, 0.05);
}
