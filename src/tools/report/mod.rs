//! The statistical reporter: fixed filter pipeline, correlations, four
//! nested regression models with an F-test chain, and descriptive
//! summaries over the persisted run table.

use std::fs::File;
use std::path::Path;

use anyhow::Context as _;
use log::{info, warn};
use polars::prelude::*;
use regex_lite::Regex;
use serde::Serialize;

use crate::data_structs::RunMode;
use crate::io::table::RunTable;
use crate::tools::regression::{compare_models, FTest, LinearModel};
use crate::utils::{pearson_test, Descriptives};

/// Reporter configuration. The defaults reproduce the standard analysis.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Case-insensitive pattern matched against `run_name`; matching
    /// rows are diagnostic runs and dropped from the analysis.
    pub diagnostic_pattern: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            diagnostic_pattern: r"(?i)diag|test|dryrun".to_owned(),
        }
    }
}

/// Pairwise correlation of one loading metric against yield.
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationEntry {
    pub metric: String,
    pub r: f64,
    pub t: f64,
    pub p: f64,
    pub n: usize,
}

/// Analysis columns of the filtered table, kept for plotting.
#[derive(Debug, Clone, Default)]
pub struct AnalysisData {
    pub yield_gb: Vec<f64>,
    pub p0_percent: Vec<f64>,
    pub p1_percent: Vec<f64>,
    pub p2_percent: Vec<f64>,
    pub insert_size: Vec<Option<f64>>,
}

/// The complete report over one run table.
#[derive(Debug, Clone, Serialize)]
pub struct StatReport {
    pub n_input: usize,
    pub n_analyzed: usize,
    pub n_with_insert_size: usize,
    pub correlations: Vec<CorrelationEntry>,
    pub models: Vec<LinearModel>,
    pub comparisons: Vec<FTest>,
    pub descriptives: Vec<Descriptives>,
    #[serde(skip)]
    pub data: AnalysisData,
}

impl StatReport {
    /// Runs the fixed pipeline over a table.
    ///
    /// Filters applied, in order: keep CCS/HiFi runs only; drop
    /// diagnostic runs by name; keep rows whose yield derives from the
    /// quality-filtered read set; drop rows missing yield or any loading
    /// percentage. Rows missing insert size stay in the analysis but are
    /// excluded from the models that require it.
    pub fn build(
        table: &RunTable,
        config: &ReportConfig,
    ) -> anyhow::Result<StatReport> {
        let n_input = table.height();

        let filtered = table
            .dataframe()
            .clone()
            .lazy()
            .filter(col("run_mode").eq(lit(RunMode::CcsHifi.as_str())))
            .filter(col("yield_is_filtered").eq(lit(true)))
            .filter(col("yield_gb").is_not_null())
            .filter(
                col("p0_percent")
                    .is_not_null()
                    .and(col("p1_percent").is_not_null())
                    .and(col("p2_percent").is_not_null()),
            )
            .collect()?;

        let analyzed = drop_diagnostic_runs(
            filtered,
            &config.diagnostic_pattern,
        )?;
        let n_analyzed = analyzed.height();
        info!(
            "analyzing {} of {} runs after filter pipeline",
            n_analyzed, n_input
        );

        let data = AnalysisData {
            yield_gb: required_f64(&analyzed, "yield_gb")?,
            p0_percent: required_f64(&analyzed, "p0_percent")?,
            p1_percent: required_f64(&analyzed, "p1_percent")?,
            p2_percent: required_f64(&analyzed, "p2_percent")?,
            insert_size: optional_f64(&analyzed, "insert_size")?,
        };

        let correlations = [
            ("p0_percent", &data.p0_percent),
            ("p1_percent", &data.p1_percent),
            ("p2_percent", &data.p2_percent),
        ]
        .into_iter()
        .map(|(metric, values)| {
            let (r, t, p) = pearson_test(values, &data.yield_gb);
            CorrelationEntry {
                metric: metric.to_owned(),
                r,
                t,
                p,
                n: n_analyzed,
            }
        })
        .collect();

        let (models, comparisons) = fit_model_chain(&data);

        let descriptives = build_descriptives(&analyzed);

        Ok(StatReport {
            n_input,
            n_analyzed,
            n_with_insert_size: data
                .insert_size
                .iter()
                .filter(|v| v.is_some())
                .count(),
            correlations,
            models,
            comparisons,
            descriptives,
            data,
        })
    }

    /// Writes the summary tables as CSVs plus a JSON digest.
    pub fn write_tables(
        &self,
        dir: &Path,
    ) -> anyhow::Result<()> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;

        let mut correlations = df!(
            "metric" => self.correlations.iter().map(|c| c.metric.clone()).collect::<Vec<_>>(),
            "r" => self.correlations.iter().map(|c| c.r).collect::<Vec<_>>(),
            "t" => self.correlations.iter().map(|c| c.t).collect::<Vec<_>>(),
            "p" => self.correlations.iter().map(|c| c.p).collect::<Vec<_>>(),
            "n" => self.correlations.iter().map(|c| c.n as u32).collect::<Vec<_>>(),
        )?;
        write_csv(&mut correlations, &dir.join("correlations.csv"))?;

        let mut model_names = Vec::new();
        let mut terms = Vec::new();
        let mut estimates = Vec::new();
        let mut std_errors = Vec::new();
        let mut t_values = Vec::new();
        let mut p_values = Vec::new();
        for model in &self.models {
            for i in 0..model.terms.len() {
                model_names.push(model.name.clone());
                terms.push(model.terms[i].clone());
                estimates.push(model.coefficients[i]);
                std_errors.push(model.std_errors[i]);
                t_values.push(model.t_values[i]);
                p_values.push(model.p_values[i]);
            }
        }
        let mut coefficients = df!(
            "model" => model_names,
            "term" => terms,
            "estimate" => estimates,
            "std_error" => std_errors,
            "t_value" => t_values,
            "p_value" => p_values,
        )?;
        write_csv(&mut coefficients, &dir.join("model_coefficients.csv"))?;

        let mut fits = df!(
            "model" => self.models.iter().map(|m| m.name.clone()).collect::<Vec<_>>(),
            "n" => self.models.iter().map(|m| m.n as u32).collect::<Vec<_>>(),
            "df_residual" => self.models.iter().map(|m| m.df_residual as u32).collect::<Vec<_>>(),
            "rss" => self.models.iter().map(|m| m.rss).collect::<Vec<_>>(),
            "r_squared" => self.models.iter().map(|m| m.r_squared).collect::<Vec<_>>(),
            "adj_r_squared" => self.models.iter().map(|m| m.adj_r_squared).collect::<Vec<_>>(),
        )?;
        write_csv(&mut fits, &dir.join("model_fit.csv"))?;

        let mut comparisons = df!(
            "restricted" => self.comparisons.iter().map(|c| c.restricted.clone()).collect::<Vec<_>>(),
            "full" => self.comparisons.iter().map(|c| c.full.clone()).collect::<Vec<_>>(),
            "f_statistic" => self.comparisons.iter().map(|c| c.f_statistic).collect::<Vec<_>>(),
            "df_numerator" => self.comparisons.iter().map(|c| c.df_numerator).collect::<Vec<_>>(),
            "df_denominator" => self.comparisons.iter().map(|c| c.df_denominator).collect::<Vec<_>>(),
            "p_value" => self.comparisons.iter().map(|c| c.p_value).collect::<Vec<_>>(),
        )?;
        write_csv(&mut comparisons, &dir.join("model_comparison.csv"))?;

        let mut descriptives = df!(
            "column" => self.descriptives.iter().map(|d| d.column.clone()).collect::<Vec<_>>(),
            "count" => self.descriptives.iter().map(|d| d.count as u32).collect::<Vec<_>>(),
            "mean" => self.descriptives.iter().map(|d| d.mean).collect::<Vec<_>>(),
            "std" => self.descriptives.iter().map(|d| d.std).collect::<Vec<_>>(),
            "min" => self.descriptives.iter().map(|d| d.min).collect::<Vec<_>>(),
            "median" => self.descriptives.iter().map(|d| d.median).collect::<Vec<_>>(),
            "max" => self.descriptives.iter().map(|d| d.max).collect::<Vec<_>>(),
        )?;
        write_csv(&mut descriptives, &dir.join("descriptives.csv"))?;

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(dir.join("report.json"), json)?;

        info!("wrote summary tables to {}", dir.display());
        Ok(())
    }
}

/// Fits the nested model chain.
///
/// M1 (`yield ~ p1`) and M2 (`yield ~ p0 + p1 + p2`) are reported over
/// all analysis rows. M3 adds insert size and M4 a `p1 x insert_size`
/// interaction; both use only rows with a known insert size. The F-test
/// chain needs a common observation set, so all four models are refit on
/// the insert-size-complete subset for the comparisons.
fn fit_model_chain(data: &AnalysisData) -> (Vec<LinearModel>, Vec<FTest>) {
    let mut models = Vec::new();
    let mut comparisons = Vec::new();

    let m1 = try_fit("yield ~ p1", &data.yield_gb, &[
        ("p1_percent", data.p1_percent.as_slice()),
    ]);
    let m2 = try_fit("yield ~ p0 + p1 + p2", &data.yield_gb, &[
        ("p0_percent", data.p0_percent.as_slice()),
        ("p1_percent", data.p1_percent.as_slice()),
        ("p2_percent", data.p2_percent.as_slice()),
    ]);
    models.extend(m1.clone());
    models.extend(m2.clone());

    // Complete cases for the insert-size models.
    let idx: Vec<usize> = data
        .insert_size
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|_| i))
        .collect();
    if idx.is_empty() {
        warn!("no runs carry an insert size; skipping models 3 and 4");
        return (models, comparisons);
    }
    let take = |values: &[f64]| -> Vec<f64> {
        idx.iter().map(|&i| values[i]).collect()
    };
    let yield_s = take(&data.yield_gb);
    let p0_s = take(&data.p0_percent);
    let p1_s = take(&data.p1_percent);
    let p2_s = take(&data.p2_percent);
    let insert_s: Vec<f64> =
        idx.iter().filter_map(|&i| data.insert_size[i]).collect();
    let interaction: Vec<f64> = p1_s
        .iter()
        .zip(insert_s.iter())
        .map(|(p1, ins)| p1 * ins)
        .collect();

    let m3 = try_fit("yield ~ p0 + p1 + p2 + insert", &yield_s, &[
        ("p0_percent", p0_s.as_slice()),
        ("p1_percent", p1_s.as_slice()),
        ("p2_percent", p2_s.as_slice()),
        ("insert_size", insert_s.as_slice()),
    ]);
    let m4 = try_fit("yield ~ p0 + p1 + p2 + insert + p1:insert", &yield_s, &[
        ("p0_percent", p0_s.as_slice()),
        ("p1_percent", p1_s.as_slice()),
        ("p2_percent", p2_s.as_slice()),
        ("insert_size", insert_s.as_slice()),
        ("p1_x_insert", interaction.as_slice()),
    ]);
    models.extend(m3.clone());
    models.extend(m4.clone());

    // Refits on the common subset so the chain compares like with like.
    let m1_sub = try_fit("yield ~ p1", &yield_s, &[
        ("p1_percent", p1_s.as_slice()),
    ]);
    let m2_sub = try_fit("yield ~ p0 + p1 + p2", &yield_s, &[
        ("p0_percent", p0_s.as_slice()),
        ("p1_percent", p1_s.as_slice()),
        ("p2_percent", p2_s.as_slice()),
    ]);

    let chain = [m1_sub, m2_sub, m3, m4];
    for pair in chain.windows(2) {
        let (Some(restricted), Some(full)) = (&pair[0], &pair[1]) else {
            continue;
        };
        match compare_models(restricted, full) {
            Ok(test) => comparisons.push(test),
            Err(e) => warn!(
                "cannot compare {} against {}: {}",
                restricted.name, full.name, e
            ),
        }
    }

    (models, comparisons)
}

fn try_fit(
    name: &str,
    y: &[f64],
    predictors: &[(&str, &[f64])],
) -> Option<LinearModel> {
    match LinearModel::fit(name, y, predictors) {
        Ok(model) => Some(model),
        Err(e) => {
            warn!("skipping model {:?}: {}", name, e);
            None
        },
    }
}

fn drop_diagnostic_runs(
    df: DataFrame,
    pattern: &str,
) -> anyhow::Result<DataFrame> {
    let re = Regex::new(pattern)
        .with_context(|| format!("invalid diagnostic pattern {:?}", pattern))?;
    let mask: BooleanChunked = df
        .column("run_name")?
        .str()?
        .into_iter()
        .map(|name| Some(!name.map(|n| re.is_match(n)).unwrap_or(false)))
        .collect();
    Ok(df.filter(&mask)?)
}

/// Non-null values of a float-castable column.
fn optional_f64(
    df: &DataFrame,
    name: &str,
) -> anyhow::Result<Vec<Option<f64>>> {
    Ok(df
        .column(name)?
        .cast(&DataType::Float64)?
        .f64()?
        .into_iter()
        .collect())
}

fn required_f64(
    df: &DataFrame,
    name: &str,
) -> anyhow::Result<Vec<f64>> {
    optional_f64(df, name).map(|values| {
        values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect()
    })
}

fn build_descriptives(df: &DataFrame) -> Vec<Descriptives> {
    [
        "yield_gb",
        "p0_percent",
        "p1_percent",
        "p2_percent",
        "insert_size",
        "loading_concentration",
        "productivity_percent",
    ]
    .iter()
    .filter_map(|name| {
        let values: Vec<f64> = optional_f64(df, name)
            .ok()?
            .into_iter()
            .flatten()
            .collect();
        Descriptives::from_values(*name, &values)
    })
    .collect()
}

fn write_csv(
    df: &mut DataFrame,
    path: &Path,
) -> anyhow::Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(df)?;
    Ok(())
}
