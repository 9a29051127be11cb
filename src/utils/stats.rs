use log::{debug, warn};
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Calculates Pearson correlation coefficient between two variables.
pub fn pearson_r(
    x: &[f64],
    y: &[f64],
) -> f64 {
    if x.len() != y.len() {
        warn!(
            "Cannot calculate Pearson's r: x length ({}) doesn't match y \
             length ({})",
            x.len(),
            y.len()
        );
        return 0.0;
    }
    if x.is_empty() {
        warn!("Cannot calculate Pearson's r: empty arrays");
        return 0.0;
    }

    let n = x.len() as f64;
    let x_mean = x.iter().sum::<f64>() / n;
    let y_mean = y.iter().sum::<f64>() / n;

    let numerator = x
        .iter()
        .zip(y.iter())
        .map(|(valx, valy)| (valx - x_mean) * (valy - y_mean))
        .sum::<f64>();

    let denominator = {
        let x_dev: f64 = x.iter().map(|valx| (valx - x_mean).powi(2)).sum();
        let y_dev: f64 = y.iter().map(|valy| (valy - y_mean).powi(2)).sum();
        (x_dev * y_dev).sqrt()
    };

    if denominator == 0.0 {
        debug!("Denominator is zero, returning r=0");
        return 0.0;
    }

    let r = numerator / denominator;
    debug!("Pearson's r = {:.4}", r);
    r
}

/// Pearson correlation with a two-tailed significance test.
///
/// The test statistic is `t = r * sqrt((n-2) / (1-r^2))` with `n-2`
/// degrees of freedom. Returns `(r, t, p)`; with fewer than three paired
/// observations the p-value is 1.
pub fn pearson_test(
    x: &[f64],
    y: &[f64],
) -> (f64, f64, f64) {
    let r = pearson_r(x, y);
    let n = x.len().min(y.len());
    if n < 3 {
        warn!("Pearson test needs at least 3 observations, got {}", n);
        return (r, 0.0, 1.0);
    }
    let df = (n - 2) as f64;
    let denom = 1.0 - r * r;
    if denom <= f64::EPSILON {
        // Perfect correlation: the statistic diverges.
        return (r, f64::INFINITY, 0.0);
    }
    let t = r * (df / denom).sqrt();
    let dist = match StudentsT::new(0.0, 1.0, df) {
        Ok(d) => d,
        Err(e) => {
            warn!("Failed to build t distribution (df={}): {}", df, e);
            return (r, t, 1.0);
        },
    };
    let p = 2.0 * (1.0 - dist.cdf(t.abs()));
    (r, t, p.clamp(0.0, 1.0))
}

/// Descriptive summary of one numeric column, missing values skipped.
#[derive(Debug, Clone, Serialize)]
pub struct Descriptives {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub median: f64,
    pub max: f64,
}

impl Descriptives {
    /// Summarizes the non-missing values of a column. Returns `None` for
    /// an all-missing column.
    pub fn from_values<S: Into<String>>(
        column: S,
        values: &[f64],
    ) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
            / (n - 1.0).max(1.0);

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let median = if sorted.len() % 2 == 1 {
            sorted[sorted.len() / 2]
        }
        else {
            (sorted[sorted.len() / 2 - 1] + sorted[sorted.len() / 2]) / 2.0
        };

        Some(Descriptives {
            column: column.into(),
            count: values.len(),
            mean,
            std: var.sqrt(),
            min: sorted[0],
            median,
            max: *sorted.last().unwrap(),
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;

    #[test]
    fn pearson_r_perfect() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let y = vec![6.0, 7.0, 8.0, 9.0, 10.0, 11.0];
        assert_eq!(pearson_r(&x, &y), 1f64);
    }

    #[test]
    fn pearson_test_uncorrelated() {
        // Symmetric about the mean with no linear trend.
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let y = vec![2.0, 4.0, 2.0, 4.0, 2.0];
        let (r, _t, p) = pearson_test(&x, &y);
        assert!(r.abs() < 0.3, "r = {}", r);
        assert!(p > 0.5, "p = {}", p);
    }

    #[test]
    fn pearson_test_strong() {
        let x: Vec<f64> = (0..30).map(|v| v as f64).collect();
        let y: Vec<f64> =
            x.iter().map(|v| 2.0 * v + (v % 3.0) * 0.1).collect();
        let (r, _t, p) = pearson_test(&x, &y);
        assert!(r > 0.99);
        assert!(p < 1e-6);
    }

    #[test]
    fn descriptives_basic() {
        let d =
            Descriptives::from_values("x", &[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(d.count, 4);
        assert_approx_eq!(d.mean, 2.5);
        assert_approx_eq!(d.median, 2.5);
        assert_eq!(d.min, 1.0);
        assert_eq!(d.max, 4.0);
        assert!(Descriptives::from_values("empty", &[]).is_none());
    }
}
