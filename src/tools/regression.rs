//! Ordinary least squares with coefficient inference and nested-model
//! comparison.
//!
//! Design matrices here are tiny (at most an intercept plus five
//! predictors), so the models are fit by solving the normal equations
//! directly with Gaussian elimination; no iterative optimizer is
//! involved.

use anyhow::{bail, ensure};
use log::debug;
use ndarray::{Array1, Array2};
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};

/// A fitted linear model. `terms[0]` is always the intercept.
#[derive(Debug, Clone, Serialize)]
pub struct LinearModel {
    pub name: String,
    pub terms: Vec<String>,
    pub coefficients: Vec<f64>,
    pub std_errors: Vec<f64>,
    pub t_values: Vec<f64>,
    pub p_values: Vec<f64>,
    /// Residual sum of squares.
    pub rss: f64,
    /// Total sum of squares around the response mean.
    pub tss: f64,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub n: usize,
    pub df_residual: usize,
}

impl LinearModel {
    /// Fits `y ~ 1 + predictors` by OLS.
    ///
    /// Each predictor is a named column of the same length as `y`. Fails
    /// when lengths disagree, when there are not more observations than
    /// parameters, or when the normal equations are singular (e.g. a
    /// constant or duplicated predictor).
    pub fn fit(
        name: &str,
        y: &[f64],
        predictors: &[(&str, &[f64])],
    ) -> anyhow::Result<Self> {
        let n = y.len();
        let p = predictors.len() + 1;
        for (term, values) in predictors {
            ensure!(
                values.len() == n,
                "predictor {} has {} values, response has {}",
                term,
                values.len(),
                n
            );
        }
        ensure!(
            n > p,
            "model {} needs more than {} observations, got {}",
            name,
            p,
            n
        );

        let mut x = Array2::<f64>::ones((n, p));
        for (j, (_, values)) in predictors.iter().enumerate() {
            for (i, v) in values.iter().enumerate() {
                x[(i, j + 1)] = *v;
            }
        }
        let y_arr = Array1::from_vec(y.to_vec());

        let xtx = x.t().dot(&x);
        let xty = x.t().dot(&y_arr);
        let xtx_inv = invert(&xtx)?;
        let beta = xtx_inv.dot(&xty);

        let fitted = x.dot(&beta);
        let residuals = &y_arr - &fitted;
        let rss = residuals.iter().map(|r| r * r).sum::<f64>();
        let y_mean = y_arr.mean().unwrap_or(0.0);
        let tss = y_arr.iter().map(|v| (v - y_mean).powi(2)).sum::<f64>();

        let df_residual = n - p;
        let sigma2 = rss / df_residual as f64;

        let dist = StudentsT::new(0.0, 1.0, df_residual as f64)?;
        let mut std_errors = Vec::with_capacity(p);
        let mut t_values = Vec::with_capacity(p);
        let mut p_values = Vec::with_capacity(p);
        for j in 0..p {
            let se = (sigma2 * xtx_inv[(j, j)]).sqrt();
            let t = if se > 0.0 { beta[j] / se } else { 0.0 };
            let p_val = if se > 0.0 {
                (2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0)
            }
            else {
                1.0
            };
            std_errors.push(se);
            t_values.push(t);
            p_values.push(p_val);
        }

        let r_squared = if tss > 0.0 { 1.0 - rss / tss } else { 0.0 };
        let adj_r_squared = 1.0
            - (1.0 - r_squared) * (n as f64 - 1.0) / (df_residual as f64);

        debug!(
            "fit {}: n={}, p={}, rss={:.4}, R2={:.4}",
            name, n, p, rss, r_squared
        );

        let mut terms = vec!["intercept".to_owned()];
        terms.extend(predictors.iter().map(|(t, _)| (*t).to_owned()));

        Ok(LinearModel {
            name: name.to_owned(),
            terms,
            coefficients: beta.to_vec(),
            std_errors,
            t_values,
            p_values,
            rss,
            tss,
            r_squared,
            adj_r_squared,
            n,
            df_residual,
        })
    }

    /// Coefficient of a term by name.
    pub fn coefficient(
        &self,
        term: &str,
    ) -> Option<f64> {
        self.terms
            .iter()
            .position(|t| t == term)
            .map(|i| self.coefficients[i])
    }

    pub fn n_params(&self) -> usize {
        self.terms.len()
    }
}

/// Result of an F-test between two nested models.
#[derive(Debug, Clone, Serialize)]
pub struct FTest {
    pub restricted: String,
    pub full: String,
    pub f_statistic: f64,
    pub p_value: f64,
    pub df_numerator: f64,
    pub df_denominator: f64,
}

/// Compares two nested models fit on the same observations.
///
/// `F = ((rss_r - rss_f) / (p_f - p_r)) / (rss_f / df_f)`, the
/// likelihood-ratio-equivalent test under Gaussian errors.
pub fn compare_models(
    restricted: &LinearModel,
    full: &LinearModel,
) -> anyhow::Result<FTest> {
    ensure!(
        restricted.n == full.n,
        "models were fit on different observation counts ({} vs {})",
        restricted.n,
        full.n
    );
    ensure!(
        full.n_params() > restricted.n_params(),
        "{} is not an extension of {}",
        full.name,
        restricted.name
    );

    let df1 = (full.n_params() - restricted.n_params()) as f64;
    let df2 = full.df_residual as f64;
    ensure!(df2 > 0.0, "full model has no residual degrees of freedom");

    let f = if full.rss > 0.0 {
        ((restricted.rss - full.rss) / df1) / (full.rss / df2)
    }
    else {
        f64::INFINITY
    };

    let p_value = if f.is_finite() {
        let dist = FisherSnedecor::new(df1, df2)?;
        (1.0 - dist.cdf(f.max(0.0))).clamp(0.0, 1.0)
    }
    else {
        0.0
    };

    Ok(FTest {
        restricted: restricted.name.clone(),
        full: full.name.clone(),
        f_statistic: f,
        p_value,
        df_numerator: df1,
        df_denominator: df2,
    })
}

/// Inverts a small symmetric positive-definite matrix by Gauss-Jordan
/// elimination with partial pivoting.
fn invert(matrix: &Array2<f64>) -> anyhow::Result<Array2<f64>> {
    let p = matrix.nrows();
    ensure!(matrix.ncols() == p, "matrix is not square");

    let mut a = matrix.clone();
    let mut inv = Array2::<f64>::eye(p);

    for col in 0..p {
        let pivot_row = (col..p)
            .max_by(|&i, &j| a[(i, col)].abs().total_cmp(&a[(j, col)].abs()))
            .unwrap_or(col);
        if a[(pivot_row, col)].abs() < 1e-12 {
            bail!(
                "normal equations are singular (column {}): constant or \
                 collinear predictor",
                col
            );
        }
        if pivot_row != col {
            for k in 0..p {
                a.swap((pivot_row, k), (col, k));
                inv.swap((pivot_row, k), (col, k));
            }
        }

        let pivot = a[(col, col)];
        for k in 0..p {
            a[(col, k)] /= pivot;
            inv[(col, k)] /= pivot;
        }
        for row in 0..p {
            if row == col {
                continue;
            }
            let factor = a[(row, col)];
            if factor == 0.0 {
                continue;
            }
            for k in 0..p {
                a[(row, k)] -= factor * a[(col, k)];
                inv[(row, k)] -= factor * inv[(col, k)];
            }
        }
    }
    Ok(inv)
}
