// src/services/regression.rs
use log::{debug, info};
use nalgebra::{DMatrix, DVector};
use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, StudentsT};

use crate::error::{AnalysisError, Result};
use crate::models::MergedRecord;

/// Singular values below this fraction of the largest count as zero.
const RANK_RTOL: f64 = 1e-10;

pub const INTERCEPT: &str = "const";
pub const AGE_COLUMN: &str = "Average Age";
pub const MARKET_COLUMN: &str = "Close_SP500";
pub const TARGET_COLUMN: &str = "Close_META";

/// Fitted OLS model with statsmodels-style diagnostics. Vectors are indexed
/// like `names`, intercept first.
#[derive(Debug, Clone, Serialize)]
pub struct RegressionResult {
    pub dep_name: String,
    pub names: Vec<String>,
    pub params: Vec<f64>,
    pub std_errors: Vec<f64>,
    pub t_values: Vec<f64>,
    pub p_values: Vec<f64>,
    /// 95% intervals.
    pub conf_int: Vec<(f64, f64)>,
    pub nobs: usize,
    pub df_model: usize,
    pub df_resid: usize,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub f_statistic: f64,
    pub f_p_value: f64,
    pub log_likelihood: f64,
    pub aic: f64,
    pub bic: f64,
    pub durbin_watson: f64,
    pub jarque_bera: f64,
    pub jb_p_value: f64,
    pub skew: f64,
    /// Pearson (non-excess) kurtosis of the residuals.
    pub kurtosis: f64,
    pub condition_number: f64,
    pub residuals: Vec<f64>,
}

impl RegressionResult {
    pub fn coefficient(&self, name: &str) -> Option<f64> {
        self.names.iter().position(|n| n == name).map(|i| self.params[i])
    }

    pub fn intercept(&self) -> f64 {
        self.params[0]
    }
}

/// Regress `close_meta` on `average_age` and `close_sp500` plus an intercept.
pub fn fit_merged(records: &[MergedRecord]) -> Result<RegressionResult> {
    if records.is_empty() {
        return Err(AnalysisError::EmptyJoin);
    }

    let y: Vec<f64> = records.iter().map(|r| r.close_meta).collect();
    let ages: Vec<f64> = records.iter().map(|r| r.average_age).collect();
    let market: Vec<f64> = records.iter().map(|r| r.close_sp500).collect();

    fit_ols(TARGET_COLUMN, &y, &[(AGE_COLUMN, ages.as_slice()), (MARKET_COLUMN, market.as_slice())])
}

/// Ordinary least squares of `y` on the given regressors and a constant,
/// solved through the SVD of the design matrix.
pub fn fit_ols(dep_name: &str, y: &[f64], regressors: &[(&str, &[f64])]) -> Result<RegressionResult> {
    let n = y.len();
    if n == 0 {
        return Err(AnalysisError::EmptyJoin);
    }
    for (name, column) in regressors {
        if column.len() != n {
            return Err(AnalysisError::DimensionMismatch {
                column: name.to_string(),
                expected: n,
                found: column.len(),
            });
        }
    }

    let p = regressors.len() + 1;
    let x = DMatrix::from_fn(n, p, |i, j| if j == 0 { 1.0 } else { regressors[j - 1].1[i] });
    let yv = DVector::from_column_slice(y);

    let svd = x.clone().svd(true, true);
    let singular = &svd.singular_values;
    let s_max = singular.iter().cloned().fold(0.0_f64, f64::max);
    let s_min = singular.iter().cloned().fold(f64::INFINITY, f64::min);
    let tol = s_max * RANK_RTOL;
    let rank = singular.iter().filter(|s| **s > tol).count();
    debug!("Design matrix {}x{}: rank {}, singular values {:?}", n, p, rank, singular.as_slice());

    if rank < p {
        return Err(AnalysisError::SingularMatrix { rank, columns: p });
    }
    if n <= p {
        return Err(AnalysisError::InsufficientDegreesOfFreedom {
            observations: n,
            parameters: p,
        });
    }

    let beta = svd
        .solve(&yv, tol)
        .map_err(|_| AnalysisError::SingularMatrix { rank, columns: p })?;
    let v_t = svd
        .v_t
        .as_ref()
        .ok_or(AnalysisError::SingularMatrix { rank, columns: p })?;
    // (X'X)^-1 = V diag(1/s^2) V'
    let inv_sq = DVector::from_iterator(singular.len(), singular.iter().map(|s| 1.0 / (s * s)));
    let xtx_inv = v_t.transpose() * DMatrix::from_diagonal(&inv_sq) * v_t;

    let fitted = &x * &beta;
    let resid = &yv - &fitted;
    let residuals: Vec<f64> = resid.iter().cloned().collect();

    let nf = n as f64;
    let df_resid = n - p;
    let df_model = p - 1;
    let y_mean = y.iter().sum::<f64>() / nf;
    let ssr = resid.norm_squared();
    let tss: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();
    let ess = tss - ssr;
    let sigma2 = ssr / df_resid as f64;

    let r_squared = 1.0 - ssr / tss;
    let adj_r_squared = 1.0 - (nf - 1.0) / df_resid as f64 * (1.0 - r_squared);

    let t_dist = StudentsT::new(0.0, 1.0, df_resid as f64).ok();
    let t_crit = t_dist.as_ref().map_or(f64::NAN, |d| d.inverse_cdf(0.975));

    let params: Vec<f64> = beta.iter().cloned().collect();
    let std_errors: Vec<f64> = (0..p).map(|j| (sigma2 * xtx_inv[(j, j)]).sqrt()).collect();
    let t_values: Vec<f64> = params.iter().zip(&std_errors).map(|(b, se)| b / se).collect();
    let p_values: Vec<f64> = t_values
        .iter()
        .map(|t| {
            t_dist
                .as_ref()
                .map_or(f64::NAN, |d| (2.0 * (1.0 - d.cdf(t.abs()))).clamp(0.0, 1.0))
        })
        .collect();
    let conf_int: Vec<(f64, f64)> = params
        .iter()
        .zip(&std_errors)
        .map(|(b, se)| (b - t_crit * se, b + t_crit * se))
        .collect();

    let (f_statistic, f_p_value) = if df_model > 0 {
        let f = (ess / df_model as f64) / sigma2;
        let p_f = FisherSnedecor::new(df_model as f64, df_resid as f64)
            .map_or(f64::NAN, |d| (1.0 - d.cdf(f)).clamp(0.0, 1.0));
        (f, p_f)
    } else {
        (f64::NAN, f64::NAN)
    };

    let log_likelihood = -nf / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (ssr / nf).ln() + 1.0);
    let aic = -2.0 * log_likelihood + 2.0 * p as f64;
    let bic = -2.0 * log_likelihood + p as f64 * nf.ln();

    let durbin_watson = residuals.windows(2).map(|w| (w[1] - w[0]).powi(2)).sum::<f64>() / ssr;

    let (skew, kurtosis) = residual_moments(&residuals);
    let jarque_bera = nf / 6.0 * (skew.powi(2) + (kurtosis - 3.0).powi(2) / 4.0);
    let jb_p_value = ChiSquared::new(2.0).map_or(f64::NAN, |d| 1.0 - d.cdf(jarque_bera));

    let result = RegressionResult {
        dep_name: dep_name.to_string(),
        names: std::iter::once(INTERCEPT)
            .chain(regressors.iter().map(|(name, _)| *name))
            .map(str::to_string)
            .collect(),
        params,
        std_errors,
        t_values,
        p_values,
        conf_int,
        nobs: n,
        df_model,
        df_resid,
        r_squared,
        adj_r_squared,
        f_statistic,
        f_p_value,
        log_likelihood,
        aic,
        bic,
        durbin_watson,
        jarque_bera,
        jb_p_value,
        skew,
        kurtosis,
        condition_number: s_max / s_min,
        residuals,
    };

    info!(
        "Fitted OLS for {} on {} observations: R-squared {:.4}",
        result.dep_name, result.nobs, result.r_squared
    );
    Ok(result)
}

fn residual_moments(residuals: &[f64]) -> (f64, f64) {
    let n = residuals.len() as f64;
    let mean = residuals.iter().sum::<f64>() / n;
    let central = |k: i32| residuals.iter().map(|e| (e - mean).powi(k)).sum::<f64>() / n;
    let m2 = central(2);
    (central(3) / m2.powf(1.5), central(4) / m2.powi(2))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic(n: usize) -> Vec<MergedRecord> {
        (0..n)
            .map(|i| {
                let t = i as f64;
                let average_age = 12.0 - 0.7 * t + 0.05 * t * t;
                let close_sp500 = 1100.0 + 150.0 * t + 40.0 * (t * 1.3).sin();
                let noise = 1e-6 * ((i * 7 % 5) as f64 - 2.0);
                MergedRecord {
                    year: 2010 + i as i32,
                    average_age,
                    close_meta: 3.0 + 2.0 * average_age + 0.5 * close_sp500 + noise,
                    close_sp500,
                }
            })
            .collect()
    }

    #[test]
    fn recovers_known_coefficients() {
        let fit = fit_merged(&synthetic(12)).unwrap();
        assert_eq!(fit.names, vec!["const", "Average Age", "Close_SP500"]);
        assert!((fit.intercept() - 3.0).abs() < 1e-3, "intercept {}", fit.intercept());
        assert!((fit.coefficient(AGE_COLUMN).unwrap() - 2.0).abs() < 1e-4);
        assert!((fit.coefficient(MARKET_COLUMN).unwrap() - 0.5).abs() < 1e-6);
        assert!(fit.r_squared > 0.999_999);
        assert_eq!(fit.nobs, 12);
        assert_eq!(fit.df_model, 2);
        assert_eq!(fit.df_resid, 9);
        assert_eq!(fit.residuals.len(), 12);
    }

    #[test]
    fn diagnostics_are_consistent() {
        let fit = fit_merged(&synthetic(12)).unwrap();
        for (j, (lo, hi)) in fit.conf_int.iter().enumerate() {
            assert!(lo < &fit.params[j] && &fit.params[j] < hi);
        }
        for p in &fit.p_values {
            assert!((0.0..=1.0).contains(p));
        }
        assert!(fit.f_statistic > 0.0);
        assert!(fit.f_p_value < 1e-6);
        assert!(fit.adj_r_squared <= fit.r_squared);
        assert!((fit.aic - (-2.0 * fit.log_likelihood + 6.0)).abs() < 1e-9);
        assert!(fit.condition_number >= 1.0);
        assert!((0.0..=4.0).contains(&fit.durbin_watson));
    }

    #[test]
    fn simple_regression_matches_closed_form() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 4.1, 5.9, 8.2, 9.8];
        let fit = fit_ols("y", &y, &[("x", &x[..])]).unwrap();
        // slope = Sxy / Sxx = 19.7 / 10, intercept = 6 - 1.97 * 3
        assert!((fit.params[1] - 1.97).abs() < 1e-10);
        assert!((fit.params[0] - 0.09).abs() < 1e-10);
        assert_eq!(fit.df_resid, 3);
    }

    #[test]
    fn empty_input_is_an_empty_join() {
        assert!(matches!(fit_merged(&[]), Err(AnalysisError::EmptyJoin)));
    }

    #[test]
    fn fewer_records_than_parameters_is_singular() {
        let err = fit_merged(&synthetic(2)).unwrap_err();
        assert!(matches!(err, AnalysisError::SingularMatrix { columns: 3, .. }));
    }

    #[test]
    fn exactly_determined_has_no_degrees_of_freedom() {
        let err = fit_merged(&synthetic(3)).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::InsufficientDegreesOfFreedom {
                observations: 3,
                parameters: 3
            }
        ));
    }

    #[test]
    fn collinear_predictors_are_reported() {
        let records: Vec<MergedRecord> = synthetic(8)
            .into_iter()
            .map(|r| MergedRecord {
                close_sp500: 100.0 * r.average_age,
                ..r
            })
            .collect();
        let err = fit_merged(&records).unwrap_err();
        assert!(matches!(err, AnalysisError::SingularMatrix { rank: 2, columns: 3 }));
    }

    #[test]
    fn mismatched_regressor_lengths_are_rejected() {
        let err = fit_ols("y", &[1.0, 2.0, 3.0], &[("x", &[1.0, 2.0][..])]).unwrap_err();
        assert!(matches!(err, AnalysisError::DimensionMismatch { expected: 3, found: 2, .. }));
    }
}
