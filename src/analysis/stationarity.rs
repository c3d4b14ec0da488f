//! Augmented Dickey-Fuller unit-root test with a constant term.
//!
//! The regression is `dy[t] = a + g*y[t-1] + sum(b[i]*dy[t-i]) + e[t]` and the
//! statistic is the t-value of `g`. P-values use the MacKinnon (1994)
//! response surface, critical values the MacKinnon (2010) tables.

use super::returns::{log_returns, simple_returns};
use crate::data::PriceSeries;
use crate::types::LagSelection;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use statrs::function::erf::erfc;
use std::f64::consts::{PI, SQRT_2};
use thiserror::Error;
use tracing::debug;

// MacKinnon (1994) coefficients, constant-only regression, one series.
const TAU_MAX: f64 = 2.74;
const TAU_MIN: f64 = -18.83;
const TAU_STAR: f64 = -1.61;
const TAU_SMALL_P: [f64; 3] = [2.1659, 1.4412, 0.038269];
const TAU_LARGE_P: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

// MacKinnon (2010) critical value surfaces for 1%, 5% and 10%.
const TAU_CRIT: [[f64; 4]; 3] = [
    [-3.43035, -6.5393, -16.786, -79.433],
    [-2.86154, -2.8903, -4.234, -40.040],
    [-2.56677, -1.5384, -2.809, 0.0],
];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StationarityError {
    #[error("Insufficient data: {observations} observations is too short for the ADF regression")]
    InsufficientData { observations: usize },
    #[error("Maximum lag {max_lag} exceeds {limit} for {observations} observations")]
    InvalidLag {
        max_lag: usize,
        limit: usize,
        observations: usize,
    },
    #[error("Singular ADF regression (series has no variation)")]
    Singular,
}

pub type Result<T> = std::result::Result<T, StationarityError>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdfConfig {
    pub significance: f64,
    pub lag_selection: LagSelection,
    pub max_lag: Option<usize>,
}

impl Default for AdfConfig {
    fn default() -> Self {
        Self {
            significance: 0.05,
            lag_selection: LagSelection::Aic,
            max_lag: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CriticalValues {
    pub one_pct: f64,
    pub five_pct: f64,
    pub ten_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdfResult {
    pub test_statistic: f64,
    pub p_value: f64,
    pub used_lag: usize,
    /// Observations in the final regression.
    pub n_obs: usize,
    pub critical_values: CriticalValues,
    /// Best information criterion value, absent for a fixed lag.
    pub ic_best: Option<f64>,
    pub is_stationary: bool,
}

struct OlsFit {
    params: DVector<f64>,
    std_errors: DVector<f64>,
    llf: f64,
    nobs: usize,
}

impl OlsFit {
    fn aic(&self) -> f64 {
        -2.0 * self.llf + 2.0 * self.params.len() as f64
    }

    fn bic(&self) -> f64 {
        -2.0 * self.llf + (self.nobs as f64).ln() * self.params.len() as f64
    }
}

fn ols(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<OlsFit> {
    let nobs = x.nrows();
    let k = x.ncols();

    let xtx = x.transpose() * x;
    let xty = x.transpose() * y;
    let xtx_inv = xtx.try_inverse().ok_or(StationarityError::Singular)?;
    let params = &xtx_inv * xty;

    let residuals = y - x * &params;
    let ssr = residuals.norm_squared();
    let sigma2 = ssr / (nobs - k) as f64;
    let std_errors = DVector::from_iterator(k, (0..k).map(|j| (sigma2 * xtx_inv[(j, j)]).sqrt()));

    let half_n = nobs as f64 / 2.0;
    let llf = -half_n * (2.0 * PI).ln() - half_n * (ssr / nobs as f64).ln() - half_n;

    Ok(OlsFit {
        params,
        std_errors,
        llf,
        nobs,
    })
}

/// Design for `lags` lagged differences over the last `nobs` differences.
/// Columns: constant, level `y[t-1]`, `dy[t-1]` .. `dy[t-lags]`.
fn adf_design(x: &[f64], diffs: &[f64], nobs: usize, lags: usize) -> (DMatrix<f64>, DVector<f64>) {
    let offset = diffs.len() - nobs;
    let design = DMatrix::from_fn(nobs, lags + 2, |row, col| {
        let t = offset + row;
        match col {
            0 => 1.0,
            1 => x[t],
            lag => diffs[t - (lag - 1)],
        }
    });
    let target = DVector::from_iterator(nobs, diffs[offset..].iter().copied());
    (design, target)
}

/// Standard normal CDF.
fn norm_cdf(z: f64) -> f64 {
    0.5 * erfc(-z / SQRT_2)
}

/// Approximate p-value of an ADF statistic (constant, no trend).
pub fn mackinnon_p_value(test_statistic: f64) -> f64 {
    if test_statistic > TAU_MAX {
        return 1.0;
    }
    if test_statistic < TAU_MIN {
        return 0.0;
    }
    let coefs: &[f64] = if test_statistic <= TAU_STAR {
        &TAU_SMALL_P
    } else {
        &TAU_LARGE_P
    };
    let z = coefs
        .iter()
        .rev()
        .fold(0.0, |acc, &c| acc * test_statistic + c);
    norm_cdf(z)
}

pub fn mackinnon_critical_values(nobs: usize) -> CriticalValues {
    let n = nobs as f64;
    let surface = |c: &[f64; 4]| c[0] + c[1] / n + c[2] / n.powi(2) + c[3] / n.powi(3);
    CriticalValues {
        one_pct: surface(&TAU_CRIT[0]),
        five_pct: surface(&TAU_CRIT[1]),
        ten_pct: surface(&TAU_CRIT[2]),
    }
}

pub fn adf_test(x: &[f64], config: &AdfConfig) -> Result<AdfResult> {
    let observations = x.len();
    // Largest lag that leaves a usable regression: nobs / 2 - 2
    let limit = (observations / 2)
        .checked_sub(2)
        .ok_or(StationarityError::InsufficientData { observations })?;

    let max_lag = match config.max_lag {
        Some(max_lag) if max_lag > limit => {
            return Err(StationarityError::InvalidLag {
                max_lag,
                limit,
                observations,
            })
        }
        Some(max_lag) => max_lag,
        None => {
            let default = (12.0 * (observations as f64 / 100.0).powf(0.25)).ceil() as usize;
            default.min(limit)
        }
    };

    let diffs: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();

    let (used_lag, ic_best) = match config.lag_selection {
        LagSelection::Fixed => (max_lag, None),
        selection => {
            // Every candidate shares the sample of the largest lag so the
            // criteria are comparable.
            let nobs = diffs.len() - max_lag;
            let mut best: Option<(f64, usize)> = None;
            for lags in 0..=max_lag {
                let (design, target) = adf_design(x, &diffs, nobs, lags);
                let fit = ols(&design, &target)?;
                let ic = match selection {
                    LagSelection::Bic => fit.bic(),
                    _ => fit.aic(),
                };
                if best.map_or(true, |(best_ic, _)| ic < best_ic) {
                    best = Some((ic, lags));
                }
            }
            let (ic, lags) = best.ok_or(StationarityError::InsufficientData { observations })?;
            (lags, Some(ic))
        }
    };

    let nobs = diffs.len() - used_lag;
    let (design, target) = adf_design(x, &diffs, nobs, used_lag);
    let fit = ols(&design, &target)?;

    let test_statistic = fit.params[1] / fit.std_errors[1];
    if !test_statistic.is_finite() {
        return Err(StationarityError::Singular);
    }
    let p_value = mackinnon_p_value(test_statistic);

    debug!(test_statistic, p_value, used_lag, nobs, "ADF regression");

    Ok(AdfResult {
        test_statistic,
        p_value,
        used_lag,
        n_obs: fit.nobs,
        critical_values: mackinnon_critical_values(fit.nobs),
        ic_best,
        is_stationary: p_value < config.significance,
    })
}

/// Simple and log returns of one symbol with a stationarity test on each.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnsAnalysis {
    pub symbol: String,
    pub simple_returns: Vec<f64>,
    pub log_returns: Vec<f64>,
    pub simple_adf: AdfResult,
    pub log_adf: AdfResult,
}

pub fn analyze_returns(series: &PriceSeries, config: &AdfConfig) -> Result<ReturnsAnalysis> {
    let closes = series.closes();
    let simple = simple_returns(&closes);
    let log = log_returns(&closes);

    let simple_adf = adf_test(&simple, config)?;
    let log_adf = adf_test(&log, config)?;

    Ok(ReturnsAnalysis {
        symbol: series.symbol().to_string(),
        simple_returns: simple,
        log_returns: log,
        simple_adf,
        log_adf,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, StandardNormal};

    fn white_noise(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n).map(|_| StandardNormal.sample(&mut rng)).collect()
    }

    #[test]
    fn test_critical_values_for_100_observations() {
        let crit = mackinnon_critical_values(100);
        assert_relative_eq!(crit.one_pct, -3.4976, epsilon = 1e-3);
        assert_relative_eq!(crit.five_pct, -2.8912, epsilon = 1e-3);
        assert_relative_eq!(crit.ten_pct, -2.5825, epsilon = 1e-3);
    }

    #[test]
    fn test_p_value_bounds_and_monotonicity() {
        assert_eq!(mackinnon_p_value(-25.0), 0.0);
        assert_eq!(mackinnon_p_value(3.0), 1.0);

        // The asymptotic 5% critical value maps to roughly 5%
        assert_relative_eq!(mackinnon_p_value(-2.86154), 0.05, epsilon = 5e-3);

        let mut prev = 0.0;
        for i in 0..100 {
            let stat = -10.0 + i as f64 * 0.12;
            let p = mackinnon_p_value(stat);
            assert!(p >= prev);
            prev = p;
        }
    }

    #[test]
    fn test_white_noise_is_stationary() {
        let result = adf_test(&white_noise(500, 7), &AdfConfig::default()).unwrap();

        assert!(result.test_statistic < result.critical_values.one_pct);
        assert!(result.p_value < 0.01);
        assert!(result.is_stationary);
        assert!(result.ic_best.is_some());
        assert_eq!(result.n_obs, 499 - result.used_lag);
    }

    #[test]
    fn test_explosive_series_is_not_stationary() {
        let shocks = white_noise(150, 3);
        let mut x = Vec::with_capacity(shocks.len());
        let mut level = 1.0;
        for shock in shocks {
            level = 1.05 * level + shock;
            x.push(level);
        }

        let result = adf_test(&x, &AdfConfig::default()).unwrap();
        assert!(result.test_statistic > 0.0);
        assert!(result.p_value > 0.1);
        assert!(!result.is_stationary);
    }

    #[test]
    fn test_fixed_lag_uses_max_lag() {
        let config = AdfConfig {
            lag_selection: LagSelection::Fixed,
            max_lag: Some(3),
            ..AdfConfig::default()
        };
        let result = adf_test(&white_noise(120, 11), &config).unwrap();

        assert_eq!(result.used_lag, 3);
        assert_eq!(result.n_obs, 119 - 3);
        assert!(result.ic_best.is_none());
    }

    #[test]
    fn test_rejects_short_and_degenerate_series() {
        assert_eq!(
            adf_test(&[1.0, 2.0, 3.0], &AdfConfig::default()),
            Err(StationarityError::InsufficientData { observations: 3 })
        );

        let config = AdfConfig {
            max_lag: Some(40),
            ..AdfConfig::default()
        };
        assert!(matches!(
            adf_test(&white_noise(50, 1), &config),
            Err(StationarityError::InvalidLag { limit: 23, .. })
        ));

        assert_eq!(
            adf_test(&[5.0; 40], &AdfConfig::default()),
            Err(StationarityError::Singular)
        );
    }
}
