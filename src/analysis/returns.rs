use crate::data::PriceSeries;
use serde::Serialize;
use statrs::statistics::Statistics;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReturnsError {
    #[error("Insufficient data: {observations} price point(s), at least 2 required")]
    InsufficientData { observations: usize },
}

pub type Result<T> = std::result::Result<T, ReturnsError>;

/// Period-over-period simple returns, `p[t] / p[t-1] - 1`. The first
/// observation has no return and is dropped.
pub fn simple_returns(prices: &[f64]) -> Vec<f64> {
    prices.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}

/// Continuously compounded returns, `ln(p[t] / p[t-1])`.
pub fn log_returns(prices: &[f64]) -> Vec<f64> {
    prices.windows(2).map(|w| (w[1] / w[0]).ln()).collect()
}

/// Drift and volatility of daily log-returns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReturnModel {
    pub mu: f64,
    pub sigma: f64,
    /// Number of log-returns the estimate is based on.
    pub observations: usize,
}

impl ReturnModel {
    pub fn estimate(series: &PriceSeries) -> Result<Self> {
        if series.len() < 2 {
            return Err(ReturnsError::InsufficientData {
                observations: series.len(),
            });
        }
        let model = Self::from_log_returns(&log_returns(&series.closes()));
        if model.observations == 1 {
            warn!(
                symbol = series.symbol(),
                "single log-return: volatility cannot be estimated, sigma set to 0"
            );
        }
        Ok(model)
    }

    /// `returns` must be non-empty. A single return has no observable
    /// dispersion, so `sigma` is 0 rather than the undefined sample std.
    fn from_log_returns(returns: &[f64]) -> Self {
        let mu = returns.mean();
        let sigma = if returns.len() > 1 {
            returns.std_dev()
        } else {
            0.0
        };
        Self {
            mu,
            sigma,
            observations: returns.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn series(closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        PriceSeries::from_closes("X", start, closes).unwrap()
    }

    #[test]
    fn test_simple_and_log_returns() {
        let prices = [100.0, 110.0, 99.0];

        let simple = simple_returns(&prices);
        assert_eq!(simple.len(), 2);
        assert_relative_eq!(simple[0], 0.1, epsilon = 1e-12);
        assert_relative_eq!(simple[1], -0.1, epsilon = 1e-12);

        let log = log_returns(&prices);
        assert_relative_eq!(log[0], 1.1_f64.ln(), epsilon = 1e-12);
        assert_relative_eq!(log[1], 0.9_f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_returns_of_short_input_are_empty() {
        assert!(simple_returns(&[]).is_empty());
        assert!(log_returns(&[42.0]).is_empty());
    }

    #[test]
    fn test_estimate_model() {
        let model = ReturnModel::estimate(&series(&[100.0, 105.0, 103.0, 108.0, 110.0])).unwrap();

        assert_eq!(model.observations, 4);
        // Log-returns telescope: their sum is ln(110 / 100)
        assert_relative_eq!(model.mu, 1.1_f64.ln() / 4.0, epsilon = 1e-12);

        let r = log_returns(&[100.0, 105.0, 103.0, 108.0, 110.0]);
        let var = r.iter().map(|x| (x - model.mu).powi(2)).sum::<f64>() / 3.0;
        assert_relative_eq!(model.sigma, var.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_constant_series_has_zero_drift_and_volatility() {
        let model = ReturnModel::estimate(&series(&[50.0; 6])).unwrap();
        assert_eq!(model.mu, 0.0);
        assert_eq!(model.sigma, 0.0);
    }

    #[test]
    fn test_single_return_has_zero_sigma() {
        let model = ReturnModel::estimate(&series(&[100.0, 102.0])).unwrap();
        assert_eq!(model.observations, 1);
        assert_relative_eq!(model.mu, 1.02_f64.ln(), epsilon = 1e-12);
        assert_eq!(model.sigma, 0.0);
    }

    #[test]
    fn test_insufficient_data() {
        assert_eq!(
            ReturnModel::estimate(&series(&[100.0])),
            Err(ReturnsError::InsufficientData { observations: 1 })
        );
    }
}
