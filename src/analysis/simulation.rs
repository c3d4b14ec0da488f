use super::returns::{ReturnModel, ReturnsError};
use crate::data::{PricePoint, PriceSeries, SeriesError};
use chrono::NaiveDate;
use ndarray::{Array1, Array2, Axis};
use ndarray_stats::errors::QuantileError;
use ndarray_stats::interpolate::Linear;
use ndarray_stats::Quantile1dExt;
use noisy_float::types::n64;
use rand::Rng;
use rand_distr::{Distribution, Normal, NormalError};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Percentile of final-day returns reported as value-at-risk.
const VAR_PERCENTILE: f64 = 0.05;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Insufficient data for {symbol}: {observations} price point(s), at least 2 required")]
    InsufficientData { symbol: String, observations: usize },
    #[error("Non-finite input for {symbol}: close {close} at {time}")]
    NonFiniteInput {
        symbol: String,
        time: NaiveDate,
        close: f64,
    },
    #[error("Duplicate timestamp for {symbol} at {time}")]
    DuplicateTimestamp { symbol: String, time: NaiveDate },
    #[error("Simulated returns for {symbol} overflowed; horizon too long for the fitted drift")]
    NonFiniteResult { symbol: String },
    #[error("Return distribution error: {0}")]
    Distribution(#[from] NormalError),
    #[error("Quantile error: {0}")]
    Quantile(#[from] QuantileError),
}

impl SimulationError {
    fn from_series(symbol: &str, err: SeriesError) -> Self {
        match err {
            SeriesError::NonFiniteClose { time, close } => SimulationError::NonFiniteInput {
                symbol: symbol.to_string(),
                time,
                close,
            },
            SeriesError::DuplicateTimestamp(time) => SimulationError::DuplicateTimestamp {
                symbol: symbol.to_string(),
                time,
            },
        }
    }

    fn from_returns(symbol: &str, err: ReturnsError) -> Self {
        match err {
            ReturnsError::InsufficientData { observations } => SimulationError::InsufficientData {
                symbol: symbol.to_string(),
                observations,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, SimulationError>;

/// Monte Carlo summary for one symbol. Returns are percentages of the
/// current price at the end of the horizon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub symbol: String,
    pub expected_return: f64,
    pub risk_std_dev: f64,
    pub var_5pct: f64,
    pub current_price: f64,
}

/// Outcome of a multi-symbol run: successful records ordered by expected
/// return (highest first) and the symbols that could not be simulated.
#[derive(Debug, Default)]
pub struct SimulationReport {
    pub results: Vec<SimulationResult>,
    pub failures: BTreeMap<String, SimulationError>,
}

impl SimulationReport {
    fn from_outcomes(outcomes: Vec<(String, Result<SimulationResult>)>) -> Self {
        let mut report = SimulationReport::default();
        for (symbol, outcome) in outcomes {
            match outcome {
                Ok(result) => report.results.push(result),
                Err(err) => {
                    warn!(%symbol, error = %err, "symbol skipped");
                    report.failures.insert(symbol, err);
                }
            }
        }
        report
            .results
            .sort_by(|a, b| b.expected_return.total_cmp(&a.expected_return));

        info!(
            simulated = report.results.len(),
            failed = report.failures.len(),
            "monte carlo comparison complete"
        );
        report
    }

    pub fn get(&self, symbol: &str) -> Option<&SimulationResult> {
        self.results.iter().find(|r| r.symbol == symbol)
    }
}

/// Geometric Brownian motion simulator driven by i.i.d. normal daily
/// log-returns estimated from history.
#[derive(Debug, Clone, Copy)]
pub struct MonteCarloSimulator {
    days: usize,
    simulations: usize,
}

impl MonteCarloSimulator {
    pub fn new(days: usize, simulations: usize) -> Result<Self> {
        if days == 0 {
            return Err(SimulationError::InvalidParameter(
                "days must be positive".to_string(),
            ));
        }
        if simulations == 0 {
            return Err(SimulationError::InvalidParameter(
                "simulations must be positive".to_string(),
            ));
        }
        Ok(Self { days, simulations })
    }

    pub fn days(&self) -> usize {
        self.days
    }

    pub fn simulations(&self) -> usize {
        self.simulations
    }

    /// Simulated prices, one row per path and one column per day.
    ///
    /// Draws are taken row by row, so a given seed always yields the same
    /// matrix for the same shape.
    pub fn simulate_paths<R: Rng + ?Sized>(
        &self,
        model: &ReturnModel,
        start_price: f64,
        rng: &mut R,
    ) -> Result<Array2<f64>> {
        let normal = Normal::new(model.mu, model.sigma)?;

        let mut paths =
            Array2::from_shape_fn((self.simulations, self.days), |_| normal.sample(&mut *rng));
        paths.accumulate_axis_inplace(Axis(1), |&prev, curr| *curr += prev);
        paths.mapv_inplace(|cum| start_price * cum.exp());

        Ok(paths)
    }

    /// Summarises an ensemble of simulated price paths relative to `start_price`.
    pub fn summarize(
        symbol: &str,
        paths: &Array2<f64>,
        start_price: f64,
    ) -> Result<SimulationResult> {
        if paths.is_empty() {
            return Err(QuantileError::EmptyInput.into());
        }
        let final_prices = paths.column(paths.ncols() - 1);
        let future_returns: Array1<f64> =
            final_prices.mapv(|last| (last - start_price) / start_price * 100.0);
        if !future_returns.iter().all(|r| r.is_finite()) {
            return Err(SimulationError::NonFiniteResult {
                symbol: symbol.to_string(),
            });
        }

        let expected_return = future_returns.mean().ok_or(QuantileError::EmptyInput)?;
        let risk_std_dev = future_returns.std(0.0);
        let var_5pct = future_returns
            .mapv(n64)
            .quantile_mut(n64(VAR_PERCENTILE), &Linear)?
            .raw();

        Ok(SimulationResult {
            symbol: symbol.to_string(),
            expected_return,
            risk_std_dev,
            var_5pct,
            current_price: start_price,
        })
    }

    pub fn simulate<R: Rng + ?Sized>(
        &self,
        series: &PriceSeries,
        rng: &mut R,
    ) -> Result<SimulationResult> {
        let symbol = series.symbol();
        let model = ReturnModel::estimate(series)
            .map_err(|err| SimulationError::from_returns(symbol, err))?;
        let start_price = series
            .last_close()
            .ok_or_else(|| SimulationError::InsufficientData {
                symbol: symbol.to_string(),
                observations: 0,
            })?;

        debug!(
            %symbol,
            mu = model.mu,
            sigma = model.sigma,
            observations = model.observations,
            start_price,
            "estimated return model"
        );

        let paths = self.simulate_paths(&model, start_price, rng)?;
        Self::summarize(symbol, &paths, start_price)
    }

    fn simulate_points<R: Rng + ?Sized>(
        &self,
        symbol: &str,
        points: &[PricePoint],
        rng: &mut R,
    ) -> Result<SimulationResult> {
        let series = PriceSeries::new(symbol, points.to_vec())
            .map_err(|err| SimulationError::from_series(symbol, err))?;
        self.simulate(&series, rng)
    }

    /// Simulates every symbol, consuming `rng` in ascending symbol order.
    pub fn compare<R: Rng + ?Sized>(
        &self,
        data: &BTreeMap<String, Vec<PricePoint>>,
        rng: &mut R,
    ) -> SimulationReport {
        let outcomes = data
            .iter()
            .map(|(symbol, points)| {
                (
                    symbol.clone(),
                    self.simulate_points(symbol, points, &mut *rng),
                )
            })
            .collect();
        SimulationReport::from_outcomes(outcomes)
    }

    /// Parallel variant of [`compare`](Self::compare). Each symbol draws from
    /// its own generator seeded with `seed` plus the symbol's position, so the
    /// report does not depend on thread scheduling.
    #[cfg(feature = "parallel")]
    pub fn compare_parallel(
        &self,
        data: &BTreeMap<String, Vec<PricePoint>>,
        seed: u64,
    ) -> SimulationReport {
        use rand::rngs::StdRng;
        use rand::SeedableRng;
        use rayon::prelude::*;

        let entries: Vec<_> = data.iter().collect();
        let outcomes = entries
            .par_iter()
            .enumerate()
            .map(|(i, (symbol, points))| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
                (
                    symbol.to_string(),
                    self.simulate_points(symbol, points, &mut rng),
                )
            })
            .collect();
        SimulationReport::from_outcomes(outcomes)
    }
}
