use super::returns::{log_returns, ReturnsError};
use crate::data::PriceSeries;
use serde::Serialize;
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatisticsError {
    #[error("Cannot describe an empty sample")]
    EmptyInput,
    #[error(transparent)]
    Returns(#[from] ReturnsError),
}

pub type Result<T> = std::result::Result<T, StatisticsError>;

/// Moments of a return sample.
///
/// `std` is the sample standard deviation. `skew` and `kurtosis` are the
/// bias-corrected sample skewness and excess kurtosis; they are NaN when the
/// sample is too small (fewer than 3 and 4 values respectively) or has no
/// dispersion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DescriptiveStats {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub skew: f64,
    pub kurtosis: f64,
}

pub fn describe(sample: &[f64]) -> Result<DescriptiveStats> {
    if sample.is_empty() {
        return Err(StatisticsError::EmptyInput);
    }

    let n = sample.len() as f64;
    let mean = sample.mean();
    let std = sample.std_dev();

    let central_moment = |k: i32| sample.iter().map(|x| (x - mean).powi(k)).sum::<f64>();
    let m2 = central_moment(2);
    let m3 = central_moment(3);
    let m4 = central_moment(4);

    let skew = if sample.len() < 3 || m2 == 0.0 {
        f64::NAN
    } else {
        let g1 = (m3 / n) / (m2 / n).powf(1.5);
        (n * (n - 1.0)).sqrt() / (n - 2.0) * g1
    };

    let kurtosis = if sample.len() < 4 || m2 == 0.0 {
        f64::NAN
    } else {
        let numer = (n + 1.0) * n * (n - 1.0) * m4;
        let denom = (n - 2.0) * (n - 3.0) * m2 * m2;
        let adj = 3.0 * (n - 1.0).powi(2) / ((n - 2.0) * (n - 3.0));
        numer / denom - adj
    };

    Ok(DescriptiveStats {
        count: sample.len(),
        mean,
        std,
        skew,
        kurtosis,
    })
}

/// Log-return statistics for one series.
pub fn describe_log_returns(series: &PriceSeries) -> Result<DescriptiveStats> {
    if series.len() < 2 {
        return Err(ReturnsError::InsufficientData {
            observations: series.len(),
        }
        .into());
    }
    describe(&log_returns(&series.closes()))
}

/// Log-return statistics per symbol. A failing symbol keeps its error and
/// does not affect the others.
pub fn describe_all(
    data: &BTreeMap<String, PriceSeries>,
) -> BTreeMap<String, Result<DescriptiveStats>> {
    data.iter()
        .map(|(symbol, series)| (symbol.clone(), describe_log_returns(series)))
        .collect()
}
