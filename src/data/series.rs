use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub time: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(time: NaiveDate, close: f64) -> Self {
        Self { time, close }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("close {close} at {time} is not a positive finite price")]
    NonFiniteClose { time: NaiveDate, close: f64 },
    #[error("duplicate observation at {0}")]
    DuplicateTimestamp(NaiveDate),
}

/// Closing prices for one symbol, strictly increasing in time.
///
/// Every close is finite and positive. Length is not checked: a one-point
/// series is valid here and rejected by the estimators that need returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    symbol: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(
        symbol: impl Into<String>,
        mut points: Vec<PricePoint>,
    ) -> Result<Self, SeriesError> {
        points.sort_by(|a, b| a.time.cmp(&b.time));

        if let Some(bad) = points
            .iter()
            .find(|p| !p.close.is_finite() || p.close <= 0.0)
        {
            return Err(SeriesError::NonFiniteClose {
                time: bad.time,
                close: bad.close,
            });
        }

        if let Some(pair) = points.windows(2).find(|w| w[0].time == w[1].time) {
            return Err(SeriesError::DuplicateTimestamp(pair[1].time));
        }

        Ok(Self {
            symbol: symbol.into(),
            points,
        })
    }

    /// Builds a series from closes on consecutive calendar days starting at `start`.
    pub fn from_closes(
        symbol: impl Into<String>,
        start: NaiveDate,
        closes: &[f64],
    ) -> Result<Self, SeriesError> {
        let points = start
            .iter_days()
            .zip(closes.iter())
            .map(|(time, &close)| PricePoint { time, close })
            .collect();
        Self::new(symbol, points)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Last observed close.
    pub fn last_close(&self) -> Option<f64> {
        self.points.last().map(|p| p.close)
    }
}
