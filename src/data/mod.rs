pub mod loader;
pub mod series;

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

pub use series::{PricePoint, PriceSeries, SeriesError};

#[derive(Debug, Deserialize)]
pub struct MarketData {
    #[serde(alias = "time")]
    pub date: NaiveDate,
    pub ticker: String,
    pub close: f64,
}

impl From<&MarketData> for PricePoint {
    fn from(record: &MarketData) -> Self {
        PricePoint {
            time: record.date,
            close: record.close,
        }
    }
}

#[derive(Debug, Error)]
pub enum DataError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("No price rows found")]
    MissingData,
    #[error("Missing required column: {0}")]
    MissingColumn(String),
}

pub type Result<T> = std::result::Result<T, DataError>;
