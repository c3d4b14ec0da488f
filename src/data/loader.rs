use super::{DataError, MarketData, PricePoint, Result};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

pub struct DataLoader;

impl DataLoader {
    fn verify_required_columns(headers: &[String]) -> Result<()> {
        let headers_set: HashSet<_> = headers.iter().map(|s| s.to_lowercase()).collect();

        if !headers_set.contains("date") && !headers_set.contains("time") {
            return Err(DataError::MissingColumn("date".to_string()));
        }
        for column in ["ticker", "close"] {
            if !headers_set.contains(column) {
                return Err(DataError::MissingColumn(column.to_string()));
            }
        }
        Ok(())
    }

    fn reader<P: AsRef<Path>>(path: P) -> Result<csv::Reader<std::fs::File>> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&path)?;

        // Lower-case headers so `Close` and `close` both deserialize
        let headers: Vec<String> = rdr.headers()?.iter().map(|s| s.to_lowercase()).collect();
        Self::verify_required_columns(&headers)?;
        rdr.set_headers(csv::StringRecord::from(headers));

        Ok(rdr)
    }

    /// Percentage of all observed dates on which each ticker has a price.
    pub fn analyze_date_coverage(
        data_by_ticker: &BTreeMap<String, Vec<PricePoint>>,
    ) -> (Vec<NaiveDate>, BTreeMap<String, f64>) {
        let mut all_dates: Vec<_> = data_by_ticker
            .values()
            .flat_map(|points| points.iter().map(|p| p.time))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        all_dates.sort();

        let coverage = data_by_ticker
            .iter()
            .map(|(ticker, points)| {
                let ticker_dates: HashSet<_> = points.iter().map(|p| p.time).collect();
                let coverage_pct = ticker_dates.len() as f64 / all_dates.len() as f64 * 100.0;
                (ticker.clone(), coverage_pct)
            })
            .collect();

        (all_dates, coverage)
    }

    /// Reads a long-format price file (`date`, `ticker`, `close`, extra columns ignored)
    /// and groups closes by ticker, each sorted by date.
    pub fn load_price_series<P: AsRef<Path>>(
        path: P,
    ) -> Result<BTreeMap<String, Vec<PricePoint>>> {
        let mut rdr = Self::reader(&path)?;

        let mut data_by_ticker: BTreeMap<String, Vec<PricePoint>> = BTreeMap::new();
        for result in rdr.deserialize() {
            let record: MarketData = result?;
            data_by_ticker
                .entry(record.ticker.clone())
                .or_default()
                .push(PricePoint::from(&record));
        }

        if data_by_ticker.is_empty() {
            return Err(DataError::MissingData);
        }

        for points in data_by_ticker.values_mut() {
            points.sort_by(|a, b| a.time.cmp(&b.time));
        }

        let (all_dates, coverage) = Self::analyze_date_coverage(&data_by_ticker);
        info!(
            path = %path.as_ref().display(),
            tickers = data_by_ticker.len(),
            dates = all_dates.len(),
            "loaded price data"
        );
        for (ticker, coverage_pct) in &coverage {
            debug!(%ticker, coverage_pct, "date coverage");
        }

        Ok(data_by_ticker)
    }

    pub fn get_tickers<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
        let mut rdr = Self::reader(&path)?;

        let mut tickers = HashSet::new();
        for result in rdr.deserialize() {
            let record: MarketData = result?;
            tickers.insert(record.ticker);
        }

        let mut tickers: Vec<_> = tickers.into_iter().collect();
        tickers.sort();
        Ok(tickers)
    }
}
