use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;
use returns_toolkit::analysis::returns::ReturnModel;
use returns_toolkit::analysis::simulation::{MonteCarloSimulator, SimulationError};
use returns_toolkit::data::loader::DataLoader;
use returns_toolkit::data::{DataError, PriceSeries};

const SAMPLE: &str = "tests/data/sample_prices.csv";

#[test]
fn test_load_sample_prices() {
    let data = DataLoader::load_price_series(SAMPLE).expect("Failed to load test data");

    assert_eq!(data.len(), 3);
    assert_eq!(data["FPT"].len(), 5);
    assert_eq!(data["NEW"].len(), 1);

    let closes: Vec<f64> = data["FPT"].iter().map(|p| p.close).collect();
    assert_eq!(closes, vec![100.0, 105.0, 103.0, 108.0, 110.0]);

    let tickers = DataLoader::get_tickers(SAMPLE).unwrap();
    assert_eq!(tickers, vec!["FPT", "NEW", "VNM"]);
}

#[test]
fn test_missing_column_is_reported() {
    let result = DataLoader::load_price_series("tests/data/missing_ticker.csv");
    assert!(matches!(result, Err(DataError::MissingColumn(c)) if c == "ticker"));
}

#[test]
fn test_compare_sample_prices() {
    let data = DataLoader::load_price_series(SAMPLE).unwrap();
    let simulator = MonteCarloSimulator::new(10, 5000).unwrap();

    let report = simulator.compare(&data, &mut StdRng::seed_from_u64(2024));

    // NEW has a single observation
    assert_eq!(report.results.len(), data.len() - 1);
    assert!(matches!(
        report.failures["NEW"],
        SimulationError::InsufficientData { observations: 1, .. }
    ));

    let fpt = report.get("FPT").expect("FPT simulated");
    assert_eq!(fpt.current_price, 110.0);
    assert!(fpt.expected_return.is_finite());
    assert!(fpt.risk_std_dev.is_finite());
    assert!(fpt.var_5pct.is_finite());

    // FPT trends up, VNM trends down
    assert_eq!(report.results[0].symbol, "FPT");
    assert_eq!(report.results[1].symbol, "VNM");
    assert!(report.results[1].expected_return < 0.0);
}

#[test]
fn test_expected_return_converges_with_more_simulations() {
    let data = DataLoader::load_price_series(SAMPLE).unwrap();
    let series = PriceSeries::new("FPT", data["FPT"].clone()).unwrap();
    let model = ReturnModel::estimate(&series).unwrap();
    let days = 10;

    // Mean of exp(N(mu * days, sigma^2 * days)) - 1
    let analytic =
        ((model.mu * days as f64 + 0.5 * model.sigma.powi(2) * days as f64).exp() - 1.0) * 100.0;

    let mut errors = Vec::new();
    for simulations in [100, 10_000, 200_000] {
        let simulator = MonteCarloSimulator::new(days, simulations).unwrap();
        let result = simulator
            .simulate(&series, &mut StdRng::seed_from_u64(11))
            .unwrap();

        let standard_error = result.risk_std_dev / (simulations as f64).sqrt();
        assert!((result.expected_return - analytic).abs() < 5.0 * standard_error);
        errors.push(5.0 * standard_error);
    }
    // The tolerance shrinks as the ensemble grows
    assert!(errors.windows(2).all(|w| w[1] < w[0]));

    // and for small sigma the drift term dominates: mu * days in percent
    assert_relative_eq!(analytic, model.mu * days as f64 * 100.0, max_relative = 0.2);
}

#[test]
fn test_unparseable_date_is_a_csv_error() {
    let result = DataLoader::load_price_series("tests/data/bad_date.csv");
    assert!(matches!(result, Err(DataError::Csv(_))));
}
