use anyhow::Context;
use rand::rngs::StdRng;
use rand::SeedableRng;
use returns_toolkit::analysis::simulation::SimulationReport;
use returns_toolkit::analysis::stationarity::{analyze_returns, AdfResult};
use returns_toolkit::analysis::statistics::describe_all;
use returns_toolkit::config::Config;
use returns_toolkit::data::loader::DataLoader;
use returns_toolkit::data::{PricePoint, PriceSeries};
use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "returns_toolkit=info".into()),
        )
        .init();

    let config = Config::load("config/simulation.yaml").context("loading config")?;
    info!(
        days = config.simulation.days,
        simulations = config.simulation.simulations,
        "loaded configuration"
    );

    // Data file from the command line, else the configured path
    let data_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| config.data_path.clone());

    println!("Loading data from: {}", data_path.display());
    let raw = DataLoader::load_price_series(&data_path)
        .with_context(|| format!("loading {}", data_path.display()))?;

    let mut series = BTreeMap::new();
    for (ticker, points) in &raw {
        match PriceSeries::new(ticker.as_str(), points.clone()) {
            Ok(s) => {
                series.insert(ticker.clone(), s);
            }
            Err(err) => warn!(%ticker, error = %err, "invalid price series"),
        }
    }
    println!("\n{} tickers loaded", raw.len());

    println!("\n=== Log Return Statistics ===");
    println!(
        "\n{:<10} {:>8} {:>12} {:>12} {:>10} {:>10}",
        "Symbol", "N", "Mean", "Std Dev", "Skew", "Kurtosis"
    );
    println!("{:-<67}", "");
    for (symbol, stats) in describe_all(&series) {
        match stats {
            Ok(s) => println!(
                "{:<10} {:>8} {:>12.6} {:>12.6} {:>10.4} {:>10.4}",
                symbol, s.count, s.mean, s.std, s.skew, s.kurtosis
            ),
            Err(err) => println!("{:<10} {}", symbol, err),
        }
    }

    println!("\n=== Stationarity (Augmented Dickey-Fuller) ===");
    println!(
        "\n{:<10} {:<8} {:>10} {:>10} {:>6} {:<12}",
        "Symbol", "Returns", "ADF Stat", "p-value", "Lag", "Stationary"
    );
    println!("{:-<61}", "");
    for (symbol, s) in &series {
        match analyze_returns(s, &config.stationarity) {
            Ok(analysis) => {
                print_adf_row(symbol, "simple", &analysis.simple_adf);
                print_adf_row(symbol, "log", &analysis.log_adf);
            }
            Err(err) => println!("{:<10} {}", symbol, err),
        }
    }
    println!(
        "\np-value < {} indicates stationarity",
        config.stationarity.significance
    );

    println!(
        "\n=== Monte Carlo Comparison ({} days, {} simulations) ===",
        config.simulation.days, config.simulation.simulations
    );
    let report = run_simulation(&config, &raw)?;
    print_simulation_report(&report);

    Ok(())
}

fn run_simulation(
    config: &Config,
    raw: &BTreeMap<String, Vec<PricePoint>>,
) -> anyhow::Result<SimulationReport> {
    let simulator = config.simulator()?;
    let seed = config.simulation.seed;

    #[cfg(feature = "parallel")]
    {
        if config.simulation.parallel {
            return Ok(simulator.compare_parallel(raw, seed.unwrap_or_else(rand::random)));
        }
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    Ok(simulator.compare(raw, &mut rng))
}

fn print_adf_row(symbol: &str, kind: &str, result: &AdfResult) {
    println!(
        "{:<10} {:<8} {:>10.4} {:>10.4} {:>6} {:<12}",
        symbol,
        kind,
        result.test_statistic,
        result.p_value,
        result.used_lag,
        if result.is_stationary { "Yes" } else { "No" }
    );
}

fn print_simulation_report(report: &SimulationReport) {
    println!(
        "\n{:<10} {:>16} {:>16} {:>10} {:>14}",
        "Symbol", "Expected Return", "Risk (Std Dev)", "VaR 5%", "Current Price"
    );
    println!("{:-<70}", "");
    for result in &report.results {
        println!(
            "{:<10} {:>15.2}% {:>15.2}% {:>9.2}% {:>14.2}",
            result.symbol,
            result.expected_return,
            result.risk_std_dev,
            result.var_5pct,
            result.current_price
        );
    }

    if !report.failures.is_empty() {
        println!("\nSkipped:");
        for (symbol, err) in &report.failures {
            println!("  {}: {}", symbol, err);
        }
    }
    println!();
}
