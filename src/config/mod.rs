use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::analysis::simulation::{MonteCarloSimulator, SimulationError};
use crate::analysis::stationarity::AdfConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub days: usize,
    pub simulations: usize,
    /// Absent means a fresh OS-seeded generator on every run.
    pub seed: Option<u64>,
    pub parallel: bool,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            days: 30,
            simulations: 100_000,
            seed: None,
            parallel: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_path: PathBuf,
    pub simulation: SimulationSettings,
    pub stationarity: AdfConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/prices.csv"),
            simulation: SimulationSettings::default(),
            stationarity: AdfConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.simulation.days == 0 {
            return Err(ConfigError::Invalid("simulation.days must be positive".into()));
        }
        if self.simulation.simulations == 0 {
            return Err(ConfigError::Invalid(
                "simulation.simulations must be positive".into(),
            ));
        }
        let significance = self.stationarity.significance;
        if !(significance > 0.0 && significance < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "stationarity.significance must lie in (0, 1), got {significance}"
            )));
        }
        Ok(())
    }

    pub fn simulator(&self) -> std::result::Result<MonteCarloSimulator, SimulationError> {
        MonteCarloSimulator::new(self.simulation.days, self.simulation.simulations)
    }
}
