use serde::{Deserialize, Serialize};

/// How the number of lagged differences in the ADF regression is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LagSelection {
    /// Minimise the Akaike information criterion.
    #[default]
    Aic,
    /// Minimise the Bayesian information criterion.
    Bic,
    /// Use the maximum lag as given.
    Fixed,
}
