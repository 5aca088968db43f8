use serde::{Deserialize, Serialize};

use crate::errors::AnalysisError;
use crate::external::market_data::MarketDataError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    MarketDataUnavailable,
    InsufficientHistory,
    IndicatorComputationFailure,
    Timeout,
    /// The uploaded table itself is unusable
    InvalidInput,
}

/// Non-fatal, per-ticker problem surfaced next to a result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisWarning {
    pub ticker: String,
    pub kind: WarningKind,
    pub message: String,
}

impl AnalysisWarning {
    pub fn new(ticker: impl Into<String>, kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn from_error(ticker: &str, error: &AnalysisError) -> Self {
        let kind = match error {
            AnalysisError::InsufficientHistory { .. } => WarningKind::InsufficientHistory,
            AnalysisError::IndicatorComputationFailure(_) => {
                WarningKind::IndicatorComputationFailure
            }
            AnalysisError::MarketDataUnavailable { .. } => WarningKind::MarketDataUnavailable,
            AnalysisError::MissingSymbolColumn { .. } => WarningKind::InvalidInput,
        };
        Self::new(ticker, kind, error.to_string())
    }

    pub fn from_market_data(ticker: &str, error: &MarketDataError) -> Self {
        let kind = match error {
            MarketDataError::Timeout(_) => WarningKind::Timeout,
            _ => WarningKind::MarketDataUnavailable,
        };
        Self::new(
            ticker,
            kind,
            format!("Could not fetch data for {}: {}", ticker, error),
        )
    }
}

/// A (possibly partial) result together with every warning raised producing it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analyzed<T> {
    pub value: T,
    pub warnings: Vec<AnalysisWarning>,
}

impl<T> Analyzed<T> {
    pub fn new(value: T, warnings: Vec<AnalysisWarning>) -> Self {
        Self { value, warnings }
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
