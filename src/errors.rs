use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::external::market_data::MarketDataError;

/// Failures produced by the analytical core.
///
/// Only `MissingSymbolColumn` is fatal to a whole run. The other variants are
/// raised per ticker and turned into warnings by the batch services.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(
        "No symbol column found (available columns: {available:?}). \
         Please include a 'Symbol' or 'Slice' column with stock tickers."
    )]
    MissingSymbolColumn { available: Vec<String> },

    #[error("Insufficient history for {context}: need at least {required} points, got {actual}")]
    InsufficientHistory {
        context: String,
        required: usize,
        actual: usize,
    },

    #[error("Market data unavailable for {ticker}: {reason}")]
    MarketDataUnavailable { ticker: String, reason: String },

    #[error("Indicator computation failed: {0}")]
    IndicatorComputationFailure(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Rate limited by external provider")]
    RateLimited,
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let message = self.to_string();
        match self {
            AppError::NotFound(_) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            AppError::Validation(_) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            AppError::RateLimited => {
                let mut headers = HeaderMap::new();
                headers.insert(http::header::RETRY_AFTER, HeaderValue::from_static("60"));
                (StatusCode::TOO_MANY_REQUESTS, headers, Json(json!({ "error": message })))
                    .into_response()
            }
            AppError::Analysis(AnalysisError::MarketDataUnavailable { .. }) => {
                (StatusCode::BAD_GATEWAY, Json(json!({ "error": message }))).into_response()
            }
            AppError::Analysis(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": message })),
            )
                .into_response(),
        }
    }
}

impl AnalysisError {
    pub fn market_data(ticker: &str, error: &MarketDataError) -> Self {
        AnalysisError::MarketDataUnavailable {
            ticker: ticker.to_string(),
            reason: error.to_string(),
        }
    }
}

impl AppError {
    /// Surface a failed single-ticker lookup. Unknown symbols and rate limits
    /// keep their own statuses, everything else is `MarketDataUnavailable`.
    pub fn from_lookup(ticker: &str, error: MarketDataError) -> Self {
        match error {
            MarketDataError::RateLimited => AppError::RateLimited,
            MarketDataError::NotFound(symbol) => {
                AppError::NotFound(format!("No market data found for symbol: {}", symbol))
            }
            other => AnalysisError::market_data(ticker, &other).into(),
        }
    }
}
