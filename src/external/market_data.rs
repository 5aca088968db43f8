use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{Interval, PricePoint, StockQuote};

/// Date range and resolution for a history lookup. `end` is inclusive;
/// `None` means "up to today".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryRequest {
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
    pub interval: Interval,
}

impl HistoryRequest {
    pub fn daily_since(start: NaiveDate) -> Self {
        Self {
            start,
            end: None,
            interval: Interval::Daily,
        }
    }
}

#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("rate limited")]
    RateLimited,

    #[error("symbol not found: {0}")]
    NotFound(String),

    #[error("lookup timed out after {0}s")]
    Timeout(u64),
}

/// Source of live quotes and price history.
///
/// Implementations must be safe to call concurrently for different tickers.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn fetch_quote(&self, ticker: &str) -> Result<StockQuote, MarketDataError>;

    /// Closing prices in ascending date order.
    async fn fetch_history(
        &self,
        ticker: &str,
        request: HistoryRequest,
    ) -> Result<Vec<PricePoint>, MarketDataError>;
}
