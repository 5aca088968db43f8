#![allow(dead_code)]

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};

use portfolio_pulse::external::market_data::{HistoryRequest, MarketDataError, MarketDataSource};
use portfolio_pulse::models::{PricePoint, StockQuote};

/// In-memory market data. Histories are returned whole, whatever range or
/// interval is requested; unknown tickers are `NotFound` and tickers marked
/// with `with_outage` fail with a network error.
#[derive(Default)]
pub struct MockMarketData {
    quotes: HashMap<String, StockQuote>,
    histories: HashMap<String, Vec<PricePoint>>,
    outages: Vec<String>,
}

impl MockMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quote(
        mut self,
        symbol: &str,
        price: f64,
        previous_close: f64,
        sector: &str,
    ) -> Self {
        self.quotes.insert(
            symbol.to_string(),
            StockQuote {
                current_price: price,
                previous_close,
                long_name: Some(format!("{} Inc.", symbol)),
                sector: Some(sector.to_string()),
                industry: Some("Software".to_string()),
                currency: Some("USD".to_string()),
                ..StockQuote::placeholder(symbol)
            },
        );
        self
    }

    pub fn with_history(mut self, symbol: &str, closes: Vec<f64>) -> Self {
        self.histories.insert(symbol.to_string(), daily_points(&closes));
        self
    }

    pub fn with_outage(mut self, symbol: &str) -> Self {
        self.outages.push(symbol.to_string());
        self
    }

    fn check_outage(&self, ticker: &str) -> Result<(), MarketDataError> {
        if self.outages.iter().any(|t| t == ticker) {
            return Err(MarketDataError::Network("connection reset".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl MarketDataSource for MockMarketData {
    async fn fetch_quote(&self, ticker: &str) -> Result<StockQuote, MarketDataError> {
        self.check_outage(ticker)?;
        self.quotes
            .get(ticker)
            .cloned()
            .ok_or_else(|| MarketDataError::NotFound(ticker.to_string()))
    }

    async fn fetch_history(
        &self,
        ticker: &str,
        _request: HistoryRequest,
    ) -> Result<Vec<PricePoint>, MarketDataError> {
        self.check_outage(ticker)?;
        self.histories
            .get(ticker)
            .cloned()
            .ok_or_else(|| MarketDataError::NotFound(ticker.to_string()))
    }
}

/// One close per calendar day starting 2020-01-01.
pub fn daily_points(closes: &[f64]) -> Vec<PricePoint> {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PricePoint::new(start + Duration::days(i as i64), close))
        .collect()
}

/// A wavy upward drift, long enough for monthly MACD.
pub fn wavy_closes(days: usize, drift: f64) -> Vec<f64> {
    (0..days)
        .map(|i| {
            let t = i as f64;
            100.0 + drift * t + 8.0 * (t / 30.0).sin()
        })
        .collect()
}
