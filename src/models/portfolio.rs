use serde::{Deserialize, Serialize};

/// Current market snapshot for one ticker, as returned by the market-data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockQuote {
    pub symbol: String,
    pub current_price: f64,
    pub previous_close: f64,
    pub market_cap: f64,
    pub long_name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub currency: Option<String>,
}

impl StockQuote {
    /// Zero-priced stand-in used when a lookup fails.
    pub fn placeholder(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            current_price: 0.0,
            previous_close: 0.0,
            market_cap: 0.0,
            long_name: None,
            sector: None,
            industry: None,
            currency: None,
        }
    }
}

/// Holding joined with live market data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummaryRow {
    pub symbol: String,
    pub company_name: String,
    pub sector: String,
    pub industry: String,
    pub currency: String,
    pub current_price: f64,
    pub previous_close: f64,
    pub market_cap: f64,

    pub shares: Option<f64>,
    /// shares * current price, 0 when shares are unknown
    pub market_value: f64,
    /// Fraction in 0..=1
    pub weight: f64,
    pub weight_pct: f64,
    pub daily_change_pct: f64,

    pub cost: Option<f64>,
    pub value: Option<f64>,
    pub pnl: Option<f64>,
    /// `None` when there is no cost basis or the cost is zero
    pub pnl_pct: Option<f64>,
}

/// Portfolio-level aggregates over the summary rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioMetrics {
    pub total_holdings: usize,
    pub total_market_value: f64,
    pub largest_position: f64,
    pub smallest_position: f64,
    /// Sum of the three largest weights
    pub concentration_top3: f64,
    pub herfindahl_index: f64,
    /// 1 / Herfindahl, 0 when the index is 0
    pub effective_holdings: f64,
    /// Weighted sum of daily changes, in percent
    pub daily_return_pct: f64,
    pub sector_count: usize,
    pub most_common_sector: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioAnalysis {
    pub rows: Vec<PortfolioSummaryRow>,
    pub metrics: PortfolioMetrics,
}
