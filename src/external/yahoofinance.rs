use async_trait::async_trait;
use chrono::{NaiveTime, Utc};
use serde::Deserialize;
use tracing::warn;

use crate::external::market_data::{HistoryRequest, MarketDataError, MarketDataSource};
use crate::models::{PricePoint, StockQuote};

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const QUOTE_SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";

/// Yahoo Finance provider - no API key required.
///
/// Quotes come from the chart endpoint's `meta` block. Sector, industry and
/// market cap come from the quote-summary endpoint, which is best effort: if
/// it refuses the request the quote is still returned without them.
pub struct YahooFinanceProvider {
    client: reqwest::Client,
}

impl YahooFinanceProvider {
    pub fn new(timeout: std::time::Duration) -> Result<Self, MarketDataError> {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; PortfolioPulse/0.1)")
            .timeout(timeout)
            .build()
            .map_err(|e| MarketDataError::Network(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    async fn fetch_chart(
        &self,
        ticker: &str,
        query: &[(&str, String)],
    ) -> Result<YahooResult, MarketDataError> {
        let url = format!("{}/{}", CHART_URL, ticker);

        let resp = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| MarketDataError::Network(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketDataError::RateLimited);
        }
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(MarketDataError::NotFound(ticker.to_string()));
        }
        if !resp.status().is_success() {
            return Err(MarketDataError::BadResponse(format!("HTTP {}", resp.status())));
        }

        let body: YahooChartResponse = resp
            .json()
            .await
            .map_err(|e| MarketDataError::Parse(e.to_string()))?;

        if let Some(error) = body.chart.error {
            if error.description.contains("No data found") {
                return Err(MarketDataError::NotFound(ticker.to_string()));
            }
            return Err(MarketDataError::BadResponse(error.description));
        }

        body.chart
            .result
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
            .ok_or_else(|| MarketDataError::NotFound(ticker.to_string()))
    }

    async fn fetch_profile(&self, ticker: &str) -> Result<YahooSummaryResult, MarketDataError> {
        let url = format!("{}/{}", QUOTE_SUMMARY_URL, ticker);

        let resp = self
            .client
            .get(&url)
            .query(&[("modules", "assetProfile,price")])
            .send()
            .await
            .map_err(|e| MarketDataError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(MarketDataError::BadResponse(format!("HTTP {}", resp.status())));
        }

        let body: YahooSummaryResponse = resp
            .json()
            .await
            .map_err(|e| MarketDataError::Parse(e.to_string()))?;

        body.quote_summary
            .result
            .and_then(|mut r| r.pop())
            .ok_or_else(|| MarketDataError::BadResponse("missing quoteSummary result".into()))
    }
}

#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChart,
}

#[derive(Debug, Deserialize)]
struct YahooChart {
    result: Option<Vec<YahooResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    description: String,
}

#[derive(Debug, Deserialize)]
struct YahooResult {
    meta: YahooMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: YahooIndicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooMeta {
    currency: Option<String>,
    regular_market_price: Option<f64>,
    previous_close: Option<f64>,
    long_name: Option<String>,
    short_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct YahooIndicators {
    quote: Vec<YahooQuote>,
}

#[derive(Debug, Deserialize)]
struct YahooQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct YahooSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: YahooSummary,
}

#[derive(Debug, Deserialize)]
struct YahooSummary {
    result: Option<Vec<YahooSummaryResult>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooSummaryResult {
    asset_profile: Option<YahooAssetProfile>,
    price: Option<YahooPriceModule>,
}

#[derive(Debug, Deserialize)]
struct YahooAssetProfile {
    sector: Option<String>,
    industry: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooPriceModule {
    market_cap: Option<YahooRawValue>,
    long_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct YahooRawValue {
    raw: Option<f64>,
}

impl YahooResult {
    // Timestamps align with closes by index; null closes (holidays) are skipped.
    fn price_points(&self) -> Vec<PricePoint> {
        let Some(quote) = self.indicators.quote.first() else {
            return Vec::new();
        };

        let mut points: Vec<PricePoint> = self
            .timestamp
            .iter()
            .zip(quote.close.iter())
            .filter_map(|(ts, close)| {
                let close = (*close)?;
                let date = chrono::DateTime::from_timestamp(*ts, 0)?.date_naive();
                Some(PricePoint::new(date, close))
            })
            .collect();

        points.sort_by_key(|p| p.date);
        points
    }
}

/// Merge the best-effort profile into a quote. A failed lookup leaves sector,
/// industry and market cap unset.
fn apply_profile(quote: &mut StockQuote, profile: Result<YahooSummaryResult, MarketDataError>) {
    let profile = match profile {
        Ok(profile) => profile,
        Err(e) => {
            warn!(
                "Profile lookup failed for {}, sector and market cap unavailable: {}",
                quote.symbol, e
            );
            return;
        }
    };

    if let Some(asset_profile) = profile.asset_profile {
        quote.sector = asset_profile.sector;
        quote.industry = asset_profile.industry;
    }
    if let Some(price) = profile.price {
        quote.market_cap = price.market_cap.and_then(|m| m.raw).unwrap_or(0.0);
        if quote.long_name.is_none() {
            quote.long_name = price.long_name;
        }
    }
}

#[async_trait]
impl MarketDataSource for YahooFinanceProvider {
    async fn fetch_quote(&self, ticker: &str) -> Result<StockQuote, MarketDataError> {
        let chart = self
            .fetch_chart(
                ticker,
                &[("range", "5d".to_string()), ("interval", "1d".to_string())],
            )
            .await?;

        let closes = chart.price_points();
        let last_close = closes.last().map(|p| p.close);

        let current_price = chart
            .meta
            .regular_market_price
            .or(last_close)
            .ok_or_else(|| MarketDataError::NotFound(ticker.to_string()))?;

        // previous session's close when the chart meta omits it
        let previous_close = chart
            .meta
            .previous_close
            .or_else(|| closes.iter().rev().nth(1).map(|p| p.close))
            .unwrap_or(current_price);

        let mut quote = StockQuote {
            symbol: ticker.to_string(),
            current_price,
            previous_close,
            market_cap: 0.0,
            long_name: chart.meta.long_name.or(chart.meta.short_name),
            sector: None,
            industry: None,
            currency: chart.meta.currency,
        };

        let profile = self.fetch_profile(ticker).await;
        apply_profile(&mut quote, profile);

        Ok(quote)
    }

    async fn fetch_history(
        &self,
        ticker: &str,
        request: HistoryRequest,
    ) -> Result<Vec<PricePoint>, MarketDataError> {
        let period1 = request.start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let period2 = match request.end {
            Some(end) => end
                .succ_opt()
                .unwrap_or(end)
                .and_time(NaiveTime::MIN)
                .and_utc()
                .timestamp(),
            None => Utc::now().timestamp(),
        };

        let chart = self
            .fetch_chart(
                ticker,
                &[
                    ("period1", period1.to_string()),
                    ("period2", period2.to_string()),
                    ("interval", request.interval.as_str().to_string()),
                ],
            )
            .await?;

        let points = chart.price_points();
        if points.is_empty() {
            return Err(MarketDataError::NotFound(ticker.to_string()));
        }

        Ok(points)
    }
}
