use chrono::{Months, NaiveDate};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::AnalysisConfig;
use crate::errors::AppError;
use crate::external::market_data::{HistoryRequest, MarketDataSource};
use crate::models::{AnalysisWarning, Analyzed, TickerAnalysis};
use crate::services::macd_signal_service::MacdSignalService;
use crate::services::price_service;

/// Trim, upper-case and de-duplicate requested tickers, keeping first-seen order.
pub fn clean_tickers(tickers: &[String]) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(tickers.len());
    for ticker in tickers {
        let ticker = ticker.trim().to_uppercase();
        if !ticker.is_empty() && !cleaned.contains(&ticker) {
            cleaned.push(ticker);
        }
    }
    cleaned
}

/// Start of the ranking window when a request does not name one.
pub fn default_start(today: NaiveDate, lookback_years: u32) -> NaiveDate {
    today
        .checked_sub_months(Months::new(12 * lookback_years))
        .unwrap_or(today)
}

/// Multi-timeframe outlook for a single ticker. Unlike [`rank_tickers`],
/// a failed lookup or a short history is returned as an error.
pub async fn analyze_one(
    provider: &dyn MarketDataSource,
    ticker: &str,
    start: NaiveDate,
    config: &AnalysisConfig,
) -> Result<TickerAnalysis, AppError> {
    let ticker = ticker.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(AppError::Validation("Ticker cannot be empty".into()));
    }

    let request = HistoryRequest::daily_since(start);
    let series = price_service::fetch_history(provider, &ticker, request, config)
        .await
        .map_err(|e| AppError::from_lookup(&ticker, e))?;
    let analysis = MacdSignalService::new(config.macd).analyze_ticker(&ticker, &series)?;

    info!(
        "{}: {} with {}% confidence",
        ticker, analysis.outlook, analysis.confidence
    );
    Ok(analysis)
}

/// Rank tickers by multi-timeframe MACD confidence.
///
/// Every ticker's daily history since `start` is fetched concurrently. Tickers
/// whose lookup fails, whose history is shorter than 50 points, or whose
/// interpretation fails are skipped with a warning. The survivors are sorted
/// by descending confidence; equal confidences keep request order.
pub async fn rank_tickers(
    provider: &dyn MarketDataSource,
    tickers: &[String],
    start: NaiveDate,
    config: &AnalysisConfig,
) -> Analyzed<Vec<TickerAnalysis>> {
    let run_id = Uuid::new_v4();
    let span = info_span!("rank_tickers", %run_id);

    async move {
        let tickers = clean_tickers(tickers);
        info!("Ranking {} tickers from {}", tickers.len(), start);

        let service = MacdSignalService::new(config.macd);
        let request = HistoryRequest::daily_since(start);
        let histories = price_service::fetch_histories(provider, &tickers, request, config).await;

        let mut results = Vec::with_capacity(histories.len());
        let mut warnings = Vec::new();

        for (ticker, history) in histories {
            let series = match history {
                Ok(series) => series,
                Err(e) => {
                    warn!("Skipping {}: {}", ticker, e);
                    warnings.push(AnalysisWarning::from_market_data(&ticker, &e));
                    continue;
                }
            };

            // histories under 50 points come back as InsufficientHistory
            match service.analyze_ticker(&ticker, &series) {
                Ok(analysis) => results.push(analysis),
                Err(e) => {
                    warn!("Skipping {}: {}", ticker, e);
                    warnings.push(AnalysisWarning::from_error(&ticker, &e));
                }
            }
        }

        // stable: ties keep first-seen order
        results.sort_by(|a, b| b.confidence.cmp(&a.confidence));

        info!(
            "Ranked {} of {} tickers ({} skipped)",
            results.len(),
            tickers.len(),
            warnings.len()
        );

        Analyzed::new(results, warnings)
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_tickers() {
        let raw: Vec<String> = [" aapl", "MSFT", "", "AAPL ", "goog"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(clean_tickers(&raw), vec!["AAPL", "MSFT", "GOOG"]);
    }

    #[test]
    fn test_default_start() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
        assert_eq!(
            default_start(today, 5),
            NaiveDate::from_ymd_opt(2020, 6, 30).unwrap()
        );
    }
}
