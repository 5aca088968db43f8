use std::future::Future;

use futures::stream::{self, StreamExt};
use tokio::time::{sleep as async_sleep, timeout};
use tracing::{info, warn};

use crate::config::AnalysisConfig;
use crate::external::market_data::{HistoryRequest, MarketDataError, MarketDataSource};
use crate::models::{PriceSeries, StockQuote};

/// Run one lookup under the per-lookup timeout, retrying rate-limit
/// responses with a linear backoff.
async fn with_retry<T, F, Fut>(
    ticker: &str,
    config: &AnalysisConfig,
    mut lookup: F,
) -> Result<T, MarketDataError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, MarketDataError>>,
{
    let mut retry_count = 0;

    loop {
        let result = match timeout(config.fetch_timeout, lookup()).await {
            Ok(result) => result,
            Err(_) => Err(MarketDataError::Timeout(config.fetch_timeout.as_secs())),
        };

        match result {
            Err(MarketDataError::RateLimited) if retry_count < config.rate_limit_retries => {
                retry_count += 1;
                let delay = config.rate_limit_backoff * retry_count;
                warn!(
                    "Rate limited for ticker {}, retrying in {}ms (attempt {}/{})",
                    ticker,
                    delay.as_millis(),
                    retry_count,
                    config.rate_limit_retries
                );
                async_sleep(delay).await;
            }
            other => return other,
        }
    }
}

pub async fn fetch_quote(
    provider: &dyn MarketDataSource,
    ticker: &str,
    config: &AnalysisConfig,
) -> Result<StockQuote, MarketDataError> {
    with_retry(ticker, config, || provider.fetch_quote(ticker)).await
}

/// Fetch a history and wrap it in a validated `PriceSeries`. An empty
/// history is reported as `NotFound`.
pub async fn fetch_history(
    provider: &dyn MarketDataSource,
    ticker: &str,
    request: HistoryRequest,
    config: &AnalysisConfig,
) -> Result<PriceSeries, MarketDataError> {
    let points = with_retry(ticker, config, || provider.fetch_history(ticker, request)).await?;
    let series = PriceSeries::new(points);

    if series.is_empty() {
        return Err(MarketDataError::NotFound(ticker.to_string()));
    }

    info!("✓ Fetched {} {} prices for {}", series.len(), request.interval, ticker);
    Ok(series)
}

/// Quotes for every ticker, in input order. At most
/// `max_concurrent_fetches` lookups are in flight and each ticker's failure
/// stays in its own slot.
pub async fn fetch_quotes(
    provider: &dyn MarketDataSource,
    tickers: &[String],
    config: &AnalysisConfig,
) -> Vec<(String, Result<StockQuote, MarketDataError>)> {
    stream::iter(tickers.iter().cloned())
        .map(|ticker| async move {
            let result = fetch_quote(provider, &ticker, config).await;
            (ticker, result)
        })
        .buffered(config.max_concurrent_fetches)
        .collect()
        .await
}

/// Histories for every ticker, in input order, with the same isolation as
/// [`fetch_quotes`].
pub async fn fetch_histories(
    provider: &dyn MarketDataSource,
    tickers: &[String],
    request: HistoryRequest,
    config: &AnalysisConfig,
) -> Vec<(String, Result<PriceSeries, MarketDataError>)> {
    stream::iter(tickers.iter().cloned())
        .map(|ticker| async move {
            let result = fetch_history(provider, &ticker, request, config).await;
            (ticker, result)
        })
        .buffered(config.max_concurrent_fetches)
        .collect()
        .await
}
