use std::sync::Arc;

use anyhow::{anyhow, Context};
use tokio::net::TcpListener;

use portfolio_pulse::app;
use portfolio_pulse::config::AppConfig;
use portfolio_pulse::external::market_data::MarketDataSource;
use portfolio_pulse::external::yahoofinance::YahooFinanceProvider;
use portfolio_pulse::logging::{self, LoggingConfig};
use portfolio_pulse::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // logging first so configuration problems below are reported
    logging::init_logging(LoggingConfig::from_env())
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    let config = AppConfig::from_env().map_err(|e| anyhow!("Invalid configuration: {}", e))?;

    let market_data: Arc<dyn MarketDataSource> = match config.market_data_provider.as_str() {
        "yahoo" => {
            tracing::info!("Using market data provider: Yahoo Finance");
            let provider = YahooFinanceProvider::new(config.analysis.fetch_timeout)
                .context("Failed to create Yahoo Finance provider")?;
            Arc::new(provider)
        }
        other => {
            return Err(anyhow!(
                "Invalid MARKET_DATA_PROVIDER: {}. Must be 'yahoo'",
                other
            ))
        }
    };

    let state = AppState {
        market_data,
        config: config.analysis.clone(),
    };
    let app = app::create_app(state);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    tracing::info!("portfolio-pulse listening on http://{}/", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
