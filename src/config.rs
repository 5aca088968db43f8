use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::services::indicators::MacdParams;

/// Knobs for a single analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Upper bound on one market-data lookup
    pub fetch_timeout: Duration,
    /// In-flight lookups per run
    pub max_concurrent_fetches: usize,
    /// Retries after a rate-limit response before giving up on a ticker
    pub rate_limit_retries: u32,
    /// Base delay of the linear rate-limit backoff
    pub rate_limit_backoff: Duration,
    /// Ranker start date when a request omits one
    pub ranking_lookback_years: u32,
    pub macd: MacdParams,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
            max_concurrent_fetches: 4,
            rate_limit_retries: 2,
            rate_limit_backoff: Duration::from_secs(2),
            ranking_lookback_years: 5,
            macd: MacdParams::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();
        let config = Self {
            fetch_timeout: Duration::from_secs(env_or(
                "FETCH_TIMEOUT_SECS",
                defaults.fetch_timeout.as_secs(),
            )?),
            max_concurrent_fetches: env_or(
                "MAX_CONCURRENT_FETCHES",
                defaults.max_concurrent_fetches,
            )?,
            rate_limit_retries: env_or("RATE_LIMIT_RETRIES", defaults.rate_limit_retries)?,
            rate_limit_backoff: Duration::from_millis(env_or(
                "RATE_LIMIT_BACKOFF_MS",
                defaults.rate_limit_backoff.as_millis() as u64,
            )?),
            ranking_lookback_years: env_or(
                "RANKING_LOOKBACK_YEARS",
                defaults.ranking_lookback_years,
            )?,
            macd: MacdParams {
                fast_period: env_or("MACD_FAST", defaults.macd.fast_period)?,
                slow_period: env_or("MACD_SLOW", defaults.macd.slow_period)?,
                signal_period: env_or("MACD_SIGNAL", defaults.macd.signal_period)?,
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.fetch_timeout.is_zero() {
            return Err("FETCH_TIMEOUT_SECS must be greater than 0".to_string());
        }
        if self.max_concurrent_fetches == 0 {
            return Err("MAX_CONCURRENT_FETCHES must be greater than 0".to_string());
        }
        if self.ranking_lookback_years == 0 {
            return Err("RANKING_LOOKBACK_YEARS must be greater than 0".to_string());
        }
        self.macd.validate()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub market_data_provider: String,
    pub analysis: AnalysisConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_addr = bind_addr
            .parse()
            .map_err(|e| format!("Invalid BIND_ADDR '{}': {}", bind_addr, e))?;

        Ok(Self {
            bind_addr,
            market_data_provider: std::env::var("MARKET_DATA_PROVIDER")
                .unwrap_or_else(|_| "yahoo".to_string())
                .to_lowercase(),
            analysis: AnalysisConfig::from_env()?,
        })
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| format!("Invalid {} '{}': {}", key, raw, e)),
        Err(_) => Ok(default),
    }
}
