use chrono::{Months, NaiveDate};
use tracing::info;

use crate::config::AnalysisConfig;
use crate::errors::{AnalysisError, AppError};
use crate::external::market_data::{HistoryRequest, MarketDataSource};
use crate::models::{
    BollingerSnapshot, IndicatorSnapshot, Interval, MacdPoint, MacdReport, PriceSeries,
};
use crate::services::indicators::{self, MacdSeries};
use crate::services::macd_signal_service::{detect_macd_signals, interpret_latest};
use crate::services::price_service;

const RSI_PERIOD: usize = 14;
const BOLLINGER_PERIOD: usize = 20;
const BOLLINGER_STD_DEV: f64 = 2.0;

/// How far back a report looks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportPeriod {
    OneYear,
    #[default]
    TwoYears,
    FiveYears,
    Max,
}

impl ReportPeriod {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "1y" => Some(ReportPeriod::OneYear),
            "2y" => Some(ReportPeriod::TwoYears),
            "5y" => Some(ReportPeriod::FiveYears),
            "max" => Some(ReportPeriod::Max),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportPeriod::OneYear => "1y",
            ReportPeriod::TwoYears => "2y",
            ReportPeriod::FiveYears => "5y",
            ReportPeriod::Max => "max",
        }
    }

    /// First date covered when the report is built on `today`.
    pub fn start_date(&self, today: NaiveDate) -> NaiveDate {
        let years = match self {
            ReportPeriod::OneYear => 1,
            ReportPeriod::TwoYears => 2,
            ReportPeriod::FiveYears => 5,
            ReportPeriod::Max => return NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(today),
        };
        today
            .checked_sub_months(Months::new(12 * years))
            .unwrap_or(today)
    }
}

/// Fetch `ticker`'s history at `interval` and build the full MACD report.
pub async fn build_report(
    provider: &dyn MarketDataSource,
    ticker: &str,
    period: ReportPeriod,
    interval: Interval,
    today: NaiveDate,
    config: &AnalysisConfig,
) -> Result<MacdReport, AppError> {
    let ticker = ticker.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(AppError::Validation("Ticker cannot be empty".into()));
    }

    let request = HistoryRequest {
        start: period.start_date(today),
        end: Some(today),
        interval,
    };
    let series = price_service::fetch_history(provider, &ticker, request, config)
        .await
        .map_err(|e| AppError::from_lookup(&ticker, e))?;
    let report = report_from_series(&ticker, period, interval, &series, config)?;

    info!(
        "MACD report for {}: {} points, {} ({})",
        ticker,
        report.points.len(),
        report.latest.trend,
        report.latest.recommendation
    );
    Ok(report)
}

/// Pure part of [`build_report`]: everything computed from an already fetched series.
pub fn report_from_series(
    ticker: &str,
    period: ReportPeriod,
    interval: Interval,
    series: &PriceSeries,
    config: &AnalysisConfig,
) -> Result<MacdReport, AnalysisError> {
    let macd = indicators::macd(series, &config.macd)?;
    let latest = interpret_latest(&macd).ok_or_else(|| {
        AnalysisError::IndicatorComputationFailure(format!("no MACD values for {}", ticker))
    })?;

    Ok(MacdReport {
        ticker: ticker.to_string(),
        period: period.as_str().to_string(),
        interval,
        points: chart_points(&macd),
        signals: detect_macd_signals(&macd),
        latest,
        indicators: indicator_snapshot(&series.closes()),
    })
}

fn chart_points(series: &MacdSeries) -> Vec<MacdPoint> {
    (0..series.len())
        .map(|i| MacdPoint {
            date: series.dates()[i],
            price: series.prices()[i],
            macd: series.macd()[i],
            signal: series.signal()[i],
            histogram: series.histogram()[i],
        })
        .collect()
}

/// Latest RSI(14), Bollinger(20, 2) and SMA 20/50/200 values.
pub fn indicator_snapshot(closes: &[f64]) -> IndicatorSnapshot {
    let latest = |values: Vec<Option<f64>>| values.last().copied().flatten();

    let (middle, upper, lower) =
        indicators::bollinger_bands(closes, BOLLINGER_PERIOD, BOLLINGER_STD_DEV);
    let bollinger = match (latest(middle), latest(upper), latest(lower)) {
        (Some(middle), Some(upper), Some(lower)) => Some(BollingerSnapshot {
            middle,
            upper,
            lower,
        }),
        _ => None,
    };

    let mut averages = indicators::moving_averages(closes, &indicators::DEFAULT_MA_PERIODS)
        .into_iter()
        .map(|ma| latest(ma.values));

    IndicatorSnapshot {
        rsi_14: latest(indicators::rsi(closes, RSI_PERIOD)),
        bollinger,
        sma_20: averages.next().flatten(),
        sma_50: averages.next().flatten(),
        sma_200: averages.next().flatten(),
    }
}
