use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::models::{AnalysisWarning, Interval, MacdReport, TickerAnalysis};
use crate::services::macd_report_service::{self, ReportPeriod};
use crate::services::ranking_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/rank", post(rank))
        .route("/:symbol", get(get_report))
        .route("/:symbol/outlook", get(get_outlook))
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    /// 1y, 2y, 5y or max (default: 2y)
    period: Option<String>,
    /// 1d, 1wk or 1mo (default: 1mo)
    interval: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OutlookQuery {
    start: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct RankRequest {
    pub tickers: Vec<String>,
    pub start_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct RankResponse {
    pub results: Vec<TickerAnalysis>,
    pub warnings: Vec<AnalysisWarning>,
}

/// MACD chart, crossover signals, latest reading and secondary indicators.
///
/// # Example
/// ```text
/// GET /api/macd/AAPL?period=5y&interval=1wk
/// ```
pub async fn get_report(
    Path(symbol): Path<String>,
    Query(query): Query<ReportQuery>,
    State(state): State<AppState>,
) -> Result<Json<MacdReport>, AppError> {
    let period = match query.period.as_deref() {
        Some(raw) => ReportPeriod::parse(raw).ok_or_else(|| {
            AppError::Validation(format!("Invalid period '{}'. Use 1y, 2y, 5y or max.", raw))
        })?,
        None => ReportPeriod::default(),
    };
    let interval = match query.interval.as_deref() {
        Some(raw) => Interval::parse(raw).ok_or_else(|| {
            AppError::Validation(format!("Invalid interval '{}'. Use 1d, 1wk or 1mo.", raw))
        })?,
        None => Interval::Monthly,
    };

    info!(
        "GET /macd/{} - period={}, interval={}",
        symbol,
        period.as_str(),
        interval
    );

    let report = macd_report_service::build_report(
        state.market_data.as_ref(),
        &symbol,
        period,
        interval,
        Utc::now().date_naive(),
        &state.config,
    )
    .await?;
    Ok(Json(report))
}

pub async fn get_outlook(
    Path(symbol): Path<String>,
    Query(query): Query<OutlookQuery>,
    State(state): State<AppState>,
) -> Result<Json<TickerAnalysis>, AppError> {
    let start = query.start.unwrap_or_else(|| {
        ranking_service::default_start(
            Utc::now().date_naive(),
            state.config.ranking_lookback_years,
        )
    });
    info!("GET /macd/{}/outlook - start={}", symbol, start);

    let analysis =
        ranking_service::analyze_one(state.market_data.as_ref(), &symbol, start, &state.config)
            .await?;
    Ok(Json(analysis))
}

/// Rank tickers by MACD confidence. Tickers that cannot be analyzed are
/// reported in `warnings` instead of failing the request.
pub async fn rank(
    State(state): State<AppState>,
    Json(request): Json<RankRequest>,
) -> Result<Json<RankResponse>, AppError> {
    if request.tickers.iter().all(|t| t.trim().is_empty()) {
        return Err(AppError::Validation("At least one ticker is required".into()));
    }

    let start = request.start_date.unwrap_or_else(|| {
        ranking_service::default_start(
            Utc::now().date_naive(),
            state.config.ranking_lookback_years,
        )
    });
    info!("POST /macd/rank - {} tickers from {}", request.tickers.len(), start);

    let ranked = ranking_service::rank_tickers(
        state.market_data.as_ref(),
        &request.tickers,
        start,
        &state.config,
    )
    .await;

    Ok(Json(RankResponse {
        results: ranked.value,
        warnings: ranked.warnings,
    }))
}
