use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use tracing::{error, info};

use crate::errors::AppError;
use crate::models::{AnalysisWarning, Analyzed, HoldingsTable, PortfolioAnalysis};
use crate::services::portfolio_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/analyze", post(analyze_table))
        .route("/analyze/csv", post(analyze_csv))
}

#[derive(Debug, Serialize)]
pub struct PortfolioResponse {
    #[serde(flatten)]
    pub analysis: PortfolioAnalysis,
    pub warnings: Vec<AnalysisWarning>,
}

impl From<Analyzed<PortfolioAnalysis>> for PortfolioResponse {
    fn from(result: Analyzed<PortfolioAnalysis>) -> Self {
        Self {
            analysis: result.value,
            warnings: result.warnings,
        }
    }
}

/// Value an uploaded holdings table given as JSON `{ columns, rows }`.
pub async fn analyze_table(
    State(state): State<AppState>,
    Json(table): Json<HoldingsTable>,
) -> Result<Json<PortfolioResponse>, AppError> {
    info!(
        "POST /portfolio/analyze - {} columns, {} rows",
        table.columns.len(),
        table.rows.len()
    );
    run(&state, &table).await
}

/// Value a holdings export posted as raw CSV text.
pub async fn analyze_csv(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<PortfolioResponse>, AppError> {
    info!("POST /portfolio/analyze/csv - {} bytes", body.len());

    let table = HoldingsTable::from_csv_reader(body.as_bytes()).map_err(|e| {
        error!("Failed to parse holdings CSV: {:#}", e);
        AppError::Validation(format!("Invalid CSV: {:#}", e))
    })?;
    run(&state, &table).await
}

async fn run(state: &AppState, table: &HoldingsTable) -> Result<Json<PortfolioResponse>, AppError> {
    let result =
        portfolio_service::analyze_table(state.market_data.as_ref(), table, &state.config).await?;
    Ok(Json(result.into()))
}
