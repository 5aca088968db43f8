use axum::Router;
use tower_http::cors::CorsLayer;

use crate::routes::{health, macd, portfolios};
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    Router::<AppState>::new()
        .nest("/health", health::router())
        .nest("/api/portfolio", portfolios::router())
        .nest("/api/macd", macd::router())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
