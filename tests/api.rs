mod common;

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{wavy_closes, MockMarketData};
use portfolio_pulse::app::create_app;
use portfolio_pulse::config::AnalysisConfig;
use portfolio_pulse::state::AppState;

fn app() -> Router {
    let provider = MockMarketData::new()
        .with_quote("AAPL", 150.0, 150.0, "Technology")
        .with_quote("MSFT", 300.0, 300.0, "Technology")
        .with_history("AAPL", wavy_closes(900, 0.05))
        .with_history("SHORT", wavy_closes(40, 0.05))
        .with_outage("DOWN");

    create_app(AppState {
        market_data: Arc::new(provider),
        config: AnalysisConfig::default(),
    })
}

async fn send(request: Request<Body>) -> (StatusCode, Value) {
    let response = app().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let response = app().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"OK");
}

#[tokio::test]
async fn analyze_json_table() {
    let (status, body) = send(post_json(
        "/api/portfolio/analyze",
        json!({
            "columns": ["Symbol", "Shares"],
            "rows": [["AAPL", 100], ["MSFT", 50], [null, 3]]
        }),
    ))
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rows"].as_array().unwrap().len(), 2);
    assert_eq!(body["rows"][0]["market_value"], json!(15000.0));
    assert_eq!(body["metrics"]["total_market_value"], json!(30000.0));
    assert_eq!(body["warnings"], json!([]));
}

#[tokio::test]
async fn analyze_without_symbol_column_is_unprocessable() {
    let (status, body) = send(post_json(
        "/api/portfolio/analyze",
        json!({ "columns": ["Foo"], "rows": [["AAPL"]] }),
    ))
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("symbol column"));
}

#[tokio::test]
async fn analyze_csv_upload() {
    let csv = "Ticker,Quantity\nAAPL,10\nMSFT,5\n";
    let request = Request::builder()
        .method("POST")
        .uri("/api/portfolio/analyze/csv")
        .header(header::CONTENT_TYPE, "text/csv")
        .body(Body::from(csv))
        .unwrap();

    let (status, body) = send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metrics"]["total_market_value"], json!(3000.0));
}

#[tokio::test]
async fn macd_report() {
    let (status, body) = send(get("/api/macd/aapl?period=5y&interval=1d")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ticker"], "AAPL");
    assert_eq!(body["period"], "5y");
    assert_eq!(body["interval"], "1d");
    assert_eq!(body["points"].as_array().unwrap().len(), 900);
    assert!(body["latest"]["recommendation"].is_string());
    assert!(body["indicators"]["sma_200"].is_number());
}

#[tokio::test]
async fn macd_report_rejects_unknown_period() {
    let (status, _) = send(get("/api/macd/AAPL?period=3y")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn outlook_statuses() {
    let (status, body) = send(get("/api/macd/AAPL/outlook?start=2020-01-01")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ticker"], "AAPL");
    assert!(body["confidence"].as_u64().unwrap() <= 100);

    let (status, _) = send(get("/api/macd/SHORT/outlook")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(get("/api/macd/NOPE/outlook")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn provider_outage_is_bad_gateway() {
    let (status, body) = send(get("/api/macd/DOWN/outlook")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Market data unavailable for DOWN"));

    let (status, _) = send(get("/api/macd/down?period=1y")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn rank_endpoint() {
    let (status, body) = send(post_json(
        "/api/macd/rank",
        json!({ "tickers": ["AAPL", "SHORT"], "start_date": "2020-01-01" }),
    ))
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"].as_array().unwrap().len(), 1);
    assert_eq!(body["results"][0]["ticker"], "AAPL");
    assert_eq!(body["warnings"][0]["ticker"], "SHORT");
    assert_eq!(body["warnings"][0]["kind"], "insufficient_history");

    let (status, _) = send(post_json("/api/macd/rank", json!({ "tickers": [] }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
