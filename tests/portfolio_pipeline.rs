mod common;

use common::MockMarketData;
use portfolio_pulse::config::AnalysisConfig;
use portfolio_pulse::models::{AllocationBasis, Cell, HoldingsTable, WarningKind};
use portfolio_pulse::services::{portfolio_normalizer, portfolio_service};

fn table(columns: &[&str], rows: Vec<Vec<Cell>>) -> HoldingsTable {
    HoldingsTable::new(columns.iter().map(|c| c.to_string()).collect(), rows)
}

#[tokio::test]
async fn shares_portfolio_is_valued_against_quotes() {
    let provider = MockMarketData::new()
        .with_quote("AAPL", 150.0, 148.0, "Technology")
        .with_quote("MSFT", 300.0, 300.0, "Technology");

    let table = table(
        &["Symbol", "Shares"],
        vec![
            vec!["aapl".into(), 100.0.into()],
            vec!["MSFT".into(), 50.0.into()],
        ],
    );

    let result = portfolio_service::analyze_table(&provider, &table, &AnalysisConfig::default())
        .await
        .unwrap();
    assert!(!result.has_warnings());

    let rows = &result.value.rows;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].symbol, "AAPL");
    assert_eq!(rows[0].market_value, 15000.0);
    assert_eq!(rows[1].market_value, 15000.0);
    assert_eq!(rows[0].weight, 0.5);
    assert_eq!(rows[1].weight, 0.5);
    assert_eq!(rows[0].company_name, "AAPL Inc.");

    let metrics = &result.value.metrics;
    assert_eq!(metrics.total_holdings, 2);
    assert_eq!(metrics.total_market_value, 30000.0);
    assert!((metrics.effective_holdings - 2.0).abs() < 1e-9);
    assert_eq!(metrics.sector_count, 1);
    assert_eq!(metrics.most_common_sector, "Technology");
}

#[tokio::test]
async fn failed_quote_becomes_placeholder_and_warning() {
    let provider = MockMarketData::new().with_quote("AAPL", 10.0, 10.0, "Technology");

    let table = table(
        &["Ticker", "Quantity"],
        vec![
            vec!["AAPL".into(), 100.0.into()],
            vec!["ZZZZ".into(), 5.0.into()],
        ],
    );

    let result = portfolio_service::analyze_table(&provider, &table, &AnalysisConfig::default())
        .await
        .unwrap();

    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].ticker, "ZZZZ");
    assert_eq!(result.warnings[0].kind, WarningKind::MarketDataUnavailable);

    let rows = &result.value.rows;
    assert_eq!(rows[1].current_price, 0.0);
    assert_eq!(rows[1].market_value, 0.0);
    assert_eq!(rows[1].sector, "Unknown");
    assert_eq!(rows[0].weight, 1.0);
    assert_eq!(rows[1].weight, 0.0);
}

#[tokio::test]
async fn broker_export_with_summary_row_and_percent_weights() {
    let provider = MockMarketData::new()
        .with_quote("AAPL", 10.0, 10.0, "Technology")
        .with_quote("XOM", 10.0, 10.0, "Energy");

    let table = table(
        &["Slice", "Name", "Weight", "Invested value", "Value", "Result"],
        vec![
            vec![
                "AAPL".into(),
                "Apple".into(),
                "60%".into(),
                "$1,000".into(),
                "1,200".into(),
                "200".into(),
            ],
            vec![
                "XOM".into(),
                "Exxon".into(),
                40.0.into(),
                800.0.into(),
                600.0.into(),
                Cell::Null,
            ],
            vec![
                "Total".into(),
                Cell::Null,
                100.0.into(),
                1800.0.into(),
                1800.0.into(),
                Cell::Null,
            ],
        ],
    );

    let portfolio = portfolio_normalizer::normalize_holdings(&table).unwrap();
    assert_eq!(portfolio.basis, AllocationBasis::DeclaredWeights);
    assert_eq!(portfolio.symbols(), vec!["AAPL", "XOM"]);

    let result =
        portfolio_service::value_portfolio(&provider, &portfolio, &AnalysisConfig::default()).await;
    let rows = &result.value.rows;

    assert!((rows[0].weight - 0.6).abs() < 1e-12);
    assert!((rows[1].weight - 0.4).abs() < 1e-12);
    assert_eq!(rows[0].pnl, Some(200.0));
    assert_eq!(rows[0].pnl_pct, Some(20.0));
    assert_eq!(rows[1].pnl, Some(-200.0));
    assert_eq!(rows[1].pnl_pct, Some(-25.0));
}

#[tokio::test]
async fn missing_symbol_column_fails_the_run() {
    let provider = MockMarketData::new();
    let table = table(&["Foo", "Bar"], vec![vec!["x".into(), 1.0.into()]]);

    let err = portfolio_service::analyze_table(&provider, &table, &AnalysisConfig::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Foo"));
}
