use std::collections::HashMap;

use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::AnalysisConfig;
use crate::errors::AnalysisError;
use crate::external::market_data::MarketDataSource;
use crate::models::{
    AnalysisWarning, Analyzed, HoldingsTable, NormalizedPortfolio, PortfolioAnalysis,
    PortfolioMetrics, PortfolioSummaryRow, StockQuote,
};
use crate::services::portfolio_normalizer::normalize_holdings;
use crate::services::price_service;

const UNKNOWN: &str = "Unknown";

/// Normalize an uploaded table and value it against live quotes.
pub async fn analyze_table(
    provider: &dyn MarketDataSource,
    table: &HoldingsTable,
    config: &AnalysisConfig,
) -> Result<Analyzed<PortfolioAnalysis>, AnalysisError> {
    let portfolio = normalize_holdings(table)?;
    Ok(value_portfolio(provider, &portfolio, config).await)
}

/// Join every holding with a market quote and compute the aggregates.
///
/// A symbol whose quote cannot be fetched is still reported, priced at zero,
/// and a warning is attached to the result.
pub async fn value_portfolio(
    provider: &dyn MarketDataSource,
    portfolio: &NormalizedPortfolio,
    config: &AnalysisConfig,
) -> Analyzed<PortfolioAnalysis> {
    let run_id = Uuid::new_v4();
    let span = info_span!("value_portfolio", %run_id);

    async move {
        let mut symbols: Vec<String> = Vec::with_capacity(portfolio.holdings.len());
        for symbol in portfolio.symbols() {
            if !symbols.contains(&symbol) {
                symbols.push(symbol);
            }
        }
        info!(
            "Valuing {} holdings ({} unique symbols)",
            portfolio.holdings.len(),
            symbols.len()
        );

        let mut quotes = HashMap::with_capacity(symbols.len());
        let mut warnings = Vec::new();
        for (symbol, result) in price_service::fetch_quotes(provider, &symbols, config).await {
            match result {
                Ok(quote) => {
                    quotes.insert(symbol, quote);
                }
                Err(e) => {
                    warn!("Using placeholder quote for {}: {}", symbol, e);
                    warnings.push(AnalysisWarning::from_market_data(&symbol, &e));
                }
            }
        }

        let rows = build_summary(portfolio, &quotes);
        let metrics = compute_metrics(&rows);
        info!(
            "Portfolio valued at {:.2} across {} holdings",
            metrics.total_market_value, metrics.total_holdings
        );

        Analyzed::new(PortfolioAnalysis { rows, metrics }, warnings)
    }
    .instrument(span)
    .await
}

/// One summary row per holding, in input order. Symbols missing from
/// `quotes` are priced with a zero placeholder.
pub fn build_summary(
    portfolio: &NormalizedPortfolio,
    quotes: &HashMap<String, StockQuote>,
) -> Vec<PortfolioSummaryRow> {
    let mut rows: Vec<PortfolioSummaryRow> = portfolio
        .holdings
        .iter()
        .map(|holding| {
            let quote = quotes
                .get(&holding.symbol)
                .cloned()
                .unwrap_or_else(|| StockQuote::placeholder(&holding.symbol));

            let shares = holding.allocation.shares();
            let market_value = shares.map(|s| s * quote.current_price).unwrap_or(0.0);

            let daily_change_pct = if quote.previous_close > 0.0 {
                (quote.current_price - quote.previous_close) / quote.previous_close * 100.0
            } else {
                0.0
            };

            // declared value wins, otherwise the live market value when we hold shares
            let value = holding.value.or(shares.map(|_| market_value));
            let pnl_pct = match (holding.cost, value) {
                (Some(cost), Some(value)) if cost != 0.0 => Some((value - cost) / cost * 100.0),
                _ => None,
            };
            let pnl = holding.pnl.or(match (holding.cost, value) {
                (Some(cost), Some(value)) => Some(value - cost),
                _ => None,
            });

            let weight = if portfolio.basis.weights_provided() {
                holding.allocation.weight().unwrap_or(0.0)
            } else {
                0.0
            };

            PortfolioSummaryRow {
                symbol: holding.symbol.clone(),
                company_name: quote
                    .long_name
                    .clone()
                    .or_else(|| holding.company_name.clone())
                    .unwrap_or_else(|| holding.symbol.clone()),
                sector: quote.sector.unwrap_or_else(|| UNKNOWN.to_string()),
                industry: quote.industry.unwrap_or_else(|| UNKNOWN.to_string()),
                currency: quote.currency.unwrap_or_else(|| UNKNOWN.to_string()),
                current_price: quote.current_price,
                previous_close: quote.previous_close,
                market_cap: quote.market_cap,
                shares,
                market_value,
                weight,
                weight_pct: 0.0,
                daily_change_pct,
                cost: holding.cost,
                value: holding.value,
                pnl,
                pnl_pct,
            }
        })
        .collect();

    if !portfolio.basis.weights_provided() {
        let total: f64 = rows.iter().map(|r| r.market_value).sum();
        let count = rows.len() as f64;
        for row in rows.iter_mut() {
            row.weight = if total > 0.0 {
                row.market_value / total
            } else {
                1.0 / count
            };
        }
    }

    for row in rows.iter_mut() {
        row.weight_pct = row.weight * 100.0;
    }

    rows
}

pub fn compute_metrics(rows: &[PortfolioSummaryRow]) -> PortfolioMetrics {
    if rows.is_empty() {
        return PortfolioMetrics {
            total_holdings: 0,
            total_market_value: 0.0,
            largest_position: 0.0,
            smallest_position: 0.0,
            concentration_top3: 0.0,
            herfindahl_index: 0.0,
            effective_holdings: 0.0,
            daily_return_pct: 0.0,
            sector_count: 0,
            most_common_sector: UNKNOWN.to_string(),
        };
    }

    let mut weights: Vec<f64> = rows.iter().map(|r| r.weight).collect();
    weights.sort_by(|a, b| b.total_cmp(a));

    let herfindahl_index: f64 = weights.iter().map(|w| w * w).sum();
    let effective_holdings = if herfindahl_index > 0.0 {
        1.0 / herfindahl_index
    } else {
        0.0
    };

    // first-seen order breaks ties for the most common sector
    let mut sectors: Vec<(&str, usize)> = Vec::new();
    for row in rows {
        match sectors.iter_mut().find(|(name, _)| *name == row.sector) {
            Some((_, count)) => *count += 1,
            None => sectors.push((row.sector.as_str(), 1)),
        }
    }
    let most_common_sector = sectors
        .iter()
        .fold(None::<(&str, usize)>, |best, &(name, count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((name, count)),
        })
        .map(|(name, _)| name.to_string())
        .unwrap_or_else(|| UNKNOWN.to_string());

    PortfolioMetrics {
        total_holdings: rows.len(),
        total_market_value: rows.iter().map(|r| r.market_value).sum(),
        largest_position: weights.first().copied().unwrap_or(0.0),
        smallest_position: weights.last().copied().unwrap_or(0.0),
        concentration_top3: weights.iter().take(3).sum(),
        herfindahl_index,
        effective_holdings,
        daily_return_pct: rows.iter().map(|r| r.weight * r.daily_change_pct).sum(),
        sector_count: sectors.len(),
        most_common_sector,
    }
}
