use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info};

use crate::errors::AnalysisError;
use crate::models::{Allocation, AllocationBasis, Holding, HoldingsTable, NormalizedPortfolio};

/// Canonical field plus the case-insensitive aliases tried, in order, when
/// the canonical column is absent.
#[derive(Debug, Clone, Copy)]
pub struct FieldAliases {
    pub canonical: &'static str,
    pub aliases: &'static [&'static str],
}

pub const LABEL_FIELD: FieldAliases = FieldAliases {
    canonical: "Slice",
    aliases: &["slice", "label"],
};

pub const SYMBOL_FIELD: FieldAliases = FieldAliases {
    canonical: "Symbol",
    aliases: &["symbol", "ticker", "stock", "slice"],
};

pub const COMPANY_FIELD: FieldAliases = FieldAliases {
    canonical: "Company Name",
    aliases: &["company name", "name", "company"],
};

pub const SHARES_FIELD: FieldAliases = FieldAliases {
    canonical: "Shares",
    aliases: &["shares", "quantity", "amount", "owned quantity"],
};

pub const WEIGHT_FIELD: FieldAliases = FieldAliases {
    canonical: "Weight",
    aliases: &["weight", "allocation", "%"],
};

pub const COST_FIELD: FieldAliases = FieldAliases {
    canonical: "Cost",
    aliases: &["cost", "invested value", "cost basis", "book value"],
};

pub const VALUE_FIELD: FieldAliases = FieldAliases {
    canonical: "Value",
    aliases: &["value", "current value", "market value"],
};

pub const PNL_FIELD: FieldAliases = FieldAliases {
    canonical: "P&L",
    aliases: &["p&l", "result", "gain/loss"],
};

impl FieldAliases {
    /// Index of the first matching column: exact canonical name first, then
    /// each alias in priority order.
    pub fn resolve(&self, table: &HoldingsTable) -> Option<usize> {
        if let Some(idx) = table.column_index(self.canonical) {
            return Some(idx);
        }

        self.aliases.iter().find_map(|alias| {
            table
                .columns
                .iter()
                .position(|c| c.trim().eq_ignore_ascii_case(alias))
        })
    }
}

fn summary_row_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)total|summary").expect("summary row pattern is valid"))
}

/// Standardize an uploaded holdings table.
///
/// Subtotal rows are dropped, the symbol column is located through its
/// aliases (its absence aborts the whole run), symbols are trimmed and
/// upper-cased, and the quantity is taken from a shares column, else a
/// weight column (rescaled from percent when any value exceeds 1), else
/// an equal 1/N weight. Rows without a symbol are dropped.
pub fn normalize_holdings(table: &HoldingsTable) -> Result<NormalizedPortfolio, AnalysisError> {
    let label_col = LABEL_FIELD.resolve(table);
    let symbol_col = SYMBOL_FIELD
        .resolve(table)
        .ok_or_else(|| AnalysisError::MissingSymbolColumn {
            available: table.columns.clone(),
        })?;

    let company_col = COMPANY_FIELD.resolve(table);
    let shares_col = SHARES_FIELD.resolve(table);
    let weight_col = if shares_col.is_none() {
        WEIGHT_FIELD.resolve(table)
    } else {
        None
    };
    let cost_col = COST_FIELD.resolve(table);
    let value_col = VALUE_FIELD.resolve(table);
    let pnl_col = PNL_FIELD.resolve(table);

    let number_at =
        |row: usize, col: Option<usize>| col.and_then(|c| table.cell(row, c).as_number());

    let mut kept_rows = Vec::with_capacity(table.rows.len());
    let mut summary_rows = 0usize;
    let mut blank_symbols = 0usize;

    for row in 0..table.rows.len() {
        if let Some(label) = label_col.and_then(|c| table.cell(row, c).as_text()) {
            if summary_row_pattern().is_match(&label) {
                summary_rows += 1;
                continue;
            }
        }

        let symbol = table
            .cell(row, symbol_col)
            .as_text()
            .map(|s| s.trim().to_uppercase())
            .unwrap_or_default();

        if symbol.is_empty() {
            blank_symbols += 1;
            continue;
        }

        kept_rows.push((row, symbol));
    }

    if summary_rows > 0 || blank_symbols > 0 {
        debug!(
            "Dropped {} summary rows and {} rows without a symbol",
            summary_rows, blank_symbols
        );
    }

    let (basis, allocations): (AllocationBasis, Vec<Allocation>) = if shares_col.is_some() {
        let shares = kept_rows
            .iter()
            .map(|(row, _)| Allocation::Shares(number_at(*row, shares_col)))
            .collect();
        (AllocationBasis::Shares, shares)
    } else if weight_col.is_some() {
        let raw: Vec<Option<f64>> = kept_rows
            .iter()
            .map(|(row, _)| number_at(*row, weight_col))
            .collect();

        let max = raw.iter().flatten().copied().fold(f64::NEG_INFINITY, f64::max);
        let scale = if max > 1.0 { 100.0 } else { 1.0 };

        let weights = raw
            .into_iter()
            .map(|w| Allocation::Weight(w.map(|v| v / scale)))
            .collect();
        (AllocationBasis::DeclaredWeights, weights)
    } else {
        let equal = 1.0 / kept_rows.len().max(1) as f64;
        let weights = kept_rows
            .iter()
            .map(|_| Allocation::Weight(Some(equal)))
            .collect();
        (AllocationBasis::EqualWeights, weights)
    };

    let holdings: Vec<Holding> = kept_rows
        .into_iter()
        .zip(allocations)
        .map(|((row, symbol), allocation)| Holding {
            symbol,
            company_name: company_col
                .and_then(|c| table.cell(row, c).as_text())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            allocation,
            cost: number_at(row, cost_col),
            value: number_at(row, value_col),
            pnl: number_at(row, pnl_col),
        })
        .collect();

    info!(
        "Normalized {} holdings from {} rows ({:?})",
        holdings.len(),
        table.rows.len(),
        basis
    );

    Ok(NormalizedPortfolio { holdings, basis })
}
