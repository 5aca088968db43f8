use std::io::Read;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// A single value of an uploaded table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Text form of the cell; `None` for nulls
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Null => None,
            Cell::Number(n) => Some(n.to_string()),
            Cell::Text(s) => Some(s.clone()),
        }
    }

    /// Numeric form of the cell. Text is parsed after stripping currency
    /// symbols, thousands separators and `%`; anything unparseable is `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Null => None,
            Cell::Number(n) if n.is_finite() => Some(*n),
            Cell::Number(_) => None,
            Cell::Text(s) => parse_numeric_string(s),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Cell::Null)
    }
}

fn parse_numeric_string(s: &str) -> Option<f64> {
    let cleaned = s
        .replace(['$', '£', '€', ',', '%'], "")
        .trim()
        .to_string();

    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }

    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Already-parsed tabular input: ordered column names plus rows of cells.
///
/// Rows shorter than the header are padded with nulls on read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HoldingsTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl HoldingsTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { columns, rows }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        static NULL: Cell = Cell::Null;
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&NULL)
    }

    /// Build a table from CSV text with a header row. Every field is kept as
    /// text (empty fields become nulls); numeric coercion happens later.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let columns: Vec<String> = reader
            .headers()
            .context("Failed to read CSV header")?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut rows = Vec::new();
        for (line_num, record) in reader.records().enumerate() {
            let record = record
                .with_context(|| format!("Line {}: Failed to parse CSV row", line_num + 2))?;
            let row = record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        Cell::Null
                    } else {
                        Cell::Text(field.to_string())
                    }
                })
                .collect();
            rows.push(row);
        }

        Ok(Self { columns, rows })
    }
}

/// The authoritative quantity of a holding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Allocation {
    /// Share count; `None` when the cell was not numeric
    Shares(Option<f64>),
    /// Fraction of the portfolio in 0..=1
    Weight(Option<f64>),
}

impl Allocation {
    pub fn shares(&self) -> Option<f64> {
        match self {
            Allocation::Shares(s) => *s,
            Allocation::Weight(_) => None,
        }
    }

    pub fn weight(&self) -> Option<f64> {
        match self {
            Allocation::Weight(w) => *w,
            Allocation::Shares(_) => None,
        }
    }
}

/// Where a normalized portfolio's quantities came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationBasis {
    /// Share counts; weights are derived from market values
    Shares,
    /// Weights were supplied by the upload
    DeclaredWeights,
    /// Nothing was supplied; every holding got 1/N
    EqualWeights,
}

impl AllocationBasis {
    pub fn weights_provided(&self) -> bool {
        !matches!(self, AllocationBasis::Shares)
    }
}

/// Canonical holding after normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    /// Trimmed, upper-cased, never empty
    pub symbol: String,
    pub company_name: Option<String>,
    pub allocation: Allocation,
    /// Amount invested (cost basis)
    pub cost: Option<f64>,
    /// Value reported by the upload
    pub value: Option<f64>,
    /// Profit/loss reported by the upload
    pub pnl: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPortfolio {
    pub holdings: Vec<Holding>,
    pub basis: AllocationBasis,
}

impl NormalizedPortfolio {
    pub fn symbols(&self) -> Vec<String> {
        self.holdings.iter().map(|h| h.symbol.clone()).collect()
    }

    /// Render back into a table using the canonical column names.
    ///
    /// Equal-weight portfolios are written without a quantity column, so
    /// normalizing the table again yields the same basis.
    pub fn to_table(&self) -> HoldingsTable {
        let quantity_column = match self.basis {
            AllocationBasis::Shares => Some("Shares"),
            AllocationBasis::DeclaredWeights => Some("Weight"),
            AllocationBasis::EqualWeights => None,
        };

        let mut columns = vec!["Symbol".to_string(), "Company Name".to_string()];
        columns.extend(quantity_column.map(str::to_string));
        columns.extend(["Cost", "Value", "P&L"].iter().map(|c| c.to_string()));

        let rows = self
            .holdings
            .iter()
            .map(|h| {
                let mut row: Vec<Cell> =
                    vec![Cell::Text(h.symbol.clone()), h.company_name.as_deref().into()];
                if quantity_column.is_some() {
                    let quantity = match h.allocation {
                        Allocation::Shares(s) => s,
                        Allocation::Weight(w) => w,
                    };
                    row.push(quantity.into());
                }
                row.push(h.cost.into());
                row.push(h.value.into());
                row.push(h.pnl.into());
                row
            })
            .collect();

        HoldingsTable { columns, rows }
    }
}
