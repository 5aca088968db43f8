mod analysis;
mod holding;
mod portfolio;
mod price_point;
mod signal;

pub use analysis::{AnalysisWarning, Analyzed, WarningKind};
pub use holding::{Allocation, AllocationBasis, Cell, Holding, HoldingsTable, NormalizedPortfolio};
pub use portfolio::{PortfolioAnalysis, PortfolioMetrics, PortfolioSummaryRow, StockQuote};
pub use price_point::{Interval, PricePoint, PriceSeries};
pub use signal::{
    BollingerSnapshot, IndicatorSnapshot, MacdInterpretation, MacdPoint, MacdReport,
    MacdSignalRow, Outlook, Recommendation, SignalStrength, TickerAnalysis, TimeframeScore,
};
