use std::sync::Arc;

use crate::config::AnalysisConfig;
use crate::external::market_data::MarketDataSource;

#[derive(Clone)]
pub struct AppState {
    pub market_data: Arc<dyn MarketDataSource>,
    pub config: AnalysisConfig,
}
