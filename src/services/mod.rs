pub mod indicators;
pub mod macd_report_service;
pub mod macd_signal_service;
pub mod portfolio_normalizer;
pub mod portfolio_service;
pub mod price_service;
pub mod ranking_service;
