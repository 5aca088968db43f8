pub mod health;
pub mod macd;
pub mod portfolios;
