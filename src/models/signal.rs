use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::price_point::Interval;

/// Qualitative outlook derived from an integer (or averaged) MACD score
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Outlook {
    #[serde(rename = "Strong Bearish")]
    StrongBearish,

    #[serde(rename = "Weak Bearish")]
    WeakBearish,

    #[serde(rename = "Neutral")]
    Neutral,

    #[serde(rename = "Weak Bullish")]
    WeakBullish,

    #[serde(rename = "Strong Bullish")]
    StrongBullish,
}

impl Outlook {
    /// Map a score onto the fixed thresholds: >= 3 strong bullish, >= 1 weak
    /// bullish, <= -3 strong bearish, <= -1 weak bearish, otherwise neutral.
    pub fn from_score(score: f64) -> Self {
        if score >= 3.0 {
            Outlook::StrongBullish
        } else if score >= 1.0 {
            Outlook::WeakBullish
        } else if score <= -3.0 {
            Outlook::StrongBearish
        } else if score <= -1.0 {
            Outlook::WeakBearish
        } else {
            Outlook::Neutral
        }
    }
}

impl std::fmt::Display for Outlook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outlook::StrongBullish => write!(f, "Strong Bullish"),
            Outlook::WeakBullish => write!(f, "Weak Bullish"),
            Outlook::Neutral => write!(f, "Neutral"),
            Outlook::WeakBearish => write!(f, "Weak Bearish"),
            Outlook::StrongBearish => write!(f, "Strong Bearish"),
        }
    }
}

/// Scored reading of one timeframe (weekly or monthly)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeScore {
    /// Sum of the rule contributions
    pub score: i32,

    /// Outlook for `score` alone
    pub outlook: Outlook,

    /// One note per rule describing which branch fired
    pub notes: Vec<String>,
}

/// Multi-timeframe MACD outlook for a single ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerAnalysis {
    /// Stock ticker symbol
    pub ticker: String,

    /// Outlook of the averaged weekly + monthly score
    pub outlook: Outlook,

    /// Averaged score rescaled from [-6, 6] onto 0..=100
    pub confidence: u8,

    /// (weekly + monthly) / 2
    pub overall_score: f64,

    pub weekly_score: i32,
    pub monthly_score: i32,

    pub weekly_outlook: Outlook,
    pub monthly_outlook: Outlook,

    pub weekly_notes: Vec<String>,
    pub monthly_notes: Vec<String>,
}

/// Transition flags for one MACD sample, relative to the previous sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdSignalRow {
    pub date: NaiveDate,
    pub macd_above_signal: bool,
    /// MACD crossed above the signal line
    pub buy_signal: bool,
    /// MACD crossed below the signal line
    pub sell_signal: bool,
    pub macd_above_zero: bool,
    /// MACD crossed above zero
    pub bullish_momentum: bool,
    /// MACD crossed below zero
    pub bearish_momentum: bool,
    pub histogram_positive: bool,
    pub histogram_increasing: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SignalStrength {
    Strong,
    Medium,
    Weak,
}

impl std::fmt::Display for SignalStrength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalStrength::Strong => write!(f, "Strong"),
            SignalStrength::Medium => write!(f, "Medium"),
            SignalStrength::Weak => write!(f, "Weak"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Recommendation {
    #[serde(rename = "Buy")]
    Buy,
    #[serde(rename = "Hold/Buy")]
    HoldBuy,
    #[serde(rename = "Hold/Sell")]
    HoldSell,
    #[serde(rename = "Sell")]
    Sell,
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Recommendation::Buy => write!(f, "Buy"),
            Recommendation::HoldBuy => write!(f, "Hold/Buy"),
            Recommendation::HoldSell => write!(f, "Hold/Sell"),
            Recommendation::Sell => write!(f, "Sell"),
        }
    }
}

/// Reading of the most recent MACD sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacdInterpretation {
    pub trend: Outlook,
    pub signal_strength: SignalStrength,
    pub recommendation: Recommendation,
    pub details: Vec<String>,
}

/// One aligned row of a MACD chart
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdPoint {
    pub date: NaiveDate,
    pub price: f64,
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BollingerSnapshot {
    pub middle: f64,
    pub upper: f64,
    pub lower: f64,
}

/// Latest values of the secondary indicators; `None` where warm-up is not met
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub rsi_14: Option<f64>,
    pub bollinger: Option<BollingerSnapshot>,
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub sma_200: Option<f64>,
}

/// Single-ticker MACD report
#[derive(Debug, Clone, Serialize)]
pub struct MacdReport {
    pub ticker: String,
    pub period: String,
    pub interval: Interval,
    pub points: Vec<MacdPoint>,
    pub signals: Vec<MacdSignalRow>,
    pub latest: MacdInterpretation,
    pub indicators: IndicatorSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outlook_thresholds() {
        assert_eq!(Outlook::from_score(6.0), Outlook::StrongBullish);
        assert_eq!(Outlook::from_score(3.0), Outlook::StrongBullish);
        assert_eq!(Outlook::from_score(2.5), Outlook::WeakBullish);
        assert_eq!(Outlook::from_score(1.0), Outlook::WeakBullish);
        assert_eq!(Outlook::from_score(0.5), Outlook::Neutral);
        assert_eq!(Outlook::from_score(0.0), Outlook::Neutral);
        assert_eq!(Outlook::from_score(-0.5), Outlook::Neutral);
        assert_eq!(Outlook::from_score(-1.0), Outlook::WeakBearish);
        assert_eq!(Outlook::from_score(-3.0), Outlook::StrongBearish);
        assert_eq!(Outlook::from_score(-6.0), Outlook::StrongBearish);
    }

    #[test]
    fn test_outlook_monotonic_in_score() {
        let mut previous = Outlook::from_score(-10.0);
        for step in -40..=40 {
            let outlook = Outlook::from_score(step as f64 * 0.25);
            assert!(outlook >= previous, "outlook regressed at score {}", step as f64 * 0.25);
            previous = outlook;
        }
    }

    #[test]
    fn test_outlook_serializes_as_label() {
        let json = serde_json::to_string(&Outlook::WeakBearish).unwrap();
        assert_eq!(json, "\"Weak Bearish\"");
    }
}
