use tracing::debug;

use crate::errors::AnalysisError;
use crate::models::{
    MacdInterpretation, MacdSignalRow, Outlook, PriceSeries, Recommendation, SignalStrength,
    TickerAnalysis, TimeframeScore,
};
use crate::services::indicators::{macd, MacdParams, MacdSeries};

/// Samples before the current one that the divergence rule compares against
pub const DIVERGENCE_WINDOW: usize = 20;
/// Shortest MACD series the interpreter accepts
pub const MIN_INTERPRETATION_POINTS: usize = DIVERGENCE_WINDOW + 1;

pub const MIN_DAILY_POINTS: usize = 50;
pub const MIN_WEEKLY_POINTS: usize = 10;
pub const MIN_MONTHLY_POINTS: usize = 5;

/// Bound of a single timeframe score used for the confidence rescale
pub const SCORE_BOUND: f64 = 6.0;

/// Multi-timeframe MACD interpretation.
///
/// Scores a weekly and a monthly resample of one daily price history with a
/// fixed rule set and reduces the two into an outlook plus a 0-100 confidence.
#[derive(Debug, Clone, Copy, Default)]
pub struct MacdSignalService {
    params: MacdParams,
}

impl MacdSignalService {
    pub fn new(params: MacdParams) -> Self {
        Self { params }
    }

    /// Analyze one ticker from its daily closes.
    ///
    /// Fails with `InsufficientHistory` below 50 daily, 10 weekly or 5 monthly
    /// points, and with whatever the MACD computation of either resample reports.
    pub fn analyze_ticker(
        &self,
        ticker: &str,
        daily: &PriceSeries,
    ) -> Result<TickerAnalysis, AnalysisError> {
        require_points(ticker, "daily", daily.len(), MIN_DAILY_POINTS)?;

        let weekly = daily.resample_weekly();
        require_points(ticker, "weekly", weekly.len(), MIN_WEEKLY_POINTS)?;

        let monthly = daily.resample_monthly();
        require_points(ticker, "monthly", monthly.len(), MIN_MONTHLY_POINTS)?;

        let weekly_score = Self::score_timeframe(&macd(&weekly, &self.params)?)?;
        let monthly_score = Self::score_timeframe(&macd(&monthly, &self.params)?)?;

        let overall_score = (weekly_score.score + monthly_score.score) as f64 / 2.0;
        let outlook = Outlook::from_score(overall_score);
        let confidence = confidence_from_score(overall_score);

        debug!(
            "{}: weekly {} monthly {} overall {:.1} -> {} ({}%)",
            ticker, weekly_score.score, monthly_score.score, overall_score, outlook, confidence
        );

        Ok(TickerAnalysis {
            ticker: ticker.to_string(),
            outlook,
            confidence,
            overall_score,
            weekly_score: weekly_score.score,
            monthly_score: monthly_score.score,
            weekly_outlook: weekly_score.outlook,
            monthly_outlook: monthly_score.outlook,
            weekly_notes: weekly_score.notes,
            monthly_notes: monthly_score.notes,
        })
    }

    /// Score the latest sample of one timeframe.
    ///
    /// Rules, each appending one note:
    /// 1. position: MACD above signal and above zero +2, below both -2
    /// 2. crossover against the previous sample: +2 up, -2 down
    /// 3. histogram rising +1, falling -1
    /// 4. divergence against the previous 20 samples: new price high without
    ///    a new MACD high -2, new price low without a new MACD low +2
    pub fn score_timeframe(series: &MacdSeries) -> Result<TimeframeScore, AnalysisError> {
        let n = series.len();
        if n < MIN_INTERPRETATION_POINTS {
            return Err(AnalysisError::InsufficientHistory {
                context: "MACD interpretation".to_string(),
                required: MIN_INTERPRETATION_POINTS,
                actual: n,
            });
        }

        let macd = series.macd();
        let signal = series.signal();
        let histogram = series.histogram();
        let prices = series.prices();

        let (cur, prev) = (n - 1, n - 2);
        let mut score = 0;
        let mut notes = Vec::with_capacity(4);

        if macd[cur] > signal[cur] && macd[cur] > 0.0 {
            score += 2;
            notes.push("MACD above signal line and zero: bullish".to_string());
        } else if macd[cur] < signal[cur] && macd[cur] < 0.0 {
            score -= 2;
            notes.push("MACD below signal line and zero: bearish".to_string());
        } else {
            notes.push("MACD position relative to signal and zero is mixed".to_string());
        }

        if macd[prev] <= signal[prev] && macd[cur] > signal[cur] {
            score += 2;
            notes.push("Fresh bullish crossover above the signal line".to_string());
        } else if macd[prev] >= signal[prev] && macd[cur] < signal[cur] {
            score -= 2;
            notes.push("Fresh bearish crossover below the signal line".to_string());
        } else {
            notes.push("No fresh signal-line crossover".to_string());
        }

        if histogram[cur] > histogram[prev] {
            score += 1;
            notes.push("Histogram rising: momentum strengthening".to_string());
        } else if histogram[cur] < histogram[prev] {
            score -= 1;
            notes.push("Histogram falling: momentum weakening".to_string());
        } else {
            notes.push("Histogram flat".to_string());
        }

        let window = cur - DIVERGENCE_WINDOW..cur;
        let price_max = max_of(&prices[window.clone()]);
        let price_min = min_of(&prices[window.clone()]);
        let macd_max = max_of(&macd[window.clone()]);
        let macd_min = min_of(&macd[window]);

        let mut divergence = false;
        if prices[cur] > price_max && macd[cur] <= macd_max {
            score -= 2;
            divergence = true;
            notes.push("Bearish divergence: price made a new high but MACD did not".to_string());
        }
        if prices[cur] < price_min && macd[cur] >= macd_min {
            score += 2;
            divergence = true;
            notes.push("Bullish divergence: price made a new low but MACD did not".to_string());
        }
        if !divergence {
            notes.push("No divergence versus price".to_string());
        }

        Ok(TimeframeScore {
            score,
            outlook: Outlook::from_score(score as f64),
            notes,
        })
    }
}

fn require_points(
    ticker: &str,
    resolution: &str,
    actual: usize,
    required: usize,
) -> Result<(), AnalysisError> {
    if actual < required {
        return Err(AnalysisError::InsufficientHistory {
            context: format!("{} {} prices", ticker, resolution),
            required,
            actual,
        });
    }
    Ok(())
}

fn max_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

fn min_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

/// Rescale an averaged score from [-6, 6] onto 0..=100, clamping anything outside.
pub fn confidence_from_score(score: f64) -> u8 {
    let scaled = ((score + SCORE_BOUND) / (2.0 * SCORE_BOUND)) * 100.0;
    scaled.round().clamp(0.0, 100.0) as u8
}

/// Per-sample crossover, zero-line and histogram flags.
pub fn detect_macd_signals(series: &MacdSeries) -> Vec<MacdSignalRow> {
    let macd = series.macd();
    let signal = series.signal();
    let histogram = series.histogram();

    series
        .dates()
        .iter()
        .enumerate()
        .map(|(i, &date)| {
            let above_signal = macd[i] > signal[i];
            let above_zero = macd[i] > 0.0;

            let (was_above_signal, was_above_zero, prev_histogram) = if i > 0 {
                (
                    Some(macd[i - 1] > signal[i - 1]),
                    Some(macd[i - 1] > 0.0),
                    Some(histogram[i - 1]),
                )
            } else {
                (None, None, None)
            };

            MacdSignalRow {
                date,
                macd_above_signal: above_signal,
                buy_signal: was_above_signal == Some(false) && above_signal,
                sell_signal: was_above_signal == Some(true) && !above_signal,
                macd_above_zero: above_zero,
                bullish_momentum: was_above_zero == Some(false) && above_zero,
                bearish_momentum: was_above_zero == Some(true) && !above_zero,
                histogram_positive: histogram[i] > 0.0,
                histogram_increasing: prev_histogram.is_some_and(|p| histogram[i] > p),
            }
        })
        .collect()
}

/// Read the most recent MACD sample into a trend, strength and recommendation.
pub fn interpret_latest(series: &MacdSeries) -> Option<MacdInterpretation> {
    let macd_value = *series.macd().last()?;
    let signal_value = *series.signal().last()?;
    let histogram_value = *series.histogram().last()?;

    let (trend, recommendation) = if macd_value > signal_value {
        if macd_value > 0.0 {
            (Outlook::StrongBullish, Recommendation::Buy)
        } else {
            (Outlook::WeakBullish, Recommendation::HoldBuy)
        }
    } else if macd_value < 0.0 {
        (Outlook::StrongBearish, Recommendation::Sell)
    } else {
        (Outlook::WeakBearish, Recommendation::HoldSell)
    };

    let spread = (macd_value - signal_value).abs();
    let signal_strength = if spread > 0.5 {
        SignalStrength::Strong
    } else if spread > 0.2 {
        SignalStrength::Medium
    } else {
        SignalStrength::Weak
    };

    let mut details = Vec::with_capacity(2);
    if histogram_value > 0.0 {
        details.push(
            "MACD histogram is positive, indicating strengthening bullish momentum".to_string(),
        );
    } else {
        details.push(
            "MACD histogram is negative, indicating strengthening bearish momentum".to_string(),
        );
    }
    if macd_value > 0.0 {
        details.push("MACD is above zero line, suggesting overall bullish trend".to_string());
    } else {
        details.push("MACD is below zero line, suggesting overall bearish trend".to_string());
    }

    Some(MacdInterpretation {
        trend,
        signal_strength,
        recommendation,
        details,
    })
}
