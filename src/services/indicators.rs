use chrono::NaiveDate;
use serde::Serialize;

use crate::errors::AnalysisError;
use crate::models::PriceSeries;

/// Simple Moving Average (SMA)
/// Returns a vector aligned with `values`:
/// - `None` until enough values exist
/// - `Some(avg)` after `window` values
pub fn sma(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    // We build a running sum using scan, and subtract the value that falls out of the window.
    values
        .iter()
        .enumerate()
        .scan(0.0_f64, move |sum, (i, &v)| {
            *sum += v;
            if i >= window {
                *sum -= values[i - window];
            }

            let out = if i + 1 >= window {
                Some(*sum / window as f64)
            } else {
                None
            };

            Some(out)
        })
        .collect()
}

/// Exponential Moving Average (EMA)
///
/// Recursive form without warm-up bias correction:
/// `ema[0] = values[0]`, `ema[t] = ema[t-1] + alpha * (values[t] - ema[t-1])`
/// with `alpha = 2 / (period + 1)`. Output has the same length as the input.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    let Some(&first) = values.first() else {
        return Vec::new();
    };

    let alpha = 2.0 / (period as f64 + 1.0);

    values
        .iter()
        .scan(first, move |prev_ema, &v| {
            let next = *prev_ema + alpha * (v - *prev_ema);
            *prev_ema = next;
            Some(next)
        })
        .collect()
}

/// Relative Strength Index (RSI)
///
/// Measures momentum by comparing recent gains to recent losses.
/// RSI values range from 0 to 100:
/// - Below 30: Oversold condition (potential buy signal)
/// - Above 70: Overbought condition (potential sell signal)
/// - 50: Neutral momentum
///
/// Calculation:
/// 1. Price changes between consecutive closes
/// 2. Average gain and average loss over the trailing `period` changes
/// 3. RS = Average Gain / Average Loss
/// 4. RSI = 100 - (100 / (1 + RS))
///
/// A window with no losses saturates at 100.
///
/// Returns `None` for the first `period` values, then `Some(rsi)`.
pub fn rsi(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    if prices.len() < 2 || period == 0 {
        return vec![None; prices.len()];
    }

    let changes: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
    let gains: Vec<f64> = changes.iter().map(|&c| c.max(0.0)).collect();
    let losses: Vec<f64> = changes.iter().map(|&c| (-c).max(0.0)).collect();

    let avg_gains = sma(&gains, period);
    let avg_losses = sma(&losses, period);

    // changes[i] sits between prices[i] and prices[i + 1]
    std::iter::once(None)
        .chain(avg_gains.iter().zip(avg_losses.iter()).map(|pair| match pair {
            (Some(gain), Some(loss)) => {
                if *loss == 0.0 {
                    Some(100.0)
                } else {
                    let rs = gain / loss;
                    Some(100.0 - (100.0 / (1.0 + rs)))
                }
            }
            _ => None,
        }))
        .collect()
}

/// MACD periods. Defaults to the classic 12 / 26 / 9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MacdParams {
    pub fast_period: usize,
    pub slow_period: usize,
    pub signal_period: usize,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast_period: 12,
            slow_period: 26,
            signal_period: 9,
        }
    }
}

impl MacdParams {
    pub fn validate(&self) -> Result<(), String> {
        if self.fast_period == 0 || self.signal_period == 0 {
            return Err("MACD periods must be positive".to_string());
        }
        if self.fast_period >= self.slow_period {
            return Err(format!(
                "MACD fast period ({}) must be shorter than slow period ({})",
                self.fast_period, self.slow_period
            ));
        }
        Ok(())
    }
}

/// MACD line, signal line and histogram on one shared date index, together
/// with the price each row was computed from.
///
/// All sequences have the same non-zero length and
/// `histogram[t] == macd[t] - signal[t]` for every row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacdSeries {
    dates: Vec<NaiveDate>,
    prices: Vec<f64>,
    macd: Vec<f64>,
    signal: Vec<f64>,
    histogram: Vec<f64>,
}

impl MacdSeries {
    /// Assemble a series from aligned inputs. Rows where any input is
    /// undefined are dropped; an empty result is a computation failure.
    pub fn from_parts(
        dates: Vec<NaiveDate>,
        prices: Vec<f64>,
        macd: Vec<f64>,
        signal: Vec<f64>,
    ) -> Result<Self, AnalysisError> {
        let len = dates.len();
        if prices.len() != len || macd.len() != len || signal.len() != len {
            return Err(AnalysisError::IndicatorComputationFailure(format!(
                "misaligned MACD inputs (dates {}, prices {}, macd {}, signal {})",
                len,
                prices.len(),
                macd.len(),
                signal.len()
            )));
        }

        let mut series = MacdSeries {
            dates: Vec::with_capacity(len),
            prices: Vec::with_capacity(len),
            macd: Vec::with_capacity(len),
            signal: Vec::with_capacity(len),
            histogram: Vec::with_capacity(len),
        };

        for i in 0..len {
            let (p, m, s) = (prices[i], macd[i], signal[i]);
            if !(p.is_finite() && m.is_finite() && s.is_finite()) {
                continue;
            }
            series.dates.push(dates[i]);
            series.prices.push(p);
            series.macd.push(m);
            series.signal.push(s);
            series.histogram.push(m - s);
        }

        if series.is_empty() {
            return Err(AnalysisError::IndicatorComputationFailure(
                "MACD produced no defined values".to_string(),
            ));
        }

        Ok(series)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    pub fn macd(&self) -> &[f64] {
        &self.macd
    }

    pub fn signal(&self) -> &[f64] {
        &self.signal
    }

    pub fn histogram(&self) -> &[f64] {
        &self.histogram
    }
}

/// Moving Average Convergence Divergence (MACD)
///
/// Trend-following momentum indicator showing relationship between two moving averages.
///
/// Components:
/// - MACD Line: fast EMA - slow EMA
/// - Signal Line: EMA of the MACD Line
/// - Histogram: MACD Line - Signal Line
///
/// Signals:
/// - MACD crosses above signal: Bullish signal
/// - MACD crosses below signal: Bearish signal
/// - Histogram widens: Strengthening trend
/// - Histogram narrows: Weakening trend
///
/// Fails with `InsufficientHistory` when the series is shorter than the slow period.
pub fn macd(series: &PriceSeries, params: &MacdParams) -> Result<MacdSeries, AnalysisError> {
    params
        .validate()
        .map_err(AnalysisError::IndicatorComputationFailure)?;

    if series.len() < params.slow_period {
        return Err(AnalysisError::InsufficientHistory {
            context: "MACD".to_string(),
            required: params.slow_period,
            actual: series.len(),
        });
    }

    let prices = series.closes();

    let fast_ema = ema(&prices, params.fast_period);
    let slow_ema = ema(&prices, params.slow_period);

    let macd_line: Vec<f64> = fast_ema
        .iter()
        .zip(slow_ema.iter())
        .map(|(fast, slow)| fast - slow)
        .collect();

    let signal_line = ema(&macd_line, params.signal_period);

    MacdSeries::from_parts(series.dates(), prices, macd_line, signal_line)
}

/// Bollinger Bands
///
/// Volatility indicator consisting of a moving average with upper and lower bands
/// based on standard deviation.
///
/// Components:
/// - Middle Band: SMA of prices
/// - Upper Band: Middle Band + (std_dev * num_std_dev)
/// - Lower Band: Middle Band - (std_dev * num_std_dev)
///
/// The standard deviation is the sample deviation of the window (n - 1).
/// Standard configuration: 20-period SMA, 2 standard deviations.
///
/// Returns: (middle_band, upper_band, lower_band); the first `period - 1` entries are `None`.
pub fn bollinger_bands(
    prices: &[f64],
    period: usize,
    num_std_dev: f64,
) -> (Vec<Option<f64>>, Vec<Option<f64>>, Vec<Option<f64>>) {
    let len = prices.len();
    if period == 0 {
        return (vec![None; len], vec![None; len], vec![None; len]);
    }

    let middle_band = sma(prices, period);

    let mut upper_band: Vec<Option<f64>> = vec![None; len];
    let mut lower_band: Vec<Option<f64>> = vec![None; len];

    for i in 0..len {
        let Some(mean) = middle_band[i] else { continue };
        if period < 2 {
            // sample deviation of a single value is undefined
            continue;
        }

        let window = &prices[i + 1 - period..=i];
        let variance = window
            .iter()
            .map(|&x| {
                let diff = x - mean;
                diff * diff
            })
            .sum::<f64>()
            / (period - 1) as f64;

        let std_dev = variance.sqrt();

        upper_band[i] = Some(mean + num_std_dev * std_dev);
        lower_band[i] = Some(mean - num_std_dev * std_dev);
    }

    (middle_band, upper_band, lower_band)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovingAverage {
    pub period: usize,
    pub values: Vec<Option<f64>>,
}

/// Independent simple moving averages, one per requested period, in request order.
pub fn moving_averages(prices: &[f64], periods: &[usize]) -> Vec<MovingAverage> {
    periods
        .iter()
        .map(|&period| MovingAverage {
            period,
            values: sma(prices, period),
        })
        .collect()
}

pub const DEFAULT_MA_PERIODS: [usize; 3] = [20, 50, 200];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PricePoint;

    fn series_from(values: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        PriceSeries::new(
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| PricePoint::new(start + chrono::Duration::days(i as i64), v))
                .collect(),
        )
    }

    #[test]
    fn test_sma_basic() {
        let values = sma(&[1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(values, vec![None, Some(1.5), Some(2.5), Some(3.5)]);
    }

    #[test]
    fn test_ema_recursive_form() {
        let values = ema(&[10.0, 20.0, 30.0], 3);
        // alpha = 0.5
        assert_eq!(values, vec![10.0, 15.0, 22.5]);
    }

    #[test]
    fn test_ema_empty() {
        assert!(ema(&[], 12).is_empty());
    }

    #[test]
    fn test_rsi_basic() {
        let prices = vec![
            44.0, 44.5, 44.0, 45.0, 44.5, 45.5, 45.0, 46.0, 46.5, 46.0, 47.0, 46.5, 47.5, 47.0,
            48.0, 48.5,
        ];
        let rsi_values = rsi(&prices, 14);

        assert_eq!(rsi_values.len(), prices.len());
        for value in rsi_values.iter().take(14) {
            assert!(value.is_none());
        }
        for value in rsi_values.iter().skip(14) {
            let v = value.expect("RSI should be defined after warm-up");
            assert!((0.0..=100.0).contains(&v));
        }
    }

    #[test]
    fn test_rsi_known_value() {
        // two gains of 1 and one loss of 1 in the window -> RS = 2 -> RSI = 66.67
        let rsi_values = rsi(&[10.0, 11.0, 12.0, 11.0], 3);
        let last = rsi_values[3].unwrap();
        assert!((last - 66.6667).abs() < 1e-3);
    }

    #[test]
    fn test_rsi_saturates_without_losses() {
        let uptrend: Vec<f64> = (0..30).map(|i| 50.0 + i as f64).collect();
        let rsi_values = rsi(&uptrend, 14);
        assert_eq!(rsi_values.last().copied().flatten(), Some(100.0));
    }

    #[test]
    fn test_rsi_downtrend_is_oversold() {
        let downtrend: Vec<f64> = (0..30).map(|i| 80.0 - i as f64).collect();
        let rsi_values = rsi(&downtrend, 14);
        assert_eq!(rsi_values.last().copied().flatten(), Some(0.0));
    }

    #[test]
    fn test_macd_components_are_consistent() {
        let prices: Vec<f64> = (0..60)
            .map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0 + i as f64 * 0.2)
            .collect();
        let series = series_from(&prices);
        let result = macd(&series, &MacdParams::default()).unwrap();

        let fast = ema(&prices, 12);
        let slow = ema(&prices, 26);
        let expected_macd: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
        let expected_signal = ema(&expected_macd, 9);

        assert_eq!(result.len(), prices.len());
        assert_eq!(result.macd(), expected_macd.as_slice());
        assert_eq!(result.signal(), expected_signal.as_slice());
        for i in 0..result.len() {
            assert_eq!(result.histogram()[i], result.macd()[i] - result.signal()[i]);
        }
    }

    #[test]
    fn test_macd_uptrend_is_positive() {
        let prices: Vec<f64> = (0..50).map(|i| 100.0 + (i as f64 * 0.5)).collect();
        let result = macd(&series_from(&prices), &MacdParams::default()).unwrap();
        assert!(*result.macd().last().unwrap() > 0.0);
    }

    #[test]
    fn test_macd_fails_below_slow_period() {
        let prices: Vec<f64> = (0..25).map(|i| 100.0 + i as f64).collect();
        let err = macd(&series_from(&prices), &MacdParams::default()).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::InsufficientHistory {
                required: 26,
                actual: 25,
                ..
            }
        ));
    }

    #[test]
    fn test_macd_accepts_exactly_slow_period() {
        let prices: Vec<f64> = (0..26).map(|i| 100.0 + i as f64).collect();
        let result = macd(&series_from(&prices), &MacdParams::default()).unwrap();
        assert_eq!(result.len(), 26);
    }

    #[test]
    fn test_macd_rejects_invalid_params() {
        let prices: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let params = MacdParams {
            fast_period: 26,
            slow_period: 12,
            signal_period: 9,
        };
        assert!(matches!(
            macd(&series_from(&prices), &params),
            Err(AnalysisError::IndicatorComputationFailure(_))
        ));
    }

    #[test]
    fn test_macd_series_drops_undefined_rows() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let dates = vec![
            d,
            d.succ_opt().unwrap(),
            d.succ_opt().unwrap().succ_opt().unwrap(),
        ];
        let series = MacdSeries::from_parts(
            dates,
            vec![1.0, 2.0, 3.0],
            vec![f64::NAN, 0.5, 0.7],
            vec![0.1, 0.2, 0.3],
        )
        .unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.prices(), &[2.0, 3.0]);
        assert!((series.histogram()[1] - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_macd_series_all_undefined_fails() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let result = MacdSeries::from_parts(vec![d], vec![1.0], vec![f64::NAN], vec![0.0]);
        assert!(matches!(result, Err(AnalysisError::IndicatorComputationFailure(_))));
    }

    #[test]
    fn test_bollinger_bands_flat_prices() {
        let prices: Vec<f64> = vec![100.0; 30];
        let (middle, upper, lower) = bollinger_bands(&prices, 20, 2.0);

        assert_eq!(middle.len(), prices.len());
        assert!(middle[18].is_none());
        assert!(upper[18].is_none());
        assert_eq!(middle[25], Some(100.0));
        assert_eq!(upper[25], Some(100.0));
        assert_eq!(lower[25], Some(100.0));
    }

    #[test]
    fn test_bollinger_bands_sample_std() {
        // window [1, 2, 3]: mean 2, sample std 1
        let (middle, upper, lower) = bollinger_bands(&[1.0, 2.0, 3.0], 3, 2.0);
        assert_eq!(middle[2], Some(2.0));
        assert_eq!(upper[2], Some(4.0));
        assert_eq!(lower[2], Some(0.0));
    }

    #[test]
    fn test_bollinger_bands_volatility() {
        let volatile: Vec<f64> = (0..30)
            .map(|i| 100.0 + ((i as f64 * 2.0).sin() * 10.0))
            .collect();
        let (_, upper_vol, lower_vol) = bollinger_bands(&volatile, 20, 2.0);
        let (_, upper_flat, lower_flat) = bollinger_bands(&vec![100.0; 30], 20, 2.0);

        let vol_width = upper_vol[25].unwrap() - lower_vol[25].unwrap();
        let flat_width = upper_flat[25].unwrap() - lower_flat[25].unwrap();
        assert!(vol_width > flat_width, "Volatile data should have wider Bollinger Bands");
    }

    #[test]
    fn test_moving_averages_independent_periods() {
        let prices: Vec<f64> = (1..=60).map(|i| i as f64).collect();
        let mas = moving_averages(&prices, &DEFAULT_MA_PERIODS);

        assert_eq!(mas.len(), 3);
        assert_eq!(mas[0].period, 20);
        assert_eq!(mas[0].values[59], Some(50.5));
        assert_eq!(mas[1].values[59], Some(35.5));
        // not enough history for the 200-period average
        assert!(mas[2].values.iter().all(|v| v.is_none()));
    }
}
