use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

// A single closing price for a trading day (or the last day of a resampled bucket).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// Bar resolution requested from the market-data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1d")]
    Daily,
    #[serde(rename = "1wk")]
    Weekly,
    #[serde(rename = "1mo")]
    Monthly,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Daily => "1d",
            Interval::Weekly => "1wk",
            Interval::Monthly => "1mo",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "1d" => Some(Interval::Daily),
            "1wk" => Some(Interval::Weekly),
            "1mo" => Some(Interval::Monthly),
            _ => None,
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ordered price history.
///
/// Construction sorts by date, keeps the last value seen for a duplicated
/// date and discards negative or non-finite closes, so dates are strictly
/// increasing and every value is usable by the indicator engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(mut points: Vec<PricePoint>) -> Self {
        points.retain(|p| p.close.is_finite() && p.close >= 0.0);
        // stable sort keeps input order among equal dates, so the last one wins below
        points.sort_by_key(|p| p.date);

        let mut deduped: Vec<PricePoint> = Vec::with_capacity(points.len());
        for point in points {
            match deduped.last_mut() {
                Some(last) if last.date == point.date => *last = point,
                _ => deduped.push(point),
            }
        }

        Self { points: deduped }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    /// Last close of every ISO week (Monday to Sunday).
    pub fn resample_weekly(&self) -> PriceSeries {
        self.resample_by(|date| {
            let week = date.iso_week();
            (week.year(), week.week())
        })
    }

    /// Last close of every calendar month.
    pub fn resample_monthly(&self) -> PriceSeries {
        self.resample_by(|date| (date.year(), date.month()))
    }

    // Buckets are contiguous because points are sorted; each bucket is
    // labelled with the date of its last observation.
    fn resample_by<K, F>(&self, key: F) -> PriceSeries
    where
        K: PartialEq,
        F: Fn(&NaiveDate) -> K,
    {
        let mut out: Vec<PricePoint> = Vec::new();
        let mut current: Option<K> = None;

        for point in &self.points {
            let k = key(&point.date);
            if current.as_ref() == Some(&k) {
                if let Some(last) = out.last_mut() {
                    *last = *point;
                }
            } else {
                out.push(*point);
                current = Some(k);
            }
        }

        PriceSeries { points: out }
    }
}
