use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Quote currency of a fetched price series.
///
/// Carried as an explicit tag on every series instead of being inferred
/// downstream from venue names, so the correction engine never has to
/// guess what a close is denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuoteCurrency {
    Krw,
    Usd,
    /// Anything else, passed through uncorrected
    Other,
}

/// Authoritative daily-close history for one identifier, as fetched.
/// Immutable once retrieved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentifierHistory {
    /// date → official closing price
    pub data: BTreeMap<NaiveDate, f64>,

    /// date → traded volume, when the provider reports it
    #[serde(default)]
    pub volume: BTreeMap<NaiveDate, f64>,

    /// What the closes are denominated in
    pub quote_currency: QuoteCurrency,
}

impl IdentifierHistory {
    #[must_use]
    pub fn new(quote_currency: QuoteCurrency) -> Self {
        Self {
            data: BTreeMap::new(),
            volume: BTreeMap::new(),
            quote_currency,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// One point of a display-ready close series: date, close, optional volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub close: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

/// Moving-average configuration as requested by the caller.
/// Presentation attributes (color, line style) are out of scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaConfig {
    pub period: usize,
    pub enabled: bool,
}

/// A single data point for chart rendering.
///
/// The core computes all the numbers; the frontend only renders.
/// Optional keys are omitted (not null) when unavailable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDataPoint {
    /// Short display label, "MM/DD"
    pub date: String,

    /// Full ISO date for tooltips and keying
    pub full_date: NaiveDate,

    /// Closing price, passed through unrounded
    pub price: f64,

    /// Present only when the day's volume exists and is > 0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,

    /// "MA{period}" → value rounded to 2 decimals; a key is present iff
    /// that SMA is defined at this index
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub moving_averages: BTreeMap<String, f64>,
}
