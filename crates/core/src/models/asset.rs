use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The category of a tracked asset.
/// Determines which provider endpoint serves its daily closes and whether
/// the asset participates in price correction at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetCategory {
    /// Equities (e.g., 005930.KS, AAPL)
    Stock,
    /// Exchange-traded funds
    Etf,
    /// Cryptocurrencies (BTC, ETH, etc.)
    Crypto,
    /// Commodities (e.g., KRX gold spot)
    Commodity,
    /// Cash balances have no market price and are never corrected
    Cash,
}

impl std::fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetCategory::Stock => write!(f, "Stock"),
            AssetCategory::Etf => write!(f, "ETF"),
            AssetCategory::Crypto => write!(f, "Crypto"),
            AssetCategory::Commodity => write!(f, "Commodity"),
            AssetCategory::Cash => write!(f, "Cash"),
        }
    }
}

/// A tracked asset's master record.
///
/// Read-only to this crate: the reconciliation pipeline consumes assets to
/// resolve tickers, currencies and purchase dates, but never mutates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Stable identifier, matches `AssetSnapshot::id` in valuation history
    pub id: String,

    pub category: AssetCategory,

    /// Ticker symbol as entered by the user (e.g., "005930", "BTC")
    pub ticker: String,

    /// Exchange / venue name (e.g., "KRX", "NASDAQ", "Upbit")
    pub exchange: String,

    /// Native quote currency of the asset (e.g., "KRW", "USD")
    pub currency: String,

    pub purchase_date: NaiveDate,

    /// Purchase price per unit in the native currency
    pub purchase_price: f64,

    /// KRW-per-unit rate locked in at purchase time, if recorded
    pub purchase_exchange_rate: Option<f64>,
}
