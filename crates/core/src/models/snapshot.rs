use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One asset's valuation inside a daily snapshot.
///
/// `unit_price` is KRW-denominated; `unit_price_original` is in the asset's
/// native currency. `quantity` is carried explicitly; older snapshots that
/// predate the field fall back to deriving it as
/// `current_value / unit_price` at correction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSnapshot {
    /// Matches `Asset::id`
    pub id: String,

    /// Total valuation of the position in KRW
    pub current_value: f64,

    /// Total purchase cost of the position in KRW
    pub purchase_value: f64,

    /// Units held at snapshot time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,

    /// Per-unit price in KRW
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,

    /// Per-unit price in the asset's native currency
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price_original: Option<f64>,
}

impl AssetSnapshot {
    /// Units held, preferring the explicit field over the stored-valuation
    /// derivation. The divisor defaults to 1 when the unit price is absent
    /// or zero, matching the correction semantics.
    #[must_use]
    pub fn effective_quantity(&self) -> f64 {
        if let Some(q) = self.quantity {
            if q > 0.0 {
                return q;
            }
        }
        let divisor = match self.unit_price {
            Some(p) if p != 0.0 => p,
            _ => 1.0,
        };
        self.current_value / divisor
    }
}

/// One day's recorded valuation of all held assets.
///
/// Sequence invariant: a history is ascending by date with at most one
/// snapshot per date. Snapshots are created by normal daily operation
/// outside this crate and mutated only by price correction; this crate
/// never deletes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub date: NaiveDate,
    pub assets: Vec<AssetSnapshot>,
}

impl PortfolioSnapshot {
    /// A synthetic snapshot for `date` carrying another snapshot's assets
    /// forward unchanged. Used by gap filling.
    #[must_use]
    pub fn carried_forward(date: NaiveDate, source: &PortfolioSnapshot) -> Self {
        Self {
            date,
            assets: source.assets.clone(),
        }
    }
}
