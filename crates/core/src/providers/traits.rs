use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::CoreError;
use crate::models::series::IdentifierHistory;

/// Synthetic pair identifier used for USD/KRW rate history requests.
pub const USD_KRW_PAIR: &str = "USD/KRW";

/// Trait abstraction for the upstream daily-close history provider.
///
/// The reconciliation pipeline only ever talks to this trait; tests swap in
/// mock implementations, and a provider change touches exactly one module.
///
/// Batch semantics: an identifier that is absent from the response, or
/// present without a populated `data` map, means "no data for that
/// identifier"; it is never an error for the whole batch.
#[async_trait]
pub trait HistoryProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors).
    fn name(&self) -> &str;

    /// Daily-close history for equities / ETFs / commodities.
    /// Keys of the returned map are the requested identifiers.
    async fn fetch_daily_closes(
        &self,
        identifiers: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HashMap<String, IdentifierHistory>, CoreError>;

    /// Crypto daily-close history, keyed by crypto symbol.
    /// Returned series are tagged `QuoteCurrency::Krw`.
    async fn fetch_crypto_closes(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HashMap<String, IdentifierHistory>, CoreError>;

    /// FX rate history for a synthetic pair identifier such as
    /// [`USD_KRW_PAIR`]. The map is date → KRW-per-unit rate.
    async fn fetch_fx_history(
        &self,
        pair: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, f64>, CoreError>;
}
