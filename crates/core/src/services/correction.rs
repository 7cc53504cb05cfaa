use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use futures::join;
use tracing::{debug, warn};

use crate::errors::CoreError;
use crate::models::asset::{Asset, AssetCategory};
use crate::models::clock::{Clock, SystemClock};
use crate::models::series::{IdentifierHistory, QuoteCurrency};
use crate::models::snapshot::{AssetSnapshot, PortfolioSnapshot};
use crate::providers::symbols::{is_crypto_exchange, normalize_symbol};
use crate::providers::traits::{HistoryProvider, USD_KRW_PAIR};
use crate::services::gap_fill::{fill_all_missing_dates, missing_date_range};

/// Hard cap on how many dates one reconciliation pass corrects/backfills.
/// Older history is left for a later pass.
const MAX_CORRECTION_DATES: usize = 90;

/// Today's FX rates, currency code → KRW-per-unit. Used only as a fallback
/// when the fetched FX history has no rate for a given date.
pub type CurrentFxRates = HashMap<String, f64>;

/// Orchestrates the daily reconciliation pass: fetches authoritative closes
/// and FX history, corrects intraday-sourced snapshot valuations, backfills
/// missing dates, and merges the result.
///
/// Never fails: any error anywhere in the pipeline degrades to plain
/// calendar interpolation (`fill_all_missing_dates`), so portfolio history
/// still renders with carried-forward stale valuations rather than blocking.
pub struct PriceCorrectionEngine<P: HistoryProvider, C: Clock = SystemClock> {
    provider: Arc<P>,
    clock: C,
}

impl<P: HistoryProvider> PriceCorrectionEngine<P, SystemClock> {
    pub fn new(provider: Arc<P>) -> Self {
        Self::with_clock(provider, SystemClock)
    }
}

impl<P: HistoryProvider, C: Clock> PriceCorrectionEngine<P, C> {
    pub fn with_clock(provider: Arc<P>, clock: C) -> Self {
        Self { provider, clock }
    }

    /// Reconcile a valuation history against authoritative daily closes.
    pub async fn reconcile_history(
        &self,
        history: Vec<PortfolioSnapshot>,
        assets: &[Asset],
        current_rates: &CurrentFxRates,
    ) -> Vec<PortfolioSnapshot> {
        let today = self.clock.today();
        match self
            .try_reconcile(history.clone(), assets, current_rates, today)
            .await
        {
            Ok(reconciled) => reconciled,
            Err(e) => {
                warn!(error = %e, "reconciliation failed, falling back to calendar interpolation");
                fill_all_missing_dates(history, today)
            }
        }
    }

    async fn try_reconcile(
        &self,
        history: Vec<PortfolioSnapshot>,
        assets: &[Asset],
        current_rates: &CurrentFxRates,
        today: NaiveDate,
    ) -> Result<Vec<PortfolioSnapshot>, CoreError> {
        let Some(latest) = history.iter().max_by_key(|s| s.date) else {
            return Ok(fill_all_missing_dates(history, today));
        };

        // 1. Correctable assets: present in the latest snapshot, with a
        //    master record, and not cash (cash has no market price).
        let assets_by_id: HashMap<&str, &Asset> =
            assets.iter().map(|a| (a.id.as_str(), a)).collect();
        let correctable: Vec<&Asset> = latest
            .assets
            .iter()
            .filter_map(|snap| assets_by_id.get(snap.id.as_str()).copied())
            .filter(|a| a.category != AssetCategory::Cash)
            .collect();

        // 2. Crypto vs everything else, by venue name.
        let (crypto_assets, market_assets): (Vec<&Asset>, Vec<&Asset>) = correctable
            .into_iter()
            .partition(|a| is_crypto_exchange(&a.exchange));

        // 3. Nothing to correct, plain interpolation.
        if crypto_assets.is_empty() && market_assets.is_empty() {
            return Ok(fill_all_missing_dates(history, today));
        }

        // 4. Correction targets: every existing non-today date, plus the
        //    missing range, capped at the most recent dates.
        let mut targets: BTreeSet<NaiveDate> = history
            .iter()
            .map(|s| s.date)
            .filter(|&d| d != today)
            .collect();
        if let Some(missing) = missing_date_range(&history, today) {
            targets.extend(missing.dates);
        }
        while targets.len() > MAX_CORRECTION_DATES {
            targets.pop_first();
        }

        let (Some(&start), Some(&end)) = (targets.iter().next(), targets.iter().last()) else {
            return Ok(fill_all_missing_dates(history, today));
        };

        let market_symbols = dedup_symbols(
            market_assets
                .iter()
                .map(|a| normalize_symbol(&a.ticker, &a.exchange)),
        );
        let crypto_symbols = dedup_symbols(
            crypto_assets.iter().map(|a| a.ticker.trim().to_uppercase()),
        );

        // 5. Three concurrent fetches, each failing soft to empty data so
        //    one provider outage never blocks the other two.
        let (stock_closes, crypto_closes, fx_history) = join!(
            self.fetch_closes_soft(&market_symbols, start, end, false),
            self.fetch_closes_soft(&crypto_symbols, start, end, true),
            self.fetch_fx_soft(start, end),
        );

        // 6. All three empty means nothing was fetched and nothing can be corrected.
        let no_stock = stock_closes.values().all(IdentifierHistory::is_empty);
        let no_crypto = crypto_closes.values().all(IdentifierHistory::is_empty);
        if no_stock && no_crypto && fx_history.is_empty() {
            debug!("no provider data for correction range {start}..{end}");
            return Ok(fill_all_missing_dates(history, today));
        }

        let ctx = CorrectionContext {
            assets_by_id: &assets_by_id,
            stock_closes: &stock_closes,
            crypto_closes: &crypto_closes,
            fx_history: &fx_history,
            fallback_usd_krw: current_rates.get("USD").copied(),
        };

        // 7+8. Correct every existing non-today snapshot, then synthesize
        //      one snapshot per missing target date from the latest
        //      snapshot's asset membership.
        let existing_dates: BTreeSet<NaiveDate> = history.iter().map(|s| s.date).collect();

        let mut merged: BTreeMap<NaiveDate, PortfolioSnapshot> = BTreeMap::new();
        for date in targets.iter().filter(|d| !existing_dates.contains(d)) {
            merged.insert(
                *date,
                PortfolioSnapshot {
                    date: *date,
                    assets: ctx.correct_assets(*date, &latest.assets),
                },
            );
        }

        // 9. Existing dates take precedence over synthesized ones.
        for snapshot in &history {
            let corrected = if snapshot.date == today {
                snapshot.clone()
            } else {
                PortfolioSnapshot {
                    date: snapshot.date,
                    assets: ctx.correct_assets(snapshot.date, &snapshot.assets),
                }
            };
            merged.insert(snapshot.date, corrected);
        }

        // Final safety pass closes any gap the merge left behind.
        Ok(fill_all_missing_dates(
            merged.into_values().collect(),
            today,
        ))
    }

    async fn fetch_closes_soft(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
        crypto: bool,
    ) -> HashMap<String, IdentifierHistory> {
        if symbols.is_empty() {
            return HashMap::new();
        }
        let result = if crypto {
            self.provider.fetch_crypto_closes(symbols, start, end).await
        } else {
            self.provider.fetch_daily_closes(symbols, start, end).await
        };
        match result {
            Ok(closes) => closes,
            Err(e) => {
                warn!(provider = self.provider.name(), crypto, error = %e,
                    "close fetch failed, continuing without this group");
                HashMap::new()
            }
        }
    }

    async fn fetch_fx_soft(&self, start: NaiveDate, end: NaiveDate) -> BTreeMap<NaiveDate, f64> {
        match self
            .provider
            .fetch_fx_history(USD_KRW_PAIR, start, end)
            .await
        {
            Ok(rates) => rates,
            Err(e) => {
                warn!(provider = self.provider.name(), error = %e,
                    "FX history fetch failed, falling back to current rates");
                BTreeMap::new()
            }
        }
    }
}

fn dedup_symbols(symbols: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    symbols.filter(|s| seen.insert(s.clone())).collect()
}

/// Everything the per-date, per-asset correction needs to look up.
struct CorrectionContext<'a> {
    assets_by_id: &'a HashMap<&'a str, &'a Asset>,
    stock_closes: &'a HashMap<String, IdentifierHistory>,
    crypto_closes: &'a HashMap<String, IdentifierHistory>,
    fx_history: &'a BTreeMap<NaiveDate, f64>,
    fallback_usd_krw: Option<f64>,
}

impl CorrectionContext<'_> {
    fn correct_assets(&self, date: NaiveDate, assets: &[AssetSnapshot]) -> Vec<AssetSnapshot> {
        assets
            .iter()
            .map(|snap| self.correct_asset(date, snap))
            .collect()
    }

    fn correct_asset(&self, date: NaiveDate, snap: &AssetSnapshot) -> AssetSnapshot {
        let Some(asset) = self.assets_by_id.get(snap.id.as_str()) else {
            return snap.clone();
        };
        if asset.category == AssetCategory::Cash {
            return snap.clone();
        }

        // The position did not exist yet on this date.
        if asset.purchase_date > date {
            return AssetSnapshot {
                id: snap.id.clone(),
                current_value: 0.0,
                purchase_value: 0.0,
                quantity: Some(0.0),
                unit_price: None,
                unit_price_original: None,
            };
        }

        if is_crypto_exchange(&asset.exchange) {
            self.correct_crypto(date, snap, asset)
        } else {
            self.correct_market(date, snap, asset)
        }
    }

    fn correct_crypto(
        &self,
        date: NaiveDate,
        snap: &AssetSnapshot,
        asset: &Asset,
    ) -> AssetSnapshot {
        let symbol = asset.ticker.trim().to_uppercase();
        let prefixed = format!("KRW-{symbol}");
        let history = self
            .crypto_closes
            .get(&symbol)
            .or_else(|| self.crypto_closes.get(&prefixed));

        let Some((close, quote_currency)) =
            history.and_then(|h| h.data.get(&date).map(|c| (*c, h.quote_currency)))
        else {
            return snap.clone();
        };

        // The quote carries its own currency tag; KRW is the normal case
        // for the supported venues.
        let krw_price = match quote_currency {
            QuoteCurrency::Krw => Some(close),
            QuoteCurrency::Usd => self.usd_to_krw(date).map(|rate| close * rate),
            QuoteCurrency::Other => snap.unit_price,
        };

        apply_unit_price(snap, close, krw_price)
    }

    fn correct_market(
        &self,
        date: NaiveDate,
        snap: &AssetSnapshot,
        asset: &Asset,
    ) -> AssetSnapshot {
        let symbol = normalize_symbol(&asset.ticker, &asset.exchange);
        let Some(close) = self
            .stock_closes
            .get(&symbol)
            .and_then(|h| h.data.get(&date).copied())
        else {
            return snap.clone();
        };

        let krw_price = match asset.currency.to_uppercase().as_str() {
            "KRW" => Some(close),
            "USD" => self.usd_to_krw(date).map(|rate| close * rate),
            // Unsupported currency: keep the previously stored KRW price.
            _ => snap.unit_price,
        };

        apply_unit_price(snap, close, krw_price)
    }

    fn usd_to_krw(&self, date: NaiveDate) -> Option<f64> {
        self.fx_history
            .get(&date)
            .copied()
            .or(self.fallback_usd_krw)
    }
}

/// Rewrite one asset snapshot around an authoritative close. The quantity is
/// taken from the explicit field when present, derived from the stored
/// valuation otherwise, and always written back explicitly.
fn apply_unit_price(
    snap: &AssetSnapshot,
    native_price: f64,
    krw_price: Option<f64>,
) -> AssetSnapshot {
    let quantity = snap.effective_quantity();
    let (unit_price, current_value) = match krw_price {
        Some(price) => (Some(price), quantity * price),
        // No usable KRW rate: record the native close, keep the valuation.
        None => (snap.unit_price, snap.current_value),
    };

    AssetSnapshot {
        id: snap.id.clone(),
        current_value,
        purchase_value: snap.purchase_value,
        quantity: Some(quantity),
        unit_price,
        unit_price_original: Some(native_price),
    }
}
