pub mod errors;
pub mod models;
pub mod providers;
pub mod services;

use std::sync::Arc;

use models::asset::{Asset, AssetCategory};
use models::clock::{Clock, SystemClock};
use models::snapshot::PortfolioSnapshot;
use providers::traits::HistoryProvider;
use services::correction::{CurrentFxRates, PriceCorrectionEngine};
use services::series_cache::{CancelToken, HistoricalSeriesAccessor, SeriesCache, SeriesState};

pub use errors::CoreError;
pub use models::series::{ChartDataPoint, MaConfig, SeriesPoint};
pub use services::chart_series::build_series;
pub use services::gap_fill::{fill_all_missing_dates, fill_missing_dates, missing_date_range};
pub use services::indicators::{compute_rsi, compute_rsi_default, compute_sma};

/// Main entry point for the portfolio-history core.
///
/// Wires one upstream history provider into the reconciliation engine and
/// the cached series accessor. The pure building blocks (gap filling,
/// indicators, chart assembly) are re-exported as free functions and need
/// no instance.
#[must_use]
pub struct PortfolioHistory<P: HistoryProvider, C: Clock + Clone = SystemClock> {
    correction: PriceCorrectionEngine<P, C>,
    accessor: HistoricalSeriesAccessor<P, C>,
    clock: C,
}

impl<P: HistoryProvider> PortfolioHistory<P, SystemClock> {
    pub fn new(provider: Arc<P>) -> Self {
        Self::with_parts(provider, SystemClock, SeriesCache::default())
    }
}

impl<P: HistoryProvider, C: Clock + Clone> PortfolioHistory<P, C> {
    /// Build with an explicit clock and cache, so tests control time and
    /// cache contents.
    pub fn with_parts(provider: Arc<P>, clock: C, cache: SeriesCache) -> Self {
        Self {
            correction: PriceCorrectionEngine::with_clock(Arc::clone(&provider), clock.clone()),
            accessor: HistoricalSeriesAccessor::with_parts(provider, clock.clone(), cache),
            clock,
        }
    }

    // ── Reconciliation ──────────────────────────────────────────────

    /// Fill gaps and correct intraday-sourced valuations against
    /// authoritative daily closes. Never fails; every error path degrades
    /// to calendar interpolation.
    pub async fn reconcile_history(
        &self,
        history: Vec<PortfolioSnapshot>,
        assets: &[Asset],
        current_rates: &CurrentFxRates,
    ) -> Vec<PortfolioSnapshot> {
        self.correction
            .reconcile_history(history, assets, current_rates)
            .await
    }

    /// Calendar interpolation only, no provider calls.
    #[must_use]
    pub fn interpolate_history(&self, history: Vec<PortfolioSnapshot>) -> Vec<PortfolioSnapshot> {
        fill_all_missing_dates(history, self.clock.today())
    }

    // ── Interactive series access ───────────────────────────────────

    /// A cancellation token for the next `get_historical_series` call.
    /// Issuing a new token supersedes the previous in-flight call.
    #[must_use]
    pub fn issue_token(&self) -> CancelToken {
        self.accessor.issue_token()
    }

    /// Cancel whatever series fetch is currently in flight.
    pub fn detach(&self) {
        self.accessor.detach();
    }

    /// Cache- and cancellation-aware close-series accessor; see
    /// [`HistoricalSeriesAccessor::get_historical_series`].
    pub async fn get_historical_series(
        &self,
        ticker: &str,
        exchange: &str,
        category: AssetCategory,
        requested_ma_period: usize,
        token: &CancelToken,
    ) -> SeriesState {
        self.accessor
            .get_historical_series(ticker, exchange, category, requested_ma_period, token)
            .await
    }

    // ── Cache Inspection ────────────────────────────────────────────

    /// Number of distinct (ticker, exchange) series currently cached.
    #[must_use]
    pub fn cache_entry_count(&self) -> usize {
        self.accessor.cache_entry_count()
    }
}
