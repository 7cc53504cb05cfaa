use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Days, Duration, NaiveDate, Utc};
use tracing::debug;

use crate::models::asset::AssetCategory;
use crate::models::clock::{Clock, SystemClock};
use crate::models::series::{IdentifierHistory, SeriesPoint};
use crate::providers::symbols::normalize_symbol;
use crate::providers::traits::HistoryProvider;
use crate::services::indicators::required_history_days;

/// How long a cached series stays reusable.
const CACHE_TTL_MINUTES: i64 = 10;

/// Default bound on distinct (ticker, exchange) entries.
const DEFAULT_MAX_ENTRIES: usize = 64;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cancellation flag tied to one accessor call.
///
/// The caller holds the token for the lifetime of its interest in the
/// result; cancelling it (or issuing a superseding call) guarantees the
/// in-flight result is fully discarded: no cache write, no state write.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    data: Vec<SeriesPoint>,
    fetched_at: DateTime<Utc>,
    /// The maximum indicator period this series was fetched to support
    max_period_covered: usize,
}

/// Bounded TTL- and coverage-aware cache of fetched close series.
///
/// Explicit and injectable rather than a process-wide singleton: tests
/// construct isolated instances and drive the clock themselves. When full,
/// the entry with the oldest fetch time is evicted.
#[derive(Debug)]
pub struct SeriesCache {
    entries: HashMap<(String, String), CacheEntry>,
    max_entries: usize,
}

impl Default for SeriesCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl SeriesCache {
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            max_entries: max_entries.max(1),
        }
    }

    fn key(ticker: &str, exchange: &str) -> (String, String) {
        (
            ticker.trim().to_uppercase(),
            exchange.trim().to_uppercase(),
        )
    }

    /// A cached series is reusable iff it is younger than the TTL and was
    /// fetched to cover at least the requested period.
    fn lookup(
        &self,
        ticker: &str,
        exchange: &str,
        effective_period: usize,
        now: DateTime<Utc>,
    ) -> Option<Vec<SeriesPoint>> {
        let entry = self.entries.get(&Self::key(ticker, exchange))?;
        let fresh = now - entry.fetched_at < Duration::minutes(CACHE_TTL_MINUTES);
        if fresh && entry.max_period_covered >= effective_period {
            Some(entry.data.clone())
        } else {
            None
        }
    }

    fn insert(
        &mut self,
        ticker: &str,
        exchange: &str,
        data: Vec<SeriesPoint>,
        effective_period: usize,
        now: DateTime<Utc>,
    ) {
        let key = Self::key(ticker, exchange);
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&key) {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.fetched_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                self.entries.remove(&oldest);
            }
        }
        self.entries.insert(
            key,
            CacheEntry {
                data,
                fetched_at: now,
                max_period_covered: effective_period,
            },
        );
    }

    /// Drop every entry older than the TTL.
    pub fn prune_expired(&mut self, now: DateTime<Utc>) {
        self.entries
            .retain(|_, e| now - e.fetched_at < Duration::minutes(CACHE_TTL_MINUTES));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What an interactive caller sees after each accessor cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesState {
    /// The most recent successfully fetched series; retained across
    /// failures so a fetch error degrades instead of blanking the chart
    pub series: Option<Vec<SeriesPoint>>,
    pub loading: bool,
    /// Short user-facing message; cleared on success
    pub error: Option<String>,
}

/// Cache- and cancellation-aware front end over the history provider for
/// interactive consumers.
///
/// Repeated calls with changing parameters are the expected usage; each
/// call supersedes the previous one, and a superseded or cancelled fetch
/// commits nothing (suppression, not last-write-wins). State lives behind
/// mutexes so the check-then-write on TTL/coverage stays serialized in a
/// multi-threaded host.
pub struct HistoricalSeriesAccessor<P: HistoryProvider, C: Clock = SystemClock> {
    provider: Arc<P>,
    clock: C,
    cache: Mutex<SeriesCache>,
    state: Mutex<SeriesState>,
    generation: AtomicU64,
    current_token: Mutex<Option<CancelToken>>,
}

impl<P: HistoryProvider> HistoricalSeriesAccessor<P, SystemClock> {
    pub fn new(provider: Arc<P>) -> Self {
        Self::with_parts(provider, SystemClock, SeriesCache::default())
    }
}

impl<P: HistoryProvider, C: Clock> HistoricalSeriesAccessor<P, C> {
    pub fn with_parts(provider: Arc<P>, clock: C, cache: SeriesCache) -> Self {
        Self {
            provider,
            clock,
            cache: Mutex::new(cache),
            state: Mutex::new(SeriesState::default()),
            generation: AtomicU64::new(0),
            current_token: Mutex::new(None),
        }
    }

    /// A token for the next call, pre-registered so an earlier in-flight
    /// call is superseded immediately.
    #[must_use]
    pub fn issue_token(&self) -> CancelToken {
        let token = CancelToken::new();
        if let Some(previous) = lock(&self.current_token).replace(token.clone()) {
            previous.cancel();
        }
        token
    }

    /// Detach the caller: cancel whatever fetch is currently in flight.
    pub fn detach(&self) {
        if let Some(token) = lock(&self.current_token).take() {
            token.cancel();
        }
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Number of cached series entries.
    #[must_use]
    pub fn cache_entry_count(&self) -> usize {
        lock(&self.cache).len()
    }

    /// Fetch (or serve from cache) the close series needed to chart
    /// `ticker` with a moving average of `requested_ma_period`.
    ///
    /// Cache hit requires freshness within the TTL *and* coverage of the
    /// effective period. Empty or failed fetches are never cached, so each
    /// subsequent attempt retries the provider.
    pub async fn get_historical_series(
        &self,
        ticker: &str,
        exchange: &str,
        category: AssetCategory,
        requested_ma_period: usize,
        token: &CancelToken,
    ) -> SeriesState {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let effective_period = requested_ma_period.max(1);
        let now = self.clock.now();

        if let Some(data) = lock(&self.cache).lookup(ticker, exchange, effective_period, now) {
            debug!(ticker, exchange, %category, "series cache hit");
            return self.commit(generation, token, |state| {
                state.series = Some(data);
                state.loading = false;
                state.error = None;
            });
        }

        self.commit(generation, token, |state| {
            state.loading = true;
            state.error = None;
        });

        let today = now.date_naive();
        let start = today
            .checked_sub_days(Days::new(required_history_days(effective_period) as u64))
            .unwrap_or(today);

        let result = self.fetch_series(ticker, exchange, category, start, today).await;

        // Suppression guarantee: a cancelled or superseded call must not
        // touch the cache or the reported state.
        if token.is_cancelled() || self.generation.load(Ordering::SeqCst) != generation {
            debug!(ticker, exchange, %category, "discarding superseded series fetch");
            return lock(&self.state).clone();
        }

        match result {
            Ok(data) if !data.is_empty() => {
                lock(&self.cache).insert(ticker, exchange, data.clone(), effective_period, now);
                self.commit(generation, token, |state| {
                    state.series = Some(data);
                    state.loading = false;
                    state.error = None;
                })
            }
            Ok(_) => self.commit(generation, token, |state| {
                state.loading = false;
                state.error = Some("No price history available".to_string());
            }),
            Err(e) => {
                debug!(ticker, exchange, %category, error = %e, "series fetch failed");
                self.commit(generation, token, |state| {
                    state.loading = false;
                    state.error = Some("Failed to load price history".to_string());
                })
            }
        }
    }

    async fn fetch_series(
        &self,
        ticker: &str,
        exchange: &str,
        category: AssetCategory,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<SeriesPoint>, crate::errors::CoreError> {
        let symbol = if category == AssetCategory::Crypto {
            ticker.trim().to_uppercase()
        } else {
            normalize_symbol(ticker, exchange)
        };
        let identifiers = [symbol.clone()];

        let mut batch = if category == AssetCategory::Crypto {
            self.provider
                .fetch_crypto_closes(&identifiers, start, end)
                .await?
        } else {
            self.provider
                .fetch_daily_closes(&identifiers, start, end)
                .await?
        };

        Ok(batch
            .remove(&symbol)
            .map(series_points)
            .unwrap_or_default())
    }

    /// Apply a state mutation unless this call has been superseded or
    /// cancelled in the meantime. Returns the resulting state snapshot.
    fn commit(
        &self,
        generation: u64,
        token: &CancelToken,
        mutate: impl FnOnce(&mut SeriesState),
    ) -> SeriesState {
        let mut state = lock(&self.state);
        if !token.is_cancelled() && self.generation.load(Ordering::SeqCst) == generation {
            mutate(&mut state);
        }
        state.clone()
    }
}

fn series_points(history: IdentifierHistory) -> Vec<SeriesPoint> {
    history
        .data
        .iter()
        .map(|(&date, &close)| SeriesPoint {
            date,
            close,
            volume: history.volume.get(&date).copied(),
        })
        .collect()
}
