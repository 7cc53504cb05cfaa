use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::models::series::{IdentifierHistory, QuoteCurrency};
use super::traits::HistoryProvider;

const PROVIDER_NAME: &str = "HistoryRest";

/// REST-backed batch daily-close provider.
///
/// Three endpoints under one base URL, all sharing the same request and
/// response shape:
/// - `POST {base}/history/stocks` for equities / ETFs / commodities
/// - `POST {base}/history/crypto` for crypto symbols, KRW-denominated
/// - `POST {base}/history/fx` for synthetic pair identifiers ("USD/KRW")
///
/// Every response passes through a parse/validate step: unparseable date
/// keys or non-finite prices surface as `CoreError::MalformedResponse`
/// instead of silently flowing into downstream arithmetic.
pub struct RestHistoryProvider {
    client: Client,
    base_url: String,
}

impl RestHistoryProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        let builder = Client::builder().timeout(Duration::from_secs(30));
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
            base_url: base_url.into(),
        }
    }
}

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Serialize)]
struct HistoryRequest<'a> {
    identifiers: &'a [String],
    start_date: String,
    end_date: String,
}

/// Per-identifier payload. `data` absent or empty means "no data for this
/// identifier", which is not an error for the batch.
#[derive(Deserialize)]
struct RawIdentifierHistory {
    data: Option<HashMap<String, f64>>,
    volume: Option<HashMap<String, f64>>,
    #[allow(dead_code)]
    error: Option<String>,
    #[allow(dead_code)]
    ticker: Option<String>,
    #[allow(dead_code)]
    market: Option<String>,
    currency: Option<String>,
}

fn parse_date_key(raw: &str) -> Result<NaiveDate, CoreError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| CoreError::MalformedResponse(format!("bad date key: {raw}")))
}

fn validated_price(identifier: &str, date: NaiveDate, price: f64) -> Result<f64, CoreError> {
    if !price.is_finite() || price < 0.0 {
        return Err(CoreError::MalformedResponse(format!(
            "invalid price {price} for {identifier} on {date}"
        )));
    }
    Ok(price)
}

/// Decode and validate one close-history response body.
///
/// Unparseable JSON, bad date keys and non-finite or negative prices all
/// surface as `CoreError::MalformedResponse`. An identifier whose `data`
/// is absent or null decodes to an empty history, which is not an error.
/// Identifiers without a `currency` field are tagged `default_currency`.
pub fn parse_history_response(
    body: &str,
    default_currency: QuoteCurrency,
) -> Result<HashMap<String, IdentifierHistory>, CoreError> {
    let raw: HashMap<String, RawIdentifierHistory> = serde_json::from_str(body)?;
    validate_batch(raw, default_currency)
}

/// Decode an FX response body down to the requested pair's rate map.
/// A response that validates but lacks the pair is `CoreError::NoData`.
pub fn parse_fx_response(body: &str, pair: &str) -> Result<BTreeMap<NaiveDate, f64>, CoreError> {
    let mut validated = parse_history_response(body, QuoteCurrency::Krw)?;
    validated
        .remove(pair)
        .map(|history| history.data)
        .ok_or_else(|| CoreError::NoData(pair.to_string()))
}

fn validate_batch(
    raw: HashMap<String, RawIdentifierHistory>,
    default_currency: QuoteCurrency,
) -> Result<HashMap<String, IdentifierHistory>, CoreError> {
    let mut out = HashMap::with_capacity(raw.len());
    for (identifier, entry) in raw {
        let quote_currency = match entry.currency.as_deref() {
            Some(c) if c.eq_ignore_ascii_case("KRW") => QuoteCurrency::Krw,
            Some(c) if c.eq_ignore_ascii_case("USD") => QuoteCurrency::Usd,
            Some(_) => QuoteCurrency::Other,
            None => default_currency,
        };
        let mut history = IdentifierHistory::new(quote_currency);
        for (date_str, price) in entry.data.unwrap_or_default() {
            let date = parse_date_key(&date_str)?;
            history
                .data
                .insert(date, validated_price(&identifier, date, price)?);
        }
        for (date_str, volume) in entry.volume.unwrap_or_default() {
            let date = parse_date_key(&date_str)?;
            if volume.is_finite() && volume >= 0.0 {
                history.volume.insert(date, volume);
            }
        }
        out.insert(identifier, history);
    }
    Ok(out)
}

impl RestHistoryProvider {
    async fn post_history(
        &self,
        path: &str,
        identifiers: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<String, CoreError> {
        if identifiers.is_empty() {
            return Err(CoreError::Validation(
                "history request needs at least one identifier".into(),
            ));
        }

        let url = format!("{}/{path}", self.base_url);
        let request = HistoryRequest {
            identifiers,
            start_date: start.format("%Y-%m-%d").to_string(),
            end_date: end.format("%Y-%m-%d").to_string(),
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(CoreError::ProviderUnavailable {
                provider: PROVIDER_NAME.into(),
                message: format!("{path} returned HTTP {}", response.status()),
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl HistoryProvider for RestHistoryProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn fetch_daily_closes(
        &self,
        identifiers: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HashMap<String, IdentifierHistory>, CoreError> {
        let body = self
            .post_history("history/stocks", identifiers, start, end)
            .await?;
        parse_history_response(&body, QuoteCurrency::Other)
    }

    async fn fetch_crypto_closes(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HashMap<String, IdentifierHistory>, CoreError> {
        let body = self
            .post_history("history/crypto", symbols, start, end)
            .await?;
        // Known crypto venues quote in KRW; the tag makes that explicit.
        parse_history_response(&body, QuoteCurrency::Krw)
    }

    async fn fetch_fx_history(
        &self,
        pair: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, f64>, CoreError> {
        let identifiers = [pair.to_string()];
        let body = self
            .post_history("history/fx", &identifiers, start, end)
            .await?;
        parse_fx_response(&body, pair)
    }
}
