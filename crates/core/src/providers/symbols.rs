/// Venue labels treated as crypto exchanges. Matching is a case-insensitive
/// substring test, so "Upbit Korea" and "BITHUMB" both qualify.
const CRYPTO_EXCHANGES: [&str; 4] = ["upbit", "bithumb", "coinone", "korbit"];

/// Markers identifying the KRX gold spot market in free-form exchange names.
const GOLD_MARKET_MARKERS: [&str; 2] = ["금현물", "gold"];

/// Fixed provider symbol for gold-market assets.
const GOLD_PROVIDER_SYMBOL: &str = "GC=F";

/// Whether the exchange name refers to a known crypto venue.
#[must_use]
pub fn is_crypto_exchange(exchange: &str) -> bool {
    let lower = exchange.to_lowercase();
    CRYPTO_EXCHANGES.iter().any(|venue| lower.contains(venue))
}

/// Normalize a ticker for the daily-close provider: uppercase + trim.
/// Assets on the gold spot market map to one fixed provider symbol
/// regardless of their stored ticker; everything else passes through.
#[must_use]
pub fn normalize_symbol(ticker: &str, exchange: &str) -> String {
    let lower_exchange = exchange.to_lowercase();
    if GOLD_MARKET_MARKERS
        .iter()
        .any(|marker| lower_exchange.contains(marker))
    {
        return GOLD_PROVIDER_SYMBOL.to_string();
    }
    ticker.trim().to_uppercase()
}
