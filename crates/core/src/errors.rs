use thiserror::Error;

/// Unified error type for the entire portfolio-history-core library.
/// Every fallible public function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Provider / Network ──────────────────────────────────────────
    #[error("Provider unavailable ({provider}): {message}")]
    ProviderUnavailable {
        provider: String,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    /// A structurally unexpected payload. Raised by the parse/validate
    /// step at the provider boundary so a malformed response never
    /// propagates missing fields into downstream arithmetic.
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    /// The upstream answered but had nothing for the requested identifier.
    /// Batch close endpoints report this per identifier (absent key, not an
    /// error); single-identifier queries like FX history surface it here.
    #[error("No data for identifier: {0}")]
    NoData(String),

    // ── Business Logic ──────────────────────────────────────────────
    #[error("Validation failed: {0}")]
    Validation(String),
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // Sanitize error message: strip query parameters from URLs to prevent
        // credential leakage. reqwest errors often contain full URLs.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        CoreError::Network(sanitized)
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::MalformedResponse(e.to_string())
    }
}
