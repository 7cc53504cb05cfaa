// ═══════════════════════════════════════════════════════════════════
// Provider Boundary Tests (response validation, FX extraction,
// symbol normalization)
// ═══════════════════════════════════════════════════════════════════

use chrono::NaiveDate;

use portfolio_history_core::errors::CoreError;
use portfolio_history_core::models::series::QuoteCurrency;
use portfolio_history_core::providers::rest::{parse_fx_response, parse_history_response};
use portfolio_history_core::providers::symbols::{is_crypto_exchange, normalize_symbol};
use portfolio_history_core::providers::traits::USD_KRW_PAIR;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

// ═══════════════════════════════════════════════════════════════════
//  Response validation
// ═══════════════════════════════════════════════════════════════════

mod response_validation {
    use super::*;

    #[test]
    fn well_formed_body_parses_with_volume_and_currency() {
        let body = r#"{
            "AAPL": {
                "data": {"2024-03-08": 200.5, "2024-03-09": 210.0},
                "volume": {"2024-03-08": 54000000.0},
                "currency": "USD"
            }
        }"#;

        let batch = parse_history_response(body, QuoteCurrency::Other).unwrap();
        let history = &batch["AAPL"];
        assert_eq!(history.data[&d(2024, 3, 8)], 200.5);
        assert_eq!(history.data[&d(2024, 3, 9)], 210.0);
        assert_eq!(history.volume[&d(2024, 3, 8)], 54_000_000.0);
        assert_eq!(history.quote_currency, QuoteCurrency::Usd);
    }

    #[test]
    fn unparseable_body_is_malformed() {
        let err = parse_history_response("not json at all", QuoteCurrency::Krw).unwrap_err();
        assert!(matches!(err, CoreError::MalformedResponse(_)), "got {err}");
    }

    #[test]
    fn bad_date_key_is_malformed() {
        let body = r#"{"AAPL": {"data": {"03/08/2024": 200.0}}}"#;
        let err = parse_history_response(body, QuoteCurrency::Other).unwrap_err();
        assert!(matches!(err, CoreError::MalformedResponse(_)), "got {err}");
    }

    #[test]
    fn negative_price_is_malformed() {
        let body = r#"{"AAPL": {"data": {"2024-03-08": -1.0}}}"#;
        let err = parse_history_response(body, QuoteCurrency::Other).unwrap_err();
        assert!(matches!(err, CoreError::MalformedResponse(_)), "got {err}");
    }

    #[test]
    fn null_data_is_empty_history_not_an_error() {
        // "nothing for this identifier" is a per-identifier condition,
        // never a batch failure
        let body = r#"{"AAPL": {"data": null}, "MSFT": {}}"#;
        let batch = parse_history_response(body, QuoteCurrency::Other).unwrap();
        assert!(batch["AAPL"].is_empty());
        assert!(batch["MSFT"].is_empty());
    }

    #[test]
    fn missing_currency_takes_the_endpoint_default() {
        let body = r#"{"BTC": {"data": {"2024-03-08": 120.0}}}"#;
        let crypto = parse_history_response(body, QuoteCurrency::Krw).unwrap();
        assert_eq!(crypto["BTC"].quote_currency, QuoteCurrency::Krw);

        let stocks = parse_history_response(body, QuoteCurrency::Other).unwrap();
        assert_eq!(stocks["BTC"].quote_currency, QuoteCurrency::Other);
    }

    #[test]
    fn explicit_currency_overrides_the_default() {
        let body = r#"{
            "A": {"data": {"2024-03-08": 1.0}, "currency": "krw"},
            "B": {"data": {"2024-03-08": 1.0}, "currency": "usd"},
            "C": {"data": {"2024-03-08": 1.0}, "currency": "JPY"}
        }"#;
        let batch = parse_history_response(body, QuoteCurrency::Krw).unwrap();
        assert_eq!(batch["A"].quote_currency, QuoteCurrency::Krw);
        assert_eq!(batch["B"].quote_currency, QuoteCurrency::Usd);
        assert_eq!(batch["C"].quote_currency, QuoteCurrency::Other);
    }

    #[test]
    fn invalid_volume_is_dropped_silently() {
        // volume is best-effort; a bad entry never fails the batch
        let body = r#"{"AAPL": {
            "data": {"2024-03-08": 200.0},
            "volume": {"2024-03-08": -5.0}
        }}"#;
        let batch = parse_history_response(body, QuoteCurrency::Other).unwrap();
        assert_eq!(batch["AAPL"].data[&d(2024, 3, 8)], 200.0);
        assert!(batch["AAPL"].volume.is_empty());
    }
}

// ═══════════════════════════════════════════════════════════════════
//  FX extraction
// ═══════════════════════════════════════════════════════════════════

mod fx_extraction {
    use super::*;

    #[test]
    fn rate_map_extracted_for_the_requested_pair() {
        let body = r#"{"USD/KRW": {"data": {"2024-03-08": 1300.0, "2024-03-09": 1310.0}}}"#;
        let rates = parse_fx_response(body, USD_KRW_PAIR).unwrap();
        assert_eq!(rates[&d(2024, 3, 8)], 1300.0);
        assert_eq!(rates[&d(2024, 3, 9)], 1310.0);
    }

    #[test]
    fn missing_pair_is_no_data() {
        let err = parse_fx_response("{}", USD_KRW_PAIR).unwrap_err();
        assert!(
            matches!(&err, CoreError::NoData(pair) if pair == USD_KRW_PAIR),
            "got {err}"
        );
    }

    #[test]
    fn malformed_fx_body_is_malformed_not_no_data() {
        let body = r#"{"USD/KRW": {"data": {"2024-13-40": 1300.0}}}"#;
        let err = parse_fx_response(body, USD_KRW_PAIR).unwrap_err();
        assert!(matches!(err, CoreError::MalformedResponse(_)), "got {err}");
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Symbol normalization
// ═══════════════════════════════════════════════════════════════════

mod symbol_normalization {
    use super::*;

    #[test]
    fn gold_market_maps_to_fixed_symbol() {
        assert_eq!(normalize_symbol("미니금", "KRX 금현물"), "GC=F");
        assert_eq!(normalize_symbol("whatever", "Gold Spot"), "GC=F");
        assert_eq!(normalize_symbol("x", "GOLD"), "GC=F");
    }

    #[test]
    fn other_tickers_are_trimmed_and_uppercased() {
        assert_eq!(normalize_symbol(" aapl ", "NASDAQ"), "AAPL");
        assert_eq!(normalize_symbol("005930", "KRX"), "005930");
    }

    #[test]
    fn golden_ticker_on_a_stock_exchange_passes_through() {
        // only the exchange name marks the gold market, never the ticker
        assert_eq!(normalize_symbol("gold", "NYSE"), "GOLD");
    }

    #[test]
    fn crypto_venues_match_case_insensitive_substring() {
        assert!(is_crypto_exchange("Upbit"));
        assert!(is_crypto_exchange("BITHUMB"));
        assert!(is_crypto_exchange("Coinone Korea"));
        assert!(is_crypto_exchange("korbit"));
    }

    #[test]
    fn non_crypto_venues_are_rejected() {
        assert!(!is_crypto_exchange("NASDAQ"));
        assert!(!is_crypto_exchange("KRX"));
        assert!(!is_crypto_exchange(""));
    }
}
