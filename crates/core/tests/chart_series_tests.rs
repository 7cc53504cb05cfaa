// ═══════════════════════════════════════════════════════════════════
// Chart Series Tests (build_series display assembly)
// ═══════════════════════════════════════════════════════════════════

use chrono::NaiveDate;

use portfolio_history_core::models::series::{MaConfig, SeriesPoint};
use portfolio_history_core::build_series;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// `count` consecutive daily points starting 2024-01-01, close = 100 + i.
fn points(count: usize) -> Vec<SeriesPoint> {
    (0..count)
        .map(|i| SeriesPoint {
            date: d(2024, 1, 1) + chrono::Days::new(i as u64),
            close: 100.0 + i as f64,
            volume: None,
        })
        .collect()
}

fn ma(period: usize) -> MaConfig {
    MaConfig {
        period,
        enabled: true,
    }
}

#[test]
fn no_enabled_periods_emits_everything() {
    let series = build_series(&points(10), &[]);
    assert_eq!(series.len(), 10);
    assert!(series.iter().all(|p| p.moving_averages.is_empty()));
}

#[test]
fn disabled_configs_are_ignored() {
    let series = build_series(
        &points(10),
        &[MaConfig {
            period: 5,
            enabled: false,
        }],
    );
    assert!(series.iter().all(|p| p.moving_averages.is_empty()));
}

#[test]
fn trims_warm_up_but_keeps_last_30_points() {
    // 40 points, MA20: display_start = min(19, 40 - 30) = 10.
    let series = build_series(&points(40), &[ma(20)]);
    assert_eq!(series.len(), 30);
    assert_eq!(series[0].full_date, d(2024, 1, 11));

    // Indices 10..18 of the source are inside the warm-up → no MA key.
    assert!(series[..9].iter().all(|p| p.moving_averages.is_empty()));
    // Source index 19 is the first defined MA20 value.
    assert!(series[9].moving_averages.contains_key("MA20"));
    assert!(series[9..].iter().all(|p| p.moving_averages.contains_key("MA20")));
}

#[test]
fn long_history_trims_full_warm_up() {
    // 100 points, MA20: display_start = min(19, 70) = 19 → every emitted
    // point has a defined MA.
    let series = build_series(&points(100), &[ma(20)]);
    assert_eq!(series.len(), 81);
    assert!(series.iter().all(|p| p.moving_averages.contains_key("MA20")));
}

#[test]
fn short_history_shows_everything_even_without_ma() {
    // 10 points, MA20: nothing can be trimmed.
    let series = build_series(&points(10), &[ma(20)]);
    assert_eq!(series.len(), 10);
    assert!(series.iter().all(|p| p.moving_averages.is_empty()));
}

#[test]
fn ma_key_present_iff_sma_defined() {
    let series = build_series(&points(40), &[ma(5), ma(35)]);
    // display_start = min(34, 10) = 10; MA5 defined everywhere shown,
    // MA35 only from source index 34 on.
    assert_eq!(series.len(), 30);
    assert!(series.iter().all(|p| p.moving_averages.contains_key("MA5")));
    assert!(series[..24].iter().all(|p| !p.moving_averages.contains_key("MA35")));
    assert!(series[24..].iter().all(|p| p.moving_averages.contains_key("MA35")));
}

#[test]
fn ma_values_rounded_to_2_decimals_price_untouched() {
    let raw = vec![
        SeriesPoint {
            date: d(2024, 1, 1),
            close: 10.111,
            volume: None,
        },
        SeriesPoint {
            date: d(2024, 1, 2),
            close: 10.123,
            volume: None,
        },
        SeriesPoint {
            date: d(2024, 1, 3),
            close: 10.456,
            volume: None,
        },
    ];
    let series = build_series(&raw, &[ma(2)]);
    assert_eq!(series[2].price, 10.456);
    // mean(10.123, 10.456) = 10.2895 → 10.29
    assert_eq!(series[2].moving_averages["MA2"], 10.29);
}

#[test]
fn volume_key_only_when_positive() {
    let mut raw = points(3);
    raw[0].volume = Some(0.0);
    raw[1].volume = None;
    raw[2].volume = Some(1234.0);

    let series = build_series(&raw, &[]);
    assert_eq!(series[0].volume, None);
    assert_eq!(series[1].volume, None);
    assert_eq!(series[2].volume, Some(1234.0));
}

#[test]
fn sorts_unsorted_input_by_date() {
    let mut raw = points(5);
    raw.reverse();
    let series = build_series(&raw, &[]);
    for pair in series.windows(2) {
        assert!(pair[0].full_date < pair[1].full_date);
    }
}

#[test]
fn display_label_is_month_day() {
    let series = build_series(&points(1), &[]);
    assert_eq!(series[0].date, "01/01");
    assert_eq!(series[0].full_date, d(2024, 1, 1));
}

#[test]
fn empty_input_empty_output() {
    assert!(build_series(&[], &[ma(20)]).is_empty());
}
