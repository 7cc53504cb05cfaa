use std::collections::BTreeMap;

use crate::models::series::{ChartDataPoint, MaConfig, SeriesPoint};
use crate::services::indicators::compute_sma;

/// Minimum number of trailing points always shown, even when that means
/// displaying part of the MA warm-up region (short-history edge case).
const MIN_VISIBLE_POINTS: i64 = 30;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Merge closes, moving averages and volume into one display-ready series.
///
/// Dates are sorted ascending, one SMA sequence is computed per enabled
/// period, and the front of the window is trimmed to skip the warm-up
/// region of the longest average, but never below the last 30 points.
///
/// Per emitted point: the price passes through unrounded; the volume key is
/// present only when that day's volume exists and is positive; each
/// `MA{period}` key is present iff that SMA is defined at the index,
/// rounded to 2 decimal places.
#[must_use]
pub fn build_series(points: &[SeriesPoint], ma_configs: &[MaConfig]) -> Vec<ChartDataPoint> {
    let mut sorted: Vec<&SeriesPoint> = points.iter().collect();
    sorted.sort_by_key(|p| p.date);

    let closes: Vec<f64> = sorted.iter().map(|p| p.close).collect();

    let enabled_periods: Vec<usize> = ma_configs
        .iter()
        .filter(|c| c.enabled && c.period > 0)
        .map(|c| c.period)
        .collect();

    let sma_by_period: Vec<(usize, Vec<Option<f64>>)> = enabled_periods
        .iter()
        .map(|&period| (period, compute_sma(&closes, period)))
        .collect();

    let max_period = enabled_periods.iter().copied().max().unwrap_or(0) as i64;
    let total = sorted.len() as i64;
    let display_start = (max_period - 1).min(total - MIN_VISIBLE_POINTS).max(0) as usize;

    sorted
        .iter()
        .enumerate()
        .skip(display_start)
        .map(|(i, point)| {
            let mut moving_averages = BTreeMap::new();
            for (period, sma) in &sma_by_period {
                if let Some(value) = sma[i] {
                    moving_averages.insert(format!("MA{period}"), round2(value));
                }
            }

            ChartDataPoint {
                date: point.date.format("%m/%d").to_string(),
                full_date: point.date,
                price: point.close,
                volume: point.volume.filter(|v| *v > 0.0),
                moving_averages,
            }
        })
        .collect()
}
