/// Default RSI lookback, per Wilder.
pub const DEFAULT_RSI_PERIOD: usize = 14;

/// Simple moving average over a sorted close sequence.
///
/// The output is positionally aligned 1:1 with the input. Entries in the
/// warm-up region (`i < period - 1`) are `None`; from there on each entry
/// is the arithmetic mean of the trailing `period` closes ending at `i`.
/// Running-sum implementation, O(n).
#[must_use]
pub fn compute_sma(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; prices.len()];
    if period == 0 || prices.len() < period {
        return out;
    }

    let mut window_sum: f64 = prices[..period].iter().sum();
    out[period - 1] = Some(window_sum / period as f64);

    for i in period..prices.len() {
        window_sum += prices[i] - prices[i - period];
        out[i] = Some(window_sum / period as f64);
    }

    out
}

/// Relative Strength Index with Wilder's smoothing.
///
/// With fewer than `period + 1` closes every entry is `None`. Otherwise
/// indices `0..period` are `None` (no prior difference at 0, insufficient
/// smoothing window through `period - 1`) and index `period` holds the
/// first RSI, seeded from the simple means of gains and losses over the
/// first `period` day-over-day differences. Subsequent entries apply
/// Wilder's update `avg = (avg * (period - 1) + x) / period`.
///
/// A zero average loss yields exactly 100.0 via an explicit branch rather
/// than an infinite-RS substitution.
#[must_use]
pub fn compute_rsi(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; prices.len()];
    if period == 0 || prices.len() < period + 1 {
        return out;
    }

    let diffs: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();

    let mut avg_gain = diffs[..period]
        .iter()
        .map(|d| d.max(0.0))
        .sum::<f64>()
        / period as f64;
    let mut avg_loss = diffs[..period]
        .iter()
        .map(|d| (-d).max(0.0))
        .sum::<f64>()
        / period as f64;

    out[period] = Some(rsi_value(avg_gain, avg_loss));

    for i in (period + 1)..prices.len() {
        let diff = diffs[i - 1];
        let gain = diff.max(0.0);
        let loss = (-diff).max(0.0);
        avg_gain = (avg_gain * (period as f64 - 1.0) + gain) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + loss) / period as f64;
        out[i] = Some(rsi_value(avg_gain, avg_loss));
    }

    out
}

/// RSI over the default 14-day period.
#[must_use]
pub fn compute_rsi_default(prices: &[f64]) -> Vec<Option<f64>> {
    compute_rsi(prices, DEFAULT_RSI_PERIOD)
}

/// Calendar days of history needed to compute a moving average of the
/// requested period: 1.5× the period (rounded up) plus a 30-day buffer for
/// non-trading days. A baseline close series is always required, so the
/// effective period is at least 1.
#[must_use]
pub fn required_history_days(requested_ma_period: usize) -> usize {
    let effective = requested_ma_period.max(1);
    (effective as f64 * 1.5).ceil() as usize + 30
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
