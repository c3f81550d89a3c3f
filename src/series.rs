//! Column transforms shared by every indicator.
//!
//! All functions return a vector as long as their input. `f64::NAN` marks a
//! cell that cannot be computed (insufficient history, undefined input or a
//! zero denominator); it never aborts the rest of the column.

use error_stack::{Report, bail};

use crate::error::IndicatorError;
use crate::model::Bar;

/// Reducer applied over a trailing window by [`rolling`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    Mean,
    Std,
    Min,
    Max,
    Sum,
}

impl Reducer {
    pub fn parse(s: &str) -> Result<Self, Report<IndicatorError>> {
        match s.to_ascii_lowercase().as_str() {
            "mean" => Ok(Self::Mean),
            "std" => Ok(Self::Std),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            "sum" => Ok(Self::Sum),
            other => bail!(IndicatorError::InvalidParameter {
                name: format!("unknown reducer \"{other}\""),
            }),
        }
    }

    /// Name used in output column names, e.g. `Close_Max_20`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mean => "Mean",
            Self::Std => "Std",
            Self::Min => "Min",
            Self::Max => "Max",
            Self::Sum => "Sum",
        }
    }

    fn reduce(self, window: &[f64]) -> f64 {
        let n = window.len() as f64;
        match self {
            Self::Mean => window.iter().sum::<f64>() / n,
            Self::Sum => window.iter().sum(),
            Self::Min => window.iter().copied().fold(f64::INFINITY, f64::min),
            Self::Max => window.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Self::Std => {
                if window.len() < 2 {
                    return f64::NAN;
                }
                let mean = window.iter().sum::<f64>() / n;
                let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
                variance.sqrt()
            }
        }
    }
}

/// Trailing-window statistic: `out[i] = reducer(values[i-window+1..=i])`.
///
/// Rows before `window - 1` and windows holding an undefined value are NaN.
/// `Std` is the sample standard deviation.
pub fn rolling(values: &[f64], window: usize, reducer: Reducer) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if window == 0 || window > values.len() {
        return out;
    }
    for (i, slice) in values.windows(window).enumerate() {
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }
        out[i + window - 1] = reducer.reduce(slice);
    }
    out
}

/// Exponentially weighted mean with `alpha = 2 / (span + 1)`.
pub fn ewm(values: &[f64], span: usize) -> Vec<f64> {
    ewm_alpha(values, 2.0 / (span as f64 + 1.0))
}

/// Recursive exponential smoothing seeded with the first defined value.
///
/// An undefined input yields an undefined output and leaves the running
/// state untouched.
pub fn ewm_alpha(values: &[f64], alpha: f64) -> Vec<f64> {
    let mut state: Option<f64> = None;
    values
        .iter()
        .map(|&value| {
            if value.is_nan() {
                return f64::NAN;
            }
            let next = match state {
                Some(prev) => alpha * value + (1.0 - alpha) * prev,
                None => value,
            };
            state = Some(next);
            next
        })
        .collect()
}

/// Wilder's smoothing (`alpha = 1 / period`), seeded with the simple mean
/// of the first `period` defined values.
pub fn wilder(values: &[f64], period: usize) -> Vec<f64> {
    let len = values.len();
    let mut out = vec![f64::NAN; len];
    if period == 0 {
        return out;
    }
    let Some(start) = values.iter().position(|v| !v.is_nan()) else {
        return out;
    };
    let seed_end = start + period;
    if seed_end > len {
        return out;
    }
    let seed = &values[start..seed_end];
    if seed.iter().any(|v| v.is_nan()) {
        return out;
    }

    let weight = period as f64;
    let mut avg = seed.iter().sum::<f64>() / weight;
    out[seed_end - 1] = avg;
    for (i, &value) in values.iter().enumerate().skip(seed_end) {
        if value.is_nan() {
            continue;
        }
        avg = (avg * (weight - 1.0) + value) / weight;
        out[i] = avg;
    }
    out
}

/// Linearly weighted moving average; the newest value has weight `period`.
pub fn wma(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 || period > values.len() {
        return out;
    }
    let denom = (period * (period + 1)) as f64 / 2.0;
    for (i, slice) in values.windows(period).enumerate() {
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }
        let weighted: f64 = slice
            .iter()
            .enumerate()
            .map(|(k, v)| (k + 1) as f64 * v)
            .sum();
        out[i + period - 1] = weighted / denom;
    }
    out
}

/// Shift a column in time: `out[i] = values[i - periods]`.
///
/// A positive `periods` reads the past. A negative one reads the future and
/// is only meant for labelling columns, since those values are known after
/// the fact.
pub fn shift(values: &[f64], periods: isize) -> Vec<f64> {
    let len = values.len() as isize;
    (0..len)
        .map(|i| {
            match i.checked_sub(periods) {
                Some(source) if (0..len).contains(&source) => values[source as usize],
                _ => f64::NAN,
            }
        })
        .collect()
}

/// `values[i] - values[i - periods]`.
pub fn diff(values: &[f64], periods: usize) -> Vec<f64> {
    values
        .iter()
        .enumerate()
        .map(|(i, &current)| {
            if i < periods {
                f64::NAN
            } else {
                current - values[i - periods]
            }
        })
        .collect()
}

/// `(values[i] - values[i - periods]) / values[i - periods]`.
pub fn pct_change(values: &[f64], periods: usize) -> Vec<f64> {
    values
        .iter()
        .enumerate()
        .map(|(i, &current)| {
            if i < periods {
                f64::NAN
            } else {
                safe_div(current - values[i - periods], values[i - periods])
            }
        })
        .collect()
}

/// Element-wise `num / den`, NaN where the denominator is zero.
pub fn ratio(num: &[f64], den: &[f64]) -> Vec<f64> {
    num.iter().zip(den).map(|(&n, &d)| safe_div(n, d)).collect()
}

pub fn safe_div(num: f64, den: f64) -> f64 {
    if den == 0.0 || den.is_nan() {
        f64::NAN
    } else {
        num / den
    }
}

/// True range; the first bar has no previous close and uses `high - low`.
pub fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    (0..close.len())
        .map(|i| {
            let range = high[i] - low[i];
            if i == 0 {
                return range;
            }
            let prev_close = close[i - 1];
            range
                .max((high[i] - prev_close).abs())
                .max((low[i] - prev_close).abs())
        })
        .collect()
}

/// Which extremum [`forward_extremum`] looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extremum {
    Max,
    Min,
}

impl Extremum {
    pub fn parse(s: &str) -> Result<Self, Report<IndicatorError>> {
        match s.to_ascii_lowercase().as_str() {
            "max" => Ok(Self::Max),
            "min" => Ok(Self::Min),
            other => bail!(IndicatorError::InvalidParameter {
                name: format!("extremum must be \"max\" or \"min\", got \"{other}\""),
            }),
        }
    }

    fn beats(self, candidate: f64, current: f64) -> bool {
        match self {
            Self::Max => candidate > current,
            Self::Min => candidate < current,
        }
    }
}

/// Extremum of the leading window `values[i..i+window]` and its 1-based
/// offset inside that window. Ties keep the first occurrence.
///
/// The last `window` rows are NaN in both columns.
pub fn forward_extremum(values: &[f64], window: usize, extremum: Extremum) -> (Vec<f64>, Vec<f64>) {
    let len = values.len();
    let mut best = vec![f64::NAN; len];
    let mut lag = vec![f64::NAN; len];
    if window == 0 || window >= len {
        return (best, lag);
    }
    for (i, slice) in values.windows(window).take(len - window).enumerate() {
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }
        let mut best_index = 0;
        for (k, &value) in slice.iter().enumerate().skip(1) {
            if extremum.beats(value, slice[best_index]) {
                best_index = k;
            }
        }
        best[i] = slice[best_index];
        lag[i] = (best_index + 1) as f64;
    }
    (best, lag)
}

/// Sequential fold over bars: `out[0] = seed`,
/// `out[i] = step(out[i-1], &bars[i-1], &bars[i])`.
pub fn running<F>(bars: &[Bar], seed: f64, mut step: F) -> Vec<f64>
where
    F: FnMut(f64, &Bar, &Bar) -> f64,
{
    if bars.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(bars.len());
    let mut state = seed;
    out.push(state);
    for pair in bars.windows(2) {
        state = step(state, &pair[0], &pair[1]);
        out.push(state);
    }
    out
}

/// Scale each value into `[0, 1]` against the high and low of the previous
/// `window` rows (the current row excluded). A flat window yields NaN.
pub fn rescale(values: &[f64], window: usize) -> Vec<f64> {
    let len = values.len();
    let mut out = vec![f64::NAN; len];
    if window == 0 {
        return out;
    }
    for i in window..len {
        let prior = &values[i - window..i];
        if values[i].is_nan() || prior.iter().any(|v| v.is_nan()) {
            continue;
        }
        let high = Reducer::Max.reduce(prior);
        let low = Reducer::Min.reduce(prior);
        if high == low {
            continue;
        }
        out[i] = (values[i] - low) / (high - low);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn ramp(n: usize) -> Vec<f64> {
        (1..=n).map(|i| i as f64).collect()
    }

    fn noisy(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + ((i * 37) % 11) as f64 - (i % 3) as f64 * 0.5)
            .collect()
    }

    #[test]
    fn rolling_leaves_warmup_undefined() {
        let out = rolling(&ramp(10), 4, Reducer::Mean);
        assert!(out[..3].iter().all(|v| v.is_nan()));
        assert!(out[3..].iter().all(|v| !v.is_nan()));
    }

    #[test]
    fn rolling_matches_brute_force_rescan() {
        let values = noisy(40);
        for reducer in [Reducer::Mean, Reducer::Std, Reducer::Min, Reducer::Max, Reducer::Sum] {
            let out = rolling(&values, 7, reducer);
            for i in 6..values.len() {
                let window = &values[i - 6..=i];
                let expected = match reducer {
                    Reducer::Mean => window.iter().sum::<f64>() / 7.0,
                    Reducer::Sum => window.iter().sum::<f64>(),
                    Reducer::Min => window.iter().cloned().fold(f64::MAX, f64::min),
                    Reducer::Max => window.iter().cloned().fold(f64::MIN, f64::max),
                    Reducer::Std => {
                        let m = window.iter().sum::<f64>() / 7.0;
                        (window.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / 6.0).sqrt()
                    }
                };
                assert!((out[i] - expected).abs() < 1e-9, "{reducer:?} at {i}");
            }
        }
    }

    #[test]
    fn rolling_propagates_undefined_inputs() {
        let mut values = ramp(8);
        values[3] = f64::NAN;
        let out = rolling(&values, 3, Reducer::Sum);
        assert!(out[3].is_nan() && out[4].is_nan() && out[5].is_nan());
        assert!((out[6] - (5.0 + 6.0 + 7.0)).abs() < 1e-9);
    }

    #[test]
    fn rolling_window_longer_than_series_is_all_undefined() {
        assert!(rolling(&ramp(3), 5, Reducer::Mean).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn constant_series_has_zero_std() {
        let out = rolling(&[100.0; 10], 5, Reducer::Std);
        assert!(out[4..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn reducer_parse_rejects_unknown_kind() {
        assert_eq!(Reducer::parse("MAX").unwrap(), Reducer::Max);
        assert!(Reducer::parse("median").is_err());
    }

    #[test]
    fn ewm_follows_recursion() {
        let values = noisy(30);
        let span = 5;
        let alpha = 2.0 / (span as f64 + 1.0);
        let out = ewm(&values, span);
        assert_eq!(out[0], values[0]);
        for i in 1..values.len() {
            let expected = alpha * values[i] + (1.0 - alpha) * out[i - 1];
            assert!((out[i] - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn ewm_seeds_at_first_defined_value() {
        let out = ewm(&[f64::NAN, f64::NAN, 4.0, 6.0], 3);
        assert!(out[0].is_nan() && out[1].is_nan());
        assert_eq!(out[2], 4.0);
        assert!((out[3] - 5.0).abs() < 1e-9);
    }

    #[test]
    fn chained_ewm_differs_from_tripled_span() {
        let values = noisy(30);
        let chained = ewm(&ewm(&ewm(&values, 4), 4), 4);
        let tripled = ewm(&values, 12);
        assert!(chained.iter().zip(&tripled).skip(1).any(|(a, b)| (a - b).abs() > 1e-6));
    }

    #[test]
    fn wilder_seed_is_simple_mean() {
        let out = wilder(&[f64::NAN, 1.0, 2.0, 3.0, 7.0], 3);
        assert!(out[..3].iter().all(|v| v.is_nan()));
        assert!((out[3] - 2.0).abs() < 1e-9);
        assert!((out[4] - (2.0 * 2.0 + 7.0) / 3.0).abs() < 1e-9);
    }

    #[test]
    fn wma_known_value() {
        let out = wma(&[1.0, 2.0, 3.0], 3);
        // (1*1 + 2*2 + 3*3) / 6
        assert!((out[2] - 14.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn shift_lags_and_leads() {
        let values = ramp(5);
        let lagged = shift(&values, 2);
        assert!(lagged[0].is_nan() && lagged[1].is_nan());
        assert_eq!(lagged[4], 3.0);

        let led = shift(&values, -1);
        assert_eq!(led[0], 2.0);
        assert!(led[4].is_nan());
    }

    #[test]
    fn shift_beyond_the_series_is_undefined() {
        let values = ramp(5);
        assert!(shift(&values, isize::MAX).iter().all(|v| v.is_nan()));
        assert!(shift(&values, isize::MIN).iter().all(|v| v.is_nan()));
        assert!(shift(&values, isize::MIN + 1).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn pct_change_zero_base_is_undefined() {
        let out = pct_change(&[0.0, 1.0, 2.0], 1);
        assert!(out[0].is_nan() && out[1].is_nan());
        assert!((out[2] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn true_range_uses_previous_close() {
        let tr = true_range(&[10.0, 12.0], &[9.0, 11.0], &[9.5, 11.5]);
        assert_eq!(tr[0], 1.0);
        assert!((tr[1] - 2.5).abs() < 1e-9);
    }

    #[test]
    fn forward_extremum_reports_first_occurrence() {
        let values = [3.0, 5.0, 5.0, 1.0, 1.0, 4.0];
        let (max, max_lag) = forward_extremum(&values, 3, Extremum::Max);
        assert_eq!(max[0], 5.0);
        assert_eq!(max_lag[0], 2.0);
        let (min, min_lag) = forward_extremum(&values, 3, Extremum::Min);
        assert_eq!(min[2], 1.0);
        assert_eq!(min_lag[2], 2.0);
    }

    #[test]
    fn forward_extremum_lag_points_at_extremum() {
        let values = noisy(30);
        let n = 5;
        let (best, lag) = forward_extremum(&values, n, Extremum::Max);
        for i in 0..values.len() - n {
            let k = lag[i] as usize;
            assert_eq!(values[i + k - 1], best[i]);
            assert!(values[i..i + k - 1].iter().all(|&v| v < best[i]));
        }
        assert!(best[values.len() - n..].iter().all(|v| v.is_nan()));
        assert!(lag[values.len() - n..].iter().all(|v| v.is_nan()));
    }

    #[test]
    fn forward_extremum_leaves_last_window_rows_undefined() {
        let values: Vec<f64> = (1..=10).map(f64::from).collect();
        let (best, lag) = forward_extremum(&values, 3, Extremum::Max);
        assert_eq!(best.iter().filter(|v| v.is_nan()).count(), 3);
        assert_eq!(best[6], 9.0);
        assert_eq!(lag[6], 3.0);
        assert!(best[7].is_nan() && lag[7].is_nan());

        let (short, _) = forward_extremum(&values[..3], 3, Extremum::Max);
        assert!(short.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn extremum_parse_rejects_other_kinds() {
        assert_eq!(Extremum::parse("min").unwrap(), Extremum::Min);
        assert!(Extremum::parse("mean").is_err());
    }

    #[test]
    fn running_seeds_then_folds_in_order() {
        let bars: Vec<Bar> = [1.0, 2.0, 2.0, 1.0]
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar {
                timestamp: Utc.timestamp_opt(i as i64 * 86_400, 0).unwrap(),
                open: c,
                high: c,
                low: c,
                close: c,
                volume: 10.0,
            })
            .collect();
        let out = running(&bars, 0.0, |state, prev, cur| {
            if cur.close > prev.close {
                state + cur.volume
            } else if cur.close < prev.close {
                state - cur.volume
            } else {
                state
            }
        });
        assert_eq!(out, vec![0.0, 10.0, 10.0, 0.0]);
    }

    #[test]
    fn rescale_maps_trailing_extremes_to_unit_range() {
        let values = [1.0, 4.0, 2.0, 4.0, 1.0, 2.5];
        let out = rescale(&values, 3);
        assert!(out[..3].iter().all(|v| v.is_nan()));
        // prior window [1, 4, 2]: value 4 is the trailing high
        assert!((out[3] - 1.0).abs() < 1e-9);
        // prior window [4, 2, 4]: value 1 is below the trailing low
        assert!((out[4] - (-0.5)).abs() < 1e-9);
        // prior window [2, 4, 1]
        assert!((out[5] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn rescale_flat_window_is_undefined() {
        assert!(rescale(&[5.0; 6], 3).iter().all(|v| v.is_nan()));
    }
}
