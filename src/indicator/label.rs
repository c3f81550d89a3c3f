//! Labels and annotations.
//!
//! Apart from the pivot levels, every column here reads bars after the
//! current one. They describe what happened next and are meant as training
//! labels, not as inputs known at the time of the bar.

use error_stack::Report;

use crate::error::IndicatorError;
use crate::indicator::{Indicator, Output, check_period, check_positive, numeric, typical_price};
use crate::series::{self, Extremum};
use crate::table::{Column, IndicatorTable};

pub const POSITIVE: &str = "Positive";
pub const NEGATIVE: &str = "Negative";
pub const NEUTRAL: &str = "Neutral";

pub const UP_TREND: &str = "UpTrend";
pub const DOWN_TREND: &str = "DownTrend";
pub const NO_TREND: &str = "NoTrend";

pub const INCREASE: &str = "Increase";
pub const DECREASE: &str = "Decrease";
pub const NO_TARGET: &str = "NoTarget";

pub const FIBONACCI_RATIOS: [(&str, f64); 5] = [
    ("0.236", 0.236),
    ("0.382", 0.382),
    ("0.5", 0.5),
    ("0.618", 0.618),
    ("0.786", 0.786),
];

/// Direction of the next close relative to the current one.
pub struct NextBarLabel;

impl Indicator for NextBarLabel {
    fn name(&self) -> &str {
        "label"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        let close = table.close();
        let next = series::shift(close, -1);
        let labels = close
            .iter()
            .zip(&next)
            .map(|(&current, &next)| {
                if next.is_nan() || current.is_nan() {
                    None
                } else if next > current {
                    Some(POSITIVE)
                } else if next < current {
                    Some(NEGATIVE)
                } else {
                    Some(NEUTRAL)
                }
            })
            .collect();
        Ok(vec![("Label".to_string(), Column::Label(labels))])
    }
}

/// Forward swing highs and lows with the bar offset at which each occurs,
/// and a trend label comparing the two offsets.
pub struct SwingTrend {
    days: usize,
}

impl SwingTrend {
    pub fn new(days: usize) -> Result<Self, Report<IndicatorError>> {
        check_period("number_of_days", days)?;
        Ok(Self { days })
    }
}

impl Indicator for SwingTrend {
    fn name(&self) -> &str {
        "swing_trend"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        let (high, high_lag) = series::forward_extremum(table.high(), self.days, Extremum::Max);
        let (low, low_lag) = series::forward_extremum(table.low(), self.days, Extremum::Min);
        let trend = high_lag
            .iter()
            .zip(&low_lag)
            .map(|(&max_lag, &min_lag)| {
                if max_lag.is_nan() || min_lag.is_nan() {
                    None
                } else if max_lag > min_lag {
                    Some(UP_TREND)
                } else if min_lag > max_lag {
                    Some(DOWN_TREND)
                } else {
                    Some(NO_TREND)
                }
            })
            .collect();

        let n = self.days;
        Ok(vec![
            numeric(format!("High_{n}"), high),
            numeric(format!("High_lag_{n}"), high_lag),
            numeric(format!("Low_{n}"), low),
            numeric(format!("Low_lag_{n}"), low_lag),
            (format!("High_Low_lag_{n}"), Column::Label(trend)),
        ])
    }
}

/// Whether price reaches an upside or downside target first within the
/// next `days` bars. Targets are percentages of the current close. A bar
/// that reaches both is ambiguous and yields `NoTarget`.
pub struct SwingTarget {
    days: usize,
    max_increase: f64,
    min_decrease: f64,
}

impl SwingTarget {
    pub fn new(
        days: usize,
        max_increase: f64,
        min_decrease: f64,
    ) -> Result<Self, Report<IndicatorError>> {
        check_period("number_of_days", days)?;
        check_positive("max_increase", max_increase)?;
        check_positive("min_decrease", min_decrease)?;
        Ok(Self {
            days,
            max_increase,
            min_decrease,
        })
    }

    pub fn calculate(&self, table: &IndicatorTable) -> Vec<Option<&'static str>> {
        let (close, high, low) = (table.close(), table.high(), table.low());
        (0..close.len())
            .map(|i| {
                if i + self.days >= close.len() {
                    return None;
                }
                let upper = close[i] * (1.0 + self.max_increase / 100.0);
                let lower = close[i] * (1.0 - self.min_decrease / 100.0);
                for j in i + 1..=i + self.days {
                    let hit_up = high[j] >= upper;
                    let hit_down = low[j] <= lower;
                    match (hit_up, hit_down) {
                        (true, true) => return Some(NO_TARGET),
                        (true, false) => return Some(INCREASE),
                        (false, true) => return Some(DECREASE),
                        (false, false) => {}
                    }
                }
                Some(NO_TARGET)
            })
            .collect()
    }
}

impl Indicator for SwingTarget {
    fn name(&self) -> &str {
        "swing_target"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        Ok(vec![(
            format!("Target_{}", self.days),
            Column::Label(self.calculate(table)),
        )])
    }
}

/// Fibonacci retracement levels between the current close and the close
/// `horizon` bars ahead.
pub struct Fibonacci {
    horizon: usize,
}

impl Fibonacci {
    pub fn new(horizon: usize) -> Result<Self, Report<IndicatorError>> {
        check_period("horizon", horizon)?;
        Ok(Self { horizon })
    }
}

impl Indicator for Fibonacci {
    fn name(&self) -> &str {
        "fibonacci"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        let close = table.close();
        let ahead = series::shift(close, -(self.horizon as isize));
        Ok(FIBONACCI_RATIOS
            .iter()
            .map(|&(label, ratio)| {
                let levels = close
                    .iter()
                    .zip(&ahead)
                    .map(|(c, a)| c + ratio * (a - c))
                    .collect();
                numeric(format!("Fibonacci_{label}"), levels)
            })
            .collect())
    }
}

/// Classic floor-trader pivots from the current bar.
pub struct PivotPoints;

impl Indicator for PivotPoints {
    fn name(&self) -> &str {
        "pivot_points"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        let pivot = typical_price(table);
        let (high, low) = (table.high(), table.low());
        let level = |f: &dyn Fn(f64, f64, f64) -> f64| -> Vec<f64> {
            (0..pivot.len()).map(|i| f(pivot[i], high[i], low[i])).collect()
        };
        Ok(vec![
            numeric("PP", pivot.clone()),
            numeric("R1", level(&|p, _, l| 2.0 * p - l)),
            numeric("S1", level(&|p, h, _| 2.0 * p - h)),
            numeric("R2", level(&|p, h, l| p + (h - l))),
            numeric("S2", level(&|p, h, l| p - (h - l))),
            numeric("R3", level(&|p, h, l| h + 2.0 * (p - l))),
            numeric("S3", level(&|p, h, l| l - 2.0 * (h - p))),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::test_support::{table_from_closes, table_from_ohlcv};

    #[test]
    fn label_on_rising_closes() {
        let closes: Vec<f64> = (1..=25).map(f64::from).collect();
        let table = table_from_closes(&closes);
        let out = NextBarLabel.compute(&table).unwrap();
        let labels = out[0].1.as_labels().unwrap();
        assert!(labels[..24].iter().all(|l| *l == Some(POSITIVE)));
        assert_eq!(labels[24], None);
    }

    #[test]
    fn label_neutral_and_negative() {
        let table = table_from_closes(&[3.0, 3.0, 2.0, 2.5]);
        let out = NextBarLabel.compute(&table).unwrap();
        assert_eq!(
            out[0].1.as_labels().unwrap(),
            &[Some(NEUTRAL), Some(NEGATIVE), Some(POSITIVE), None]
        );
    }

    #[test]
    fn swing_trend_columns() {
        let table = table_from_ohlcv(&[
            (5.0, 6.0, 4.0, 5.0, 1.0),
            (5.0, 8.0, 3.0, 5.0, 1.0),
            (5.0, 9.0, 4.5, 5.0, 1.0),
            (5.0, 7.0, 2.0, 5.0, 1.0),
            (5.0, 6.0, 4.0, 5.0, 1.0),
        ]);
        let out = SwingTrend::new(3).unwrap().compute(&table).unwrap();
        let names: Vec<_> = out.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["High_3", "High_lag_3", "Low_3", "Low_lag_3", "High_Low_lag_3"]);

        let high = out[0].1.as_numeric().unwrap();
        let high_lag = out[1].1.as_numeric().unwrap();
        let low_lag = out[3].1.as_numeric().unwrap();
        let trend = out[4].1.as_labels().unwrap();
        // row 0 window: highs 6, 8, 9 / lows 4, 3, 4.5
        assert_eq!(high[0], 9.0);
        assert_eq!(high_lag[0], 3.0);
        assert_eq!(low_lag[0], 2.0);
        assert_eq!(trend[0], Some(UP_TREND));
        // row 1 window: highs 8, 9, 7 / lows 3, 4.5, 2
        assert_eq!(trend[1], Some(DOWN_TREND));
        // the last n rows are undefined
        assert!(high[2..].iter().all(|v| v.is_nan()));
        assert!(trend[2..].iter().all(Option::is_none));
    }

    #[test]
    fn swing_target_first_hit_wins() {
        let table = table_from_ohlcv(&[
            (100.0, 100.0, 100.0, 100.0, 1.0),
            (100.0, 101.0, 99.0, 100.0, 1.0),
            (100.0, 106.0, 99.0, 105.0, 1.0),
            (105.0, 105.0, 90.0, 91.0, 1.0),
            (91.0, 91.0, 91.0, 91.0, 1.0),
        ]);
        let labels = SwingTarget::new(2, 5.0, 3.0).unwrap().calculate(&table);
        assert_eq!(labels[0], Some(INCREASE));
        assert_eq!(labels[1], Some(INCREASE));
        assert_eq!(labels[2], Some(DECREASE));
        assert_eq!(labels[3], None);
    }

    #[test]
    fn swing_target_same_bar_is_ambiguous() {
        let table = table_from_ohlcv(&[
            (100.0, 100.0, 100.0, 100.0, 1.0),
            (100.0, 110.0, 90.0, 100.0, 1.0),
        ]);
        let labels = SwingTarget::new(1, 5.0, 3.0).unwrap().calculate(&table);
        assert_eq!(labels, vec![Some(NO_TARGET), None]);
    }

    #[test]
    fn fibonacci_levels_between_closes() {
        let table = table_from_closes(&[100.0, 110.0, 200.0]);
        let out = Fibonacci::new(2).unwrap().compute(&table).unwrap();
        assert_eq!(out[2].0, "Fibonacci_0.5");
        assert_eq!(out[2].1.as_numeric().unwrap()[0], 150.0);
        assert!(out[2].1.as_numeric().unwrap()[1].is_nan());
        assert!((out[3].1.as_numeric().unwrap()[0] - 161.8).abs() < 1e-9);
    }

    #[test]
    fn pivot_points_known_bar() {
        let table = table_from_ohlcv(&[(10.0, 12.0, 6.0, 9.0, 1.0)]);
        let out = PivotPoints.compute(&table).unwrap();
        let get = |name: &str| {
            out.iter()
                .find(|(n, _)| n == name)
                .and_then(|(_, c)| c.as_numeric())
                .unwrap()[0]
        };
        assert_eq!(get("PP"), 9.0);
        assert_eq!(get("R1"), 12.0);
        assert_eq!(get("S1"), 6.0);
        assert_eq!(get("R2"), 15.0);
        assert_eq!(get("S2"), 3.0);
        assert_eq!(get("R3"), 18.0);
        assert_eq!(get("S3"), 0.0);
    }

    #[test]
    fn zero_windows_rejected() {
        assert!(SwingTrend::new(0).is_err());
        assert!(SwingTarget::new(0, 5.0, 3.0).is_err());
        assert!(SwingTarget::new(5, 0.0, 3.0).is_err());
        assert!(Fibonacci::new(0).is_err());
    }
}
