use error_stack::{Report, bail};

use crate::error::IndicatorError;
use crate::indicator::{Indicator, Output, check_period, median_price, numeric, typical_price};
use crate::series::{self, Reducer};
use crate::table::IndicatorTable;

/// RSI (Relative Strength Index) using Wilder's smoothing method.
///
/// Undefined where the average loss is zero, since the gain/loss ratio has
/// no finite value there.
pub struct Rsi {
    period: usize,
}

impl Rsi {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        check_period("period", period)?;
        Ok(Self { period })
    }

    pub fn calculate_prices(&self, prices: &[f64]) -> Vec<f64> {
        let deltas = series::diff(prices, 1);
        let gains: Vec<f64> = deltas.iter().map(|&d| positive_part(d)).collect();
        let losses: Vec<f64> = deltas.iter().map(|&d| positive_part(-d)).collect();

        let avg_gain = series::wilder(&gains, self.period);
        let avg_loss = series::wilder(&losses, self.period);

        avg_gain
            .iter()
            .zip(&avg_loss)
            .map(|(&gain, &loss)| 100.0 - 100.0 / (1.0 + series::safe_div(gain, loss)))
            .collect()
    }
}

// `f64::max` would turn NaN into 0.0; keep it undefined.
fn positive_part(value: f64) -> f64 {
    if value.is_nan() { f64::NAN } else { value.max(0.0) }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        "rsi"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        Ok(vec![numeric(
            format!("RSI_{}", self.period),
            self.calculate_prices(table.close()),
        )])
    }
}

/// Stochastic oscillator: `%K` over `k_period` bars and its `d_period` SMA.
pub struct Stochastic {
    k_period: usize,
    d_period: usize,
}

impl Stochastic {
    pub fn new(k_period: usize, d_period: usize) -> Result<Self, Report<IndicatorError>> {
        check_period("k_period", k_period)?;
        check_period("d_period", d_period)?;
        Ok(Self { k_period, d_period })
    }
}

impl Indicator for Stochastic {
    fn name(&self) -> &str {
        "stochastic"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        let highest = series::rolling(table.high(), self.k_period, Reducer::Max);
        let lowest = series::rolling(table.low(), self.k_period, Reducer::Min);
        let k: Vec<f64> = (0..table.len())
            .map(|i| 100.0 * series::safe_div(table.close()[i] - lowest[i], highest[i] - lowest[i]))
            .collect();
        let d = series::rolling(&k, self.d_period, Reducer::Mean);
        Ok(vec![
            numeric(format!("Stoch_K_{}", self.k_period), k),
            numeric(format!("Stoch_D_{}_{}", self.k_period, self.d_period), d),
        ])
    }
}

/// Williams %R, in `[-100, 0]`.
pub struct WilliamsR {
    period: usize,
}

impl WilliamsR {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        check_period("period", period)?;
        Ok(Self { period })
    }
}

impl Indicator for WilliamsR {
    fn name(&self) -> &str {
        "williams_r"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        let highest = series::rolling(table.high(), self.period, Reducer::Max);
        let lowest = series::rolling(table.low(), self.period, Reducer::Min);
        let values = (0..table.len())
            .map(|i| -100.0 * series::safe_div(highest[i] - table.close()[i], highest[i] - lowest[i]))
            .collect();
        Ok(vec![numeric(format!("WilliamsR_{}", self.period), values)])
    }
}

/// Rate of change in percent over `period` bars.
pub struct Roc {
    period: usize,
}

impl Roc {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        check_period("period", period)?;
        Ok(Self { period })
    }
}

impl Indicator for Roc {
    fn name(&self) -> &str {
        "roc"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        let values = series::pct_change(table.close(), self.period)
            .into_iter()
            .map(|v| v * 100.0)
            .collect();
        Ok(vec![numeric(format!("ROC_{}", self.period), values)])
    }
}

/// Absolute close change over `period` bars.
pub struct Momentum {
    period: usize,
}

impl Momentum {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        check_period("period", period)?;
        Ok(Self { period })
    }
}

impl Indicator for Momentum {
    fn name(&self) -> &str {
        "momentum"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        Ok(vec![numeric(
            format!("Momentum_{}", self.period),
            series::diff(table.close(), self.period),
        )])
    }
}

/// Commodity Channel Index with the usual 0.015 constant.
pub struct Cci {
    period: usize,
}

impl Cci {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        check_period("period", period)?;
        Ok(Self { period })
    }
}

impl Indicator for Cci {
    fn name(&self) -> &str {
        "cci"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        let tp = typical_price(table);
        let mean = series::rolling(&tp, self.period, Reducer::Mean);
        let mut values = vec![f64::NAN; tp.len()];
        if self.period <= tp.len() {
            for (start, window) in tp.windows(self.period).enumerate() {
                let i = start + self.period - 1;
                let deviation = window.iter().map(|v| (v - mean[i]).abs()).sum::<f64>()
                    / self.period as f64;
                values[i] = series::safe_div(tp[i] - mean[i], 0.015 * deviation);
            }
        }
        Ok(vec![numeric(format!("CCI_{}", self.period), values)])
    }
}

/// True Strength Index: double-smoothed momentum over double-smoothed
/// absolute momentum.
pub struct Tsi {
    long: usize,
    short: usize,
}

impl Tsi {
    pub fn new(long: usize, short: usize) -> Result<Self, Report<IndicatorError>> {
        check_period("long", long)?;
        check_period("short", short)?;
        Ok(Self { long, short })
    }
}

impl Indicator for Tsi {
    fn name(&self) -> &str {
        "tsi"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        let momentum = series::diff(table.close(), 1);
        let absolute: Vec<f64> = momentum.iter().map(|m| m.abs()).collect();
        let num = series::ewm(&series::ewm(&momentum, self.long), self.short);
        let den = series::ewm(&series::ewm(&absolute, self.long), self.short);
        let values = series::ratio(&num, &den)
            .into_iter()
            .map(|v| v * 100.0)
            .collect();
        Ok(vec![numeric(format!("TSI_{}_{}", self.long, self.short), values)])
    }
}

/// Ultimate Oscillator, weighting three buying-pressure averages 4:2:1.
pub struct UltimateOscillator {
    short: usize,
    medium: usize,
    long: usize,
}

impl UltimateOscillator {
    pub fn new(short: usize, medium: usize, long: usize) -> Result<Self, Report<IndicatorError>> {
        check_period("short", short)?;
        if !(short < medium && medium < long) {
            bail!(IndicatorError::InvalidParameter {
                name: "periods must satisfy short < medium < long".into(),
            });
        }
        Ok(Self {
            short,
            medium,
            long,
        })
    }
}

impl Indicator for UltimateOscillator {
    fn name(&self) -> &str {
        "ultimate"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        let (high, low, close) = (table.high(), table.low(), table.close());
        let mut pressure = vec![f64::NAN; close.len()];
        let mut range = vec![f64::NAN; close.len()];
        for i in 1..close.len() {
            let floor = low[i].min(close[i - 1]);
            pressure[i] = close[i] - floor;
            range[i] = high[i].max(close[i - 1]) - floor;
        }

        let average = |period: usize| {
            series::ratio(
                &series::rolling(&pressure, period, Reducer::Sum),
                &series::rolling(&range, period, Reducer::Sum),
            )
        };
        let (a, b, c) = (average(self.short), average(self.medium), average(self.long));
        let values = (0..close.len())
            .map(|i| 100.0 * (4.0 * a[i] + 2.0 * b[i] + c[i]) / 7.0)
            .collect();
        Ok(vec![numeric(
            format!("UO_{}_{}_{}", self.short, self.medium, self.long),
            values,
        )])
    }
}

/// Awesome Oscillator: fast SMA minus slow SMA of the median price.
pub struct AwesomeOscillator {
    fast: usize,
    slow: usize,
}

impl AwesomeOscillator {
    pub fn new(fast: usize, slow: usize) -> Result<Self, Report<IndicatorError>> {
        check_period("fast", fast)?;
        if fast >= slow {
            bail!(IndicatorError::InvalidParameter {
                name: "fast must be < slow".into(),
            });
        }
        Ok(Self { fast, slow })
    }
}

impl Indicator for AwesomeOscillator {
    fn name(&self) -> &str {
        "awesome"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        let median = median_price(table);
        let fast = series::rolling(&median, self.fast, Reducer::Mean);
        let slow = series::rolling(&median, self.slow, Reducer::Mean);
        let values = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
        Ok(vec![numeric(format!("AO_{}_{}", self.fast, self.slow), values)])
    }
}

/// Coppock curve: WMA of the sum of two rates of change.
pub struct Coppock {
    period: usize,
    long_roc: usize,
    short_roc: usize,
}

impl Coppock {
    pub fn new(period: usize, long_roc: usize, short_roc: usize) -> Result<Self, Report<IndicatorError>> {
        check_period("period", period)?;
        check_period("long_roc", long_roc)?;
        check_period("short_roc", short_roc)?;
        Ok(Self {
            period,
            long_roc,
            short_roc,
        })
    }
}

impl Indicator for Coppock {
    fn name(&self) -> &str {
        "coppock"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        let long = series::pct_change(table.close(), self.long_roc);
        let short = series::pct_change(table.close(), self.short_roc);
        let summed: Vec<f64> = long.iter().zip(&short).map(|(l, s)| 100.0 * (l + s)).collect();
        Ok(vec![numeric(
            format!("Coppock_{}", self.period),
            series::wma(&summed, self.period),
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::test_support::{sample_table, table_from_closes, table_from_ohlcv};

    fn single(output: Output) -> Vec<f64> {
        output[0].1.as_numeric().unwrap().to_vec()
    }

    #[test]
    fn rsi_period_zero_invalid() {
        assert!(Rsi::new(0).is_err());
    }

    #[test]
    fn rsi_constant_prices_are_undefined() {
        let table = table_from_closes(&[100.0; 30]);
        let values = single(Rsi::new(14).unwrap().compute(&table).unwrap());
        assert!(values.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn rsi_all_losses_returns_0() {
        let rsi = Rsi::new(3).unwrap();
        let values = rsi.calculate_prices(&[4.0, 3.0, 2.0, 1.0]);
        assert!((values[3] - 0.0).abs() < 1e-9);
    }

    #[test]
    fn rsi_warmup_length() {
        let table = sample_table(20);
        let values = single(Rsi::new(14).unwrap().compute(&table).unwrap());
        assert!(values[..14].iter().all(|v| v.is_nan()));
        assert!(values[14..].iter().all(|v| (0.0..=100.0).contains(v)));
    }

    #[test]
    fn rsi_known_value() {
        // deltas +2, -1, +1: avg gain 1, avg loss 1/3 -> RS 3 -> RSI 75
        let values = Rsi::new(3).unwrap().calculate_prices(&[10.0, 12.0, 11.0, 12.0]);
        assert!((values[3] - 75.0).abs() < 1e-9);
    }

    #[test]
    fn stochastic_at_window_high_is_100() {
        let table = table_from_ohlcv(&[
            (1.0, 2.0, 1.0, 1.5, 1.0),
            (1.5, 3.0, 1.0, 2.0, 1.0),
            (2.0, 4.0, 2.0, 4.0, 1.0),
        ]);
        let out = Stochastic::new(3, 1).unwrap().compute(&table).unwrap();
        assert_eq!(out[0].0, "Stoch_K_3");
        assert_eq!(out[1].0, "Stoch_D_3_1");
        let k = out[0].1.as_numeric().unwrap();
        assert!(k[..2].iter().all(|v| v.is_nan()));
        assert!((k[2] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn stochastic_flat_range_is_undefined() {
        let table = table_from_closes(&[5.0; 6]);
        let out = Stochastic::new(3, 3).unwrap().compute(&table).unwrap();
        assert!(out[0].1.as_numeric().unwrap().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn williams_r_at_window_low_is_minus_100() {
        let table = table_from_ohlcv(&[
            (3.0, 4.0, 2.0, 3.0, 1.0),
            (3.0, 3.5, 1.0, 1.0, 1.0),
        ]);
        let values = single(WilliamsR::new(2).unwrap().compute(&table).unwrap());
        assert!((values[1] + 100.0).abs() < 1e-9);
    }

    #[test]
    fn roc_and_momentum_known_values() {
        let table = table_from_closes(&[10.0, 11.0, 12.0]);
        let roc = single(Roc::new(2).unwrap().compute(&table).unwrap());
        assert!((roc[2] - 20.0).abs() < 1e-9);
        let momentum = single(Momentum::new(2).unwrap().compute(&table).unwrap());
        assert!((momentum[2] - 2.0).abs() < 1e-9);
        assert!(momentum[1].is_nan());
    }

    #[test]
    fn cci_flat_prices_are_undefined() {
        let table = table_from_closes(&[7.0; 10]);
        let values = single(Cci::new(5).unwrap().compute(&table).unwrap());
        assert!(values.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn cci_positive_when_price_above_mean() {
        let closes: Vec<f64> = (1..=10).map(|i| i as f64).collect();
        let table = table_from_closes(&closes);
        let values = single(Cci::new(5).unwrap().compute(&table).unwrap());
        // window 6..10: mean 8, mean abs deviation 1.2 -> (10 - 8) / 0.018
        assert!((values[9] - 2.0 / (0.015 * 1.2)).abs() < 1e-6);
    }

    #[test]
    fn tsi_is_100_on_steady_rise() {
        let closes: Vec<f64> = (1..=40).map(|i| i as f64).collect();
        let table = table_from_closes(&closes);
        let values = single(Tsi::new(25, 13).unwrap().compute(&table).unwrap());
        assert!(values[0].is_nan());
        assert!((values[39] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn ultimate_oscillator_stays_in_range() {
        let table = sample_table(60);
        let values = single(UltimateOscillator::new(7, 14, 28).unwrap().compute(&table).unwrap());
        assert!(values[..28].iter().all(|v| v.is_nan()));
        assert!(values[28..].iter().all(|v| (0.0..=100.0).contains(v)));
    }

    #[test]
    fn ultimate_oscillator_rejects_unordered_periods() {
        assert!(UltimateOscillator::new(14, 7, 28).is_err());
    }

    #[test]
    fn awesome_oscillator_flat_is_zero() {
        let table = table_from_closes(&[3.0; 40]);
        let values = single(AwesomeOscillator::new(5, 34).unwrap().compute(&table).unwrap());
        assert!(values[..33].iter().all(|v| v.is_nan()));
        assert!(values[33..].iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn coppock_warmup() {
        let table = sample_table(40);
        let values = single(Coppock::new(10, 14, 11).unwrap().compute(&table).unwrap());
        // the long ROC needs 14 bars, then the WMA needs 10 of those
        assert!(values[..23].iter().all(|v| v.is_nan()));
        assert!(!values[23].is_nan());
    }
}
