use error_stack::Report;

use crate::error::IndicatorError;
use crate::indicator::volatility::average_true_range;
use crate::indicator::{Indicator, Output, check_period, check_positive, numeric};
use crate::series::{self, Reducer};
use crate::table::IndicatorTable;

/// Bollinger Bands: SMA ± `multiplier` sample standard deviations, plus the
/// relative band width and %B.
pub struct BollingerBands {
    period: usize,
    std_dev_multiplier: f64,
}

impl BollingerBands {
    pub fn new(period: usize, std_dev_multiplier: f64) -> Result<Self, Report<IndicatorError>> {
        check_period("period", period)?;
        check_positive("std_dev_multiplier", std_dev_multiplier)?;
        Ok(Self {
            period,
            std_dev_multiplier,
        })
    }

    /// Returns (upper, middle, lower) band columns.
    pub fn calculate_bands(&self, prices: &[f64]) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let middle = series::rolling(prices, self.period, Reducer::Mean);
        let std_dev = series::rolling(prices, self.period, Reducer::Std);
        let upper = middle
            .iter()
            .zip(&std_dev)
            .map(|(m, s)| m + self.std_dev_multiplier * s)
            .collect();
        let lower = middle
            .iter()
            .zip(&std_dev)
            .map(|(m, s)| m - self.std_dev_multiplier * s)
            .collect();
        (upper, middle, lower)
    }
}

impl Indicator for BollingerBands {
    fn name(&self) -> &str {
        "bollinger"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        let close = table.close();
        let (upper, middle, lower) = self.calculate_bands(close);
        let width = (0..close.len())
            .map(|i| series::safe_div(upper[i] - lower[i], middle[i]))
            .collect();
        let percent_b = (0..close.len())
            .map(|i| series::safe_div(close[i] - lower[i], upper[i] - lower[i]))
            .collect();

        let n = self.period;
        Ok(vec![
            numeric(format!("BB_Middle_{n}"), middle),
            numeric(format!("BB_Upper_{n}"), upper),
            numeric(format!("BB_Lower_{n}"), lower),
            numeric(format!("BB_Width_{n}"), width),
            numeric(format!("BB_PctB_{n}"), percent_b),
        ])
    }
}

/// Keltner Channels: EMA of closes ± `multiplier` ATRs.
pub struct KeltnerChannels {
    period: usize,
    multiplier: f64,
}

impl KeltnerChannels {
    pub fn new(period: usize, multiplier: f64) -> Result<Self, Report<IndicatorError>> {
        check_period("period", period)?;
        check_positive("multiplier", multiplier)?;
        Ok(Self { period, multiplier })
    }
}

impl Indicator for KeltnerChannels {
    fn name(&self) -> &str {
        "keltner"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        let middle = series::ewm(table.close(), self.period);
        let atr = average_true_range(table, self.period);
        let upper = middle
            .iter()
            .zip(&atr)
            .map(|(m, a)| m + self.multiplier * a)
            .collect();
        let lower = middle
            .iter()
            .zip(&atr)
            .map(|(m, a)| m - self.multiplier * a)
            .collect();

        let n = self.period;
        Ok(vec![
            numeric(format!("KC_Middle_{n}"), middle),
            numeric(format!("KC_Upper_{n}"), upper),
            numeric(format!("KC_Lower_{n}"), lower),
        ])
    }
}

/// Donchian Channels: highest high, lowest low and their midpoint.
pub struct DonchianChannels {
    period: usize,
}

impl DonchianChannels {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        check_period("period", period)?;
        Ok(Self { period })
    }
}

impl Indicator for DonchianChannels {
    fn name(&self) -> &str {
        "donchian"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        let upper = series::rolling(table.high(), self.period, Reducer::Max);
        let lower = series::rolling(table.low(), self.period, Reducer::Min);
        let middle = upper.iter().zip(&lower).map(|(u, l)| (u + l) / 2.0).collect();

        let n = self.period;
        Ok(vec![
            numeric(format!("DC_Upper_{n}"), upper),
            numeric(format!("DC_Lower_{n}"), lower),
            numeric(format!("DC_Middle_{n}"), middle),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::test_support::{sample_table, table_from_closes, table_from_ohlcv};

    #[test]
    fn bollinger_period_zero_invalid() {
        assert!(BollingerBands::new(0, 2.0).is_err());
    }

    #[test]
    fn bollinger_negative_multiplier_invalid() {
        assert!(BollingerBands::new(20, -1.0).is_err());
    }

    #[test]
    fn bollinger_flat_prices_zero_width() {
        let bb = BollingerBands::new(3, 2.0).unwrap();
        let (upper, middle, lower) = bb.calculate_bands(&[10.0_f64; 5]);
        for i in 2..5 {
            assert_eq!(upper[i], 10.0);
            assert_eq!(middle[i], 10.0);
            assert_eq!(lower[i], 10.0);
        }
    }

    #[test]
    fn bollinger_flat_prices_pct_b_undefined() {
        let table = table_from_closes(&[10.0; 5]);
        let out = BollingerBands::new(3, 2.0).unwrap().compute(&table).unwrap();
        assert_eq!(out[4].0, "BB_PctB_3");
        assert!(out[4].1.as_numeric().unwrap().iter().all(|v| v.is_nan()));
        assert_eq!(out[3].1.as_numeric().unwrap()[4], 0.0);
    }

    #[test]
    fn bollinger_bands_symmetry() {
        let bb = BollingerBands::new(3, 2.0).unwrap();
        let (upper, middle, lower) = bb.calculate_bands(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        for i in 2..5 {
            // upper - middle == middle - lower (symmetric around SMA)
            assert!((upper[i] - middle[i] - (middle[i] - lower[i])).abs() < 1e-9);
        }
        assert!(upper[..2].iter().all(|v| v.is_nan()));
    }

    #[test]
    fn keltner_brackets_middle() {
        let table = sample_table(40);
        let out = KeltnerChannels::new(10, 2.0).unwrap().compute(&table).unwrap();
        let middle = out[0].1.as_numeric().unwrap();
        let upper = out[1].1.as_numeric().unwrap();
        let lower = out[2].1.as_numeric().unwrap();
        assert!(upper[..9].iter().all(|v| v.is_nan()));
        for i in 9..40 {
            assert!(upper[i] > middle[i] && lower[i] < middle[i]);
        }
    }

    #[test]
    fn donchian_known_values() {
        let table = table_from_ohlcv(&[
            (1.0, 3.0, 1.0, 2.0, 1.0),
            (2.0, 5.0, 2.0, 4.0, 1.0),
            (4.0, 4.0, 0.0, 1.0, 1.0),
        ]);
        let out = DonchianChannels::new(2).unwrap().compute(&table).unwrap();
        assert_eq!(out[0].1.as_numeric().unwrap()[2], 5.0);
        assert_eq!(out[1].1.as_numeric().unwrap()[2], 0.0);
        assert_eq!(out[2].1.as_numeric().unwrap()[2], 2.5);
    }
}
