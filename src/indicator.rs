pub mod bands;
pub mod directional;
pub mod label;
pub mod ma;
pub mod macd;
pub mod oscillator;
pub mod pattern;
pub mod volatility;
pub mod volume;

use error_stack::{Report, bail};

use crate::error::IndicatorError;
use crate::table::{Column, IndicatorTable};

/// Columns produced by one indicator, in output order.
pub type Output = Vec<(String, Column)>;

/// A transform that reads columns of an [`IndicatorTable`] and produces new
/// ones.
///
/// Implementations never mutate the table; the caller decides where the
/// output goes (normally [`IndicatorTable::apply`]).
pub trait Indicator: Send + Sync {
    /// Short kind name of this indicator (e.g. "rsi", "sma").
    fn name(&self) -> &str;

    /// Derived columns that must already exist in the table.
    fn requires(&self) -> Vec<String> {
        Vec::new()
    }

    /// Compute the output columns. Every column has one value per bar.
    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>>;
}

/// `(high + low + close) / 3` per bar.
pub fn typical_price(table: &IndicatorTable) -> Vec<f64> {
    table
        .high()
        .iter()
        .zip(table.low())
        .zip(table.close())
        .map(|((h, l), c)| (h + l + c) / 3.0)
        .collect()
}

/// `(high + low) / 2` per bar.
pub fn median_price(table: &IndicatorTable) -> Vec<f64> {
    table
        .high()
        .iter()
        .zip(table.low())
        .map(|(h, l)| (h + l) / 2.0)
        .collect()
}

pub(crate) fn check_period(what: &str, period: usize) -> Result<(), Report<IndicatorError>> {
    if period == 0 {
        bail!(IndicatorError::InvalidParameter {
            name: format!("{what} must be > 0"),
        });
    }
    Ok(())
}

pub(crate) fn check_positive(what: &str, value: f64) -> Result<(), Report<IndicatorError>> {
    if value.is_nan() || value <= 0.0 {
        bail!(IndicatorError::InvalidParameter {
            name: format!("{what} must be > 0"),
        });
    }
    Ok(())
}

pub(crate) fn numeric(name: impl Into<String>, values: Vec<f64>) -> (String, Column) {
    (name.into(), Column::Numeric(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::test_support::table_from_ohlcv;

    #[test]
    fn price_helpers() {
        let table = table_from_ohlcv(&[(1.0, 4.0, 1.0, 4.0, 1.0)]);
        assert_eq!(typical_price(&table), vec![3.0]);
        assert_eq!(median_price(&table), vec![2.5]);
    }

    #[test]
    fn parameter_checks() {
        assert!(check_period("period", 0).is_err());
        assert!(check_period("period", 1).is_ok());
        assert!(check_positive("multiplier", 0.0).is_err());
        assert!(check_positive("multiplier", f64::NAN).is_err());
        assert!(check_positive("multiplier", 2.0).is_ok());
    }
}
