use error_stack::Report;

use crate::error::IndicatorError;
use crate::indicator::{Indicator, Output, check_period, numeric};
use crate::series::{self, Reducer};
use crate::table::IndicatorTable;

/// Wilder-smoothed true range.
pub fn average_true_range(table: &IndicatorTable, period: usize) -> Vec<f64> {
    let tr = series::true_range(table.high(), table.low(), table.close());
    series::wilder(&tr, period)
}

/// Rolling sample standard deviation of closes (`Vol_{n}`).
pub struct Volatility {
    period: usize,
}

impl Volatility {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        check_period("period", period)?;
        Ok(Self { period })
    }
}

impl Indicator for Volatility {
    fn name(&self) -> &str {
        "volatility"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        let values = series::rolling(table.close(), self.period, Reducer::Std);
        Ok(vec![numeric(format!("Vol_{}", self.period), values)])
    }
}

pub struct Atr {
    period: usize,
}

impl Atr {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        check_period("period", period)?;
        Ok(Self { period })
    }
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        "atr"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        Ok(vec![numeric(
            format!("ATR_{}", self.period),
            average_true_range(table, self.period),
        )])
    }
}

/// Mass Index: sum over `sum_period` bars of EMA(range) / EMA(EMA(range)).
pub struct MassIndex {
    ema_period: usize,
    sum_period: usize,
}

impl MassIndex {
    pub fn new(ema_period: usize, sum_period: usize) -> Result<Self, Report<IndicatorError>> {
        check_period("ema_period", ema_period)?;
        check_period("sum_period", sum_period)?;
        Ok(Self {
            ema_period,
            sum_period,
        })
    }
}

impl Indicator for MassIndex {
    fn name(&self) -> &str {
        "mass_index"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        let range: Vec<f64> = table
            .high()
            .iter()
            .zip(table.low())
            .map(|(h, l)| h - l)
            .collect();
        let single = series::ewm(&range, self.ema_period);
        let double = series::ewm(&single, self.ema_period);
        let ratio = series::ratio(&single, &double);
        let values = series::rolling(&ratio, self.sum_period, Reducer::Sum);
        Ok(vec![numeric(
            format!("Mass_Index_{}_{}", self.ema_period, self.sum_period),
            values,
        )])
    }
}

/// Chaikin Volatility: percent change over `period` bars of the EMA of the
/// high-low range.
pub struct ChaikinVolatility {
    period: usize,
}

impl ChaikinVolatility {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        check_period("period", period)?;
        Ok(Self { period })
    }
}

impl Indicator for ChaikinVolatility {
    fn name(&self) -> &str {
        "chaikin_volatility"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        let range: Vec<f64> = table
            .high()
            .iter()
            .zip(table.low())
            .map(|(h, l)| h - l)
            .collect();
        let smoothed = series::ewm(&range, self.period);
        let values = series::pct_change(&smoothed, self.period)
            .into_iter()
            .map(|v| v * 100.0)
            .collect();
        Ok(vec![numeric(
            format!("Chaikin_Volatility_{}", self.period),
            values,
        )])
    }
}
