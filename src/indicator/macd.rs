use error_stack::{Report, bail};

use crate::error::IndicatorError;
use crate::indicator::{Indicator, Output, numeric};
use crate::series;
use crate::table::IndicatorTable;

pub(crate) fn check_fast_slow(fast: usize, slow: usize) -> Result<(), Report<IndicatorError>> {
    if fast == 0 || slow == 0 {
        bail!(IndicatorError::InvalidParameter {
            name: "all periods must be > 0".into(),
        });
    }
    if fast >= slow {
        bail!(IndicatorError::InvalidParameter {
            name: "fast_period must be < slow_period".into(),
        });
    }
    Ok(())
}

/// MACD line, signal line and histogram.
///
/// Column names carry their periods (`MACD_12_26`, `MACD_Signal_12_26_9`,
/// `MACD_Hist_12_26_9`) so several parameterisations can coexist.
pub struct Macd {
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
}

impl Macd {
    pub fn new(
        fast_period: usize,
        slow_period: usize,
        signal_period: usize,
    ) -> Result<Self, Report<IndicatorError>> {
        check_fast_slow(fast_period, slow_period)?;
        if signal_period == 0 {
            bail!(IndicatorError::InvalidParameter {
                name: "all periods must be > 0".into(),
            });
        }
        Ok(Self {
            fast_period,
            slow_period,
            signal_period,
        })
    }

    /// Calculate (macd_line, signal_line, histogram) columns.
    pub fn calculate_full(&self, prices: &[f64]) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let fast_ema = series::ewm(prices, self.fast_period);
        let slow_ema = series::ewm(prices, self.slow_period);
        let macd_line: Vec<f64> = fast_ema.iter().zip(&slow_ema).map(|(f, s)| f - s).collect();
        let signal_line = series::ewm(&macd_line, self.signal_period);
        let histogram = macd_line
            .iter()
            .zip(&signal_line)
            .map(|(m, s)| m - s)
            .collect();
        (macd_line, signal_line, histogram)
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        "macd"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        let (line, signal, histogram) = self.calculate_full(table.close());
        let base = format!("{}_{}", self.fast_period, self.slow_period);
        Ok(vec![
            numeric(format!("MACD_{base}"), line),
            numeric(format!("MACD_Signal_{base}_{}", self.signal_period), signal),
            numeric(format!("MACD_Hist_{base}_{}", self.signal_period), histogram),
        ])
    }
}

/// Percentage Price Oscillator: the MACD line as a percentage of the slow EMA.
pub struct Ppo {
    fast_period: usize,
    slow_period: usize,
}

impl Ppo {
    pub fn new(fast_period: usize, slow_period: usize) -> Result<Self, Report<IndicatorError>> {
        check_fast_slow(fast_period, slow_period)?;
        Ok(Self {
            fast_period,
            slow_period,
        })
    }
}

impl Indicator for Ppo {
    fn name(&self) -> &str {
        "ppo"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        let fast = series::ewm(table.close(), self.fast_period);
        let slow = series::ewm(table.close(), self.slow_period);
        let values = fast
            .iter()
            .zip(&slow)
            .map(|(&f, &s)| 100.0 * series::safe_div(f - s, s))
            .collect();
        Ok(vec![numeric(
            format!("PPO_{}_{}", self.fast_period, self.slow_period),
            values,
        )])
    }
}
