use error_stack::{Report, bail};

use crate::error::IndicatorError;
use crate::indicator::{Indicator, Output, check_period, numeric, typical_price};
use crate::series::{self, Reducer};
use crate::table::{CLOSE, IndicatorTable};

/// Simple Moving Average over any numeric column (close by default).
///
/// Writes `MA_{n}` for closes and `{Source}_MA_{n}` otherwise, so the volume
/// average lands in `Volume_MA_{n}`.
pub struct Sma {
    period: usize,
    source: String,
}

impl Sma {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        Self::with_source(period, CLOSE)
    }

    pub fn with_source(
        period: usize,
        source: impl Into<String>,
    ) -> Result<Self, Report<IndicatorError>> {
        check_period("period", period)?;
        Ok(Self {
            period,
            source: source.into(),
        })
    }

    fn column_name(&self) -> String {
        if self.source == CLOSE {
            format!("MA_{}", self.period)
        } else {
            format!("{}_MA_{}", self.source, self.period)
        }
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        "sma"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        let values = table.numeric(&self.source)?;
        Ok(vec![numeric(
            self.column_name(),
            series::rolling(values, self.period, Reducer::Mean),
        )])
    }
}

/// Exponential Moving Average of closes, `EMA_{n}`.
pub struct Ema {
    span: usize,
}

impl Ema {
    pub fn new(span: usize) -> Result<Self, Report<IndicatorError>> {
        check_period("span", span)?;
        Ok(Self { span })
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        "ema"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        Ok(vec![numeric(
            format!("EMA_{}", self.span),
            series::ewm(table.close(), self.span),
        )])
    }
}

/// Linearly Weighted Moving Average of closes, `WMA_{n}`.
pub struct Wma {
    period: usize,
}

impl Wma {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        check_period("period", period)?;
        Ok(Self { period })
    }
}

impl Indicator for Wma {
    fn name(&self) -> &str {
        "wma"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        Ok(vec![numeric(
            format!("WMA_{}", self.period),
            series::wma(table.close(), self.period),
        )])
    }
}

/// Double EMA: `2·EMA − EMA(EMA)`.
pub struct Dema {
    span: usize,
}

impl Dema {
    pub fn new(span: usize) -> Result<Self, Report<IndicatorError>> {
        check_period("span", span)?;
        Ok(Self { span })
    }
}

impl Indicator for Dema {
    fn name(&self) -> &str {
        "dema"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        let first = series::ewm(table.close(), self.span);
        let second = series::ewm(&first, self.span);
        let values = first.iter().zip(&second).map(|(a, b)| 2.0 * a - b).collect();
        Ok(vec![numeric(format!("DEMA_{}", self.span), values)])
    }
}

/// Triple EMA: `3·E1 − 3·E2 + E3` over three chained EMAs.
pub struct Tema {
    span: usize,
}

impl Tema {
    pub fn new(span: usize) -> Result<Self, Report<IndicatorError>> {
        check_period("span", span)?;
        Ok(Self { span })
    }
}

impl Indicator for Tema {
    fn name(&self) -> &str {
        "tema"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        let e1 = series::ewm(table.close(), self.span);
        let e2 = series::ewm(&e1, self.span);
        let e3 = series::ewm(&e2, self.span);
        let values = (0..e1.len())
            .map(|i| 3.0 * e1[i] - 3.0 * e2[i] + e3[i])
            .collect();
        Ok(vec![numeric(format!("TEMA_{}", self.span), values)])
    }
}

/// Hull Moving Average: `WMA(2·WMA(n/2) − WMA(n), ⌊√n⌋)`.
pub struct Hma {
    period: usize,
}

impl Hma {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        if period < 2 {
            bail!(IndicatorError::InvalidParameter {
                name: "period must be >= 2".into(),
            });
        }
        Ok(Self { period })
    }
}

impl Indicator for Hma {
    fn name(&self) -> &str {
        "hma"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        let close = table.close();
        let half = series::wma(close, self.period / 2);
        let full = series::wma(close, self.period);
        let raw: Vec<f64> = half.iter().zip(&full).map(|(h, f)| 2.0 * h - f).collect();
        let smooth = (self.period as f64).sqrt().floor() as usize;
        Ok(vec![numeric(
            format!("HMA_{}", self.period),
            series::wma(&raw, smooth.max(1)),
        )])
    }
}

/// Kaufman Adaptive Moving Average, `KAMA_{n}`.
///
/// The smoothing constant follows the efficiency ratio of the last `n`
/// closes, between the `fast` and `slow` EMA constants.
pub struct Kama {
    period: usize,
    fast: usize,
    slow: usize,
}

impl Kama {
    pub fn new(period: usize, fast: usize, slow: usize) -> Result<Self, Report<IndicatorError>> {
        check_period("period", period)?;
        check_period("fast", fast)?;
        check_period("slow", slow)?;
        if fast >= slow {
            bail!(IndicatorError::InvalidParameter {
                name: "fast must be < slow".into(),
            });
        }
        Ok(Self { period, fast, slow })
    }

    pub fn calculate_prices(&self, close: &[f64]) -> Vec<f64> {
        let len = close.len();
        let mut out = vec![f64::NAN; len];
        if len < self.period {
            return out;
        }

        let fast_sc = 2.0 / (self.fast as f64 + 1.0);
        let slow_sc = 2.0 / (self.slow as f64 + 1.0);
        let mut kama = close[self.period - 1];
        out[self.period - 1] = kama;

        for i in self.period..len {
            let change = (close[i] - close[i - self.period]).abs();
            let volatility: f64 = (i + 1 - self.period..=i)
                .map(|j| (close[j] - close[j - 1]).abs())
                .sum();
            // Flat window: no direction, fall back to the slow constant.
            let efficiency = if volatility == 0.0 { 0.0 } else { change / volatility };
            let sc = (efficiency * (fast_sc - slow_sc) + slow_sc).powi(2);
            kama += sc * (close[i] - kama);
            out[i] = kama;
        }
        out
    }
}

impl Indicator for Kama {
    fn name(&self) -> &str {
        "kama"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        Ok(vec![numeric(
            format!("KAMA_{}", self.period),
            self.calculate_prices(table.close()),
        )])
    }
}

/// TRIX: one-period percent change of a triple-smoothed EMA.
pub struct Trix {
    span: usize,
}

impl Trix {
    pub fn new(span: usize) -> Result<Self, Report<IndicatorError>> {
        check_period("span", span)?;
        Ok(Self { span })
    }
}

impl Indicator for Trix {
    fn name(&self) -> &str {
        "trix"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        let e1 = series::ewm(table.close(), self.span);
        let e2 = series::ewm(&e1, self.span);
        let e3 = series::ewm(&e2, self.span);
        let values = series::pct_change(&e3, 1)
            .into_iter()
            .map(|v| v * 100.0)
            .collect();
        Ok(vec![numeric(format!("TRIX_{}", self.span), values)])
    }
}

/// Rolling volume-weighted average of the typical price, `VWAP_{n}`.
pub struct Vwap {
    period: usize,
}

impl Vwap {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        check_period("period", period)?;
        Ok(Self { period })
    }
}

impl Indicator for Vwap {
    fn name(&self) -> &str {
        "vwap"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        let weighted: Vec<f64> = typical_price(table)
            .iter()
            .zip(table.volume())
            .map(|(p, v)| p * v)
            .collect();
        let num = series::rolling(&weighted, self.period, Reducer::Sum);
        let den = series::rolling(table.volume(), self.period, Reducer::Sum);
        Ok(vec![numeric(
            format!("VWAP_{}", self.period),
            series::ratio(&num, &den),
        )])
    }
}

/// Any trailing-window statistic over any numeric column,
/// `{Source}_{Reducer}_{n}`.
pub struct RollingStat {
    source: String,
    window: usize,
    reducer: Reducer,
}

impl RollingStat {
    pub fn new(
        source: impl Into<String>,
        window: usize,
        reducer: Reducer,
    ) -> Result<Self, Report<IndicatorError>> {
        check_period("window", window)?;
        Ok(Self {
            source: source.into(),
            window,
            reducer,
        })
    }
}

impl Indicator for RollingStat {
    fn name(&self) -> &str {
        "rolling"
    }

    fn requires(&self) -> Vec<String> {
        vec![self.source.clone()]
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        let values = table.numeric(&self.source)?;
        Ok(vec![numeric(
            format!("{}_{}_{}", self.source, self.reducer.as_str(), self.window),
            series::rolling(values, self.window, self.reducer),
        )])
    }
}

/// Shifted copy of a numeric column.
///
/// Positive periods lag (`{Source}_Lag_{k}`); negative periods look ahead
/// (`{Source}_Lead_{k}`) and are only valid as labels.
pub struct Lag {
    source: String,
    periods: isize,
}

impl Lag {
    pub fn new(source: impl Into<String>, periods: isize) -> Result<Self, Report<IndicatorError>> {
        if periods == 0 {
            bail!(IndicatorError::InvalidParameter {
                name: "periods must be non-zero".into(),
            });
        }
        if periods == isize::MIN {
            bail!(IndicatorError::InvalidParameter {
                name: format!("periods must be > {}", isize::MIN),
            });
        }
        Ok(Self {
            source: source.into(),
            periods,
        })
    }
}

impl Indicator for Lag {
    fn name(&self) -> &str {
        "shift"
    }

    fn requires(&self) -> Vec<String> {
        vec![self.source.clone()]
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        let values = table.numeric(&self.source)?;
        let name = if self.periods > 0 {
            format!("{}_Lag_{}", self.source, self.periods)
        } else {
            format!("{}_Lead_{}", self.source, self.periods.unsigned_abs())
        };
        Ok(vec![numeric(name, series::shift(values, self.periods))])
    }
}
