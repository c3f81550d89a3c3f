use error_stack::Report;

use crate::error::IndicatorError;
use crate::indicator::macd::check_fast_slow;
use crate::indicator::{Indicator, Output, check_period, numeric, typical_price};
use crate::model::Bar;
use crate::series::{self, Reducer};
use crate::table::IndicatorTable;

/// Money-flow volume of one bar: the close location within the bar's range
/// times volume. A bar with no range contributes nothing.
fn money_flow_volume(bar: &Bar) -> f64 {
    let range = bar.high - bar.low;
    if range == 0.0 {
        return 0.0;
    }
    let multiplier = ((bar.close - bar.low) - (bar.high - bar.close)) / range;
    multiplier * bar.volume
}

/// On-Balance Volume, starting at 0.
pub struct Obv;

impl Obv {
    pub fn calculate(bars: &[Bar]) -> Vec<f64> {
        series::running(bars, 0.0, |obv, prev, cur| {
            if cur.close > prev.close {
                obv + cur.volume
            } else if cur.close < prev.close {
                obv - cur.volume
            } else {
                obv
            }
        })
    }
}

impl Indicator for Obv {
    fn name(&self) -> &str {
        "obv"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        Ok(vec![numeric("OBV", Self::calculate(table.bars()))])
    }
}

/// Accumulation/Distribution Line, seeded with the first bar's money-flow
/// volume.
pub struct AccumulationDistribution;

impl AccumulationDistribution {
    pub fn calculate(bars: &[Bar]) -> Vec<f64> {
        let Some(first) = bars.first() else {
            return Vec::new();
        };
        series::running(bars, money_flow_volume(first), |adl, _, cur| {
            adl + money_flow_volume(cur)
        })
    }
}

impl Indicator for AccumulationDistribution {
    fn name(&self) -> &str {
        "adl"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        Ok(vec![numeric("ADL", Self::calculate(table.bars()))])
    }
}

/// Chaikin Oscillator: fast EMA minus slow EMA of the `ADL` column, which
/// must already be in the table.
pub struct ChaikinOscillator {
    fast_period: usize,
    slow_period: usize,
}

impl ChaikinOscillator {
    pub fn new(fast_period: usize, slow_period: usize) -> Result<Self, Report<IndicatorError>> {
        check_fast_slow(fast_period, slow_period)?;
        Ok(Self {
            fast_period,
            slow_period,
        })
    }
}

impl Indicator for ChaikinOscillator {
    fn name(&self) -> &str {
        "chaikin_oscillator"
    }

    fn requires(&self) -> Vec<String> {
        vec!["ADL".into()]
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        let adl = table.numeric("ADL")?;
        let fast = series::ewm(adl, self.fast_period);
        let slow = series::ewm(adl, self.slow_period);
        let values = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
        Ok(vec![numeric(
            format!("Chaikin_Oscillator_{}_{}", self.fast_period, self.slow_period),
            values,
        )])
    }
}

/// Which volume move updates a [`VolumeIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeDirection {
    /// Negative Volume Index: updates when volume falls.
    Negative,
    /// Positive Volume Index: updates when volume rises.
    Positive,
}

/// NVI / PVI, starting at 1000. On qualifying bars the index moves by the
/// close-to-close percent change; otherwise it holds.
pub struct VolumeIndex {
    direction: VolumeDirection,
}

impl VolumeIndex {
    pub const SEED: f64 = 1000.0;

    pub fn new(direction: VolumeDirection) -> Self {
        Self { direction }
    }

    pub fn calculate(&self, bars: &[Bar]) -> Vec<f64> {
        series::running(bars, Self::SEED, |index, prev, cur| {
            let qualifies = match self.direction {
                VolumeDirection::Negative => cur.volume < prev.volume,
                VolumeDirection::Positive => cur.volume > prev.volume,
            };
            let change = series::safe_div(cur.close - prev.close, prev.close);
            if qualifies && !change.is_nan() {
                index * (1.0 + change)
            } else {
                index
            }
        })
    }
}

impl Indicator for VolumeIndex {
    fn name(&self) -> &str {
        match self.direction {
            VolumeDirection::Negative => "nvi",
            VolumeDirection::Positive => "pvi",
        }
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        let column = match self.direction {
            VolumeDirection::Negative => "NVI",
            VolumeDirection::Positive => "PVI",
        };
        Ok(vec![numeric(column, self.calculate(table.bars()))])
    }
}

/// Volume-Price Trend, starting at 0.
pub struct Vpt;

impl Vpt {
    pub fn calculate(bars: &[Bar]) -> Vec<f64> {
        series::running(bars, 0.0, |vpt, prev, cur| {
            let change = series::safe_div(cur.close - prev.close, prev.close);
            if change.is_nan() { vpt } else { vpt + cur.volume * change }
        })
    }
}

impl Indicator for Vpt {
    fn name(&self) -> &str {
        "vpt"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        Ok(vec![numeric("VPT", Self::calculate(table.bars()))])
    }
}

/// Money Flow Index. Undefined while the window holds no negative flow.
pub struct Mfi {
    period: usize,
}

impl Mfi {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        check_period("period", period)?;
        Ok(Self { period })
    }
}

impl Indicator for Mfi {
    fn name(&self) -> &str {
        "mfi"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        let tp = typical_price(table);
        let volume = table.volume();
        let mut positive = vec![f64::NAN; tp.len()];
        let mut negative = vec![f64::NAN; tp.len()];
        for i in 1..tp.len() {
            let flow = tp[i] * volume[i];
            let (pos, neg) = if tp[i] > tp[i - 1] {
                (flow, 0.0)
            } else if tp[i] < tp[i - 1] {
                (0.0, flow)
            } else {
                (0.0, 0.0)
            };
            positive[i] = pos;
            negative[i] = neg;
        }
        let positive = series::rolling(&positive, self.period, Reducer::Sum);
        let negative = series::rolling(&negative, self.period, Reducer::Sum);
        let values = positive
            .iter()
            .zip(&negative)
            .map(|(&p, &n)| 100.0 - 100.0 / (1.0 + series::safe_div(p, n)))
            .collect();
        Ok(vec![numeric(format!("MFI_{}", self.period), values)])
    }
}

/// Force Index: EMA of close change times volume.
pub struct ForceIndex {
    period: usize,
}

impl ForceIndex {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        check_period("period", period)?;
        Ok(Self { period })
    }
}

impl Indicator for ForceIndex {
    fn name(&self) -> &str {
        "force_index"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        let raw: Vec<f64> = series::diff(table.close(), 1)
            .iter()
            .zip(table.volume())
            .map(|(d, v)| d * v)
            .collect();
        Ok(vec![numeric(
            format!("Force_{}", self.period),
            series::ewm(&raw, self.period),
        )])
    }
}

/// Ease of Movement: SMA of midpoint move per unit of volume-per-range.
pub struct EaseOfMovement {
    period: usize,
}

impl EaseOfMovement {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        check_period("period", period)?;
        Ok(Self { period })
    }
}

impl Indicator for EaseOfMovement {
    fn name(&self) -> &str {
        "ease_of_movement"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        let (high, low, volume) = (table.high(), table.low(), table.volume());
        let raw: Vec<f64> = (0..high.len())
            .map(|i| {
                if i == 0 {
                    return f64::NAN;
                }
                let distance = (high[i] + low[i]) / 2.0 - (high[i - 1] + low[i - 1]) / 2.0;
                series::safe_div(distance * (high[i] - low[i]), volume[i])
            })
            .collect();
        Ok(vec![numeric(
            format!("EoM_{}", self.period),
            series::rolling(&raw, self.period, Reducer::Mean),
        )])
    }
}

/// Chaikin Money Flow: windowed money-flow volume over windowed volume.
pub struct Cmf {
    period: usize,
}

impl Cmf {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        check_period("period", period)?;
        Ok(Self { period })
    }
}

impl Indicator for Cmf {
    fn name(&self) -> &str {
        "cmf"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        let flow: Vec<f64> = table.bars().iter().map(money_flow_volume).collect();
        let flow = series::rolling(&flow, self.period, Reducer::Sum);
        let volume = series::rolling(table.volume(), self.period, Reducer::Sum);
        Ok(vec![numeric(
            format!("CMF_{}", self.period),
            series::ratio(&flow, &volume),
        )])
    }
}
