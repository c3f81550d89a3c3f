use error_stack::Report;

use crate::error::IndicatorError;
use crate::indicator::{Indicator, Output, check_period, check_positive, numeric};
use crate::model::Bar;
use crate::series::{self, Reducer};
use crate::table::IndicatorTable;

/// Incremental Wilder average: the mean of the first `period` samples, then
/// `(prev * (period - 1) + x) / period`.
struct WilderAverage {
    period: f64,
    seed_sum: f64,
    seen: usize,
    value: Option<f64>,
}

impl WilderAverage {
    fn new(period: usize) -> Self {
        Self {
            period: period as f64,
            seed_sum: 0.0,
            seen: 0,
            value: None,
        }
    }

    fn push(&mut self, sample: f64) -> Option<f64> {
        match self.value {
            Some(prev) => {
                self.value = Some((prev * (self.period - 1.0) + sample) / self.period);
            }
            None => {
                self.seed_sum += sample;
                self.seen += 1;
                if self.seen as f64 >= self.period {
                    self.value = Some(self.seed_sum / self.period);
                }
            }
        }
        self.value
    }
}

/// Directional movement from `prev` to `cur` as (+DM, -DM).
fn directional_movement(prev: &Bar, cur: &Bar) -> (f64, f64) {
    let up = cur.high - prev.high;
    let down = prev.low - cur.low;
    let plus = if up > down && up > 0.0 { up } else { 0.0 };
    let minus = if down > up && down > 0.0 { down } else { 0.0 };
    (plus, minus)
}

fn bar_true_range(prev: &Bar, cur: &Bar) -> f64 {
    (cur.high - cur.low)
        .max((cur.high - prev.close).abs())
        .max((cur.low - prev.close).abs())
}

/// Average Directional Index with its +DI / -DI lines.
///
/// Runs as a single fold over the bars: TR and both DMs are Wilder-smoothed
/// from the second bar on, and DX is smoothed again once both DIs exist.
/// The first ADX value lands at row `2 * period - 1`.
pub struct Adx {
    period: usize,
}

impl Adx {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        check_period("period", period)?;
        Ok(Self { period })
    }

    /// Returns (+DI, -DI, ADX).
    pub fn calculate(&self, bars: &[Bar]) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let len = bars.len();
        let mut plus_di = vec![f64::NAN; len];
        let mut minus_di = vec![f64::NAN; len];
        let mut adx = vec![f64::NAN; len];

        let mut tr_avg = WilderAverage::new(self.period);
        let mut plus_avg = WilderAverage::new(self.period);
        let mut minus_avg = WilderAverage::new(self.period);
        let mut dx_avg = WilderAverage::new(self.period);

        for (i, pair) in bars.windows(2).enumerate() {
            let row = i + 1;
            let (plus_dm, minus_dm) = directional_movement(&pair[0], &pair[1]);
            let tr = tr_avg.push(bar_true_range(&pair[0], &pair[1]));
            let plus = plus_avg.push(plus_dm);
            let minus = minus_avg.push(minus_dm);
            let (Some(tr), Some(plus), Some(minus)) = (tr, plus, minus) else {
                continue;
            };

            let pdi = 100.0 * series::safe_div(plus, tr);
            let mdi = 100.0 * series::safe_div(minus, tr);
            plus_di[row] = pdi;
            minus_di[row] = mdi;

            let dx = 100.0 * series::safe_div((pdi - mdi).abs(), pdi + mdi);
            if dx.is_nan() {
                continue;
            }
            if let Some(value) = dx_avg.push(dx) {
                adx[row] = value;
            }
        }
        (plus_di, minus_di, adx)
    }
}

impl Indicator for Adx {
    fn name(&self) -> &str {
        "adx"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        let (plus_di, minus_di, adx) = self.calculate(table.bars());
        let n = self.period;
        Ok(vec![
            numeric(format!("+DI_{n}"), plus_di),
            numeric(format!("-DI_{n}"), minus_di),
            numeric(format!("ADX_{n}"), adx),
        ])
    }
}

/// Vortex indicator: windowed upward / downward vortex movement over the
/// windowed true range.
pub struct Vortex {
    period: usize,
}

impl Vortex {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        check_period("period", period)?;
        Ok(Self { period })
    }
}

impl Indicator for Vortex {
    fn name(&self) -> &str {
        "vortex"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        let bars = table.bars();
        let mut up = vec![f64::NAN; bars.len()];
        let mut down = vec![f64::NAN; bars.len()];
        let mut tr = vec![f64::NAN; bars.len()];
        for (i, pair) in bars.windows(2).enumerate() {
            let (prev, cur) = (&pair[0], &pair[1]);
            up[i + 1] = (cur.high - prev.low).abs();
            down[i + 1] = (cur.low - prev.high).abs();
            tr[i + 1] = bar_true_range(prev, cur);
        }
        let tr = series::rolling(&tr, self.period, Reducer::Sum);
        let up = series::rolling(&up, self.period, Reducer::Sum);
        let down = series::rolling(&down, self.period, Reducer::Sum);

        let n = self.period;
        Ok(vec![
            numeric(format!("Vortex_Pos_{n}"), series::ratio(&up, &tr)),
            numeric(format!("Vortex_Neg_{n}"), series::ratio(&down, &tr)),
        ])
    }
}

/// Aroon Up / Down: how recently, within the last `period + 1` bars, the
/// highest high and lowest low occurred. Ties go to the most recent bar.
pub struct Aroon {
    period: usize,
}

impl Aroon {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        check_period("period", period)?;
        Ok(Self { period })
    }

    fn score(&self, values: &[f64], newer_wins: impl Fn(f64, f64) -> bool) -> Vec<f64> {
        let mut out = vec![f64::NAN; values.len()];
        let span = self.period + 1;
        if span > values.len() {
            return out;
        }
        for (i, window) in values.windows(span).enumerate() {
            let mut best = 0;
            for (k, &value) in window.iter().enumerate().skip(1) {
                if newer_wins(value, window[best]) {
                    best = k;
                }
            }
            let since = (span - 1 - best) as f64;
            let period = self.period as f64;
            out[i + self.period] = 100.0 * (period - since) / period;
        }
        out
    }
}

impl Indicator for Aroon {
    fn name(&self) -> &str {
        "aroon"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        let up = self.score(table.high(), |candidate, best| candidate >= best);
        let down = self.score(table.low(), |candidate, best| candidate <= best);
        let n = self.period;
        Ok(vec![
            numeric(format!("Aroon_Up_{n}"), up),
            numeric(format!("Aroon_Down_{n}"), down),
        ])
    }
}

/// Wilder's Swing Index and its running sum, the Accumulative Swing Index.
///
/// `limit_move` is the largest price move allowed in one period. SI is
/// undefined on the first bar and on bars with a zero reference range; ASI
/// starts at 0 and holds across undefined SI values.
pub struct SwingIndex {
    limit_move: f64,
}

impl SwingIndex {
    pub const DEFAULT_LIMIT_MOVE: f64 = 10.0;

    pub fn new(limit_move: f64) -> Result<Self, Report<IndicatorError>> {
        check_positive("limit_move", limit_move)?;
        Ok(Self { limit_move })
    }

    pub fn swing(&self, prev: &Bar, cur: &Bar) -> f64 {
        let high_gap = (cur.high - prev.close).abs();
        let low_gap = (cur.low - prev.close).abs();
        let range = cur.high - cur.low;
        let prev_body = (prev.close - prev.open).abs();

        let reference = if high_gap >= low_gap && high_gap >= range {
            high_gap - 0.5 * low_gap + 0.25 * prev_body
        } else if low_gap >= high_gap && low_gap >= range {
            low_gap - 0.5 * high_gap + 0.25 * prev_body
        } else {
            range + 0.25 * prev_body
        };

        let k = high_gap.max(low_gap);
        let numerator = cur.close - prev.close
            + 0.5 * (cur.close - cur.open)
            + 0.25 * (prev.close - prev.open);
        50.0 * series::safe_div(numerator, reference) * k / self.limit_move
    }
}

impl Indicator for SwingIndex {
    fn name(&self) -> &str {
        "swing_index"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        let bars = table.bars();
        let mut si = vec![f64::NAN; bars.len()];
        for (i, pair) in bars.windows(2).enumerate() {
            si[i + 1] = self.swing(&pair[0], &pair[1]);
        }
        let asi = series::running(bars, 0.0, |asi, prev, cur| {
            let step = self.swing(prev, cur);
            if step.is_nan() { asi } else { asi + step }
        });
        Ok(vec![numeric("SI", si), numeric("ASI", asi)])
    }
}
