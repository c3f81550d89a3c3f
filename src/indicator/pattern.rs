use error_stack::Report;

use crate::error::IndicatorError;
use crate::indicator::{Indicator, Output};
use crate::model::Bar;
use crate::table::{Column, IndicatorTable};

/// Bars of history a pattern may look back over, current bar excluded.
pub const LOOKBACK: usize = 3;

const DOJI_BODY_RATIO: f64 = 0.1;
const TWEEZER_TOLERANCE: f64 = 0.001;

fn body(bar: &Bar) -> f64 {
    (bar.close - bar.open).abs()
}

fn range(bar: &Bar) -> f64 {
    bar.high - bar.low
}

fn upper_wick(bar: &Bar) -> f64 {
    bar.high - bar.open.max(bar.close)
}

fn lower_wick(bar: &Bar) -> f64 {
    bar.open.min(bar.close) - bar.low
}

fn is_bullish(bar: &Bar) -> bool {
    bar.close > bar.open
}

fn is_bearish(bar: &Bar) -> bool {
    bar.close < bar.open
}

fn is_doji(bar: &Bar) -> bool {
    range(bar) > 0.0 && body(bar) <= DOJI_BODY_RATIO * range(bar)
}

/// Candlestick patterns, in the order they are tried. Several are not
/// mutually exclusive, so this order decides which flag a row gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    BullishEngulfing,
    BearishEngulfing,
    Hammer,
    ShootingStar,
    Doji,
    BullishHarami,
    BearishHarami,
    TweezerBottom,
    TweezerTop,
    ThreeLineStrikeBullish,
    ThreeLineStrikeBearish,
    AbandonedBabyBullish,
    AbandonedBabyBearish,
    KickerBullish,
    KickerBearish,
}

impl Pattern {
    pub const ALL: [Pattern; 15] = [
        Self::BullishEngulfing,
        Self::BearishEngulfing,
        Self::Hammer,
        Self::ShootingStar,
        Self::Doji,
        Self::BullishHarami,
        Self::BearishHarami,
        Self::TweezerBottom,
        Self::TweezerTop,
        Self::ThreeLineStrikeBullish,
        Self::ThreeLineStrikeBearish,
        Self::AbandonedBabyBullish,
        Self::AbandonedBabyBearish,
        Self::KickerBullish,
        Self::KickerBearish,
    ];

    pub fn column(self) -> &'static str {
        match self {
            Self::ThreeLineStrikeBullish => "Three_Line_Strike_Bullish",
            Self::ThreeLineStrikeBearish => "Three_Line_Strike_Bearish",
            Self::AbandonedBabyBullish => "Abandoned_Baby_Bullish",
            Self::AbandonedBabyBearish => "Abandoned_Baby_Bearish",
            Self::KickerBullish => "Kicker_Bullish",
            Self::KickerBearish => "Kicker_Bearish",
            Self::BullishEngulfing => "Bullish_Engulfing",
            Self::BearishEngulfing => "Bearish_Engulfing",
            Self::BullishHarami => "Bullish_Harami",
            Self::BearishHarami => "Bearish_Harami",
            Self::TweezerBottom => "Tweezer_Bottom",
            Self::TweezerTop => "Tweezer_Top",
            Self::Hammer => "Hammer",
            Self::ShootingStar => "Shooting_Star",
            Self::Doji => "Doji",
        }
    }

    /// `window` holds the `LOOKBACK` previous bars followed by the current one.
    fn matches(self, window: &[Bar]) -> bool {
        let [b3, b2, prev, cur] = window else {
            return false;
        };
        match self {
            Self::ThreeLineStrikeBullish => {
                is_bearish(b3)
                    && is_bearish(b2)
                    && is_bearish(prev)
                    && b3.close > b2.close
                    && b2.close > prev.close
                    && cur.open < prev.close
                    && cur.close > b3.open
            }
            Self::ThreeLineStrikeBearish => {
                is_bullish(b3)
                    && is_bullish(b2)
                    && is_bullish(prev)
                    && b3.close < b2.close
                    && b2.close < prev.close
                    && cur.open > prev.close
                    && cur.close < b3.open
            }
            Self::AbandonedBabyBullish => {
                is_bearish(b2)
                    && is_doji(prev)
                    && prev.high < b2.low
                    && is_bullish(cur)
                    && cur.low > prev.high
            }
            Self::AbandonedBabyBearish => {
                is_bullish(b2)
                    && is_doji(prev)
                    && prev.low > b2.high
                    && is_bearish(cur)
                    && cur.high < prev.low
            }
            Self::KickerBullish => is_bearish(prev) && is_bullish(cur) && cur.open > prev.open,
            Self::KickerBearish => is_bullish(prev) && is_bearish(cur) && cur.open < prev.open,
            Self::BullishEngulfing => {
                is_bearish(prev)
                    && is_bullish(cur)
                    && cur.open <= prev.close
                    && cur.close >= prev.open
                    && body(cur) > body(prev)
            }
            Self::BearishEngulfing => {
                is_bullish(prev)
                    && is_bearish(cur)
                    && cur.open >= prev.close
                    && cur.close <= prev.open
                    && body(cur) > body(prev)
            }
            Self::BullishHarami => {
                is_bearish(prev)
                    && is_bullish(cur)
                    && cur.open > prev.close
                    && cur.close < prev.open
            }
            Self::BearishHarami => {
                is_bullish(prev)
                    && is_bearish(cur)
                    && cur.open < prev.close
                    && cur.close > prev.open
            }
            Self::TweezerBottom => {
                is_bearish(prev)
                    && is_bullish(cur)
                    && (cur.low - prev.low).abs() <= TWEEZER_TOLERANCE * cur.close
            }
            Self::TweezerTop => {
                is_bullish(prev)
                    && is_bearish(cur)
                    && (cur.high - prev.high).abs() <= TWEEZER_TOLERANCE * cur.close
            }
            Self::Hammer => {
                range(cur) > 0.0
                    && lower_wick(cur) >= 2.0 * body(cur)
                    && upper_wick(cur) <= DOJI_BODY_RATIO * range(cur)
            }
            Self::ShootingStar => {
                range(cur) > 0.0
                    && upper_wick(cur) >= 2.0 * body(cur)
                    && lower_wick(cur) <= DOJI_BODY_RATIO * range(cur)
            }
            Self::Doji => is_doji(cur),
        }
    }
}

/// First matching pattern per row. Rows without `LOOKBACK` bars of history
/// are never classified.
pub fn classify(bars: &[Bar]) -> Vec<Option<Pattern>> {
    let mut out = vec![None; bars.len()];
    for (i, window) in bars.windows(LOOKBACK + 1).enumerate() {
        out[i + LOOKBACK] = Pattern::ALL.into_iter().find(|p| p.matches(window));
    }
    out
}

/// One 0/1 flag column per [`Pattern`]; at most one flag is set per row.
pub struct Candlestick;

impl Indicator for Candlestick {
    fn name(&self) -> &str {
        "candlestick"
    }

    fn compute(&self, table: &IndicatorTable) -> Result<Output, Report<IndicatorError>> {
        let matches = classify(table.bars());
        Ok(Pattern::ALL
            .into_iter()
            .map(|pattern| {
                let flags = matches
                    .iter()
                    .map(|m| u8::from(*m == Some(pattern)))
                    .collect();
                (pattern.column().to_string(), Column::Flag(flags))
            })
            .collect())
    }
}
