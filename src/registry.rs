use error_stack::{Report, ResultExt, bail};

use crate::config::{IndicatorConfig, SwingConfig};
use crate::error::IndicatorError;
use crate::indicator::Indicator;
use crate::indicator::bands::{BollingerBands, DonchianChannels, KeltnerChannels};
use crate::indicator::directional::{Adx, Aroon, SwingIndex, Vortex};
use crate::indicator::label::{Fibonacci, NextBarLabel, PivotPoints, SwingTarget, SwingTrend};
use crate::indicator::ma::{Dema, Ema, Hma, Kama, Lag, RollingStat, Sma, Tema, Trix, Vwap, Wma};
use crate::indicator::macd::{Macd, Ppo};
use crate::indicator::oscillator::{
    AwesomeOscillator, Cci, Coppock, Momentum, Roc, Rsi, Stochastic, Tsi, UltimateOscillator,
    WilliamsR,
};
use crate::indicator::pattern::Candlestick;
use crate::indicator::volatility::{Atr, ChaikinVolatility, MassIndex, Volatility};
use crate::indicator::volume::{
    AccumulationDistribution, ChaikinOscillator, Cmf, EaseOfMovement, ForceIndex, Mfi, Obv,
    VolumeDirection, VolumeIndex, Vpt,
};
use crate::series::Reducer;
use crate::table::{CLOSE, VOLUME};

/// Indicator kinds accepted in `[[indicators]]` config entries.
pub const KNOWN_KINDS: &[&str] = &[
    "sma",
    "ema",
    "wma",
    "dema",
    "tema",
    "hma",
    "kama",
    "trix",
    "vwap",
    "rolling",
    "shift",
    "rsi",
    "macd",
    "ppo",
    "stochastic",
    "williams_r",
    "roc",
    "momentum",
    "cci",
    "tsi",
    "ultimate",
    "awesome",
    "coppock",
    "volatility",
    "bollinger",
    "keltner",
    "donchian",
    "atr",
    "mass_index",
    "chaikin_volatility",
    "obv",
    "adl",
    "chaikin_oscillator",
    "nvi",
    "pvi",
    "vpt",
    "mfi",
    "force_index",
    "ease_of_movement",
    "volume_ma",
    "cmf",
    "adx",
    "vortex",
    "aroon",
    "swing_index",
    "candlestick",
    "label",
    "swing_trend",
    "swing_target",
    "fibonacci",
    "pivot_points",
];

pub type BoxedIndicator = Box<dyn Indicator>;

pub fn build_indicators(
    configs: &[IndicatorConfig],
    swing: &SwingConfig,
) -> Result<Vec<BoxedIndicator>, Report<IndicatorError>> {
    configs
        .iter()
        .enumerate()
        .map(|(i, config)| {
            build_indicator(config, swing).attach_with(|| format!("indicators[{i}]"))
        })
        .collect()
}

/// The set run when the config lists no indicators. Ordered so that
/// dependencies come first (`ADL` before the Chaikin Oscillator).
pub fn default_indicators(swing: &SwingConfig) -> Result<Vec<BoxedIndicator>, Report<IndicatorError>> {
    let days = swing.number_of_days;
    Ok(vec![
        Box::new(Sma::new(20)?),
        Box::new(Sma::new(50)?),
        Box::new(Sma::new(200)?),
        Box::new(Ema::new(12)?),
        Box::new(Ema::new(26)?),
        Box::new(Volatility::new(20)?),
        Box::new(Rsi::new(14)?),
        Box::new(Macd::new(12, 26, 9)?),
        Box::new(Stochastic::new(14, 3)?),
        Box::new(Cci::new(20)?),
        Box::new(BollingerBands::new(20, 2.0)?),
        Box::new(Atr::new(14)?),
        Box::new(Obv),
        Box::new(AccumulationDistribution),
        Box::new(ChaikinOscillator::new(3, 10)?),
        Box::new(Mfi::new(14)?),
        Box::new(Sma::with_source(20, VOLUME)?),
        Box::new(Adx::new(14)?),
        Box::new(Candlestick),
        Box::new(NextBarLabel),
        Box::new(SwingTrend::new(days)?),
        Box::new(SwingTarget::new(days, swing.max_increase, swing.min_decrease)?),
        Box::new(Fibonacci::new(days)?),
        Box::new(PivotPoints),
    ])
}

/// Build one indicator from its config entry. Missing params take the
/// usual textbook defaults; swing kinds default to the `[swing]` section.
pub fn build_indicator(
    config: &IndicatorConfig,
    swing: &SwingConfig,
) -> Result<BoxedIndicator, Report<IndicatorError>> {
    let p = &config.params;
    let indicator: BoxedIndicator = match config.kind.as_str() {
        "sma" => Box::new(Sma::with_source(
            get_usize(p, "period", 20)?,
            get_str(p, "source", CLOSE)?,
        )?),
        "ema" => Box::new(Ema::new(get_usize(p, "period", 20)?)?),
        "wma" => Box::new(Wma::new(get_usize(p, "period", 20)?)?),
        "dema" => Box::new(Dema::new(get_usize(p, "period", 20)?)?),
        "tema" => Box::new(Tema::new(get_usize(p, "period", 20)?)?),
        "hma" => Box::new(Hma::new(get_usize(p, "period", 20)?)?),
        "kama" => Box::new(Kama::new(
            get_usize(p, "period", 10)?,
            get_usize(p, "fast", 2)?,
            get_usize(p, "slow", 30)?,
        )?),
        "trix" => Box::new(Trix::new(get_usize(p, "period", 15)?)?),
        "vwap" => Box::new(Vwap::new(get_usize(p, "period", 20)?)?),
        "rolling" => Box::new(RollingStat::new(
            get_str(p, "source", CLOSE)?,
            get_usize(p, "window", 20)?,
            Reducer::parse(&get_str(p, "reducer", "mean")?)?,
        )?),
        "shift" => Box::new(Lag::new(
            get_str(p, "source", CLOSE)?,
            get_isize(p, "periods", 1)?,
        )?),
        "rsi" => Box::new(Rsi::new(get_usize(p, "period", 14)?)?),
        "macd" => Box::new(Macd::new(
            get_usize(p, "fast_period", 12)?,
            get_usize(p, "slow_period", 26)?,
            get_usize(p, "signal_period", 9)?,
        )?),
        "ppo" => Box::new(Ppo::new(
            get_usize(p, "fast_period", 12)?,
            get_usize(p, "slow_period", 26)?,
        )?),
        "stochastic" => Box::new(Stochastic::new(
            get_usize(p, "k_period", 14)?,
            get_usize(p, "d_period", 3)?,
        )?),
        "williams_r" => Box::new(WilliamsR::new(get_usize(p, "period", 14)?)?),
        "roc" => Box::new(Roc::new(get_usize(p, "period", 12)?)?),
        "momentum" => Box::new(Momentum::new(get_usize(p, "period", 10)?)?),
        "cci" => Box::new(Cci::new(get_usize(p, "period", 20)?)?),
        "tsi" => Box::new(Tsi::new(
            get_usize(p, "long", 25)?,
            get_usize(p, "short", 13)?,
        )?),
        "ultimate" => Box::new(UltimateOscillator::new(
            get_usize(p, "short", 7)?,
            get_usize(p, "medium", 14)?,
            get_usize(p, "long", 28)?,
        )?),
        "awesome" => Box::new(AwesomeOscillator::new(
            get_usize(p, "fast", 5)?,
            get_usize(p, "slow", 34)?,
        )?),
        "coppock" => Box::new(Coppock::new(
            get_usize(p, "period", 10)?,
            get_usize(p, "long_roc", 14)?,
            get_usize(p, "short_roc", 11)?,
        )?),
        "volatility" => Box::new(Volatility::new(get_usize(p, "period", 20)?)?),
        "bollinger" => Box::new(BollingerBands::new(
            get_usize(p, "period", 20)?,
            get_f64(p, "std_dev_multiplier", 2.0)?,
        )?),
        "keltner" => Box::new(KeltnerChannels::new(
            get_usize(p, "period", 20)?,
            get_f64(p, "multiplier", 2.0)?,
        )?),
        "donchian" => Box::new(DonchianChannels::new(get_usize(p, "period", 20)?)?),
        "atr" => Box::new(Atr::new(get_usize(p, "period", 14)?)?),
        "mass_index" => Box::new(MassIndex::new(
            get_usize(p, "ema_period", 9)?,
            get_usize(p, "sum_period", 25)?,
        )?),
        "chaikin_volatility" => Box::new(ChaikinVolatility::new(get_usize(p, "period", 10)?)?),
        "obv" => Box::new(Obv),
        "adl" => Box::new(AccumulationDistribution),
        "chaikin_oscillator" => Box::new(ChaikinOscillator::new(
            get_usize(p, "fast_period", 3)?,
            get_usize(p, "slow_period", 10)?,
        )?),
        "nvi" => Box::new(VolumeIndex::new(VolumeDirection::Negative)),
        "pvi" => Box::new(VolumeIndex::new(VolumeDirection::Positive)),
        "vpt" => Box::new(Vpt),
        "mfi" => Box::new(Mfi::new(get_usize(p, "period", 14)?)?),
        "force_index" => Box::new(ForceIndex::new(get_usize(p, "period", 13)?)?),
        "ease_of_movement" => Box::new(EaseOfMovement::new(get_usize(p, "period", 14)?)?),
        "volume_ma" => Box::new(Sma::with_source(get_usize(p, "period", 20)?, VOLUME)?),
        "cmf" => Box::new(Cmf::new(get_usize(p, "period", 20)?)?),
        "adx" => Box::new(Adx::new(get_usize(p, "period", 14)?)?),
        "vortex" => Box::new(Vortex::new(get_usize(p, "period", 14)?)?),
        "aroon" => Box::new(Aroon::new(get_usize(p, "period", 25)?)?),
        "swing_index" => Box::new(SwingIndex::new(get_f64(
            p,
            "limit_move",
            SwingIndex::DEFAULT_LIMIT_MOVE,
        )?)?),
        "candlestick" => Box::new(Candlestick),
        "label" => Box::new(NextBarLabel),
        "swing_trend" => Box::new(SwingTrend::new(get_usize(
            p,
            "number_of_days",
            swing.number_of_days,
        )?)?),
        "swing_target" => Box::new(SwingTarget::new(
            get_usize(p, "number_of_days", swing.number_of_days)?,
            get_f64(p, "max_increase", swing.max_increase)?,
            get_f64(p, "min_decrease", swing.min_decrease)?,
        )?),
        "fibonacci" => Box::new(Fibonacci::new(get_usize(
            p,
            "horizon",
            swing.number_of_days,
        )?)?),
        "pivot_points" => Box::new(PivotPoints),
        other => bail!(IndicatorError::InvalidParameter {
            name: format!("unknown indicator kind: {other}"),
        }),
    };
    Ok(indicator)
}

fn invalid(key: &str, expected: &str) -> Report<IndicatorError> {
    Report::new(IndicatorError::InvalidParameter {
        name: format!("{key} must be {expected}"),
    })
}

fn get_usize(params: &toml::Table, key: &str, default: usize) -> Result<usize, Report<IndicatorError>> {
    match params.get(key) {
        None => Ok(default),
        Some(value) => value
            .as_integer()
            .and_then(|v| usize::try_from(v).ok())
            .ok_or_else(|| invalid(key, "a non-negative integer")),
    }
}

fn get_isize(params: &toml::Table, key: &str, default: isize) -> Result<isize, Report<IndicatorError>> {
    match params.get(key) {
        None => Ok(default),
        Some(value) => value
            .as_integer()
            .and_then(|v| isize::try_from(v).ok())
            .ok_or_else(|| invalid(key, "an integer")),
    }
}

fn get_f64(params: &toml::Table, key: &str, default: f64) -> Result<f64, Report<IndicatorError>> {
    match params.get(key) {
        None => Ok(default),
        Some(value) => value
            .as_float()
            .or_else(|| value.as_integer().map(|v| v as f64))
            .ok_or_else(|| invalid(key, "a number")),
    }
}

fn get_str(params: &toml::Table, key: &str, default: &str) -> Result<String, Report<IndicatorError>> {
    match params.get(key) {
        None => Ok(default.to_string()),
        Some(value) => value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| invalid(key, "a string")),
    }
}
