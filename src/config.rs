use std::path::Path;

use chrono::NaiveDate;
use error_stack::{Report, ResultExt};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::model::{HistoryRequest, Period};
use crate::registry;

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "text".into()
}

fn default_period() -> String {
    "daily".into()
}

fn default_max_increase() -> f64 {
    5.0
}

fn default_min_decrease() -> f64 {
    3.0
}

fn default_number_of_days() -> usize {
    5
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub swing: SwingConfig,
    /// Runs the default indicator set when empty.
    #[serde(default)]
    pub indicators: Vec<IndicatorConfig>,
    #[serde(default)]
    pub rescale: Vec<RescaleConfig>,
}

#[derive(Debug, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Accepted values: `"text"` | `"json"`
    #[serde(default = "default_log_format")]
    pub log_format: String,
    /// Output file for the feature table; stdout when absent.
    pub output: Option<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            output: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SourceConfig {
    /// Accepted values: `"binance"` | `"file"`
    pub kind: String,
    pub symbol: String,
    #[serde(default = "default_period")]
    pub period: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// JSON bar file, required for the `file` source.
    pub path: Option<String>,
}

impl SourceConfig {
    pub fn history_request(&self) -> Result<HistoryRequest, Report<ConfigError>> {
        let period = Period::from_str(&self.period).ok_or_else(|| {
            Report::new(ConfigError::Validation {
                field: format!("source.period: unknown period \"{}\"", self.period),
            })
        })?;
        Ok(HistoryRequest {
            symbol: self.symbol.clone(),
            start: self.start,
            end: self.end,
            period,
        })
    }
}

/// Parameters of the swing-trading labels.
#[derive(Debug, Clone, Deserialize)]
pub struct SwingConfig {
    /// Upside target, in percent of the close.
    #[serde(default = "default_max_increase")]
    pub max_increase: f64,
    /// Downside target, in percent of the close.
    #[serde(default = "default_min_decrease")]
    pub min_decrease: f64,
    /// Forward window of the swing columns, in bars.
    #[serde(default = "default_number_of_days")]
    pub number_of_days: usize,
}

impl Default for SwingConfig {
    fn default() -> Self {
        Self {
            max_increase: default_max_increase(),
            min_decrease: default_min_decrease(),
            number_of_days: default_number_of_days(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndicatorConfig {
    pub kind: String,
    #[serde(default)]
    pub params: toml::Table,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RescaleConfig {
    pub column: String,
    pub window: usize,
}

/// Load and validate an `AppConfig` from a TOML file at `path`.
pub fn load(path: &Path) -> Result<AppConfig, Report<ConfigError>> {
    let content = std::fs::read_to_string(path)
        .change_context(ConfigError::ReadFile)
        .attach_with(|| format!("path: {}", path.display()))?;

    let config: AppConfig = toml::from_str(&content).change_context(ConfigError::Parse {
        reason: "invalid TOML syntax or schema mismatch".into(),
    })?;

    validate(&config)?;

    Ok(config)
}

const VALID_LOG_FORMATS: &[&str] = &["text", "json"];
const VALID_SOURCE_KINDS: &[&str] = &["binance", "file"];

fn validate(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    validate_general(config)?;
    validate_source(config)?;
    validate_swing(config)?;
    validate_indicator_kinds(config)?;
    validate_rescale_windows(config)?;
    Ok(())
}

fn validate_general(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    let format = config.general.log_format.as_str();
    if !VALID_LOG_FORMATS.contains(&format) {
        return Err(Report::new(ConfigError::Validation {
            field: format!("general.log_format \"{format}\" is not valid"),
        }));
    }
    Ok(())
}

fn validate_source(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    let source = &config.source;
    if !VALID_SOURCE_KINDS.contains(&source.kind.as_str()) {
        return Err(Report::new(ConfigError::Validation {
            field: format!("source.kind \"{}\" is not valid", source.kind),
        }));
    }
    if source.kind == "file" && source.path.is_none() {
        return Err(Report::new(ConfigError::Validation {
            field: "source.path is required for kind \"file\"".into(),
        }));
    }
    if source.start > source.end {
        return Err(Report::new(ConfigError::Validation {
            field: format!(
                "source.start ({}) is after source.end ({})",
                source.start, source.end
            ),
        }));
    }
    source.history_request()?;
    Ok(())
}

fn validate_swing(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    if config.swing.number_of_days == 0 {
        return Err(Report::new(ConfigError::Validation {
            field: "swing.number_of_days must be > 0".into(),
        }));
    }
    Ok(())
}

fn validate_indicator_kinds(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    for (i, indicator) in config.indicators.iter().enumerate() {
        if !registry::KNOWN_KINDS.contains(&indicator.kind.as_str()) {
            return Err(Report::new(ConfigError::Validation {
                field: format!("indicators[{i}].kind \"{}\" is not known", indicator.kind),
            }));
        }
    }
    Ok(())
}

fn validate_rescale_windows(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    for rescale in &config.rescale {
        if rescale.window == 0 {
            return Err(Report::new(ConfigError::Validation {
                field: format!("rescale[column={}].window must be >= 1", rescale.column),
            }));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> AppConfig {
        toml::from_str(toml).expect("parse failed")
    }

    const SOURCE: &str = r#"
[source]
kind = "binance"
symbol = "BTCUSDT"
start = "2024-01-01"
end = "2024-06-30"
"#;

    #[test]
    fn valid_full_config_parses() {
        let toml = r#"
[general]
log_level = "debug"
log_format = "json"
output = "features.json"

[source]
kind = "file"
symbol = "AAPL"
period = "weekly"
start = "2023-01-01"
end = "2023-12-31"
path = "bars.json"

[swing]
max_increase = 4.0
min_decrease = 2.0
number_of_days = 10

[[indicators]]
kind = "sma"
params = { period = 50 }

[[indicators]]
kind = "macd"

[[rescale]]
column = "OBV"
window = 20
"#;
        let config = parse(toml);
        assert!(validate(&config).is_ok());
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.general.output.as_deref(), Some("features.json"));
        assert_eq!(config.swing.number_of_days, 10);
        assert_eq!(config.indicators.len(), 2);
        assert_eq!(config.indicators[0].params.get("period").and_then(|v| v.as_integer()), Some(50));
        assert!(config.indicators[1].params.is_empty());
        assert_eq!(config.rescale[0].window, 20);

        let request = config.source.history_request().unwrap();
        assert_eq!(request.period, Period::Weekly);
        assert_eq!(request.symbol, "AAPL");
    }

    #[test]
    fn defaults_applied_when_fields_omitted() {
        let config = parse(SOURCE);
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "text");
        assert!(config.general.output.is_none());
        assert_eq!(config.source.period, "daily");
        assert_eq!(config.swing.max_increase, 5.0);
        assert_eq!(config.swing.min_decrease, 3.0);
        assert_eq!(config.swing.number_of_days, 5);
        assert!(config.indicators.is_empty());
        assert!(config.rescale.is_empty());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn invalid_period_rejected() {
        let toml = SOURCE.replace("end =", "period = \"hourly\"\nend =");
        assert!(validate(&parse(&toml)).is_err());
    }

    #[test]
    fn invalid_source_kind_rejected() {
        let toml = SOURCE.replace("\"binance\"", "\"yahoo\"");
        assert!(validate(&parse(&toml)).is_err());
    }

    #[test]
    fn file_source_requires_path() {
        let toml = SOURCE.replace("\"binance\"", "\"file\"");
        assert!(validate(&parse(&toml)).is_err());
    }

    #[test]
    fn start_after_end_rejected() {
        let toml = SOURCE.replace("2024-06-30", "2023-06-30");
        assert!(validate(&parse(&toml)).is_err());
    }

    #[test]
    fn zero_swing_window_rejected() {
        let toml = format!("{SOURCE}\n[swing]\nnumber_of_days = 0\n");
        assert!(validate(&parse(&toml)).is_err());
    }

    #[test]
    fn unknown_indicator_kind_rejected() {
        let toml = format!("{SOURCE}\n[[indicators]]\nkind = \"ichimoku\"\n");
        assert!(validate(&parse(&toml)).is_err());
    }

    #[test]
    fn zero_rescale_window_rejected() {
        let toml = format!("{SOURCE}\n[[rescale]]\ncolumn = \"OBV\"\nwindow = 0\n");
        assert!(validate(&parse(&toml)).is_err());
    }

    #[test]
    fn invalid_log_format_rejected() {
        let toml = format!("[general]\nlog_format = \"xml\"\n{SOURCE}");
        assert!(validate(&parse(&toml)).is_err());
    }
}
