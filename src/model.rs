use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Bar granularity supported by the price-history sources.
///
/// String representations match the config file format (e.g. `"daily"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
}

impl Period {
    /// Parse a config-format string into a `Period`.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "daily" | "1d" => Some(Self::Daily),
            "weekly" | "1wk" => Some(Self::Weekly),
            "monthly" | "1mo" => Some(Self::Monthly),
            _ => None,
        }
    }

    /// Return the config-format string representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// Return the Binance kline interval string for this period.
    pub fn binance_interval(self) -> &'static str {
        match self {
            Self::Daily => "1d",
            Self::Weekly => "1w",
            Self::Monthly => "1M",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One OHLCV row of market data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// What to ask a price-history source for.
#[derive(Debug, Clone)]
pub struct HistoryRequest {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub period: Period,
}

impl HistoryRequest {
    /// Whether `timestamp` falls on a day inside `[start, end]`.
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        let day = timestamp.date_naive();
        day >= self.start && day <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_round_trip() {
        for (s, period) in [
            ("daily", Period::Daily),
            ("weekly", Period::Weekly),
            ("monthly", Period::Monthly),
        ] {
            assert_eq!(Period::from_str(s), Some(period));
            assert_eq!(period.as_str(), s);
        }
    }

    #[test]
    fn period_accepts_short_aliases() {
        assert_eq!(Period::from_str("1d"), Some(Period::Daily));
        assert_eq!(Period::from_str("1wk"), Some(Period::Weekly));
        assert_eq!(Period::from_str("1mo"), Some(Period::Monthly));
    }

    #[test]
    fn period_invalid_string_returns_none() {
        assert_eq!(Period::from_str("hourly"), None);
        assert_eq!(Period::from_str(""), None);
    }

    #[test]
    fn binance_interval_mapping() {
        assert_eq!(Period::Daily.binance_interval(), "1d");
        assert_eq!(Period::Weekly.binance_interval(), "1w");
        assert_eq!(Period::Monthly.binance_interval(), "1M");
    }

    #[test]
    fn bar_serde_round_trip() {
        let json = r#"{"timestamp":"2024-01-02T00:00:00Z","open":1.0,"high":2.0,"low":0.5,"close":1.5,"volume":100.0}"#;
        let bar: Bar = serde_json::from_str(json).unwrap();
        assert_eq!(bar.close, 1.5);
        let back = serde_json::to_string(&bar).unwrap();
        let again: Bar = serde_json::from_str(&back).unwrap();
        assert_eq!(bar, again);
    }

    #[test]
    fn request_range_is_inclusive() {
        let request = HistoryRequest {
            symbol: "TEST".into(),
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            period: Period::Daily,
        };
        let inside = "2024-01-31T23:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let outside = "2024-02-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        assert!(request.contains(inside));
        assert!(!request.contains(outside));
    }
}
