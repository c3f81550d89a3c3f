pub mod binance;
pub mod file;

use error_stack::Report;
use futures::future::BoxFuture;

use crate::error::SourceError;
use crate::model::{Bar, HistoryRequest};

/// A provider of historical OHLCV bars.
///
/// Uses `BoxFuture` (from `futures` crate) instead of `async fn` in trait
/// to keep the trait object-safe (`dyn PriceSource`).
pub trait PriceSource: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch the bars of `request`, ascending by timestamp and limited to
    /// its date range. An empty result is a [`SourceError::NoData`] error.
    fn fetch_bars(
        &self,
        request: &HistoryRequest,
    ) -> BoxFuture<'_, Result<Vec<Bar>, Report<SourceError>>>;
}

/// Keep the bars inside the requested range and fail when none remain.
pub(crate) fn within_range(
    bars: Vec<Bar>,
    request: &HistoryRequest,
) -> Result<Vec<Bar>, Report<SourceError>> {
    let bars: Vec<Bar> = bars
        .into_iter()
        .filter(|bar| request.contains(bar.timestamp))
        .collect();
    if bars.is_empty() {
        return Err(Report::new(SourceError::NoData {
            symbol: request.symbol.clone(),
        })
        .attach(format!("range: {} to {}", request.start, request.end)));
    }
    Ok(bars)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::*;
    use crate::model::Period;

    fn bar(day: u32) -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: 1.0,
        }
    }

    fn request(start: u32, end: u32) -> HistoryRequest {
        HistoryRequest {
            symbol: "TEST".into(),
            start: NaiveDate::from_ymd_opt(2024, 1, start).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, end).unwrap(),
            period: Period::Daily,
        }
    }

    #[test]
    fn filters_to_inclusive_range() {
        let bars = within_range((1..=10).map(bar).collect(), &request(3, 5)).unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0], bar(3));
        assert_eq!(bars[2], bar(5));
    }

    #[test]
    fn empty_range_is_no_data() {
        let err = within_range((1..=3).map(bar).collect(), &request(20, 25)).unwrap_err();
        assert!(matches!(err.current_context(), SourceError::NoData { symbol } if symbol == "TEST"));
    }
}
