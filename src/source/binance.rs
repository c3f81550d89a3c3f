use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime};
use error_stack::{Report, ResultExt};
use futures::future::BoxFuture;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::SourceError;
use crate::model::{Bar, HistoryRequest};
use crate::source::{PriceSource, within_range};

const BINANCE_BASE_URL: &str = "https://api.binance.com";
const MAX_KLINES_PER_REQUEST: usize = 1000;
const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Kline history from the Binance spot REST API, paged by start time.
pub struct BinanceSource {
    client: reqwest::Client,
    base_url: String,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
}

impl BinanceSource {
    pub fn new() -> Self {
        Self::with_base_url(BINANCE_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        // kline weight is 2; 10 req/s stays far below the 6000 weight/min cap
        let quota = Quota::per_second(nonzero!(10u32));
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    async fn fetch_page(
        &self,
        request: &HistoryRequest,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<BinanceKlineRow>, Report<SourceError>> {
        // Wait for rate limiter before making the request
        self.rate_limiter.until_ready().await;

        let url = format!("{}/api/v3/klines", self.base_url);
        let start = start_ms.to_string();
        let end = end_ms.to_string();
        let limit = MAX_KLINES_PER_REQUEST.to_string();
        let params = [
            ("symbol", request.symbol.as_str()),
            ("interval", request.period.binance_interval()),
            ("startTime", start.as_str()),
            ("endTime", end.as_str()),
            ("limit", limit.as_str()),
        ];

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .change_context(SourceError::Request {
                source_name: "binance".into(),
            })?;

        if !response.status().is_success() {
            return Err(Report::new(SourceError::Request {
                source_name: "binance".into(),
            })
            .attach(format!("HTTP status: {}", response.status())));
        }

        response
            .json()
            .await
            .change_context(SourceError::ResponseParse {
                source_name: "binance".into(),
            })
    }
}

impl Default for BinanceSource {
    fn default() -> Self {
        Self::new()
    }
}

fn day_start_ms(day: NaiveDate) -> i64 {
    day.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}

impl PriceSource for BinanceSource {
    fn name(&self) -> &str {
        "binance"
    }

    fn fetch_bars(
        &self,
        request: &HistoryRequest,
    ) -> BoxFuture<'_, Result<Vec<Bar>, Report<SourceError>>> {
        let request = request.clone();
        Box::pin(async move {
            let end_ms = day_start_ms(request.end) + MS_PER_DAY - 1;
            let mut cursor = day_start_ms(request.start);
            let mut bars = Vec::new();

            loop {
                let page = self.fetch_page(&request, cursor, end_ms).await?;
                let page_len = page.len();
                debug!(symbol = %request.symbol, cursor, fetched = page_len, "binance kline page");

                let Some(last_open) = page.last().map(|row| row.0) else {
                    break;
                };
                for row in page {
                    bars.push(row.into_bar()?);
                }
                if page_len < MAX_KLINES_PER_REQUEST || last_open >= end_ms {
                    break;
                }
                cursor = last_open + 1;
            }

            info!(
                symbol = %request.symbol,
                period = %request.period,
                fetched = bars.len(),
                "binance kline fetch complete"
            );

            within_range(bars, &request)
        })
    }
}

// ── REST response types ───────────────────────────────────────────────────────

/// Binance kline row: a 12-element JSON array.
#[derive(Debug, Deserialize)]
struct BinanceKlineRow(
    i64,                        // 0: open time (ms)
    String,                     // 1: open
    String,                     // 2: high
    String,                     // 3: low
    String,                     // 4: close
    String,                     // 5: volume
    #[allow(dead_code)] i64,    // 6: close time
    #[allow(dead_code)] String, // 7: quote asset volume
    #[allow(dead_code)] u64,    // 8: number of trades
    #[allow(dead_code)] String, // 9: taker buy base volume
    #[allow(dead_code)] String, // 10: taker buy quote volume
    #[allow(dead_code)] String, // 11: ignore
);

impl BinanceKlineRow {
    fn into_bar(self) -> Result<Bar, Report<SourceError>> {
        let parse_f64 = |s: &str| -> Result<f64, Report<SourceError>> {
            s.parse::<f64>()
                .change_context(SourceError::ResponseParse {
                    source_name: "binance".into(),
                })
                .attach_with(|| format!("value: {s}"))
        };

        let timestamp = DateTime::from_timestamp_millis(self.0).ok_or_else(|| {
            Report::new(SourceError::ResponseParse {
                source_name: "binance".into(),
            })
            .attach(format!("open time out of range: {}", self.0))
        })?;

        Ok(Bar {
            timestamp,
            open: parse_f64(&self.1)?,
            high: parse_f64(&self.2)?,
            low: parse_f64(&self.3)?,
            close: parse_f64(&self.4)?,
            volume: parse_f64(&self.5)?,
        })
    }
}
