//! CoinGecko `market_chart/range` prices.

use crate::error::FetchError;
use crate::http::HttpClient;
use crate::series::SeriesTable;
use chrono::{DateTime, NaiveDate, NaiveTime};
use serde::Deserialize;
use std::time::Duration;

pub const COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Fixed pause between CoinGecko calls; the public tier rate-limits hard.
pub const COINGECKO_THROTTLE: Duration = Duration::from_secs(1);

#[derive(Debug, Deserialize)]
struct MarketChart {
    #[serde(default)]
    prices: Vec<(f64, Option<f64>)>,
}

/// Parses `{"prices": [[ms, price], ...]}` into a table with one column.
///
/// Intraday points collapse to their UTC date, the last point of a day
/// winning. An absent or empty `prices` array is `FetchError::EmptyPayload`.
pub fn parse_market_chart(body: &[u8], column: &str) -> Result<SeriesTable, FetchError> {
    let chart: MarketChart =
        serde_json::from_slice(body).map_err(|e| FetchError::Parse(e.to_string()))?;

    if chart.prices.is_empty() {
        return Err(FetchError::EmptyPayload(format!("CoinGecko prices for {}", column)));
    }

    let rows = chart
        .prices
        .into_iter()
        .map(|(millis, price)| {
            DateTime::from_timestamp_millis(millis as i64)
                .map(|dt| (dt.date_naive(), vec![price]))
                .ok_or_else(|| FetchError::Parse(format!("CoinGecko timestamp {}", millis)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SeriesTable::from_rows(vec![column.to_string()], rows))
}

/// CoinGecko client
#[derive(Debug, Clone)]
pub struct CoinGeckoClient {
    http: HttpClient,
    base_url: String,
}

impl CoinGeckoClient {
    pub fn new(http: HttpClient) -> Self {
        CoinGeckoClient {
            http,
            base_url: COINGECKO_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn range_url(&self, coin_id: &str, start: NaiveDate, end: NaiveDate) -> String {
        let from = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let to = end.and_time(NaiveTime::MIN).and_utc().timestamp();
        format!(
            "{}/coins/{}/market_chart/range?vs_currency=usd&from={}&to={}",
            self.base_url, coin_id, from, to
        )
    }

    /// USD prices of `coin_id` between midnight UTC of `start` and of `end`.
    pub async fn fetch_prices(
        &self,
        coin_id: &str,
        column: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<SeriesTable, FetchError> {
        let body = self.http.get_bytes(&self.range_url(coin_id, start, end)).await?;
        parse_market_chart(&body, column)
    }
}
