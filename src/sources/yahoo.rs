//! Yahoo Finance daily closes via the v8 chart API.

use crate::error::FetchError;
use crate::http::HttpClient;
use crate::series::SeriesTable;
use chrono::{DateTime, NaiveDate, NaiveTime};
use serde::Deserialize;
use tracing::debug;

pub const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
    #[serde(default)]
    adjclose: Vec<AdjClose>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

/// Parses a chart payload into a single-column table named `column`.
///
/// Prefers the split/dividend-adjusted close and falls back to the raw close.
/// Timestamps are converted to UTC calendar dates; when two bars land on the
/// same date the later one wins.
pub fn parse_chart(body: &[u8], column: &str) -> Result<SeriesTable, FetchError> {
    let response: ChartResponse =
        serde_json::from_slice(body).map_err(|e| FetchError::Parse(e.to_string()))?;

    if let Some(error) = response.chart.error {
        return Err(FetchError::Parse(format!(
            "Yahoo chart error {}: {}",
            error.code.unwrap_or_default(),
            error.description.unwrap_or_default()
        )));
    }

    let result = response
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| FetchError::EmptyPayload(format!("Yahoo chart for {}", column)))?;

    let adjusted = result.indicators.adjclose.into_iter().next().map(|a| a.adjclose);
    let closes = match adjusted {
        Some(values) if !values.is_empty() => values,
        _ => result
            .indicators
            .quote
            .into_iter()
            .next()
            .map(|q| q.close)
            .unwrap_or_default(),
    };

    if result.timestamp.is_empty() || closes.len() != result.timestamp.len() {
        return Err(FetchError::EmptyPayload(format!("Yahoo chart for {}", column)));
    }

    let rows = result
        .timestamp
        .iter()
        .zip(closes)
        .map(|(ts, close)| {
            DateTime::from_timestamp(*ts, 0)
                .map(|dt| (dt.date_naive(), vec![close]))
                .ok_or_else(|| FetchError::Parse(format!("Yahoo timestamp {}", ts)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SeriesTable::from_rows(vec![column.to_string()], rows))
}

/// Yahoo Finance chart client
#[derive(Debug, Clone)]
pub struct YahooClient {
    http: HttpClient,
    base_url: String,
}

impl YahooClient {
    pub fn new(http: HttpClient) -> Self {
        YahooClient {
            http,
            base_url: YAHOO_CHART_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn chart_url(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let period1 = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let period2 = end.and_time(NaiveTime::MIN).and_utc().timestamp();
        format!(
            "{}/{}?period1={}&period2={}&interval=1d&events=div%2Csplit",
            self.base_url,
            symbol.replace('^', "%5E"),
            period1,
            period2
        )
    }

    /// Fetches adjusted daily closes of `symbol` for `[start, end)`, as a
    /// table with a single column named `column`.
    pub async fn fetch_daily_closes(
        &self,
        symbol: &str,
        column: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<SeriesTable, FetchError> {
        let body = self.http.get_bytes(&self.chart_url(symbol, start, end)).await?;
        let table = parse_chart(&body, column)?;
        debug!(symbol, rows = table.len(), "Yahoo closes fetched");
        Ok(table)
    }
}
