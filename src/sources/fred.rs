//! Federal Reserve Economic Data (FRED) client.
//!
//! Observations are dated at the start of their period (`2024-01-01` is the
//! January value); callers re-align dates to canonical period ends.

use crate::error::FetchError;
use crate::http::HttpClient;
use crate::series::RawSeries;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

pub const FRED_BASE_URL: &str = "https://api.stlouisfed.org/fred";

/// Marker FRED uses for a missing observation
const MISSING_VALUE: &str = ".";

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    observations: Vec<FredObservation>,
}

#[derive(Debug, Deserialize)]
struct FredObservation {
    date: String,
    value: String,
}

/// Parses a `series/observations` JSON body.
///
/// `"."` and other non-numeric values become missing observations; an
/// unparseable date is a parse failure for the whole payload.
pub fn parse_observations(body: &[u8]) -> Result<RawSeries, FetchError> {
    let response: ObservationsResponse =
        serde_json::from_slice(body).map_err(|e| FetchError::Parse(e.to_string()))?;

    response
        .observations
        .into_iter()
        .map(|obs| {
            let date = NaiveDate::parse_from_str(&obs.date, "%Y-%m-%d")
                .map_err(|e| FetchError::Parse(format!("FRED date '{}': {}", obs.date, e)))?;
            let value = match obs.value.trim() {
                MISSING_VALUE => None,
                text => text.parse::<f64>().ok(),
            };
            Ok((date, value))
        })
        .collect()
}

/// FRED API client
#[derive(Debug, Clone)]
pub struct FredClient {
    http: HttpClient,
    api_key: String,
    base_url: String,
}

impl FredClient {
    pub fn new(http: HttpClient, api_key: impl Into<String>) -> Self {
        FredClient {
            http,
            api_key: api_key.into(),
            base_url: FRED_BASE_URL.to_string(),
        }
    }

    /// Points the client at a different API root (mirrors, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn observations_url(&self, series_id: &str) -> String {
        format!(
            "{}/series/observations?series_id={}&api_key={}&file_type=json",
            self.base_url, series_id, self.api_key
        )
    }

    /// Fetches the full history of `series_id`.
    ///
    /// # Errors
    /// Returns `FetchError::EmptyPayload` when the series has no observations.
    pub async fn get_series(&self, series_id: &str) -> Result<RawSeries, FetchError> {
        let body = self.http.get_bytes(&self.observations_url(series_id)).await?;
        let series = parse_observations(&body)?;
        if series.is_empty() {
            return Err(FetchError::EmptyPayload(format!("FRED {}", series_id)));
        }
        debug!(series_id, observations = series.len(), "FRED series fetched");
        Ok(series)
    }
}
