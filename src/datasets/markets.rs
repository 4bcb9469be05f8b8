//! Market price tables: gold, European equity indices, crypto.

use crate::calendar::Frequency;
use crate::error::FetchError;
use crate::http::HttpClient;
use crate::normalize::projection::extend_with_proxy;
use crate::normalize::resample::{resample, Aggregation};
use crate::series::{RawSeries, SeriesTable};
use crate::sources::spreadsheet::{parse_gold_spot, Workbook};
use crate::sources::{CoinGeckoClient, YahooClient, COINGECKO_THROTTLE};
use chrono::{Duration, NaiveDate};
use tracing::debug;

pub const GOLD_COLUMN: &str = "Gold Price";
/// Gold ETF whose returns extend the spot series
pub const GOLD_PROXY_SYMBOL: &str = "GLD";
const GOLD_PROXY_START: (i32, u32, u32) = (2004, 1, 1);

/// Yahoo symbol and stored column of each European index
pub const EUROPEAN_INDICES: [(&str, &str); 2] = [("^GDAXI", "DAX"), ("^FCHI", "CAC40")];
const EUROPEAN_START: (i32, u32, u32) = (2000, 1, 1);

/// Stored column and CoinGecko id of each tracked coin
pub const CRYPTO_COINS: [(&str, &str); 4] = [
    ("BTC", "bitcoin"),
    ("ETH", "ethereum"),
    ("SOL", "solana"),
    ("SUI", "sui"),
];
/// Width of the live CoinGecko window ending today
pub const CRYPTO_LOOKBACK_WEEKS: i64 = 35;

fn ymd((y, m, d): (i32, u32, u32)) -> Result<NaiveDate, FetchError> {
    NaiveDate::from_ymd_opt(y, m, d).ok_or_else(|| FetchError::Parse(format!("invalid date {}-{}-{}", y, m, d)))
}

/// Weekly (Sunday) spot gold, extended past the workbook's last week with
/// the weekly returns of the GLD proxy.
///
/// `proxy` holds daily GLD closes in a column named [`GOLD_PROXY_SYMBOL`].
pub fn build_gold(spot: RawSeries, proxy: &SeriesTable) -> Result<SeriesTable, FetchError> {
    let spot = resample(&SeriesTable::from_raw(GOLD_COLUMN, spot), Frequency::WeeklySunday, Aggregation::Mean);
    let proxy = resample(proxy, Frequency::WeeklySunday, Aggregation::Mean);
    Ok(extend_with_proxy(&spot, GOLD_COLUMN, &proxy, GOLD_PROXY_SYMBOL)?)
}

pub async fn fetch_gold(
    http: &HttpClient,
    yahoo: &YahooClient,
    workbook_url: &str,
    today: NaiveDate,
) -> Result<SeriesTable, FetchError> {
    let bytes = http.get_bytes(workbook_url).await?;
    let mut workbook = Workbook::from_bytes("gold spot", bytes)?;
    let spot = parse_gold_spot(&workbook.first_sheet()?)?;

    let proxy = yahoo
        .fetch_daily_closes(GOLD_PROXY_SYMBOL, GOLD_PROXY_SYMBOL, ymd(GOLD_PROXY_START)?, today)
        .await?;
    build_gold(spot, &proxy)
}

/// Outer-joins the daily index closes and keeps the last close of each
/// Friday-ending week.
pub fn build_european_indices(closes: &[SeriesTable]) -> SeriesTable {
    let joined = closes
        .iter()
        .fold(SeriesTable::new(), |acc, table| if acc.is_empty() { table.clone() } else { acc.outer_join(table) });
    resample(&joined, Frequency::WeeklyFriday, Aggregation::Last)
}

pub async fn fetch_european_indices(yahoo: &YahooClient, today: NaiveDate) -> Result<SeriesTable, FetchError> {
    let start = ymd(EUROPEAN_START)?;
    let mut closes = Vec::with_capacity(EUROPEAN_INDICES.len());
    for (symbol, column) in EUROPEAN_INDICES {
        closes.push(yahoo.fetch_daily_closes(symbol, column, start, today).await?);
    }
    Ok(build_european_indices(&closes))
}

/// Start of the live crypto window.
pub fn crypto_window_start(today: NaiveDate) -> NaiveDate {
    today - Duration::weeks(CRYPTO_LOOKBACK_WEEKS)
}

/// Appends the live prices dated strictly after the bootstrap's last date.
pub fn merge_crypto(bootstrap: &SeriesTable, live: &SeriesTable) -> SeriesTable {
    bootstrap.concat(live)
}

/// Live prices of every tracked coin for the lookback window, outer-joined
/// by date. Calls are spaced by the CoinGecko throttle.
pub async fn fetch_live_crypto(coingecko: &CoinGeckoClient, today: NaiveDate) -> Result<SeriesTable, FetchError> {
    let start = crypto_window_start(today);
    let mut live = SeriesTable::new();
    for (column, coin_id) in CRYPTO_COINS {
        let prices = coingecko.fetch_prices(coin_id, column, start, today).await?;
        live = if live.is_empty() { prices } else { live.outer_join(&prices) };
        tokio::time::sleep(COINGECKO_THROTTLE).await;
    }
    debug!(rows = live.len(), "Live crypto prices fetched");
    Ok(live)
}
