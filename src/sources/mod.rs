//! One connector per external provider.
//!
//! Each connector splits into a pure payload parser (tested against literal
//! fixtures) and a thin async client that fetches through [`HttpClient`].
//!
//! [`HttpClient`]: crate::http::HttpClient

pub mod bis;
pub mod coingecko;
pub mod fred;
pub mod imf;
pub mod spreadsheet;
pub mod yahoo;

pub use coingecko::{CoinGeckoClient, COINGECKO_THROTTLE};
pub use fred::FredClient;
pub use spreadsheet::Workbook;
pub use yahoo::YahooClient;
