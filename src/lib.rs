pub mod calendar;
pub mod config;
pub mod datasets;
pub mod error;
pub mod forecast;
pub mod http;
pub mod linalg;
pub mod loader;
pub mod logging;
pub mod normalize;
pub mod pipeline;
pub mod series;
pub mod sources;
pub mod store;
pub mod views;

pub use calendar::Frequency;
pub use config::EtlConfig;
pub use datasets::{DatasetId, SourceEndpoints};
pub use error::{FetchError, ForecastError, SeriesError, StoreError};
pub use forecast::{run_forecasts, ForecastModel, LinearRegression, ModelReport, MODELS};
pub use http::{HttpClient, HttpConfig};
pub use loader::{load_all, load_table, mirror_debug, LoadMode, LoadOutcome};
pub use pipeline::{run_etl, RunContext, RunReport, Sources};
pub use series::{Column, RawSeries, SeriesTable};
pub use store::{InMemoryStore, SqliteStore, TableStore};
pub use views::{build_views, View, ViewError};
