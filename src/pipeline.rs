//! One ETL run: fetch every dataset in catalogue order, isolate per-dataset
//! failures, optionally mirror to CSV, then load into the store.

use crate::datasets::fred_tables::{
    self, build_banking, fetch_fred_table, finish_fed_liquidity, finish_nasdaq, with_initial_claims, FredTableSpec,
};
use crate::datasets::markets::{fetch_european_indices, fetch_gold, fetch_live_crypto, merge_crypto};
use crate::datasets::official::{
    fetch_debt_securities, fetch_dollar_reserves, fetch_rstar, fetch_shiller, fetch_supply_chain, Bootstrap,
    BOOTSTRAP_CRYPTO, BOOTSTRAP_GLOBAL_M2, BOOTSTRAP_ISM,
};
use crate::datasets::{DatasetId, SourceEndpoints};
use crate::error::{FetchError, StoreError};
use crate::http::HttpClient;
use crate::loader::{load_all, mirror_debug, LoadMode, LoadOutcome};
use crate::series::SeriesTable;
use crate::sources::{CoinGeckoClient, FredClient, YahooClient};
use crate::store::TableStore;
use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// File name of the historical bootstrap workbook inside the data directory
pub const BOOTSTRAP_WORKBOOK: &str = "historical_data.xlsx";

/// Parameters of a single run.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Date the run treats as today; every date window is derived from it
    pub today: NaiveDate,
    pub mode: LoadMode,
    /// Mirror every fetched table to CSV and a debug workbook
    pub debug: bool,
    pub data_dir: PathBuf,
}

impl RunContext {
    pub fn bootstrap_path(&self) -> PathBuf {
        self.data_dir.join(BOOTSTRAP_WORKBOOK)
    }
}

/// Provider clients and download locations.
#[derive(Debug, Clone)]
pub struct Sources {
    pub http: HttpClient,
    pub fred: Option<FredClient>,
    pub yahoo: YahooClient,
    pub coingecko: CoinGeckoClient,
    pub endpoints: SourceEndpoints,
}

impl Sources {
    pub fn new(http: HttpClient, fred_api_key: Option<String>) -> Self {
        Sources {
            fred: fred_api_key.map(|key| FredClient::new(http.clone(), key)),
            yahoo: YahooClient::new(http.clone()),
            coingecko: CoinGeckoClient::new(http.clone()),
            endpoints: SourceEndpoints::default(),
            http,
        }
    }

    fn fred(&self) -> Result<&FredClient, FetchError> {
        self.fred
            .as_ref()
            .ok_or_else(|| FetchError::MissingConfig("FRED_API_KEY".to_string()))
    }
}

/// What happened to each dataset of a run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub loaded: Vec<(String, LoadOutcome)>,
    /// Dataset name and the error that skipped it
    pub failed: Vec<(String, String)>,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

async fn fred_table(sources: &Sources, spec: &FredTableSpec) -> Result<SeriesTable, FetchError> {
    fetch_fred_table(sources.fred()?, spec).await
}

fn bootstrap_sheet(ctx: &RunContext, sheet: &str) -> Result<SeriesTable, FetchError> {
    Bootstrap::open(&ctx.bootstrap_path())?.table(sheet)
}

/// Historical crypto prices extended with the live CoinGecko window.
///
/// An incremental run starts from the stored table so that earlier live
/// slices are kept; a full run (or a first run) starts from the workbook.
async fn crypto<S: TableStore + ?Sized>(
    sources: &Sources,
    ctx: &RunContext,
    store: &S,
) -> Result<SeriesTable, FetchError> {
    let table = DatasetId::Crypto.table_name();
    let bootstrap = if ctx.mode == LoadMode::Incremental && store.table_exists(table)? {
        store.load_table(table)?
    } else {
        bootstrap_sheet(ctx, BOOTSTRAP_CRYPTO)?
    };
    let live = fetch_live_crypto(&sources.coingecko, ctx.today).await?;
    Ok(merge_crypto(&bootstrap, &live))
}

/// Fetches and assembles one dataset.
pub async fn fetch_dataset<S: TableStore + ?Sized>(
    id: DatasetId,
    sources: &Sources,
    ctx: &RunContext,
    store: &S,
) -> Result<SeriesTable, FetchError> {
    let endpoints = &sources.endpoints;
    match id {
        DatasetId::FedLiquidity => Ok(finish_fed_liquidity(fred_table(sources, &fred_tables::FED_LIQUIDITY).await?)?),
        DatasetId::Nasdaq => Ok(finish_nasdaq(fred_table(sources, &fred_tables::NASDAQ).await?)?),
        DatasetId::Gold => fetch_gold(&sources.http, &sources.yahoo, &endpoints.gold_workbook, ctx.today).await,
        DatasetId::DollarReserves => fetch_dollar_reserves(&sources.http, &endpoints.imf_cofer).await,
        DatasetId::DebtSecurities => {
            fetch_debt_securities(&sources.http, &endpoints.bis_total_debt, &endpoints.bis_usd_debt).await
        }
        DatasetId::EuropeanIndices => fetch_european_indices(&sources.yahoo, ctx.today).await,
        DatasetId::FinancialConditions => fred_table(sources, &fred_tables::FINANCIAL_CONDITIONS).await,
        DatasetId::FedFci => fred_table(sources, &fred_tables::FED_FCI).await,
        DatasetId::EconomicData => {
            let table = fred_table(sources, &fred_tables::ECONOMIC_DATA).await?;
            let claims = sources.fred()?.get_series(fred_tables::INITIAL_CLAIMS.series_id).await?;
            Ok(with_initial_claims(table, claims)?)
        }
        DatasetId::Banking => {
            let weekly = fred_table(sources, &fred_tables::BANKING_WEEKLY).await?;
            let monthly = fred_table(sources, &fred_tables::BANKING_MONTHLY).await?;
            Ok(build_banking(&weekly, &monthly))
        }
        DatasetId::InterestRates => fred_table(sources, &fred_tables::INTEREST_RATES).await,
        DatasetId::Rstar => fetch_rstar(&sources.http, &endpoints.rstar_workbook).await,
        DatasetId::Inflation => fred_table(sources, &fred_tables::INFLATION).await,
        DatasetId::GovernmentSpending => fred_table(sources, &fred_tables::GOVERNMENT_SPENDING).await,
        DatasetId::QuarterlyData => fred_table(sources, &fred_tables::QUARTERLY_DATA).await,
        DatasetId::MonthlyData => fred_table(sources, &fred_tables::MONTHLY_DATA).await,
        DatasetId::AnnualData => fred_table(sources, &fred_tables::ANNUAL_DATA).await,
        DatasetId::FedSupplyChain => fetch_supply_chain(&sources.http, &endpoints.gscpi_workbook).await,
        DatasetId::ShillerData => fetch_shiller(&sources.http, &endpoints.shiller_workbook).await,
        DatasetId::GlobalM2 => bootstrap_sheet(ctx, BOOTSTRAP_GLOBAL_M2),
        DatasetId::Ism => bootstrap_sheet(ctx, BOOTSTRAP_ISM),
        DatasetId::Crypto => crypto(sources, ctx, store).await,
    }
}

/// Fetches `ids` one after another. A failed dataset is logged and left out;
/// the rest of the run continues.
pub async fn fetch_datasets<S: TableStore + ?Sized>(
    ids: &[DatasetId],
    sources: &Sources,
    ctx: &RunContext,
    store: &S,
) -> (Vec<(String, SeriesTable)>, Vec<(String, String)>) {
    let mut fetched = Vec::with_capacity(ids.len());
    let mut failed = Vec::new();

    for &id in ids {
        match fetch_dataset(id, sources, ctx, store).await {
            Ok(table) => {
                info!("{} data fetched ({} rows).", id, table.len());
                fetched.push((id.table_name().to_string(), table));
            }
            Err(e) if e.is_schema_drift() => {
                warn!("{} data not found, file structure must have changed. Please investigate! ({})", id, e);
                failed.push((id.table_name().to_string(), e.to_string()));
            }
            Err(e) => {
                error!("Failed to fetch {}: {}", id, e);
                failed.push((id.table_name().to_string(), e.to_string()));
            }
        }
    }
    (fetched, failed)
}

/// Runs `ids` end to end. Storage errors abort the run.
pub async fn run_datasets<S: TableStore + ?Sized>(
    ids: &[DatasetId],
    sources: &Sources,
    ctx: &RunContext,
    store: &mut S,
) -> Result<RunReport, StoreError> {
    let (tables, failed) = fetch_datasets(ids, sources, ctx, &*store).await;

    if ctx.debug {
        mirror_debug(&ctx.data_dir, &tables)?;
    }
    let loaded = load_all(store, &tables, ctx.mode)?;

    info!(
        "Run finished: {} tables loaded, {} datasets failed.",
        loaded.len(),
        failed.len()
    );
    Ok(RunReport { loaded, failed })
}

/// Runs every dataset of the catalogue.
pub async fn run_etl<S: TableStore + ?Sized>(
    sources: &Sources,
    ctx: &RunContext,
    store: &mut S,
) -> Result<RunReport, StoreError> {
    run_datasets(&DatasetId::ALL, sources, ctx, store).await
}
