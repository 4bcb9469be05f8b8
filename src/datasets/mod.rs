//! The dataset catalogue: which tables exist, where each one comes from and
//! how its raw series are assembled.

pub mod fred_tables;
pub mod markets;
pub mod official;

pub use fred_tables::{Alignment, FredTableSpec, SeriesSpec, UnitTransform};

/// Every table the ETL run produces, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetId {
    FedLiquidity,
    Nasdaq,
    Gold,
    DollarReserves,
    DebtSecurities,
    EuropeanIndices,
    FinancialConditions,
    FedFci,
    EconomicData,
    Banking,
    InterestRates,
    Rstar,
    Inflation,
    GovernmentSpending,
    QuarterlyData,
    MonthlyData,
    AnnualData,
    FedSupplyChain,
    ShillerData,
    GlobalM2,
    Ism,
    Crypto,
}

impl DatasetId {
    pub const ALL: [DatasetId; 22] = [
        DatasetId::FedLiquidity,
        DatasetId::Nasdaq,
        DatasetId::Gold,
        DatasetId::DollarReserves,
        DatasetId::DebtSecurities,
        DatasetId::EuropeanIndices,
        DatasetId::FinancialConditions,
        DatasetId::FedFci,
        DatasetId::EconomicData,
        DatasetId::Banking,
        DatasetId::InterestRates,
        DatasetId::Rstar,
        DatasetId::Inflation,
        DatasetId::GovernmentSpending,
        DatasetId::QuarterlyData,
        DatasetId::MonthlyData,
        DatasetId::AnnualData,
        DatasetId::FedSupplyChain,
        DatasetId::ShillerData,
        DatasetId::GlobalM2,
        DatasetId::Ism,
        DatasetId::Crypto,
    ];

    /// Name of the stored table.
    pub fn table_name(self) -> &'static str {
        match self {
            DatasetId::FedLiquidity => "fed_liquidity",
            DatasetId::Nasdaq => "nasdaq",
            DatasetId::Gold => "gold",
            DatasetId::DollarReserves => "dollar_reserves",
            DatasetId::DebtSecurities => "debt_securities",
            DatasetId::EuropeanIndices => "european_indices",
            DatasetId::FinancialConditions => "financial_conditions",
            DatasetId::FedFci => "fed_fci",
            DatasetId::EconomicData => "economic_data",
            DatasetId::Banking => "banking",
            DatasetId::InterestRates => "interest_rates",
            DatasetId::Rstar => "rstar",
            DatasetId::Inflation => "inflation",
            DatasetId::GovernmentSpending => "government_spending",
            DatasetId::QuarterlyData => "quarterly_data",
            DatasetId::MonthlyData => "monthly_data",
            DatasetId::AnnualData => "annual_data",
            DatasetId::FedSupplyChain => "fed_supply_chain",
            DatasetId::ShillerData => "shiller_data",
            DatasetId::GlobalM2 => "global_m2",
            DatasetId::Ism => "ism",
            DatasetId::Crypto => "crypto",
        }
    }

    /// Whether the dataset calls the FRED API.
    pub fn needs_fred(self) -> bool {
        matches!(
            self,
            DatasetId::FedLiquidity
                | DatasetId::Nasdaq
                | DatasetId::FinancialConditions
                | DatasetId::FedFci
                | DatasetId::EconomicData
                | DatasetId::Banking
                | DatasetId::InterestRates
                | DatasetId::Inflation
                | DatasetId::GovernmentSpending
                | DatasetId::QuarterlyData
                | DatasetId::MonthlyData
                | DatasetId::AnnualData
        )
    }
}

impl std::fmt::Display for DatasetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table_name())
    }
}

/// Download locations of the non-API sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEndpoints {
    pub gold_workbook: String,
    pub imf_cofer: String,
    pub bis_total_debt: String,
    pub bis_usd_debt: String,
    pub rstar_workbook: String,
    pub gscpi_workbook: String,
    pub shiller_workbook: String,
}

impl Default for SourceEndpoints {
    fn default() -> Self {
        SourceEndpoints {
            gold_workbook: "https://auronum.co.uk/wp-content/uploads/2024/09/Auronum-Historic-Gold-Price-Data-5.xlsx".to_string(),
            imf_cofer: "https://api.imf.org/external/sdmx/3.0/data/dataflow/IMF.STA/COFER/%2B/G001.AFXRA.CI_USD.SHRO_PT.Q?dimensionAtObservation=TIME_PERIOD&attributes=dsd&measures=all&includeHistory=false".to_string(),
            bis_total_debt: "https://stats.bis.org/api/v1/data/WS_DEBT_SEC2_PUB/Q.3P.3P.1.1.C.A.A.TO1.A.A.A.A.A.I/all?startPeriod=1967".to_string(),
            bis_usd_debt: "https://stats.bis.org/api/v1/data/WS_DEBT_SEC2_PUB/Q.3P.3P.1.1.C.A.A.USD.A.A.A.A.A.I/all?startPeriod=1967".to_string(),
            rstar_workbook: "https://www.newyorkfed.org/medialibrary/media/research/economists/williams/data/Laubach_Williams_current_estimates.xlsx".to_string(),
            gscpi_workbook: "https://www.newyorkfed.org/medialibrary/research/interactives/gscpi/downloads/gscpi_data.xlsx".to_string(),
            shiller_workbook: "https://img1.wsimg.com/blobby/go/e5e77e0b-59d1-44d9-ab25-4763ac982e53/downloads/b152b405-8563-4eec-b5c0-b49f95f4e8cf/ie_data.xls?ver=1746381879934".to_string(),
        }
    }
}
