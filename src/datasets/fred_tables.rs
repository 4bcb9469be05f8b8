//! Tables assembled from FRED series.
//!
//! Most tables are a plain [`FredTableSpec`]: fetch every series, seed the
//! index with the first one, left-align the rest, move dates to the period
//! end and cut the early history. The few tables with extra steps
//! (liquidity, Nasdaq, economic data, banking) post-process that result.

use crate::calendar::{month_end, quarter_end, year_end, Frequency};
use crate::error::{FetchError, SeriesError};
use crate::normalize::derived::add_yoy;
use crate::normalize::resample::{resample, Aggregation};
use crate::series::{RawSeries, SeriesTable};
use crate::sources::FredClient;
use chrono::NaiveDate;
use tracing::debug;

/// Unit conversion applied to a series right after it is fetched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnitTransform {
    Identity,
    /// Divide every value, e.g. millions to billions
    DivideBy(f64),
}

impl UnitTransform {
    fn apply(self, value: f64) -> f64 {
        match self {
            UnitTransform::Identity => value,
            UnitTransform::DivideBy(divisor) => value / divisor,
        }
    }
}

/// One FRED series and the column it lands in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesSpec {
    pub column: &'static str,
    pub series_id: &'static str,
    pub transform: UnitTransform,
}

const fn series(column: &'static str, series_id: &'static str) -> SeriesSpec {
    SeriesSpec {
        column,
        series_id,
        transform: UnitTransform::Identity,
    }
}

const fn series_in_billions(column: &'static str, series_id: &'static str) -> SeriesSpec {
    SeriesSpec {
        column,
        series_id,
        transform: UnitTransform::DivideBy(1000.0),
    }
}

/// Where FRED's period-start dates are moved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    /// Keep provider dates (daily and weekly series)
    Raw,
    MonthEnd,
    QuarterEnd,
    YearEnd,
}

impl Alignment {
    pub fn align(self, date: NaiveDate) -> NaiveDate {
        match self {
            Alignment::Raw => date,
            Alignment::MonthEnd => month_end(date),
            Alignment::QuarterEnd => quarter_end(date),
            Alignment::YearEnd => year_end(date),
        }
    }
}

/// Static description of a table built from FRED series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FredTableSpec {
    pub table: &'static str,
    pub series: &'static [SeriesSpec],
    pub alignment: Alignment,
    /// Keep only rows dated strictly after this `(year, month, day)`
    pub after: Option<(i32, u32, u32)>,
    /// Drop every row with a missing value
    pub drop_incomplete: bool,
}

impl FredTableSpec {
    pub fn after_date(&self) -> Option<NaiveDate> {
        self.after.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d))
    }
}

pub const FED_LIQUIDITY: FredTableSpec = FredTableSpec {
    table: "fed_liquidity",
    series: &[
        series_in_billions("Fed Balance Sheet", "WALCL"),
        series("TGA", "WTREGEN"),
        series("RRP", "RRPONTSYD"),
    ],
    alignment: Alignment::Raw,
    after: None,
    drop_incomplete: false,
};

pub const NASDAQ: FredTableSpec = FredTableSpec {
    table: "nasdaq",
    series: &[series("Nasdaq", "NASDAQCOM")],
    alignment: Alignment::Raw,
    after: None,
    drop_incomplete: true,
};

pub const FINANCIAL_CONDITIONS: FredTableSpec = FredTableSpec {
    table: "financial_conditions",
    series: &[
        series("USD", "DTWEXBGS"),
        series("WTI Crude", "DCOILWTICO"),
        series("US 10YR", "DGS10"),
        series("HY Credit Spreads", "BAMLH0A0HYM2"),
        series("Yield Curve", "T10Y2Y"),
    ],
    alignment: Alignment::Raw,
    after: None,
    drop_incomplete: false,
};

pub const FED_FCI: FredTableSpec = FredTableSpec {
    table: "fed_fci",
    series: &[
        series("Chicago Fed NFCI", "NFCI"),
        series("FCI Leverage", "NFCILEVERAGE"),
        series("FCI Credit", "NFCICREDIT"),
        series("FCI Risk", "NFCIRISK"),
    ],
    alignment: Alignment::Raw,
    after: None,
    drop_incomplete: false,
};

pub const ECONOMIC_DATA: FredTableSpec = FredTableSpec {
    table: "economic_data",
    series: &[
        // leading
        series("Building Permits", "PERMIT"),
        series("Total Vehicle Sales", "TOTALSA"),
        series("Heavy Truck Sales", "HTRUCKSSAAR"),
        series("Consumer Sentiment", "UMCSENT"),
        series("New Home Sales", "HSN1F"),
        // lagging
        series("Unemployment", "UNRATE"),
        series("Industrial Production", "INDPRO"),
        series("Labor Force Participation Rate", "CIVPART"),
    ],
    alignment: Alignment::MonthEnd,
    after: Some((1977, 12, 31)),
    drop_incomplete: false,
};

/// Weekly initial claims, averaged per month into `economic_data`
pub const INITIAL_CLAIMS: SeriesSpec = series("Initial Job Claims", "ICSA");

pub const BANKING_WEEKLY: FredTableSpec = FredTableSpec {
    table: "banking",
    series: &[
        series("All Loans & Leases", "TOTLL"),
        series("Total Bank Assets", "TLAACBW027SBOG"),
        series("Bank Securities", "SBCACBW027SBOG"),
    ],
    alignment: Alignment::Raw,
    after: None,
    drop_incomplete: false,
};

pub const BANKING_MONTHLY: FredTableSpec = FredTableSpec {
    table: "banking",
    series: &[
        series_in_billions("Consumer Credit", "TOTALSL"),
        series("Commercial/Industrial Loans", "BUSLOANS"),
    ],
    alignment: Alignment::MonthEnd,
    after: None,
    drop_incomplete: false,
};

pub const INTEREST_RATES: FredTableSpec = FredTableSpec {
    table: "interest_rates",
    series: &[
        series("Effective Fed Funds", "DFF"),
        series("SOFR", "SOFR"),
        series("ECB Deposit Rate", "ECBDFR"),
    ],
    alignment: Alignment::Raw,
    after: Some((1998, 1, 1)),
    drop_incomplete: false,
};

pub const INFLATION: FredTableSpec = FredTableSpec {
    table: "inflation",
    series: &[
        series("Core PCE (Index)", "PCEPILFE"),
        series("Consumer Price Index", "CPIAUCSL"),
        series("Producer Price Index", "PPIACO"),
        series("Prices Paid: Diffusion Index (NY)", "PPCDISA066MSFRBNY"),
        series("Prices Paid: Diffusion Index (Philly)", "PPCDFSA066MSFRBPHI"),
    ],
    alignment: Alignment::MonthEnd,
    after: None,
    drop_incomplete: false,
};

pub const GOVERNMENT_SPENDING: FredTableSpec = FredTableSpec {
    table: "government_spending",
    series: &[
        series("Total Federal Spending", "FGEXPND"),
        series_in_billions("Federal Govt Debt", "GFDEBTN"),
        series("Interest on Debt", "A091RC1Q027SBEA"),
        series("Social Benefits Total", "B087RC1Q027SBEA"),
        series("Defense Spending", "FDEFX"),
        series("Federal Tax & Other Receipts", "FGRECPT"),
    ],
    alignment: Alignment::QuarterEnd,
    after: Some((1966, 3, 1)),
    drop_incomplete: false,
};

pub const QUARTERLY_DATA: FredTableSpec = FredTableSpec {
    table: "quarterly_data",
    series: &[
        series("US GDP", "GDP"),
        series("Real GDP", "GDPC1"),
        series("Current Account", "IEABC"),
        series("Household Debt Payments % Disposable Income", "TDSP"),
        series("Delinquency Rate Credit Card Loans", "DRCCLACBS"),
        series("Delinquency Rate Consumer Loans", "DRCLACBS"),
        series("Delinquency Rate All Loans", "DRALACBN"),
        series("Charge-Off Rate Business Loans", "CORBLACBS"),
        series("Charge-Off Rate Consumer Loans", "CORCACBS"),
        series("Margin Loans", "BOGZ1FL663067003Q"),
        series("Credit Cards: % Accounts Making Minimum Payment", "RCCCBSHRMIN"),
        series("Net % Banks Tightening: Industrial", "DRTSCILM"),
        series("Net % Banks Tightening: Credit Card", "DRTSCLCC"),
        series("Total Mortgage Debt", "ASTMA"),
        series("Total Private Credit", "CRDQUSAPABIS"),
        series("Private Residential Fixed Investment", "PRFI"),
        series("Real Gross Private Domestic Investment", "GPDIC1"),
        series("Corporate Debt", "BCNSDODNS"),
        series("Household Debt", "BOGZ1FL194190005Q"),
        series("Financial Sector Debt", "DODFS"),
    ],
    alignment: Alignment::QuarterEnd,
    after: Some((1980, 1, 1)),
    drop_incomplete: false,
};

pub const MONTHLY_DATA: FredTableSpec = FredTableSpec {
    table: "monthly_data",
    series: &[
        series("Future New Orders (Philadelphia)", "NOFDFSA066MSFRBPHI"),
        series("Future Business Activity (Texas)", "FBACTSAMFRBDAL"),
        series("New Homes for Sale", "HNFSEPUSSA"),
        series("Case-Shiller Home Price Index", "CSUSHPINSA"),
        series("EU Business Confidence Survey", "BSCICP02EZM460S"),
        series("US Composite Leading Indicator", "USALOLITOAASTSAM"),
        series("Employment Level", "CE16OV"),
        series("US Population", "POPTHM"),
        series("Labour Force Participation 65+", "LNU01375379"),
        series("US M2", "M2SL"),
    ],
    alignment: Alignment::MonthEnd,
    after: Some((1980, 1, 1)),
    drop_incomplete: false,
};

pub const ANNUAL_DATA: FredTableSpec = FredTableSpec {
    table: "annual_data",
    series: &[
        series("US % Population 65+", "SPPOP65UPTOZSUSA"),
        series("US Fertility Rate", "SPDYNTFRTINUSA"),
        series("Japan % Population 65+", "SPPOP65UPTOZSJPN"),
        series("Korea Fertility Rate", "SPDYNTFRTINKOR"),
    ],
    alignment: Alignment::YearEnd,
    after: None,
    drop_incomplete: true,
};

/// Builds a table from the fetched series of `spec`, given in spec order.
///
/// The first series defines the date index; later series are left-aligned
/// onto it, so their dates missing from the first series are dropped.
pub fn build_fred_table(spec: &FredTableSpec, fetched: Vec<RawSeries>) -> Result<SeriesTable, SeriesError> {
    let mut table = SeriesTable::new();
    for (series, raw) in spec.series.iter().zip(fetched) {
        let source = SeriesTable::from_raw(series.column, raw);
        table.assign(series.column, &source, series.column)?;
        if series.transform != UnitTransform::Identity {
            let transform = series.transform;
            table.map_column(series.column, move |v| transform.apply(v))?;
        }
    }

    let mut table = table.map_index(|date| spec.alignment.align(date));
    if let Some(after) = spec.after_date() {
        table = table.after(after);
    }
    if spec.drop_incomplete {
        table = table.drop_incomplete();
    }
    Ok(table)
}

/// Fetches every series of `spec` in order, then builds the table.
pub async fn fetch_fred_table(fred: &FredClient, spec: &FredTableSpec) -> Result<SeriesTable, FetchError> {
    let mut fetched = Vec::with_capacity(spec.series.len());
    for series in spec.series {
        fetched.push(fred.get_series(series.series_id).await?);
    }
    let table = build_fred_table(spec, fetched)?;
    debug!(table = spec.table, rows = table.len(), "FRED table assembled");
    Ok(table)
}

/// Fed net liquidity: balance sheet less the Treasury General Account and
/// reverse repos, in billions.
///
/// Missing reverse-repo values count as zero; a latest row still missing
/// the balance sheet or TGA is dropped as not yet published.
pub fn finish_fed_liquidity(mut table: SeriesTable) -> Result<SeriesTable, SeriesError> {
    table.fill_missing("RRP", 0.0)?;
    table.drop_trailing_incomplete();

    let net: Vec<Option<f64>> = {
        let balance = table.require("Fed Balance Sheet")?;
        let tga = table.require("TGA")?;
        let rrp = table.require("RRP")?;
        balance
            .iter()
            .zip(tga)
            .zip(rrp)
            .map(|((b, t), r)| Some((*b)? - (*t)? - (*r)?))
            .collect()
    };
    table.set_column("Fed Net Liquidity", net)?;
    Ok(table)
}

/// Weekly (Friday) Nasdaq closes with their 52-week change.
pub fn finish_nasdaq(table: SeriesTable) -> Result<SeriesTable, SeriesError> {
    let mut weekly = resample(&table.drop_incomplete(), Frequency::WeeklyFriday, Aggregation::Last);
    add_yoy(&mut weekly, "Nasdaq", "Nasdaq YoY%", Frequency::WeeklyFriday)?;
    Ok(weekly.drop_incomplete())
}

/// Adds monthly-mean initial claims to the monthly economic table.
pub fn with_initial_claims(mut table: SeriesTable, claims: RawSeries) -> Result<SeriesTable, SeriesError> {
    let weekly = SeriesTable::from_raw(INITIAL_CLAIMS.column, claims);
    let monthly = resample(&weekly, Frequency::Monthly, Aggregation::Mean);
    table.assign(INITIAL_CLAIMS.column, &monthly, INITIAL_CLAIMS.column)?;
    Ok(table)
}

/// Monthly means of the weekly bank balance-sheet series with the monthly
/// credit series left-joined on.
pub fn build_banking(weekly: &SeriesTable, monthly: &SeriesTable) -> SeriesTable {
    resample(weekly, Frequency::Monthly, Aggregation::Mean).left_join(monthly)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_first_series_defines_the_index() {
        const SERIES: &[SeriesSpec] = &[series("A", "A"), series_in_billions("B", "B")];
        let spec = FredTableSpec {
            table: "t",
            series: SERIES,
            alignment: Alignment::MonthEnd,
            after: Some((2024, 1, 31)),
            drop_incomplete: false,
        };
        let a = vec![
            (d(2024, 1, 1), Some(1.0)),
            (d(2024, 2, 1), Some(2.0)),
            (d(2024, 3, 1), Some(3.0)),
        ];
        let b = vec![(d(2024, 2, 1), Some(5000.0)), (d(2024, 4, 1), Some(7000.0))];

        let table = build_fred_table(&spec, vec![a, b]).unwrap();
        assert_eq!(table.index(), &[d(2024, 2, 29), d(2024, 3, 31)]);
        assert_eq!(table.column("A").unwrap(), &[Some(2.0), Some(3.0)]);
        assert_eq!(table.column("B").unwrap(), &[Some(5.0), None]);
    }

    #[test]
    fn test_annual_table_drops_incomplete_rows() {
        let a = vec![(d(2022, 1, 1), Some(16.8)), (d(2023, 1, 1), Some(17.1))];
        let b = vec![(d(2022, 1, 1), Some(1.66)), (d(2023, 1, 1), None)];
        let c = vec![(d(2022, 1, 1), Some(29.9)), (d(2023, 1, 1), Some(30.1))];
        let e = vec![(d(2022, 1, 1), Some(0.78)), (d(2023, 1, 1), Some(0.72))];
        let table = build_fred_table(&ANNUAL_DATA, vec![a, b, c, e]).unwrap();
        assert_eq!(table.index(), &[d(2022, 12, 31)]);
    }

    #[test]
    fn test_fed_net_liquidity() {
        let spec = FED_LIQUIDITY;
        let walcl = vec![
            (d(2024, 1, 3), Some(7_700_000.0)),
            (d(2024, 1, 10), Some(7_690_000.0)),
            (d(2024, 1, 17), Some(7_680_000.0)),
        ];
        let tga = vec![
            (d(2024, 1, 3), Some(700.0)),
            (d(2024, 1, 10), Some(710.0)),
            (d(2024, 1, 17), None),
        ];
        let rrp = vec![(d(2024, 1, 3), Some(600.0)), (d(2024, 1, 4), Some(650.0))];

        let table = finish_fed_liquidity(build_fred_table(&spec, vec![walcl, tga, rrp]).unwrap()).unwrap();
        assert_eq!(table.index(), &[d(2024, 1, 3), d(2024, 1, 10)]);
        assert_eq!(table.column("RRP").unwrap(), &[Some(600.0), Some(0.0)]);
        assert_eq!(
            table.column("Fed Net Liquidity").unwrap(),
            &[Some(7700.0 - 700.0 - 600.0), Some(7690.0 - 710.0)]
        );
    }

    #[test]
    fn test_nasdaq_weekly_yoy_needs_a_full_year() {
        let raw: RawSeries = (0..60)
            .map(|week| (d(2023, 1, 2) + chrono::Duration::weeks(week), Some(100.0 + week as f64)))
            .collect();
        let table = finish_nasdaq(SeriesTable::from_raw("Nasdaq", raw)).unwrap();
        // 60 weeks of closes leave 8 weeks with a value 52 weeks earlier
        assert_eq!(table.len(), 8);
        assert_eq!(table.first_date(), Some(d(2024, 1, 5)));
        let yoy = table.column("Nasdaq YoY%").unwrap();
        assert_eq!(yoy[0], Some((152.0 / 100.0 - 1.0) * 100.0));
    }

    #[test]
    fn test_initial_claims_are_monthly_means() {
        let table = SeriesTable::from_raw("Unemployment", vec![(d(2024, 1, 31), Some(3.7)), (d(2024, 2, 29), Some(3.9))]);
        let claims = vec![
            (d(2024, 1, 6), Some(200_000.0)),
            (d(2024, 1, 13), Some(220_000.0)),
            (d(2024, 2, 3), Some(230_000.0)),
        ];
        let table = with_initial_claims(table, claims).unwrap();
        assert_eq!(table.column("Initial Job Claims").unwrap(), &[Some(210_000.0), Some(230_000.0)]);
    }

    #[test]
    fn test_catalogue_column_names_are_unique_per_table() {
        for spec in [
            FED_LIQUIDITY,
            FINANCIAL_CONDITIONS,
            FED_FCI,
            ECONOMIC_DATA,
            INTEREST_RATES,
            INFLATION,
            GOVERNMENT_SPENDING,
            QUARTERLY_DATA,
            MONTHLY_DATA,
            ANNUAL_DATA,
        ] {
            let mut names: Vec<&str> = spec.series.iter().map(|s| s.column).collect();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), spec.series.len(), "{}", spec.table);
        }
        assert_eq!(QUARTERLY_DATA.series.len(), 20);
        assert_eq!(MONTHLY_DATA.series.len(), 10);
    }
}
