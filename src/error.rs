//! Error taxonomy shared across the pipeline.

use thiserror::Error;

/// Errors raised by table manipulation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeriesError {
    /// A column required by a transform is not present.
    #[error("column not found: {0}")]
    MissingColumn(String),
    /// A column does not have one value per index row.
    #[error("column '{column}' has {got} values, index has {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        got: usize,
    },
}

/// Errors raised while retrieving one external dataset.
///
/// Every variant is local to a single dataset: the pipeline logs it and
/// moves on to the next connector.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP client creation failed
    #[error("client creation error: {0}")]
    ClientCreation(String),
    /// Transport failure, including timeouts
    #[error("network error: {0}")]
    Network(String),
    /// Non-success HTTP status
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
    /// Payload could not be decoded
    #[error("parse error: {0}")]
    Parse(String),
    /// Payload decoded but carried no observations
    #[error("empty payload: {0}")]
    EmptyPayload(String),
    /// An upstream file no longer has the layout the parser expects
    #[error("schema drift in {source_name}: {detail}")]
    SchemaDrift { source_name: String, detail: String },
    /// Workbook could not be opened or a sheet is missing
    #[error("spreadsheet error: {0}")]
    Spreadsheet(String),
    /// Required configuration (e.g. an API key) is absent
    #[error("missing configuration: {0}")]
    MissingConfig(String),
    #[error(transparent)]
    Series(#[from] SeriesError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl FetchError {
    /// Whether a second attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network(_) => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Schema drift is reported as a warning to investigate rather than an error.
    pub fn is_schema_drift(&self) -> bool {
        matches!(self, FetchError::SchemaDrift { .. })
    }
}

/// Errors raised by the table store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQL error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Table or column name that cannot be used as an identifier
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
    /// Stored date that is not ISO-8601
    #[error("invalid stored date '{0}'")]
    InvalidDate(String),
    #[error("table not found: {0}")]
    TableNotFound(String),
    /// Appending columns the stored table does not have
    #[error("table '{table}' has no column '{column}'; a full reload is required")]
    SchemaMismatch { table: String, column: String },
    /// Appending a row whose date is already stored
    #[error("table '{table}' already has a row for {date}")]
    DuplicateDate { table: String, date: chrono::NaiveDate },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("workbook error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),
}

/// Errors raised while fitting or applying a forecast model.
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Not enough joined rows to fit and evaluate the model
    #[error("model '{model}' has {rows} usable rows, needs at least {required}")]
    InsufficientData {
        model: String,
        rows: usize,
        required: usize,
    },
    #[error("invalid start date for model '{0}'")]
    InvalidStart(String),
    /// Normal equations have no unique solution
    #[error("design matrix is singular")]
    SingularMatrix,
    /// Feature matrix width differs from the fitted coefficients
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error(transparent)]
    Series(#[from] SeriesError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        let server = FetchError::Status {
            status: 503,
            url: "https://example.org".to_string(),
        };
        let missing = FetchError::Status {
            status: 404,
            url: "https://example.org".to_string(),
        };
        assert!(server.is_retryable());
        assert!(!missing.is_retryable());
        assert!(FetchError::Network("timed out".to_string()).is_retryable());
        assert!(!FetchError::Parse("bad json".to_string()).is_retryable());
    }

    #[test]
    fn test_schema_drift_is_flagged() {
        let drift = FetchError::SchemaDrift {
            source_name: "rstar".to_string(),
            detail: "marker row not found".to_string(),
        };
        assert!(drift.is_schema_drift());
        assert!(drift.to_string().contains("rstar"));
    }
}
