//! Runtime configuration read from the environment (and `.env`).

use crate::http::HttpConfig;
use std::path::PathBuf;

/// ETL configuration
#[derive(Debug, Clone)]
pub struct EtlConfig {
    /// FRED API key; FRED datasets fail without it
    pub fred_api_key: Option<String>,
    /// Path to the SQLite database (default: "macro_data.db")
    pub database_path: PathBuf,
    /// Directory holding the bootstrap workbook and debug output (default: "data")
    pub data_dir: PathBuf,
    /// Log file appended to on every run (default: "macro_etl_log.txt")
    pub log_file: PathBuf,
    pub http: HttpConfig,
}

impl Default for EtlConfig {
    fn default() -> Self {
        EtlConfig {
            fred_api_key: None,
            database_path: PathBuf::from("macro_data.db"),
            data_dir: PathBuf::from("data"),
            log_file: PathBuf::from("macro_etl_log.txt"),
            http: HttpConfig::default(),
        }
    }
}

impl EtlConfig {
    /// Reads the process environment. Call [`load_env_file`] first to pick
    /// up a `.env` file.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from a variable lookup. Unset or unparsable
    /// values keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = EtlConfig::default();
        let mut http = defaults.http.clone();
        if let Some(timeout) = lookup("HTTP_TIMEOUT_SECS").and_then(|v| v.trim().parse().ok()) {
            http.timeout_seconds = timeout;
        }
        if let Some(retries) = lookup("HTTP_MAX_RETRIES").and_then(|v| v.trim().parse().ok()) {
            http.max_retries = retries;
        }

        EtlConfig {
            fred_api_key: lookup("FRED_API_KEY")
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty()),
            database_path: lookup("DATABASE_PATH").map(PathBuf::from).unwrap_or(defaults.database_path),
            data_dir: lookup("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            log_file: lookup("LOG_FILE").map(PathBuf::from).unwrap_or(defaults.log_file),
            http,
        }
    }
}

/// Loads `.env` from the working directory or one of its parents into the
/// process environment.
///
/// Returns the loaded path, or `None` when there is no such file. A file that
/// exists but cannot be read or parsed is an error.
pub fn load_env_file() -> Result<Option<PathBuf>, dotenvy::Error> {
    env_file_outcome(dotenvy::dotenv())
}

fn env_file_outcome(result: Result<PathBuf, dotenvy::Error>) -> Result<Option<PathBuf>, dotenvy::Error> {
    match result {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(e),
    }
}
