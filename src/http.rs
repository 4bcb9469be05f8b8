use crate::error::FetchError;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for the shared HTTP client
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Additional attempts after a retryable failure (default: 1)
    pub max_retries: u32,
    /// Request timeout in seconds (default: 30)
    pub timeout_seconds: u64,
    /// Pause before a retry in milliseconds (default: 1000)
    pub retry_delay_ms: u64,
    /// User-Agent header; some providers reject the reqwest default
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            max_retries: 1,
            timeout_seconds: 30,
            retry_delay_ms: 1000,
            user_agent: format!("macro-etl/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// HTTP client shared by every connector.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpConfig,
}

impl HttpClient {
    /// Creates a client with the default configuration.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_config(HttpConfig::default())
    }

    /// Creates a client with a custom timeout and retry policy.
    ///
    /// # Errors
    /// Returns `FetchError::ClientCreation` if the TLS backend cannot be initialised.
    pub fn with_config(config: HttpConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::ClientCreation(e.to_string()))?;

        Ok(HttpClient { client, config })
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// GETs `url` and returns the body, retrying transient failures.
    ///
    /// Non-2xx responses become `FetchError::Status`. Query strings are
    /// stripped from URLs carried in errors so API keys never reach the logs.
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut attempt = 0;
        loop {
            match self.get_once(url).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!(
                        url = %redact_url(url),
                        attempt,
                        error = %e,
                        "Request failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// GETs `url` and decodes the body as UTF-8 text.
    pub async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let body = self.get_bytes(url).await?;
        String::from_utf8(body).map_err(|e| FetchError::Parse(e.to_string()))
    }

    /// GETs `url` and deserializes the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let body = self.get_bytes(url).await?;
        serde_json::from_slice(&body).map_err(|e| FetchError::Parse(e.to_string()))
    }

    async fn get_once(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        debug!(url = %redact_url(url), "GET");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: redact_url(url),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Network(e.without_url().to_string()))?;

        Ok(body.to_vec())
    }
}

/// `url` without its query string.
pub fn redact_url(url: &str) -> String {
    match url.split_once('?') {
        Some((base, _)) => base.to_string(),
        None => url.to_string(),
    }
}
