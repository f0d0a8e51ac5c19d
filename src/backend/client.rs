//! HTTP client for the records backend.
//!
//! Requests are plain GETs against `{base}/data/{field}/{term}`. Response
//! bodies are classified by shape: an array is a result set, a single
//! object is a point lookup, and anything else is malformed.

use crate::models::{Record, SearchField, SearchQuery, DEFAULT_TERM, RESULT_CAP};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Backend used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "https://datarecord-backend.onrender.com";

/// Configuration for the backend client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// No timeout is applied when unset.
    pub timeout_seconds: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_seconds: None,
        }
    }
}

/// Transport-level failures. None of these are shown to the user verbatim.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid backend URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Cannot connect to backend at {url}")]
    Connect { url: String },

    #[error("Request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Backend returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Failed to decode response body: {0}")]
    Decode(String),

    #[error("Failed to send request: {0}")]
    Request(#[source] reqwest::Error),
}

/// Shape of a successfully decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Array body, truncated to the result cap.
    Records(Vec<Record>),
    /// Single object body.
    Single(Record),
    /// Null, number, string or bool.
    Malformed,
}

/// Classify a response body by shape.
pub fn classify(body: Value) -> FetchOutcome {
    match body {
        Value::Array(items) => FetchOutcome::Records(
            items
                .into_iter()
                .take(RESULT_CAP)
                .map(record_from_element)
                .collect(),
        ),
        Value::Object(map) => FetchOutcome::Single(Record::from(map)),
        _ => FetchOutcome::Malformed,
    }
}

/// Array elements that are not objects become records with no fields.
fn record_from_element(element: Value) -> Record {
    match element {
        Value::Object(map) => Record::from(map),
        _ => Record::default(),
    }
}

/// Client for the records backend.
#[derive(Debug, Clone)]
pub struct RecordClient {
    http_client: reqwest::Client,
    base_url: Url,
    timeout_seconds: Option<u64>,
}

impl RecordClient {
    /// Create a new client. Fails if the base URL cannot carry a path.
    pub fn new(config: &ClientConfig) -> Result<Self, FetchError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| FetchError::InvalidUrl {
            url: config.base_url.clone(),
            message: e.to_string(),
        })?;

        if base_url.cannot_be_a_base() {
            return Err(FetchError::InvalidUrl {
                url: config.base_url.clone(),
                message: "URL cannot carry a path".to_string(),
            });
        }

        let mut builder = reqwest::Client::builder();
        if let Some(seconds) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(seconds));
        }
        let http_client = builder.build().map_err(FetchError::Request)?;

        Ok(Self {
            http_client,
            base_url,
            timeout_seconds: config.timeout_seconds,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build `{base}/data/{field}/{term}`.
    ///
    /// The term is pushed as a single path segment, so reserved characters
    /// such as `/` and `?` are percent-encoded.
    pub fn request_url(&self, field: SearchField, term: &str) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidUrl {
                url: self.base_url.to_string(),
                message: "URL cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .push("data")
            .push(field.as_str())
            .push(term);
        Ok(url)
    }

    /// Fetch the raw body for a query. Non-2xx statuses are errors.
    pub async fn fetch(&self, query: &SearchQuery) -> Result<Value, FetchError> {
        let url = self.request_url(query.field, query.effective_term())?;
        debug!("GET {}", url);

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }

    /// Liveness probe against `/data/all/accounts`.
    ///
    /// Succeeds whenever the body parses as JSON; the status is not checked.
    pub async fn ping(&self) -> Result<Value, FetchError> {
        let url = self.request_url(SearchField::All, DEFAULT_TERM)?;
        debug!("Ping {}", url);

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        response
            .json::<Value>()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }

    fn map_send_error(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout {
                seconds: self.timeout_seconds.unwrap_or_default(),
            }
        } else if e.is_connect() {
            FetchError::Connect {
                url: self.base_url.to_string(),
            }
        } else {
            FetchError::Request(e)
        }
    }
}
