//! Client for the published market dataset.
//!
//! - One GET per call, no retry, bounded by a request timeout.
//! - Every failure is classified so callers can log it before falling back.

use std::{future::Future, time::Duration};

use reqwest::{Client, Url};
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::Dataset;
use crate::util::version::user_agent;

pub const DEFAULT_DATASET_URL: &str =
    "https://raw.githubusercontent.com/farqab/halApp/main/data/marketData.json";
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected status {0}")]
    BadStatus(u16),
    #[error("malformed dataset: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Short label for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Network(_) => "network",
            FetchError::BadStatus(_) => "bad_status",
            FetchError::Malformed(_) => "malformed",
        }
    }

    fn transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Network(format!("timed out: {err}"))
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

/// Anything that can hand the controller a dataset.
pub trait DatasetSource: Send + Sync {
    fn fetch(&self) -> impl Future<Output = Result<Dataset, FetchError>> + Send;
}

#[derive(Clone)]
pub struct RemoteDatasetFetcher {
    http: Client,
    url: Url,
}

impl RemoteDatasetFetcher {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, FetchError> {
        let http = Client::builder()
            .user_agent(user_agent())
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|err| FetchError::Network(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { http, url })
    }
}

impl DatasetSource for RemoteDatasetFetcher {
    async fn fetch(&self) -> Result<Dataset, FetchError> {
        debug!(url = %self.url, "Requesting market dataset");

        let response = self
            .http
            .get(self.url.clone())
            .send()
            .await
            .map_err(FetchError::transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::BadStatus(status.as_u16()));
        }

        let body = response.bytes().await.map_err(FetchError::transport)?;
        let dataset: Dataset = serde_json::from_slice(&body)
            .map_err(|err| FetchError::Malformed(err.to_string()))?;

        info!(
            cities = dataset.cities.len(),
            districts = dataset.districts.len(),
            last_updated = dataset.last_updated.as_deref().unwrap_or("-"),
            "Fetched remote dataset"
        );
        Ok(dataset)
    }
}
