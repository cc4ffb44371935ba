// src/fetch/mod.rs
//! Downloading the monthly trip files.

use anyhow::Result;
use arrow::record_batch::RecordBatch;
use parquet::errors::ParquetError;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tokio::time;
use tracing::{debug, error, info, instrument, warn};

pub mod months;
pub mod staging;
pub mod urls;

pub use months::MonthBatch;
pub use urls::MonthKey;

/// Why a month produced nothing. Every variant is recoverable: the run moves on.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{file} not found (404), probably not published yet")]
    NotFound { file: String },

    #[error("HTTP {status} for {file}")]
    Status { file: String, status: StatusCode },

    #[error("timed out downloading {file}")]
    Timeout { file: String },

    #[error("request for {file} failed: {source}")]
    Transport {
        file: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("could not read {file} as parquet: {source}")]
    Parse {
        file: String,
        #[source]
        source: ParquetError,
    },

    #[error("staging {file} failed: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    fn timeout(file: &str) -> Self {
        FetchError::Timeout {
            file: file.to_string(),
        }
    }

    fn from_reqwest(file: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::timeout(file)
        } else {
            FetchError::Transport {
                file: file.to_string(),
                source,
            }
        }
    }

    /// The file simply isn't there yet, as opposed to something going wrong.
    pub fn is_absence(&self) -> bool {
        matches!(self, FetchError::NotFound { .. })
    }

    /// Absence is a warning; everything else is an error.
    pub fn log(&self) {
        if self.is_absence() {
            warn!("✗ {}", self);
        } else {
            error!("✗ {}", self);
        }
    }
}

/// Pulls one month at a time from the TLC file host.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl Fetcher {
    /// `timeout` applies to each wait on the server (connect, headers, every body chunk),
    /// not to the whole download, so a large file that keeps arriving is never cut off.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().connect_timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            timeout,
        })
    }

    /// Download and parse the file for `key`.
    #[instrument(level = "info", skip(self), fields(month = %key))]
    pub async fn fetch(&self, key: MonthKey) -> Result<RecordBatch, FetchError> {
        let file = key.file_name();
        let url = key.url(&self.base_url);
        info!("downloading {}", file);

        let mut resp = time::timeout(self.timeout, self.client.get(&url).send())
            .await
            .map_err(|_| FetchError::timeout(&file))?
            .map_err(|e| FetchError::from_reqwest(&file, e))?;

        match resp.status() {
            StatusCode::NOT_FOUND => return Err(FetchError::NotFound { file }),
            status if !status.is_success() => return Err(FetchError::Status { file, status }),
            _ => {}
        }

        let mut payload = Vec::new();
        while let Some(chunk) = time::timeout(self.timeout, resp.chunk())
            .await
            .map_err(|_| FetchError::timeout(&file))?
            .map_err(|e| FetchError::from_reqwest(&file, e))?
        {
            payload.extend_from_slice(&chunk);
        }
        debug!(bytes = payload.len(), "body received");
        let table = staging::stage_and_read(&file, &payload)?;
        info!(rows = table.num_rows(), "✓ {} downloaded", file);
        Ok(table)
    }
}
