//! Client for the dom4in backend's admin API

use crate::aggregate::BlockPayload;
use crate::config::BackendConfig;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Header carrying the admin API key
pub const API_KEY_HEADER: &str = "x-admin-api-key";

const UPLOAD_PATH: &str = "/api/admin/upload-aggregate";
const RESET_PATH: &str = "/api/admin/reset-stats";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Backend errors
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Backend rejected {url} with status {status}: {body}")]
    Rejected { url: String, status: u16, body: String },

    #[error("Failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Status and body returned by a successful call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendResponse {
    pub status: u16,
    pub body: String,
}

/// Uploads block payloads and issues admin resets
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl BackendClient {
    /// Creates a client for the configured backend
    ///
    /// # Arguments
    ///
    /// * `config` - Base URL and admin API key. A trailing slash on the base
    ///   URL is ignored.
    ///
    /// # Returns
    ///
    /// A client whose requests time out after 30 seconds, or the error from
    /// building the underlying HTTP client.
    pub fn new(config: &BackendConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: &BackendConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    /// Uploads one block's aggregate
    ///
    /// # Arguments
    ///
    /// * `payload` - The block payload, sent as the JSON request body
    ///
    /// # Returns
    ///
    /// The backend's status and body on a 2xx answer. Any other status is
    /// `BackendError::Rejected`; connection and timeout failures are
    /// `BackendError::Transport`.
    pub async fn upload_aggregate(
        &self,
        payload: &BlockPayload,
    ) -> Result<BackendResponse, BackendError> {
        let body = payload.to_json()?;
        self.post(UPLOAD_PATH, body).await
    }

    /// Asks the backend to clear its accumulated statistics
    pub async fn reset_stats(&self) -> Result<BackendResponse, BackendError> {
        self.post(RESET_PATH, "{}".to_string()).await
    }

    async fn post(&self, path: &str, body: String) -> Result<BackendResponse, BackendError> {
        let url = format!("{}{}", self.base_url, path);
        let transport = |source| BackendError::Transport {
            url: url.clone(),
            source,
        };

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport)?;

        if !(200..300).contains(&status) {
            return Err(BackendError::Rejected { url, status, body });
        }

        tracing::debug!("{} -> {}", url, status);
        Ok(BackendResponse { status, body })
    }
}
