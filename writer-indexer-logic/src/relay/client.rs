use super::settings::RelaySettings;
use crate::provenance::CorrelationId;
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;
use url::Url;
use writer_indexer_entity::sea_orm_active_enums::TransactionStatus;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("relay is not configured: missing {0}")]
    MissingSetting(&'static str),
    #[error("invalid relay url: {0}")]
    Url(#[from] url::ParseError),
    #[error("request error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("transaction request {0} not found")]
    NotFound(String),
    #[error("relay responded with {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("invalid relay response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayTransactionRequest {
    #[serde(default)]
    pub transaction_id: Option<String>,
    pub chain_id: i64,
    #[serde(default)]
    pub function_signature: Option<String>,
    #[serde(default)]
    pub decoded_data: Option<serde_json::Value>,
    #[serde(default)]
    pub transaction_attempts: Vec<RelayTransactionAttempt>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayTransactionAttempt {
    pub status: TransactionStatus,
    #[serde(default)]
    pub block: Option<i64>,
    #[serde(default)]
    pub hash: Option<String>,
}

#[async_trait]
pub trait RelayClient: Send + Sync {
    async fn get_transaction_request(
        &self,
        correlation_id: &CorrelationId,
    ) -> Result<RelayTransactionRequest, RelayError>;
}

/// Client of the relay's transaction request API.
#[derive(Clone)]
pub struct HttpRelayClient {
    http: ClientWithMiddleware,
    url: Url,
    project_id: String,
    api_key: String,
    timeout: Duration,
}

impl HttpRelayClient {
    pub fn new(
        url: Url,
        project_id: String,
        api_key: String,
        timeout: Duration,
        max_retries: u32,
    ) -> Self {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);
        let http = ClientBuilder::new(reqwest::Client::new())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();
        Self {
            http,
            url,
            project_id,
            api_key,
            timeout,
        }
    }

    /// Returns `None` when the relay is disabled.
    pub fn from_settings(settings: &RelaySettings) -> Result<Option<Self>, RelayError> {
        if !settings.enabled {
            return Ok(None);
        }
        let url = settings
            .url
            .clone()
            .ok_or(RelayError::MissingSetting("url"))?;
        let project_id = settings
            .project_id
            .clone()
            .ok_or(RelayError::MissingSetting("project_id"))?;
        let api_key = settings
            .api_key
            .clone()
            .ok_or(RelayError::MissingSetting("api_key"))?;
        Ok(Some(Self::new(
            url,
            project_id,
            api_key,
            settings.timeout,
            settings.max_retries,
        )))
    }

    fn request_url(&self, correlation_id: &CorrelationId) -> Result<Url, RelayError> {
        let url = format!(
            "{}/wallet/project/{}/request/{}",
            self.url.as_str().trim_end_matches('/'),
            self.project_id,
            correlation_id
        );
        Ok(url.parse()?)
    }
}

#[async_trait]
impl RelayClient for HttpRelayClient {
    #[instrument(name = "relay::get_transaction_request", skip(self), level = "debug")]
    async fn get_transaction_request(
        &self,
        correlation_id: &CorrelationId,
    ) -> Result<RelayTransactionRequest, RelayError> {
        let url = self.request_url(correlation_id)?;
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(RelayError::NotFound(correlation_id.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Status { status, body });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
