use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use super::models::{StatusResponse, Transaction, TransactionRequest, TransactionStatus};

pub const DEFAULT_ERROR_MESSAGE: &str = "An error occurred while generating the PIX payment.";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("status lookup returned HTTP {0}")]
    Unavailable(u16),
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Invalid response from gateway: {0}")]
    InvalidResponse(String),
    #[error("Invalid proxy URL: {0}")]
    InvalidUrl(String),
}

impl GatewayError {
    /// Whether the same call may succeed if simply tried again later.
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Transport(_) | GatewayError::InvalidResponse(_) => true,
            GatewayError::Unavailable(status) => {
                *status == StatusCode::TOO_MANY_REQUESTS.as_u16()
                    || *status == StatusCode::REQUEST_TIMEOUT.as_u16()
                    || *status >= 500
            }
            GatewayError::Rejected { status, .. } => *status >= 500,
            GatewayError::InvalidUrl(_) => false,
        }
    }
}

/// The two remote operations the checkout depends on.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    async fn create_transaction(
        &self,
        request: &TransactionRequest,
    ) -> Result<Transaction, GatewayError>;

    async fn fetch_status(&self, transaction_id: &str) -> Result<TransactionStatus, GatewayError>;
}

#[async_trait]
impl<T: GatewayClient + ?Sized> GatewayClient for Arc<T> {
    async fn create_transaction(
        &self,
        request: &TransactionRequest,
    ) -> Result<Transaction, GatewayError> {
        (**self).create_transaction(request).await
    }

    async fn fetch_status(&self, transaction_id: &str) -> Result<TransactionStatus, GatewayError> {
        (**self).fetch_status(transaction_id).await
    }
}

/// Talks to the key-holding proxy. Never carries a gateway credential.
#[derive(Clone)]
pub struct ProxyClient {
    client: Client,
    base_url: Url,
}

impl ProxyClient {
    pub fn new(base_url: &str) -> Result<Self, GatewayError> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| GatewayError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        if base_url.cannot_be_a_base() {
            return Err(GatewayError::InvalidUrl(base_url.to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Ok(ProxyClient { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn status_url(&self, transaction_id: &str) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push(transaction_id);
        Ok(url)
    }
}

#[async_trait]
impl GatewayClient for ProxyClient {
    async fn create_transaction(
        &self,
        request: &TransactionRequest,
    ) -> Result<Transaction, GatewayError> {
        let response = self
            .client
            .post(self.base_url.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let parsed = serde_json::from_str::<Value>(&body).unwrap_or(Value::Null);
            let message = extract_error_message(&parsed);
            tracing::warn!(status = status.as_u16(), %message, "Transaction creation rejected");
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let transaction = serde_json::from_str::<Transaction>(&body)
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        tracing::info!(
            transaction_id = %transaction.id,
            status = %transaction.status,
            "Transaction created"
        );

        Ok(transaction)
    }

    async fn fetch_status(&self, transaction_id: &str) -> Result<TransactionStatus, GatewayError> {
        let url = self.status_url(transaction_id)?;
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Unavailable(status.as_u16()));
        }

        let body = response.text().await?;
        let parsed = serde_json::from_str::<StatusResponse>(&body)
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        Ok(parsed.status)
    }
}

/// Pulls a user-facing message out of an `{error:{message, details?}}` body.
/// Details win when present, joined with ". ".
pub fn extract_error_message(body: &Value) -> String {
    let error = &body["error"];

    if let Some(details) = error["details"].as_array() {
        let details: Vec<&str> = details
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|detail| !detail.is_empty())
            .collect();

        if !details.is_empty() {
            return details.join(". ");
        }
    }

    match error["message"].as_str().map(str::trim) {
        Some(message) if !message.is_empty() => message.to_string(),
        _ => DEFAULT_ERROR_MESSAGE.to_string(),
    }
}
