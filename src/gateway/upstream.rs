use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{backoff, failure_policy, Config, Error as FailsafeError, StateMachine};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_GATEWAY_URL: &str = "https://api.brpixdigital.com/functions/v1";

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Invalid response body from gateway: {0}")]
    InvalidBody(String),
    #[error("Invalid gateway URL: {0}")]
    InvalidUrl(String),
    #[error("Circuit breaker open: {0}")]
    CircuitBreakerOpen(String),
}

/// Upstream status and JSON body, relayed to the caller untouched.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: Value,
}

type Breaker = StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>;

/// Outbound client from the proxy to the payment gateway. The bearer key is
/// supplied per call and never stored.
#[derive(Clone)]
pub struct GatewayUpstream {
    client: Client,
    base_url: String,
    circuit_breaker: Breaker,
}

impl GatewayUpstream {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        Self::with_circuit_breaker(base_url, timeout, 5, 60)
    }

    /// Creates an upstream whose breaker opens after `failure_threshold`
    /// consecutive transport failures. HTTP error statuses do not count.
    pub fn with_circuit_breaker(
        base_url: String,
        timeout: Duration,
        failure_threshold: u32,
        reset_timeout_secs: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        let backoff = backoff::equal_jittered(
            Duration::from_secs(reset_timeout_secs),
            Duration::from_secs(reset_timeout_secs * 2),
        );
        let policy = failure_policy::consecutive_failures(failure_threshold, backoff);
        let circuit_breaker = Config::new().failure_policy(policy).build();

        GatewayUpstream {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            circuit_breaker,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn circuit_state(&self) -> String {
        if self.circuit_breaker.is_call_permitted() {
            "closed".to_string()
        } else {
            "open".to_string()
        }
    }

    fn transactions_url(&self, id: Option<&str>) -> Result<Url, UpstreamError> {
        let mut url = Url::parse(&format!("{}/transactions", self.base_url))
            .map_err(|e| UpstreamError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;

        if let Some(id) = id {
            url.path_segments_mut()
                .map_err(|_| UpstreamError::InvalidUrl(self.base_url.clone()))?
                .push(id);
        }

        Ok(url)
    }

    /// `POST /transactions` with the caller's body forwarded verbatim.
    pub async fn create_transaction(
        &self,
        api_key: &str,
        body: &Value,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let url = self.transactions_url(None)?;
        let request = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .json(body);

        self.relay(request).await
    }

    /// `GET /transactions/{id}`.
    pub async fn get_transaction(
        &self,
        api_key: &str,
        id: &str,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let url = self.transactions_url(Some(id))?;
        let request = self
            .client
            .get(url)
            .bearer_auth(api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json");

        self.relay(request).await
    }

    async fn relay(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let result = self
            .circuit_breaker
            .call(async move {
                let response = request.send().await?;
                let status = response.status().as_u16();
                let body = response
                    .json::<Value>()
                    .await
                    .map_err(|e| UpstreamError::InvalidBody(e.to_string()))?;

                Ok::<_, UpstreamError>(UpstreamResponse { status, body })
            })
            .await;

        match result {
            Ok(response) => Ok(response),
            Err(FailsafeError::Rejected) => Err(UpstreamError::CircuitBreakerOpen(
                "payment gateway circuit breaker is open".to_string(),
            )),
            Err(FailsafeError::Inner(e)) => Err(e),
        }
    }
}
