use anyhow::Context;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

use crate::gateway::upstream::DEFAULT_GATEWAY_URL;

pub mod checkout;

pub use checkout::{CheckoutConfig, StatusClass, StatusPolicy};

pub const DEFAULT_API_KEY_VAR: &str = "BRPIX_API_KEY";

/// Proxy server configuration. The gateway key itself is not part of it: it
/// is read from `api_key_var` on every request.
#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub gateway_base_url: String,
    pub gateway_timeout_secs: u64,
    pub api_key_var: String,
    pub cors_allowed_origins: Option<Vec<String>>,
    pub log_request_body: bool,
    pub circuit_breaker_failures: u32,
    pub circuit_breaker_reset_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_port: 3000,
            gateway_base_url: DEFAULT_GATEWAY_URL.to_string(),
            gateway_timeout_secs: 30,
            api_key_var: DEFAULT_API_KEY_VAR.to_string(),
            cors_allowed_origins: None,
            log_request_body: false,
            circuit_breaker_failures: 5,
            circuit_breaker_reset_secs: 60,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present

        let defaults = Config::default();

        Ok(Config {
            server_port: env_or("SERVER_PORT", defaults.server_port)?,
            gateway_base_url: env::var("GATEWAY_BASE_URL")
                .unwrap_or(defaults.gateway_base_url),
            gateway_timeout_secs: env_or("GATEWAY_TIMEOUT_SECS", defaults.gateway_timeout_secs)?,
            api_key_var: env::var("GATEWAY_API_KEY_VAR").unwrap_or(defaults.api_key_var),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .ok()
                .map(|raw| parse_list(&raw))
                .filter(|origins| !origins.is_empty()),
            log_request_body: env_or("LOG_REQUEST_BODY", defaults.log_request_body)?,
            circuit_breaker_failures: env_or(
                "CIRCUIT_BREAKER_FAILURES",
                defaults.circuit_breaker_failures,
            )?,
            circuit_breaker_reset_secs: env_or(
                "CIRCUIT_BREAKER_RESET_SECS",
                defaults.circuit_breaker_reset_secs,
            )?,
        })
    }
}

/// Where the proxy finds the gateway key. Resolved on every request so a
/// missing key surfaces as a configuration error rather than a startup default.
#[derive(Debug, Clone)]
pub enum ApiKeySource {
    Env(String),
    Fixed(Option<String>),
}

impl ApiKeySource {
    pub fn resolve(&self) -> Option<String> {
        let key = match self {
            ApiKeySource::Env(var) => env::var(var).ok(),
            ApiKeySource::Fixed(key) => key.clone(),
        };

        key.filter(|key| !key.trim().is_empty())
    }
}

impl Config {
    pub fn api_key_source(&self) -> ApiKeySource {
        ApiKeySource::Env(self.api_key_var.clone())
    }
}

/// Reads and parses `key`, falling back to `default` when unset.
pub(crate) fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", key, raw)),
        _ => Ok(default),
    }
}

pub(crate) fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}
