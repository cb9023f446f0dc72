use dotenvy::dotenv;
use std::env;
use std::time::Duration;

use super::{env_or, parse_list};
use crate::amount::Amount;
use crate::gateway::models::{ContactDefaults, Product, DEFAULT_EXPIRES_IN_DAYS};
use crate::gateway::TransactionStatus;

pub const DEFAULT_PROXY_URL: &str = "http://localhost:3000/api/pix";
pub const DEFAULT_REDIRECT_TO: &str = "/";

/// How a polled status affects the checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Failure,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPolicy {
    pub success: Vec<TransactionStatus>,
    pub failure: Vec<TransactionStatus>,
}

impl Default for StatusPolicy {
    fn default() -> Self {
        StatusPolicy {
            success: vec![TransactionStatus::Paid],
            failure: vec![
                TransactionStatus::Refused,
                TransactionStatus::Failed,
                TransactionStatus::Expired,
                TransactionStatus::Canceled,
                TransactionStatus::Chargeback,
            ],
        }
    }
}

impl StatusPolicy {
    pub fn classify(&self, status: &TransactionStatus) -> StatusClass {
        if self.success.contains(status) {
            StatusClass::Success
        } else if self.failure.contains(status) {
            StatusClass::Failure
        } else {
            StatusClass::Pending
        }
    }
}

/// Checkout-side settings: what is sold, where the proxy lives, and the
/// polling and redirect timings.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    pub proxy_url: String,
    pub product: Product,
    pub contact: ContactDefaults,
    pub expires_in_days: u32,
    pub poll_interval: Duration,
    pub redirect_delay: Duration,
    /// `None` polls until a terminal status arrives.
    pub max_poll_duration: Option<Duration>,
    pub max_poll_attempts: Option<u32>,
    pub statuses: StatusPolicy,
    pub redirect_to: String,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        CheckoutConfig {
            proxy_url: DEFAULT_PROXY_URL.to_string(),
            product: Product {
                title: "Identity confirmation".to_string(),
                amount: Amount::from_cents(3400),
            },
            contact: ContactDefaults {
                email: "default@it.me".to_string(),
                phone: "11999999999".to_string(),
            },
            expires_in_days: DEFAULT_EXPIRES_IN_DAYS,
            poll_interval: Duration::from_millis(3000),
            redirect_delay: Duration::from_millis(7000),
            max_poll_duration: Some(Duration::from_secs(30 * 60)),
            max_poll_attempts: None,
            statuses: StatusPolicy::default(),
            redirect_to: DEFAULT_REDIRECT_TO.to_string(),
        }
    }
}

impl CheckoutConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();

        let defaults = CheckoutConfig::default();

        let poll_interval_ms: u64 =
            env_or("PIX_POLL_INTERVAL_MS", defaults.poll_interval.as_millis() as u64)?;
        if poll_interval_ms == 0 {
            anyhow::bail!("PIX_POLL_INTERVAL_MS must be greater than 0");
        }

        let redirect_delay_ms: u64 =
            env_or("PIX_REDIRECT_DELAY_MS", defaults.redirect_delay.as_millis() as u64)?;

        let default_max_secs = defaults.max_poll_duration.map_or(0, |d| d.as_secs());
        let max_poll_secs: u64 = env_or("PIX_MAX_POLL_SECS", default_max_secs)?;

        let max_poll_attempts: u32 = env_or("PIX_MAX_POLL_ATTEMPTS", 0)?;

        let amount_cents: i64 = env_or("PIX_PRODUCT_AMOUNT", defaults.product.amount.cents())?;
        if amount_cents <= 0 {
            anyhow::bail!("PIX_PRODUCT_AMOUNT must be greater than zero");
        }

        let statuses = StatusPolicy {
            success: env_statuses("PIX_SUCCESS_STATUSES").unwrap_or(defaults.statuses.success),
            failure: env_statuses("PIX_FAILURE_STATUSES").unwrap_or(defaults.statuses.failure),
        };

        Ok(CheckoutConfig {
            proxy_url: env::var("PIX_PROXY_URL").unwrap_or(defaults.proxy_url),
            product: Product {
                title: env::var("PIX_PRODUCT_TITLE").unwrap_or(defaults.product.title),
                amount: Amount::from_cents(amount_cents),
            },
            contact: ContactDefaults {
                email: env::var("PIX_CUSTOMER_EMAIL").unwrap_or(defaults.contact.email),
                phone: env::var("PIX_CUSTOMER_PHONE").unwrap_or(defaults.contact.phone),
            },
            expires_in_days: env_or("PIX_EXPIRES_IN_DAYS", defaults.expires_in_days)?,
            poll_interval: Duration::from_millis(poll_interval_ms),
            redirect_delay: Duration::from_millis(redirect_delay_ms),
            max_poll_duration: (max_poll_secs > 0).then(|| Duration::from_secs(max_poll_secs)),
            max_poll_attempts: (max_poll_attempts > 0).then_some(max_poll_attempts),
            statuses,
            redirect_to: env::var("PIX_REDIRECT_TO").unwrap_or(defaults.redirect_to),
        })
    }
}

fn env_statuses(key: &str) -> Option<Vec<TransactionStatus>> {
    let parsed: Vec<TransactionStatus> = parse_list(&env::var(key).ok()?)
        .iter()
        .map(|raw| TransactionStatus::from(raw.as_str()))
        .collect();

    (!parsed.is_empty()).then_some(parsed)
}
