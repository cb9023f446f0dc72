use crate::config::{ApiKeySource, CheckoutConfig, Config};
use anyhow::{Context, Result};
use std::time::Duration;

pub struct ValidationReport {
    pub environment: bool,
    pub credential: bool,
    pub gateway: Option<bool>,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.environment && self.credential && self.gateway.unwrap_or(true)
    }

    pub fn print(&self) {
        println!("\n=== Startup Validation Report ===");
        println!("Environment Variables: {}", status(self.environment));
        println!("Gateway Credential:    {}", status(self.credential));
        match self.gateway {
            Some(ok) => println!("Gateway Connectivity:  {}", status(ok)),
            None => println!("Gateway Connectivity:  skipped"),
        }

        if !self.errors.is_empty() {
            println!("\nErrors:");
            for error in &self.errors {
                println!("  ❌ {}", error);
            }
        }

        println!("\nOverall Status: {}", if self.is_valid() { "✅ PASS" } else { "❌ FAIL" });
        println!("=================================\n");
    }
}

fn status(ok: bool) -> &'static str {
    if ok { "✅ OK" } else { "❌ FAIL" }
}

pub async fn validate_environment(
    config: &Config,
    checkout: &CheckoutConfig,
    check_gateway: bool,
) -> ValidationReport {
    let mut report = ValidationReport {
        environment: true,
        credential: true,
        gateway: None,
        errors: Vec::new(),
    };

    if let Err(e) = validate_env_vars(config, checkout) {
        report.environment = false;
        report.errors.push(format!("Environment: {:#}", e));
    }

    if let Err(e) = validate_credential(&config.api_key_source()) {
        report.credential = false;
        report.errors.push(format!("Credential: {:#}", e));
    }

    if check_gateway {
        let reachable = validate_gateway(&config.gateway_base_url).await;
        if let Err(e) = &reachable {
            report.errors.push(format!("Gateway: {:#}", e));
        }
        report.gateway = Some(reachable.is_ok());
    }

    report
}

fn validate_env_vars(config: &Config, checkout: &CheckoutConfig) -> Result<()> {
    if config.server_port == 0 {
        anyhow::bail!("SERVER_PORT must be greater than 0");
    }
    if config.gateway_timeout_secs == 0 {
        anyhow::bail!("GATEWAY_TIMEOUT_SECS must be greater than 0");
    }
    if checkout.poll_interval.is_zero() {
        anyhow::bail!("PIX_POLL_INTERVAL_MS must be greater than 0");
    }

    url::Url::parse(&config.gateway_base_url)
        .context("GATEWAY_BASE_URL is not a valid URL")?;
    url::Url::parse(&checkout.proxy_url).context("PIX_PROXY_URL is not a valid URL")?;

    Ok(())
}

fn validate_credential(source: &ApiKeySource) -> Result<()> {
    if source.resolve().is_none() {
        match source {
            ApiKeySource::Env(var) => anyhow::bail!("{} is not set", var),
            ApiKeySource::Fixed(_) => anyhow::bail!("gateway API key is empty"),
        }
    }
    Ok(())
}

// Any HTTP answer counts: the gateway may well refuse an unauthenticated GET.
async fn validate_gateway(gateway_url: &str) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;

    client
        .get(gateway_url)
        .send()
        .await
        .context("Failed to connect to payment gateway")?;

    Ok(())
}
