use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::checkout::{CheckoutCoordinator, CheckoutState, ConsoleSink, Outcome};
use crate::config::{CheckoutConfig, Config};
use crate::gateway::ProxyClient;
use crate::validation::{is_valid_cpf, normalize_cpf, CPF_LEN};
use crate::{create_app, AppState};

#[derive(Parser)]
#[command(name = "pix-checkout")]
#[command(about = "PIX Checkout - gateway proxy and terminal checkout", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the proxy HTTP server (default)
    Serve,

    /// Configuration validation
    Config {
        /// Also check that the payment gateway answers
        #[arg(long)]
        check_gateway: bool,
    },

    /// Create a PIX payment through the proxy and wait until it settles
    Pay {
        /// Customer full name
        #[arg(long)]
        name: String,

        /// Customer CPF, formatted or digits only
        #[arg(long)]
        cpf: String,

        /// Where to go once the payment is confirmed
        #[arg(long, value_name = "URL")]
        next_page: Option<String>,
    },

    /// Check a CPF number
    ValidateCpf {
        #[arg(value_name = "CPF")]
        cpf: String,
    },
}

pub async fn handle_serve(config: &Config) -> anyhow::Result<()> {
    let state = AppState::from_config(config);
    if state.credentials.resolve().is_none() {
        tracing::warn!(
            "{} is not set; transaction requests will be answered with 500",
            config.api_key_var
        );
    }
    tracing::info!(
        "Forwarding PIX requests to gateway at {}",
        config.gateway_base_url
    );

    let app = create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;

    Ok(())
}

pub async fn handle_config_validate(
    config: &Config,
    checkout: &CheckoutConfig,
    check_gateway: bool,
) -> anyhow::Result<()> {
    tracing::info!("Validating configuration...");

    println!("Configuration:");
    println!("  Server Port: {}", config.server_port);
    println!("  Gateway URL: {}", config.gateway_base_url);
    println!(
        "  Gateway Key ({}): {}",
        config.api_key_var,
        config
            .api_key_source()
            .resolve()
            .map(|key| mask_secret(&key))
            .unwrap_or_else(|| "<missing>".to_string())
    );
    println!("  Proxy URL: {}", checkout.proxy_url);
    println!("  Product: {} ({})", checkout.product.title, checkout.product.amount);
    println!("  Poll Interval: {}ms", checkout.poll_interval.as_millis());

    let report = crate::startup::validate_environment(config, checkout, check_gateway).await;
    report.print();

    if !report.is_valid() {
        anyhow::bail!("Configuration is invalid");
    }

    tracing::info!("Configuration is valid");
    println!("✓ Configuration is valid");

    Ok(())
}

pub async fn handle_pay(
    mut checkout: CheckoutConfig,
    name: &str,
    cpf: &str,
    next_page: Option<String>,
) -> anyhow::Result<()> {
    if let Some(next_page) = next_page {
        checkout.redirect_to = next_page;
    }

    let client = ProxyClient::new(&checkout.proxy_url)?;
    let coordinator = CheckoutCoordinator::new(client, ConsoleSink::new(), checkout);
    let mut states = coordinator.subscribe();

    let transaction = coordinator.submit(name, cpf).await?;
    tracing::info!(transaction_id = %transaction.id, "Waiting for payment, press Ctrl-C to cancel");

    let settled = tokio::select! {
        state = states.wait_for(CheckoutState::is_final) => state.map(|state| (*state).clone())?,
        _ = tokio::signal::ctrl_c() => {
            coordinator.cancel();
            CheckoutState::Cancelled
        }
    };

    match settled {
        CheckoutState::Settled(Outcome::Success) => {
            coordinator.sink().wait_redirect().await;
            Ok(())
        }
        CheckoutState::Settled(Outcome::Failure(reason)) => {
            anyhow::bail!("Payment {} was not confirmed: {:?}", transaction.id, reason)
        }
        _ => anyhow::bail!("Checkout cancelled"),
    }
}

pub fn handle_validate_cpf(cpf: &str) -> anyhow::Result<()> {
    let digits = normalize_cpf(cpf);

    if is_valid_cpf(&digits) {
        println!("✓ {} is a valid CPF", format_cpf(&digits));
        Ok(())
    } else {
        anyhow::bail!("{} is not a valid CPF", cpf)
    }
}

fn format_cpf(digits: &str) -> String {
    if digits.len() != CPF_LEN {
        return digits.to_string();
    }
    format!(
        "{}.{}.{}-{}",
        &digits[0..3],
        &digits[3..6],
        &digits[6..9],
        &digits[9..11]
    )
}

fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    format!("{}****", head)
}
