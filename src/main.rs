use clap::Parser;
use pix_checkout::cli::{self, Cli, Commands};
use pix_checkout::config::{CheckoutConfig, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    // Setup logging; LOG_FORMAT=json switches to one JSON object per line
    let json_logs = std::env::var("LOG_FORMAT")
        .is_ok_and(|format| format.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(json_logs.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();

    match args.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let config = Config::from_env()?;
            cli::handle_serve(&config).await
        }
        Commands::Config { check_gateway } => {
            let config = Config::from_env()?;
            let checkout = CheckoutConfig::from_env()?;
            cli::handle_config_validate(&config, &checkout, check_gateway).await
        }
        Commands::Pay {
            name,
            cpf,
            next_page,
        } => {
            let checkout = CheckoutConfig::from_env()?;
            cli::handle_pay(checkout, &name, &cpf, next_page).await
        }
        Commands::ValidateCpf { cpf } => cli::handle_validate_cpf(&cpf),
    }
}
