use anyhow::{Context, Result};
use clap::Parser;
use kpi_contracts::config::ValidatorConfig;
use kpi_contracts::validator::WebhookValidator;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Validate multi-KPI workflow webhooks against the data contract.
///
/// Reads N8N_BASE_URL and WEBHOOK_TIMEOUT_SECS from the environment or `.env`.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {}

#[tokio::main]
async fn main() -> Result<()> {
    let _cli = Cli::parse();
    init_logging().context("initializing logging")?;

    let config = ValidatorConfig::from_env()?;
    info!(target: "plain", "Starting webhook validation against {}\n{}", config.base_url, "=".repeat(50));

    let report = WebhookValidator::new(config).run().await;
    report.log_summary();

    if !report.all_passed() {
        std::process::exit(1);
    }

    Ok(())
}

/// Report lines go to the bare `plain` target; everything else is filtered by
/// `RUST_LOG`, defaulting to info for this crate.
fn init_logging() -> Result<()> {
    let report_layer = tracing_subscriber::fmt::layer()
        .event_format(
            tracing_subscriber::fmt::format()
                .without_time()
                .with_level(false)
                .with_target(false)
                .compact(),
        )
        .with_filter(Targets::new().with_target("plain", LevelFilter::TRACE));

    let diagnostics_layer = tracing_subscriber::fmt::layer().with_filter(
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn,kpi_contracts=info,webhook_validator=info")),
    );

    tracing_subscriber::registry()
        .with(report_layer)
        .with(diagnostics_layer)
        .try_init()
        .context("installing tracing subscriber")?;

    Ok(())
}
