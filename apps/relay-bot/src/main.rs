use anyhow::{Context, Result};
use relay_bot::{build_context, poller};
use relay_core::RelayConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let config = RelayConfig::from_env().context("load configuration")?;
    let _telemetry = relay_telemetry::install("relay-bot", env!("CARGO_PKG_VERSION"))?;

    let ctx = build_context(&config)?;
    tracing::info!(
        poll_timeout_secs = config.telegram.poll_timeout.as_secs(),
        ticker_api = %config.ticker_api_base,
        "relay bot polling for updates"
    );
    poller::run(ctx, config.telegram.poll_timeout).await;
    Ok(())
}
