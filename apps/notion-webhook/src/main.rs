use anyhow::{Context, Result};
use notion_webhook::{WEBHOOK_PATH, build_state, router};
use relay_core::RelayConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let config = RelayConfig::from_env().context("load configuration")?;
    let _telemetry = relay_telemetry::install("notion-webhook", env!("CARGO_PKG_VERSION"))?;

    let state = build_state(&config)?;
    tracing::info!(
        secret_configured = state.verification.is_configured(),
        notifications = state.dispatcher.is_configured(),
        "notion webhook ready"
    );

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("bind {}", config.bind))?;
    tracing::info!("notion-webhook listening on {}{}", config.bind, WEBHOOK_PATH);
    axum::serve(listener, router(state).into_make_service()).await?;
    Ok(())
}
