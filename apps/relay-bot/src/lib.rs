//! Telegram bot that answers price, profile and utility commands.

pub mod command;
pub mod handlers;
pub mod poller;

use std::sync::Arc;

use relay_core::http::build_client;
use relay_core::{
    BybitTicker, HttpProfileBackend, HttpTelegramApi, ProfileBackend, RelayConfig,
};

pub use handlers::BotContext;

/// Builds the live context. A bot without a token cannot run.
pub fn build_context(config: &RelayConfig) -> anyhow::Result<BotContext> {
    let token = config
        .telegram
        .bot_token
        .clone()
        .ok_or(relay_core::ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?;
    let client = build_client(config.http_timeout)?;

    let backend = match config.backend_url.as_ref() {
        Some(url) => Some(Arc::new(HttpProfileBackend::new(client.clone(), url.clone()))
            as Arc<dyn ProfileBackend>),
        None => {
            tracing::warn!("BACKEND_URL not set; /register and /myinfo are disabled");
            None
        }
    };

    Ok(BotContext {
        telegram: Arc::new(HttpTelegramApi::new(
            client.clone(),
            Some(config.telegram.api_base.clone()),
            token,
        )),
        prices: Arc::new(BybitTicker::new(client, Some(config.ticker_api_base.clone()))),
        backend,
        photo_file_id: config.telegram.photo_file_id.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refuses_to_start_without_token() {
        let config = RelayConfig::from_lookup(|_| None).unwrap();
        let err = build_context(&config).err().unwrap();
        assert_eq!(err.to_string(), "TELEGRAM_BOT_TOKEN is not configured");
    }

    #[test]
    fn backend_is_optional() {
        let config = RelayConfig::from_lookup(|key| {
            (key == "TELEGRAM_TOKEN").then(|| "123:abc".to_string())
        })
        .unwrap();
        let ctx = build_context(&config).unwrap();
        assert!(ctx.backend.is_none());
        assert!(ctx.photo_file_id.is_none());
    }
}
