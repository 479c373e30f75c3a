//! Notion webhook ingress.
//!
//! Exposes `/notion-webhook`: answers Notion's verification handshakes, verifies
//! `sha256=` signatures over the raw body, extracts page properties for page and
//! block events, and forwards a formatted summary to a Telegram chat.

pub mod error;
pub mod event;
pub mod format;
pub mod handler;
pub mod reqid;
pub mod respond;
pub mod signature;
pub mod state;

use std::any::Any;
use std::sync::Arc;

use axum::{Router, middleware, response::IntoResponse, response::Response, routing::get};
use relay_core::http::build_client;
use relay_core::{
    HttpTelegramApi, NotificationDispatcher, PropertyExtractor, RelayConfig, TelegramApi,
    notion::{HttpNotionClient, NotionApi},
};
use tower_http::catch_panic::CatchPanicLayer;

pub use error::WebhookError;
pub use state::{AppState, VerificationState, WebhookOptions};

pub const WEBHOOK_PATH: &str = "/notion-webhook";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(WEBHOOK_PATH, get(handler::status).post(handler::receive))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn(reqid::with_request_id))
        .with_state(state)
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| err.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "handler panicked".to_string());
    WebhookError::Internal(detail).into_response()
}

/// Wires the real Notion and Telegram clients; features without credentials stay disabled.
pub fn build_state(config: &RelayConfig) -> anyhow::Result<AppState> {
    let client = build_client(config.http_timeout)?;

    let telegram: Option<Arc<dyn TelegramApi>> = config.telegram.bot_token.as_ref().map(|token| {
        Arc::new(HttpTelegramApi::new(
            client.clone(),
            Some(config.telegram.api_base.clone()),
            token.clone(),
        )) as Arc<dyn TelegramApi>
    });
    let notion: Option<Arc<dyn NotionApi>> = config.notion.token.as_ref().map(|token| {
        Arc::new(HttpNotionClient::new(
            client.clone(),
            Some(config.notion.api_base.clone()),
            token.clone(),
        )) as Arc<dyn NotionApi>
    });

    for (feature, reason) in config.disabled_features() {
        tracing::warn!(feature, %reason, "feature disabled");
    }

    Ok(AppState::new(
        VerificationState::new(config.notion.webhook_token.clone()),
        WebhookOptions::from_config(config),
        PropertyExtractor::new(notion, config.notify_retry),
        NotificationDispatcher::from_config(telegram, config),
    ))
}
