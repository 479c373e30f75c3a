//! Shared building blocks for the Notion relay services: configuration,
//! outbound provider clients, retry policy and Notion property extraction.

pub mod backend;
pub mod config;
pub mod error;
pub mod http;
pub mod notify;
pub mod notion;
pub mod retry;
pub mod telegram;
pub mod ticker;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

pub use backend::{HttpProfileBackend, ProfileBackend, UserProfile, backend_error_text};
pub use config::{NotifyLayout, RelayConfig};
pub use error::{ConfigError, ProviderError};
pub use notify::NotificationDispatcher;
pub use notion::{Extraction, PageProperties, PropertyExtractor, PropertyValue};
pub use retry::RetryPolicy;
pub use telegram::{HttpTelegramApi, OutgoingMessage, TelegramApi};
pub use ticker::{BybitTicker, PriceSource, TickerQuote};
