//! Process configuration shared by the webhook server, the bot and the diagnostics CLI.
//!
//! Values come from the process environment, optionally seeded from a `.env` file.
//! Missing credentials never abort loading; each consumer decides whether the
//! feature it needs can run.

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::retry::RetryPolicy;

pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";
pub const DEFAULT_NOTION_API_BASE: &str = "https://api.notion.com";
pub const DEFAULT_TICKER_API_BASE: &str = "https://api-testnet.bybit.com";
pub const DEFAULT_SIGNATURE_HEADERS: [&str; 2] = ["X-Notion-Signature", "Notion-Signature"];
const DEFAULT_PORT: u16 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLayout {
    /// One escaped MarkdownV2 summary per event.
    Plain,
    /// HTML trade card built from the page properties.
    Trade,
}

#[derive(Debug, Clone)]
pub struct TelegramSettings {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub api_base: String,
    pub parse_mode: Option<String>,
    pub poll_timeout: Duration,
    pub photo_file_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NotionSettings {
    pub token: Option<String>,
    pub api_base: String,
    pub webhook_token: Option<String>,
    pub parent_page_id: Option<String>,
    pub signature_headers: Vec<String>,
    pub accept_legacy_token: bool,
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub telegram: TelegramSettings,
    pub notion: NotionSettings,
    pub ticker_api_base: String,
    pub backend_url: Option<String>,
    pub bind: SocketAddr,
    pub http_timeout: Duration,
    pub notify_retry: RetryPolicy,
    pub notify_layout: NotifyLayout,
}

impl RelayConfig {
    /// Loads `.env` (if present) and reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let notify_layout = match get("NOTIFY_LAYOUT").as_deref() {
            None | Some("plain") => NotifyLayout::Plain,
            Some("trade") => NotifyLayout::Trade,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "NOTIFY_LAYOUT",
                    value: other.to_string(),
                });
            }
        };
        let parse_mode = match get("TELEGRAM_PARSE_MODE") {
            Some(mode) if mode.eq_ignore_ascii_case("none") => None,
            Some(mode) => Some(mode),
            None => Some(
                match notify_layout {
                    NotifyLayout::Plain => "MarkdownV2",
                    NotifyLayout::Trade => "HTML",
                }
                .to_string(),
            ),
        };

        let telegram = TelegramSettings {
            bot_token: get("TELEGRAM_BOT_TOKEN").or_else(|| get("TELEGRAM_TOKEN")),
            chat_id: get("TELEGRAM_CHAT_ID"),
            api_base: get("TELEGRAM_API_BASE")
                .unwrap_or_else(|| DEFAULT_TELEGRAM_API_BASE.into()),
            parse_mode,
            poll_timeout: Duration::from_secs(parse_or(&get, "BOT_POLL_TIMEOUT_SECS", 30)?),
            photo_file_id: get("BOT_PHOTO_FILE_ID"),
        };

        let signature_headers = get("NOTION_SIGNATURE_HEADERS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|h| !h.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|headers| !headers.is_empty())
            .unwrap_or_else(|| {
                DEFAULT_SIGNATURE_HEADERS
                    .iter()
                    .map(|h| h.to_string())
                    .collect()
            });

        let notion = NotionSettings {
            token: get("NOTION_TOKEN"),
            api_base: get("NOTION_API_BASE").unwrap_or_else(|| DEFAULT_NOTION_API_BASE.into()),
            webhook_token: get("NOTION_WEBHOOK_TOKEN"),
            parent_page_id: get("PARENT_PAGE_ID"),
            signature_headers,
            accept_legacy_token: parse_bool(&get, "NOTION_ACCEPT_LEGACY_TOKEN", true)?,
        };

        let bind = match get("BIND") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                key: "BIND",
                value: raw.clone(),
            })?,
            None => {
                let port: u16 = parse_or(&get, "PORT", DEFAULT_PORT)?;
                SocketAddr::from(([0, 0, 0, 0], port))
            }
        };

        let notify_retry = RetryPolicy::new(
            parse_or(&get, "NOTIFY_MAX_ATTEMPTS", 3)?,
            Duration::from_millis(parse_or(&get, "NOTIFY_RETRY_DELAY_MS", 2_000)?),
        );

        Ok(Self {
            telegram,
            notion,
            ticker_api_base: get("TICKER_API_BASE")
                .unwrap_or_else(|| DEFAULT_TICKER_API_BASE.into()),
            backend_url: get("BACKEND_URL"),
            bind,
            http_timeout: Duration::from_secs(parse_or(&get, "HTTP_TIMEOUT_SECS", 10)?),
            notify_retry,
            notify_layout,
        })
    }

    /// Names of the features that are disabled because their credentials are absent.
    pub fn disabled_features(&self) -> Vec<(&'static str, ConfigError)> {
        let mut disabled = Vec::new();
        if self.telegram.bot_token.is_none() {
            disabled.push(("telegram", ConfigError::Missing("TELEGRAM_BOT_TOKEN")));
        }
        if self.telegram.chat_id.is_none() {
            disabled.push(("notifications", ConfigError::Missing("TELEGRAM_CHAT_ID")));
        }
        if self.notion.token.is_none() {
            disabled.push(("property extraction", ConfigError::Missing("NOTION_TOKEN")));
        }
        if self.backend_url.is_none() {
            disabled.push(("profile backend", ConfigError::Missing("BACKEND_URL")));
        }
        disabled
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

fn parse_bool<G>(get: &G, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let raw = get(key);
    match raw.as_deref().map(str::to_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(_) => Err(ConfigError::Invalid {
            key,
            value: raw.unwrap_or_default(),
        }),
    }
}
