use std::time::Duration;

pub use reqwest::StatusCode;
use thiserror::Error;

/// Failure talking to one of the upstream providers (Telegram, Notion, Bybit, profile backend).
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unauthorized: {body}")]
    Unauthorized { body: String },
    #[error("not found: {body}")]
    NotFound { body: String },
    #[error("rate limited: {body}")]
    RateLimited {
        retry_after: Option<Duration>,
        body: String,
    },
    #[error("request timed out")]
    Timeout,
    #[error("client error {status}: {body}")]
    Client { status: StatusCode, body: String },
    #[error("server error {status}: {body}")]
    Server { status: StatusCode, body: String },
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Timeouts, rate limits and 5xx are transient; everything else is permanent.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::Timeout
                | ProviderError::RateLimited { .. }
                | ProviderError::Server { .. }
        )
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ProviderError::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED),
            ProviderError::NotFound { .. } => Some(StatusCode::NOT_FOUND),
            ProviderError::RateLimited { .. } => Some(StatusCode::TOO_MANY_REQUESTS),
            ProviderError::Client { status, .. } | ProviderError::Server { status, .. } => {
                Some(*status)
            }
            ProviderError::Timeout | ProviderError::Transport(_) | ProviderError::Decode(_) => None,
        }
    }

    /// Response body as returned by the provider, if any.
    pub fn body(&self) -> Option<&str> {
        match self {
            ProviderError::Unauthorized { body }
            | ProviderError::NotFound { body }
            | ProviderError::RateLimited { body, .. }
            | ProviderError::Client { body, .. }
            | ProviderError::Server { body, .. } => Some(body.as_str()),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::Unauthorized { .. } => "unauthorized",
            ProviderError::NotFound { .. } => "not_found",
            ProviderError::RateLimited { .. } => "rate_limited",
            ProviderError::Timeout => "timeout",
            ProviderError::Client { .. } => "client_error",
            ProviderError::Server { .. } => "server_error",
            ProviderError::Transport(_) => "transport",
            ProviderError::Decode(_) => "decode",
        }
    }
}

/// The request URL is dropped: Telegram URLs carry the bot token.
impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_decode() {
            ProviderError::Decode(err.to_string())
        } else {
            ProviderError::Transport(err)
        }
    }
}

/// Missing or malformed settings; the dependent feature is disabled, not the process.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not configured")]
    Missing(&'static str),
    #[error("{key} has an invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
}
