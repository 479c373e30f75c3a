use std::sync::{Arc, OnceLock};

use relay_core::config::{DEFAULT_SIGNATURE_HEADERS, NotifyLayout, RelayConfig};
use relay_core::{NotificationDispatcher, PropertyExtractor};

/// Shared signing secret. Set once, either from configuration at startup or by
/// the first legacy verification callback; never replaced afterwards.
#[derive(Clone, Debug, Default)]
pub struct VerificationState {
    secret: Arc<OnceLock<String>>,
}

impl VerificationState {
    pub fn new(initial: Option<String>) -> Self {
        let state = Self::default();
        if let Some(secret) = initial.filter(|s| !s.is_empty()) {
            let _ = state.secret.set(secret);
        }
        state
    }

    pub fn secret(&self) -> Option<&str> {
        self.secret.get().map(String::as_str)
    }

    pub fn is_configured(&self) -> bool {
        self.secret.get().is_some()
    }

    /// Stores `secret` unless one is already held. Returns whether it was stored.
    pub fn store_if_unset(&self, secret: &str) -> bool {
        !secret.is_empty() && self.secret.set(secret.to_string()).is_ok()
    }
}

/// Deployment-specific knobs of the ingest pipeline.
#[derive(Clone, Debug)]
pub struct WebhookOptions {
    pub signature_headers: Vec<String>,
    pub accept_legacy_token: bool,
    pub layout: NotifyLayout,
    pub parse_mode: Option<String>,
}

impl Default for WebhookOptions {
    fn default() -> Self {
        Self {
            signature_headers: DEFAULT_SIGNATURE_HEADERS.iter().map(|h| h.to_string()).collect(),
            accept_legacy_token: true,
            layout: NotifyLayout::Plain,
            parse_mode: Some("MarkdownV2".into()),
        }
    }
}

impl WebhookOptions {
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            signature_headers: config.notion.signature_headers.clone(),
            accept_legacy_token: config.notion.accept_legacy_token,
            layout: config.notify_layout,
            parse_mode: config.telegram.parse_mode.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub verification: VerificationState,
    pub options: Arc<WebhookOptions>,
    pub extractor: PropertyExtractor,
    pub dispatcher: NotificationDispatcher,
}

impl AppState {
    pub fn new(
        verification: VerificationState,
        options: WebhookOptions,
        extractor: PropertyExtractor,
        dispatcher: NotificationDispatcher,
    ) -> Self {
        Self {
            verification,
            options: Arc::new(options),
            extractor,
            dispatcher,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_is_set_once() {
        let state = VerificationState::new(None);
        assert!(!state.is_configured());
        assert!(state.store_if_unset("first"));
        assert!(!state.store_if_unset("second"));
        assert_eq!(state.secret(), Some("first"));
    }

    #[test]
    fn configured_secret_wins_over_callbacks() {
        let state = VerificationState::new(Some("from-env".into()));
        let shared = state.clone();
        assert!(!shared.store_if_unset("callback"));
        assert_eq!(state.secret(), Some("from-env"));
    }

    #[test]
    fn empty_values_are_ignored() {
        let state = VerificationState::new(Some(String::new()));
        assert!(!state.store_if_unset(""));
        assert!(!state.is_configured());
    }
}
