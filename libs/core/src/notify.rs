use std::sync::Arc;

use relay_telemetry::{TelemetryLabels, record_counter};

use crate::config::RelayConfig;
use crate::retry::RetryPolicy;
use crate::telegram::{OutgoingMessage, TelegramApi};

pub const MAX_MESSAGE_CHARS: usize = 1000;
pub const EMPTY_MESSAGE: &str = "Empty message";

/// Clamps `text` to `MAX_MESSAGE_CHARS` characters; blank text becomes a fixed placeholder.
///
/// With a `MarkdownV2` or `HTML` parse mode the cut never leaves a dangling escape,
/// a partial tag or entity, or an unclosed entity, so Telegram can still parse it.
pub fn prepare_text(text: &str, parse_mode: Option<&str>) -> String {
    if text.trim().is_empty() {
        return EMPTY_MESSAGE.to_string();
    }
    if text.chars().count() <= MAX_MESSAGE_CHARS {
        return text.to_string();
    }
    let markup = Markup::from_parse_mode(parse_mode);
    let mut budget = MAX_MESSAGE_CHARS;
    loop {
        let repaired = markup.close(char_prefix(text, budget));
        let len = repaired.chars().count();
        if len <= MAX_MESSAGE_CHARS {
            return repaired;
        }
        // closing markers pushed it over; retry with less text
        budget = budget.saturating_sub(len - MAX_MESSAGE_CHARS);
    }
}

fn char_prefix(text: &str, chars: usize) -> &str {
    match text.char_indices().nth(chars) {
        Some((cut, _)) => &text[..cut],
        None => text,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Markup {
    MarkdownV2,
    Html,
    Plain,
}

impl Markup {
    fn from_parse_mode(parse_mode: Option<&str>) -> Self {
        match parse_mode {
            Some(mode) if mode.eq_ignore_ascii_case("MarkdownV2") => Markup::MarkdownV2,
            Some(mode) if mode.eq_ignore_ascii_case("HTML") => Markup::Html,
            _ => Markup::Plain,
        }
    }

    fn close(self, cut: &str) -> String {
        match self {
            Markup::MarkdownV2 => close_markdown_v2(cut),
            Markup::Html => close_html(cut),
            Markup::Plain => cut.to_string(),
        }
    }
}

fn toggle(open: &mut Vec<&'static str>, marker: &'static str) {
    if open.last() == Some(&marker) {
        open.pop();
    } else {
        open.push(marker);
    }
}

fn close_markdown_v2(cut: &str) -> String {
    let mut text = cut;
    let trailing = text.chars().rev().take_while(|&c| c == '\\').count();
    if trailing % 2 == 1 {
        text = &text[..text.len() - 1];
    }

    let mut open: Vec<&'static str> = Vec::new();
    let mut link_start = None;
    let mut chars = text.char_indices().peekable();
    while let Some((i, ch)) = chars.next() {
        let in_code = open.last() == Some(&"`");
        match ch {
            '\\' => {
                chars.next();
            }
            '`' => toggle(&mut open, "`"),
            _ if in_code => {}
            '*' => toggle(&mut open, "*"),
            '~' => toggle(&mut open, "~"),
            '_' if chars.peek().map(|&(_, c)| c) == Some('_') => {
                chars.next();
                toggle(&mut open, "__");
            }
            '_' => toggle(&mut open, "_"),
            '|' if chars.peek().map(|&(_, c)| c) == Some('|') => {
                chars.next();
                toggle(&mut open, "||");
            }
            '[' if link_start.is_none() => link_start = Some(i),
            ')' => link_start = None,
            _ => {}
        }
    }
    if let Some(start) = link_start {
        return close_markdown_v2(&text[..start]);
    }

    let mut out = text.to_string();
    for marker in open.iter().rev() {
        out.push_str(marker);
    }
    out
}

fn close_html(cut: &str) -> String {
    let mut text = cut;
    if let Some(lt) = text.rfind('<') {
        if !text[lt..].contains('>') {
            text = &text[..lt];
        }
    }
    if let Some(amp) = text.rfind('&') {
        if !text[amp..].contains(';') {
            text = &text[..amp];
        }
    }

    let mut open: Vec<&str> = Vec::new();
    let mut rest = text;
    while let Some(lt) = rest.find('<') {
        let after = &rest[lt + 1..];
        let Some(gt) = after.find('>') else {
            break;
        };
        let tag = &after[..gt];
        match tag.strip_prefix('/') {
            Some(closing) => {
                let name = tag_name(closing);
                if let Some(pos) = open.iter().rposition(|t| *t == name) {
                    open.truncate(pos);
                }
            }
            None => open.push(tag_name(tag)),
        }
        rest = &after[gt + 1..];
    }

    let mut out = text.to_string();
    for name in open.iter().rev() {
        out.push_str(&format!("</{name}>"));
    }
    out
}

fn tag_name(tag: &str) -> &str {
    tag.split(char::is_whitespace).next().unwrap_or("")
}

/// Posts notifications into the configured Telegram chat.
#[derive(Clone)]
pub struct NotificationDispatcher {
    api: Option<Arc<dyn TelegramApi>>,
    chat_id: Option<String>,
    parse_mode: Option<String>,
    policy: RetryPolicy,
}

impl NotificationDispatcher {
    pub fn new(
        api: Option<Arc<dyn TelegramApi>>,
        chat_id: Option<String>,
        parse_mode: Option<String>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            api,
            chat_id,
            parse_mode,
            policy,
        }
    }

    pub fn from_config(api: Option<Arc<dyn TelegramApi>>, config: &RelayConfig) -> Self {
        Self::new(
            api,
            config.telegram.chat_id.clone(),
            config.telegram.parse_mode.clone(),
            config.notify_retry,
        )
    }

    pub fn is_configured(&self) -> bool {
        self.api.is_some() && self.chat_id.is_some()
    }

    /// Sends `text`, retrying transient failures. Returns whether Telegram accepted it.
    pub async fn dispatch(&self, text: &str) -> bool {
        let (Some(api), Some(chat_id)) = (self.api.as_ref(), self.chat_id.as_ref()) else {
            tracing::error!("telegram bot token or chat id not configured; notification dropped");
            record_outcome("unconfigured");
            return false;
        };

        let message = OutgoingMessage {
            chat_id: chat_id.clone(),
            text: prepare_text(text, self.parse_mode.as_deref()),
            parse_mode: self.parse_mode.clone(),
            disable_web_page_preview: true,
        };

        let result = self
            .policy
            .run("telegram.sendMessage", |_attempt| {
                let api = api.clone();
                let message = message.clone();
                async move { api.send_message(&message).await }
            })
            .await;

        match result {
            Ok(()) => {
                tracing::info!(chars = message.text.chars().count(), "notification delivered");
                record_outcome("delivered");
                true
            }
            Err(err) => {
                tracing::error!(
                    error = %err,
                    kind = err.kind(),
                    status = err.status().map(|s| s.as_u16()),
                    "notification failed"
                );
                record_outcome("failed");
                false
            }
        }
    }
}

fn record_outcome(outcome: &str) {
    record_counter(
        "relay_notifications_total",
        1,
        &TelemetryLabels::new("notify").with_outcome(outcome),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::testkit::MockTelegram;
    use reqwest::StatusCode;
    use std::time::Duration;

    fn dispatcher(api: Arc<MockTelegram>) -> NotificationDispatcher {
        NotificationDispatcher::new(
            Some(api),
            Some("-100".into()),
            Some("MarkdownV2".into()),
            RetryPolicy::new(3, Duration::ZERO),
        )
    }

    #[test]
    fn truncates_to_character_limit() {
        let long = "ж".repeat(1500);
        let prepared = prepare_text(&long, None);
        assert_eq!(prepared.chars().count(), MAX_MESSAGE_CHARS);
        assert_eq!(prepare_text("short", Some("MarkdownV2")), "short");
    }

    #[test]
    fn empty_text_is_replaced() {
        assert_eq!(prepare_text("", None), EMPTY_MESSAGE);
        assert_eq!(prepare_text("  \n", Some("HTML")), EMPTY_MESSAGE);
    }

    #[test]
    fn markdown_cut_drops_dangling_escape() {
        let text = format!("{}\\.", "a".repeat(999));
        let prepared = prepare_text(&text, Some("MarkdownV2"));
        assert_eq!(prepared, "a".repeat(999));
    }

    #[test]
    fn markdown_cut_closes_open_entities() {
        let text = format!("*Notion page update*\n_{}_", "b".repeat(1200));
        let prepared = prepare_text(&text, Some("MarkdownV2"));
        assert!(prepared.chars().count() <= MAX_MESSAGE_CHARS);
        assert!(prepared.starts_with("*Notion page update*\n_b"));
        assert!(prepared.ends_with("b_"));
    }

    #[test]
    fn markdown_cut_inside_link_drops_the_link() {
        let text = format!("{}[page](https://www.notion.so/{})", "c".repeat(980), "d".repeat(40));
        let prepared = prepare_text(&text, Some("MarkdownV2"));
        assert_eq!(prepared, "c".repeat(980));
    }

    #[test]
    fn html_cut_drops_partial_entity_and_closes_tags() {
        let text = format!("<b>{}</b>", "&amp;x".repeat(300));
        let prepared = prepare_text(&text, Some("HTML"));
        assert!(prepared.chars().count() <= MAX_MESSAGE_CHARS);
        assert!(prepared.starts_with("<b>&amp;x"));
        assert!(prepared.ends_with("x</b>"), "{}", &prepared[prepared.len() - 12..]);
        assert_eq!(prepared.matches('&').count(), prepared.matches("&amp;").count());
    }

    #[test]
    fn html_cut_drops_partial_tag() {
        let text = format!("{}<a href='https://www.notion.so/abc'>link</a>", "e".repeat(990));
        let prepared = prepare_text(&text, Some("HTML"));
        assert_eq!(prepared, "e".repeat(990));
    }

    #[tokio::test]
    async fn timeout_then_success_makes_two_calls() {
        let api = Arc::new(MockTelegram::with_send_results(vec![
            Err(ProviderError::Timeout),
            Ok(()),
        ]));
        assert!(dispatcher(api.clone()).dispatch("hello").await);
        assert_eq!(api.send_count(), 2);
    }

    #[tokio::test]
    async fn client_error_is_not_retried() {
        let api = Arc::new(MockTelegram::with_send_results(vec![Err(ProviderError::Client {
            status: StatusCode::BAD_REQUEST,
            body: "can't parse entities".into(),
        })]));
        assert!(!dispatcher(api.clone()).dispatch("hello").await);
        assert_eq!(api.send_count(), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let api = Arc::new(MockTelegram::with_send_results(vec![
            Err(ProviderError::Server {
                status: StatusCode::BAD_GATEWAY,
                body: String::new(),
            }),
            Err(ProviderError::Timeout),
            Err(ProviderError::RateLimited {
                retry_after: None,
                body: String::new(),
            }),
            Ok(()),
        ]));
        assert!(!dispatcher(api.clone()).dispatch("hello").await);
        assert_eq!(api.send_count(), 3);
    }

    #[tokio::test]
    async fn sends_prepared_payload() {
        let api = Arc::new(MockTelegram::default());
        assert!(dispatcher(api.clone()).dispatch("").await);
        let sent = api.sent_messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, EMPTY_MESSAGE);
        assert_eq!(sent[0].chat_id, "-100");
        assert_eq!(sent[0].parse_mode.as_deref(), Some("MarkdownV2"));
        assert!(sent[0].disable_web_page_preview);
    }

    #[tokio::test]
    async fn missing_chat_id_makes_no_calls() {
        let api = Arc::new(MockTelegram::default());
        let dispatcher = NotificationDispatcher::new(
            Some(api.clone()),
            None,
            None,
            RetryPolicy::default(),
        );
        assert!(!dispatcher.is_configured());
        assert!(!dispatcher.dispatch("hello").await);
        assert_eq!(api.send_count(), 0);
    }
}
