//! Telegram message bodies for Notion events.

use relay_core::{Extraction, PageProperties, PropertyValue};
use time::Date;
use time::macros::format_description;

const MARKDOWN_V2_RESERVED: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!', '\\',
];

pub fn escape_markdown_v2(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if MARKDOWN_V2_RESERVED.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Text markup matching the Telegram `parse_mode` the message is sent with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Markup {
    MarkdownV2,
    Html,
    Plain,
}

impl Markup {
    pub fn from_parse_mode(parse_mode: Option<&str>) -> Self {
        match parse_mode {
            Some(mode) if mode.eq_ignore_ascii_case("MarkdownV2") => Markup::MarkdownV2,
            Some(mode) if mode.eq_ignore_ascii_case("HTML") => Markup::Html,
            _ => Markup::Plain,
        }
    }

    pub fn escape(self, text: &str) -> String {
        match self {
            Markup::MarkdownV2 => escape_markdown_v2(text),
            Markup::Html => escape_html(text),
            Markup::Plain => text.to_string(),
        }
    }

    pub fn bold(self, text: &str) -> String {
        let escaped = self.escape(text);
        match self {
            Markup::MarkdownV2 => format!("*{escaped}*"),
            Markup::Html => format!("<b>{escaped}</b>"),
            Markup::Plain => escaped,
        }
    }

    pub fn italic(self, text: &str) -> String {
        let escaped = self.escape(text);
        match self {
            Markup::MarkdownV2 => format!("_{escaped}_"),
            Markup::Html => format!("<i>{escaped}</i>"),
            Markup::Plain => escaped,
        }
    }
}

/// Summary of a page event, followed by the extracted properties when available.
pub fn page_summary(
    markup: Markup,
    event_type: &str,
    page_id: Option<&str>,
    extraction: Option<&Extraction>,
) -> String {
    let mut lines = vec![
        markup.bold("Notion page update"),
        format!("Event: {}", markup.escape(event_type)),
        format!("Page: {}", markup.escape(page_id.unwrap_or("unknown"))),
    ];
    match extraction {
        Some(Extraction::Available(props)) if !props.is_empty() => {
            lines.push(String::new());
            for (name, value) in props.iter() {
                lines.push(format!(
                    "• {}: {}",
                    markup.bold(name),
                    markup.escape(&display_value(value))
                ));
            }
        }
        Some(Extraction::Available(_)) => {
            lines.push(markup.italic("No properties to show"));
        }
        Some(Extraction::Unavailable(reason)) => {
            lines.push(markup.italic(&format!("Properties unavailable: {reason}")));
        }
        None => {}
    }
    lines.join("\n")
}

pub fn database_summary(markup: Markup, event_type: &str, database_id: Option<&str>) -> String {
    [
        markup.bold("Notion database update"),
        format!("Event: {}", markup.escape(event_type)),
        format!("Database: {}", markup.escape(database_id.unwrap_or("unknown"))),
    ]
    .join("\n")
}

fn display_value(value: &PropertyValue) -> String {
    if value.is_empty() {
        "—".to_string()
    } else {
        value.to_string()
    }
}

pub const TRADE_NO_DATA: &str = "⚠️ Обновление получено, но данные страницы не были извлечены.";

const TICKER_FIELD: &str = "Тикер";
const DEAL_TYPE_FIELD: &str = "Тип сделки";
const STATUS_FIELD: &str = "Статус";
const DEAL_DATE_FIELD: &str = "Дата сделки";

fn status_emoji(status: &str) -> &'static str {
    match status {
        "Активна" => "🟢",
        "Закрыта" => "🔴",
        "Отменена" => "⚪",
        _ => "⚙️",
    }
}

fn deal_emoji(deal_type: &str) -> &'static str {
    match deal_type {
        "Long" => "📈",
        "Short" => "📉",
        _ => "💼",
    }
}

fn field_emoji(field: &str) -> &'static str {
    match field {
        "Дата сделки" => "🗓",
        "Цена входа" => "💰",
        "Цена выхода" => "🏁",
        "Объем" => "📦",
        "Комиссии" => "💸",
        "Комментарий" => "📝",
        _ => "•",
    }
}

/// ISO date or datetime (`2025-06-20`, `2025-06-20T10:00:00.000Z`) as `dd.mm.yyyy`.
pub fn format_deal_date(raw: &str) -> Option<String> {
    let date = Date::parse(raw.get(..10)?, format_description!("[year]-[month]-[day]")).ok()?;
    date.format(format_description!("[day].[month].[year]")).ok()
}

/// HTML trade card for one page of the trades database.
pub fn trade_card(props: Option<&PageProperties>) -> String {
    let Some(props) = props.filter(|p| !p.is_empty()) else {
        return TRADE_NO_DATA.to_string();
    };

    let text_of = |field: &str| {
        props
            .get(field)
            .filter(|v| !v.is_empty())
            .map(PropertyValue::to_string)
    };
    let ticker = text_of(TICKER_FIELD).unwrap_or_else(|| "Без тикера".into());
    let deal_type = text_of(DEAL_TYPE_FIELD).unwrap_or_else(|| "Сделка".into());
    let status = text_of(STATUS_FIELD).unwrap_or_default();

    let mut header = format!(
        "{} <b>{}</b> — {} <i>{}</i> <code>{}</code>",
        status_emoji(&status),
        escape_html(&ticker),
        deal_emoji(&deal_type),
        escape_html(&deal_type),
        escape_html(&status),
    );
    if !props.page_id.is_empty() {
        let url = format!("https://www.notion.so/{}", props.page_id.replace('-', ""));
        header.push_str(&format!("\n🔗 <a href='{url}'>Открыть в Notion</a>"));
    }

    let mut lines = vec![header, String::new()];
    for (field, value) in props.iter() {
        if matches!(field, TICKER_FIELD | DEAL_TYPE_FIELD | STATUS_FIELD) {
            continue;
        }
        let rendered = if value.is_empty() {
            "—".to_string()
        } else if field == DEAL_DATE_FIELD {
            value
                .as_text()
                .and_then(format_deal_date)
                .unwrap_or_else(|| value.to_string())
        } else {
            value.to_string()
        };
        lines.push(format!(
            "{} <b>{}:</b> {}",
            field_emoji(field),
            escape_html(field),
            escape_html(&rendered)
        ));
    }
    lines.join("\n")
}
