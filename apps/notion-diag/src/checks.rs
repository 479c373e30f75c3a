use std::fmt;

use relay_core::ProviderError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenFormat {
    /// `ntn_` integration tokens.
    Current,
    /// `secret_` tokens issued before the `ntn_` prefix.
    Legacy,
    Unknown,
}

impl fmt::Display for TokenFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TokenFormat::Current => "current format (ntn_)",
            TokenFormat::Legacy => "legacy format (secret_)",
            TokenFormat::Unknown => "unknown format",
        })
    }
}

pub fn token_format(token: &str) -> TokenFormat {
    if token.starts_with("ntn_") {
        TokenFormat::Current
    } else if token.starts_with("secret_") {
        TokenFormat::Legacy
    } else {
        TokenFormat::Unknown
    }
}

pub const MIN_TOKEN_LEN: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Ok,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub level: Level,
    pub message: String,
}

impl Finding {
    fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = match self.level {
            Level::Ok => "ok  ",
            Level::Warn => "warn",
            Level::Error => "FAIL",
        };
        write!(f, "[{marker}] {}", self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdShape {
    Dashed,
    Compact,
    Invalid,
}

/// Notion ids are UUIDs, either `8-4-4-4-12` dashed or 32 bare hex digits.
pub fn id_shape(id: &str) -> IdShape {
    let groups: Vec<&str> = id.split('-').collect();
    let hex = |s: &str| s.chars().all(|c| c.is_ascii_hexdigit());
    if groups.iter().map(|g| g.len()).eq([8, 4, 4, 4, 12]) && groups.iter().all(|g| hex(g)) {
        IdShape::Dashed
    } else if id.len() == 32 && hex(id) {
        IdShape::Compact
    } else {
        IdShape::Invalid
    }
}

/// Offline checks of the token and page id, before any request is made.
pub fn validate_inputs(token: Option<&str>, page_id: Option<&str>) -> Vec<Finding> {
    let mut findings = Vec::new();
    match token.map(str::trim).filter(|t| !t.is_empty()) {
        None => findings.push(Finding::new(Level::Error, "NOTION_TOKEN is not set")),
        Some(token) => {
            match token_format(token) {
                TokenFormat::Unknown => findings.push(Finding::new(
                    Level::Warn,
                    "token has an unexpected prefix (expected ntn_ or secret_); it may be mis-copied",
                )),
                format => {
                    findings.push(Finding::new(Level::Ok, format!("token is in the {format}")))
                }
            }
            if token.len() < MIN_TOKEN_LEN {
                findings.push(Finding::new(
                    Level::Warn,
                    format!(
                        "token is only {} characters long; make sure it was copied in full",
                        token.len()
                    ),
                ));
            }
        }
    }
    match page_id.map(str::trim).filter(|p| !p.is_empty()) {
        None => findings.push(Finding::new(Level::Error, "PARENT_PAGE_ID is not set")),
        Some(id) => findings.push(match id_shape(id) {
            IdShape::Dashed => Finding::new(Level::Ok, "page id is a dashed UUID"),
            IdShape::Compact => Finding::new(
                Level::Warn,
                "page id has no dashes; the API accepts it, but check it against the page URL",
            ),
            IdShape::Invalid => Finding::new(
                Level::Warn,
                "page id is not UUID-shaped (expected 8-4-4-4-12 hex digits)",
            ),
        }),
    }
    findings
}

pub fn has_errors(findings: &[Finding]) -> bool {
    findings.iter().any(|f| f.level == Level::Error)
}

/// What to try next after a failed page lookup.
pub fn remediation_tips(err: &ProviderError) -> Vec<&'static str> {
    match err {
        ProviderError::Unauthorized { .. } => vec![
            "The token was rejected. Copy the Internal Integration Secret again from notion.so/my-integrations.",
            "Make sure the integration belongs to the workspace that holds the page.",
        ],
        ProviderError::NotFound { .. } => vec![
            "The page is not shared with the integration.",
            "Open the page in Notion -> Share -> Connect with integrations -> pick your integration.",
            "Double-check the page id against the page URL.",
        ],
        ProviderError::RateLimited { .. } => {
            vec!["Notion is rate limiting this token; wait a few seconds and retry."]
        }
        ProviderError::Timeout | ProviderError::Transport(_) => vec![
            "Could not reach api.notion.com; check network access and NOTION_API_BASE.",
        ],
        ProviderError::Client { .. } => vec![
            "Notion rejected the request; the page id may be malformed.",
        ],
        ProviderError::Server { .. } | ProviderError::Decode(_) => {
            vec!["Notion returned an unexpected response; retry later."]
        }
    }
}
