use std::sync::Arc;

use serde_json::Value;

use super::client::NotionApi;
use super::property::PageProperties;
use crate::error::ProviderError;
use crate::retry::RetryPolicy;

pub const TOKEN_NOT_CONFIGURED: &str = "notion token not configured";

/// Blocks nested deeper than this under their page are not resolved.
const MAX_PARENT_DEPTH: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Available(PageProperties),
    Unavailable(String),
}

impl Extraction {
    pub fn properties(&self) -> Option<&PageProperties> {
        match self {
            Extraction::Available(props) => Some(props),
            Extraction::Unavailable(_) => None,
        }
    }
}

/// Only timeouts and rate limits are worth repeating against Notion.
fn notion_retryable(err: &ProviderError) -> bool {
    matches!(err, ProviderError::Timeout | ProviderError::RateLimited { .. })
}

#[derive(Clone)]
pub struct PropertyExtractor {
    api: Option<Arc<dyn NotionApi>>,
    policy: RetryPolicy,
}

impl PropertyExtractor {
    pub fn new(api: Option<Arc<dyn NotionApi>>, policy: RetryPolicy) -> Self {
        Self { api, policy }
    }

    pub async fn fetch_page_properties(&self, page_id: &str) -> Extraction {
        let Some(api) = self.api.as_ref() else {
            tracing::warn!(page_id, "{TOKEN_NOT_CONFIGURED}; skipping property extraction");
            return Extraction::Unavailable(TOKEN_NOT_CONFIGURED.into());
        };
        match self.retrieve_page(api, page_id).await {
            Ok(page) => {
                let props = PageProperties::from_page(&page);
                tracing::debug!(page_id, count = props.len(), "page properties extracted");
                Extraction::Available(props)
            }
            Err(err) => Extraction::Unavailable(log_failure("page", page_id, &err)),
        }
    }

    /// Walks a block up to its owning page and extracts that page.
    pub async fn fetch_block_page_properties(&self, block_id: &str) -> Extraction {
        let Some(api) = self.api.as_ref() else {
            tracing::warn!(block_id, "{TOKEN_NOT_CONFIGURED}; skipping property extraction");
            return Extraction::Unavailable(TOKEN_NOT_CONFIGURED.into());
        };
        let mut current = block_id.to_string();
        for _ in 0..MAX_PARENT_DEPTH {
            let block = match self.retrieve_block(api, &current).await {
                Ok(block) => block,
                Err(err) => return Extraction::Unavailable(log_failure("block", &current, &err)),
            };
            match parent_of(&block) {
                Some(Parent::Page(page_id)) => return self.fetch_page_properties(&page_id).await,
                Some(Parent::Block(parent)) => current = parent,
                Some(Parent::Other(kind)) => {
                    tracing::info!(block_id, parent = %kind, "block is not owned by a page");
                    return Extraction::Unavailable(format!("block parent is {kind}"));
                }
                None => {
                    tracing::warn!(block_id, "block has no parent reference");
                    return Extraction::Unavailable("block parent unknown".into());
                }
            }
        }
        Extraction::Unavailable("block nesting too deep".into())
    }

    async fn retrieve_page(
        &self,
        api: &Arc<dyn NotionApi>,
        page_id: &str,
    ) -> Result<Value, ProviderError> {
        self.policy
            .run_when("notion.pages.retrieve", notion_retryable, |_| {
                let api = api.clone();
                async move { api.retrieve_page(page_id).await }
            })
            .await
    }

    async fn retrieve_block(
        &self,
        api: &Arc<dyn NotionApi>,
        block_id: &str,
    ) -> Result<Value, ProviderError> {
        self.policy
            .run_when("notion.blocks.retrieve", notion_retryable, |_| {
                let api = api.clone();
                async move { api.retrieve_block(block_id).await }
            })
            .await
    }
}

#[derive(Debug, PartialEq)]
enum Parent {
    Page(String),
    Block(String),
    Other(String),
}

fn parent_of(block: &Value) -> Option<Parent> {
    let parent = block.get("parent")?;
    let kind = parent.get("type").and_then(Value::as_str)?;
    let id = parent.get(kind).and_then(Value::as_str).map(str::to_string);
    match (kind, id) {
        ("page_id", Some(id)) => Some(Parent::Page(id)),
        ("block_id", Some(id)) => Some(Parent::Block(id)),
        (other, _) => Some(Parent::Other(other.to_string())),
    }
}

fn log_failure(object: &'static str, id: &str, err: &ProviderError) -> String {
    match err {
        ProviderError::Unauthorized { .. } => {
            tracing::error!(object, id, "notion rejected the token (401); check NOTION_TOKEN");
            "notion token rejected".into()
        }
        ProviderError::NotFound { .. } => {
            tracing::error!(
                object,
                id,
                "notion object not found (404); it may not be shared with the integration"
            );
            "notion object not found or not shared".into()
        }
        ProviderError::RateLimited { retry_after, .. } => {
            tracing::warn!(
                object,
                id,
                retry_after_secs = retry_after.map(|d| d.as_secs()),
                "notion rate limit hit (429)"
            );
            "notion rate limited".into()
        }
        other => {
            tracing::error!(object, id, error = %other, "notion request failed");
            format!("notion request failed: {}", other.kind())
        }
    }
}
