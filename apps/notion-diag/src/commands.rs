use anyhow::{Result, anyhow};
use relay_core::ProviderError;
use relay_core::notion::{NotionApi, PageProperties, title_property_name};
use serde::Serialize;
use serde_json::Value;

use crate::checks::{Finding, has_errors, remediation_tips, validate_inputs};

#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub findings: Vec<Finding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tips: Vec<&'static str>,
}

impl CheckReport {
    pub fn passed(&self) -> bool {
        self.error.is_none() && !has_errors(&self.findings)
    }
}

/// Offline input checks, then one page lookup when the inputs allow it.
pub async fn check(
    api: Option<&dyn NotionApi>,
    token: Option<&str>,
    page_id: Option<&str>,
) -> CheckReport {
    let findings = validate_inputs(token, page_id);
    let mut report = CheckReport {
        findings,
        page_url: None,
        error: None,
        tips: Vec::new(),
    };
    let (Some(api), Some(page_id)) = (api, page_id) else {
        return report;
    };
    if has_errors(&report.findings) {
        return report;
    }

    match api.retrieve_page(page_id.trim()).await {
        Ok(page) => {
            report.page_url = page
                .get("url")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| Some(format!("https://www.notion.so/{}", page_id.replace('-', ""))));
        }
        Err(err) => {
            tracing::debug!(kind = err.kind(), "page lookup failed");
            report.tips = remediation_tips(&err);
            report.error = Some(describe(&err));
        }
    }
    report
}

fn describe(err: &ProviderError) -> String {
    match err.status() {
        Some(status) => format!("{} ({status})", err.kind()),
        None => err.to_string(),
    }
}

pub async fn props(api: &dyn NotionApi, page_id: &str) -> Result<PageProperties, ProviderError> {
    let page = api.retrieve_page(page_id).await?;
    Ok(PageProperties::from_page(&page))
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct BlockInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub parent_type: Option<String>,
    pub parent_id: Option<String>,
}

pub async fn block(api: &dyn NotionApi, block_id: &str) -> Result<BlockInfo, ProviderError> {
    let block = api.retrieve_block(block_id).await?;
    let text = |v: Option<&Value>| v.and_then(Value::as_str).map(str::to_string);
    let parent = block.get("parent");
    let parent_type = text(parent.and_then(|p| p.get("type")));
    let parent_id = parent_type
        .as_deref()
        .and_then(|kind| text(parent.and_then(|p| p.get(kind))));
    Ok(BlockInfo {
        id: text(block.get("id")).unwrap_or_else(|| block_id.to_string()),
        kind: text(block.get("type")).unwrap_or_else(|| "unknown".into()),
        parent_type,
        parent_id,
    })
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct TitleUpdate {
    pub page_id: String,
    pub property: String,
    pub title: String,
}

/// Looks up the page's title property, then patches it.
pub async fn set_title(api: &dyn NotionApi, page_id: &str, title: &str) -> Result<TitleUpdate> {
    let page = api.retrieve_page(page_id).await?;
    let property = title_property_name(&page)
        .ok_or_else(|| anyhow!("page {page_id} has no title property"))?;
    api.update_page_title(page_id, &property, title).await?;
    Ok(TitleUpdate {
        page_id: page_id.to_string(),
        property,
        title: title.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::Level;
    use relay_core::testkit::MockNotion;
    use serde_json::json;

    const PAGE: &str = "21185b6b-d4cc-80b0-b129-f2ebc68965ce";

    fn token() -> String {
        format!("ntn_{}", "a".repeat(46))
    }

    fn page() -> Value {
        json!({
            "object": "page",
            "id": PAGE,
            "url": "https://www.notion.so/Trades-21185b6bd4cc80b0b129f2ebc68965ce",
            "properties": {
                "Тикер": {"type": "title", "title": [{"plain_text": "BTCUSDT"}]},
                "Статус": {"type": "select", "select": {"name": "Активна"}}
            }
        })
    }

    #[tokio::test]
    async fn check_reports_page_url() {
        let notion = MockNotion::default().with_page(PAGE, page());
        let report = check(Some(&notion as &dyn NotionApi), Some(&token()), Some(PAGE)).await;
        assert!(report.passed());
        assert_eq!(
            report.page_url.as_deref(),
            Some("https://www.notion.so/Trades-21185b6bd4cc80b0b129f2ebc68965ce")
        );
        assert!(report.tips.is_empty());
    }

    #[tokio::test]
    async fn check_explains_unshared_page() {
        let notion = MockNotion::default();
        let report = check(Some(&notion as &dyn NotionApi), Some(&token()), Some(PAGE)).await;
        assert!(!report.passed());
        assert_eq!(report.error.as_deref(), Some("not_found (404 Not Found)"));
        assert!(report.tips.iter().any(|t| t.contains("not shared")));
    }

    #[tokio::test]
    async fn check_skips_lookup_when_inputs_are_missing() {
        let notion = MockNotion::default().with_page(PAGE, page());
        let report = check(Some(&notion as &dyn NotionApi), None, Some(PAGE)).await;
        assert!(!report.passed());
        assert_eq!(report.findings[0].level, Level::Error);
        assert_eq!(notion.page_calls(), 0);
    }

    #[tokio::test]
    async fn props_lists_extracted_values() {
        let notion = MockNotion::default().with_page(PAGE, page());
        let props = props(&notion, PAGE).await.unwrap();
        assert_eq!(props.len(), 2);
        assert_eq!(props.get("Тикер").and_then(|v| v.as_text()), Some("BTCUSDT"));
        assert_eq!(
            serde_json::to_value(&props).unwrap(),
            json!({"Тикер": "BTCUSDT", "Статус": "Активна"})
        );
    }

    #[tokio::test]
    async fn block_reports_type_and_parent() {
        let notion = MockNotion::default().with_block(
            "blk",
            json!({
                "id": "blk",
                "type": "paragraph",
                "parent": {"type": "page_id", "page_id": PAGE}
            }),
        );
        let info = block(&notion, "blk").await.unwrap();
        assert_eq!(
            info,
            BlockInfo {
                id: "blk".into(),
                kind: "paragraph".into(),
                parent_type: Some("page_id".into()),
                parent_id: Some(PAGE.into()),
            }
        );
        assert!(matches!(
            block(&notion, "missing").await,
            Err(ProviderError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn set_title_patches_title_property() {
        let notion = MockNotion::default().with_page(PAGE, page());
        let update = set_title(&notion, PAGE, "ETHUSDT").await.unwrap();
        assert_eq!(update.property, "Тикер");
        assert_eq!(
            notion.title_updates(),
            vec![(PAGE.to_string(), "Тикер".to_string(), "ETHUSDT".to_string())]
        );
    }

    #[tokio::test]
    async fn set_title_requires_title_property() {
        let notion =
            MockNotion::default().with_page("bare", json!({"id": "bare", "properties": {}}));
        let err = set_title(&notion, "bare", "x").await.unwrap_err();
        assert!(err.to_string().contains("no title property"));
        assert!(notion.title_updates().is_empty());
    }
}
