use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::config::DEFAULT_NOTION_API_BASE;
use crate::error::ProviderError;
use crate::http::classify_response;

pub const NOTION_VERSION: &str = "2022-06-28";

#[async_trait]
pub trait NotionApi: Send + Sync {
    async fn retrieve_page(&self, page_id: &str) -> Result<Value, ProviderError>;
    async fn retrieve_block(&self, block_id: &str) -> Result<Value, ProviderError>;
    async fn update_page_title(
        &self,
        page_id: &str,
        property: &str,
        title: &str,
    ) -> Result<Value, ProviderError>;
}

#[derive(Clone)]
pub struct HttpNotionClient {
    client: Client,
    api_base: String,
    token: String,
}

impl HttpNotionClient {
    pub fn new(client: Client, api_base: Option<String>, token: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.unwrap_or_else(|| DEFAULT_NOTION_API_BASE.into()),
            token: token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.api_base.trim_end_matches('/'), path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.url(path))
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
    }

    async fn send(builder: reqwest::RequestBuilder) -> Result<Value, ProviderError> {
        let res = classify_response(builder.send().await?).await?;
        Ok(res.json().await?)
    }
}

#[async_trait]
impl NotionApi for HttpNotionClient {
    async fn retrieve_page(&self, page_id: &str) -> Result<Value, ProviderError> {
        Self::send(self.request(reqwest::Method::GET, &format!("pages/{page_id}"))).await
    }

    async fn retrieve_block(&self, block_id: &str) -> Result<Value, ProviderError> {
        Self::send(self.request(reqwest::Method::GET, &format!("blocks/{block_id}"))).await
    }

    async fn update_page_title(
        &self,
        page_id: &str,
        property: &str,
        title: &str,
    ) -> Result<Value, ProviderError> {
        let mut properties = serde_json::Map::new();
        properties.insert(
            property.to_string(),
            json!({ "title": [{ "text": { "content": title } }] }),
        );
        let body = json!({ "properties": properties });
        Self::send(
            self.request(reqwest::Method::PATCH, &format!("pages/{page_id}"))
                .json(&body),
        )
        .await
    }
}

/// Name of the page's `title`-typed property, if any.
pub fn title_property_name(page: &Value) -> Option<String> {
    page.get("properties")?
        .as_object()?
        .iter()
        .find(|(_, prop)| prop.get("type").and_then(Value::as_str) == Some("title"))
        .map(|(name, _)| name.clone())
}
