use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProviderError;
use crate::http::classify_response;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub chat_id: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Serialize)]
struct Registration<'a> {
    chat_id: i64,
    email: &'a str,
}

/// User-profile service reached by the bot's `/register` and `/myinfo`.
#[async_trait]
pub trait ProfileBackend: Send + Sync {
    async fn register(&self, chat_id: i64, email: &str) -> Result<(), ProviderError>;
    async fn profile(&self, chat_id: i64) -> Result<UserProfile, ProviderError>;
}

#[derive(Clone)]
pub struct HttpProfileBackend {
    client: Client,
    base_url: String,
}

impl HttpProfileBackend {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl ProfileBackend for HttpProfileBackend {
    async fn register(&self, chat_id: i64, email: &str) -> Result<(), ProviderError> {
        let res = self
            .client
            .post(self.url("users"))
            .json(&Registration { chat_id, email })
            .send()
            .await?;
        classify_response(res).await?;
        Ok(())
    }

    async fn profile(&self, chat_id: i64) -> Result<UserProfile, ProviderError> {
        let res = self
            .client
            .get(self.url(&format!("users/{chat_id}")))
            .send()
            .await?;
        Ok(classify_response(res).await?.json().await?)
    }
}

/// Human-readable error text from a backend failure body.
/// Looks for `detail`, `error` or `message` in a JSON body, else uses the raw text.
pub fn backend_error_text(err: &ProviderError) -> String {
    let Some(body) = err.body().map(str::trim).filter(|b| !b.is_empty()) else {
        return err.to_string();
    };
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| {
            ["detail", "error", "message"]
                .iter()
                .find_map(|key| json.get(*key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| body.to_string())
}
