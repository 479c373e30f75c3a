use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_TELEGRAM_API_BASE;
use crate::error::ProviderError;
use crate::http::classify_response;

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub photo: Option<Vec<PhotoSize>>,
}

impl Message {
    /// The highest-resolution variant of an attached photo.
    pub fn largest_photo(&self) -> Option<&PhotoSize> {
        self.photo
            .as_deref()?
            .iter()
            .max_by_key(|size| (u64::from(size.width) * u64::from(size.height), size.file_size))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub file_size: Option<u64>,
}

/// Body of a `sendMessage` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingMessage {
    pub chat_id: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<String>,
    pub disable_web_page_preview: bool,
}

impl OutgoingMessage {
    pub fn plain(chat_id: impl ToString, text: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.to_string(),
            text: text.into(),
            parse_mode: None,
            disable_web_page_preview: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[async_trait]
pub trait TelegramApi: Send + Sync {
    async fn send_message(&self, message: &OutgoingMessage) -> Result<(), ProviderError>;
    async fn send_photo(&self, chat_id: &str, photo: &str) -> Result<(), ProviderError>;
    async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout: Duration,
    ) -> Result<Vec<Update>, ProviderError>;
}

#[derive(Clone)]
pub struct HttpTelegramApi {
    client: Client,
    api_base: String,
    bot_token: String,
}

impl HttpTelegramApi {
    pub fn new(client: Client, api_base: Option<String>, bot_token: impl Into<String>) -> Self {
        let api_base = api_base.unwrap_or_else(|| DEFAULT_TELEGRAM_API_BASE.into());
        Self {
            client,
            api_base,
            bot_token: bot_token.into(),
        }
    }

    fn url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.api_base.trim_end_matches('/'),
            self.bot_token,
            method
        )
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        method: &str,
        res: reqwest::Response,
    ) -> Result<Option<T>, ProviderError> {
        let res = classify_response(res).await?;
        let body: TelegramResponse<T> = res.json().await?;
        if body.ok {
            Ok(body.result)
        } else {
            Err(ProviderError::Decode(format!(
                "telegram {method} failed: {}",
                body.description.unwrap_or_else(|| "unknown error".into())
            )))
        }
    }
}

#[async_trait]
impl TelegramApi for HttpTelegramApi {
    async fn send_message(&self, message: &OutgoingMessage) -> Result<(), ProviderError> {
        let res = self
            .client
            .post(self.url("sendMessage"))
            .json(message)
            .send()
            .await?;
        Self::decode::<serde_json::Value>("sendMessage", res).await?;
        Ok(())
    }

    async fn send_photo(&self, chat_id: &str, photo: &str) -> Result<(), ProviderError> {
        let payload = serde_json::json!({ "chat_id": chat_id, "photo": photo });
        let res = self
            .client
            .post(self.url("sendPhoto"))
            .json(&payload)
            .send()
            .await?;
        Self::decode::<serde_json::Value>("sendPhoto", res).await?;
        Ok(())
    }

    async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout: Duration,
    ) -> Result<Vec<Update>, ProviderError> {
        let mut query = vec![("timeout", timeout.as_secs().to_string())];
        if let Some(offset) = offset {
            query.push(("offset", offset.to_string()));
        }
        let res = self
            .client
            .get(self.url("getUpdates"))
            .query(&query)
            // long poll: the server holds the request for up to `timeout`
            .timeout(timeout + Duration::from_secs(10))
            .send()
            .await?;
        Ok(Self::decode::<Vec<Update>>("getUpdates", res)
            .await?
            .unwrap_or_default())
    }
}
