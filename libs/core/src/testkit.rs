//! In-memory doubles for the outbound seams, shared by unit tests across the workspace.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::backend::{ProfileBackend, UserProfile};
use crate::error::ProviderError;
use crate::notion::NotionApi;
use crate::telegram::{OutgoingMessage, TelegramApi, Update};
use crate::ticker::{PriceSource, TickerQuote};

/// Records every Telegram call; scripted `sendMessage` results are consumed in order,
/// then every call succeeds.
#[derive(Default)]
pub struct MockTelegram {
    send_results: Mutex<VecDeque<Result<(), ProviderError>>>,
    sent: Mutex<Vec<OutgoingMessage>>,
    photos: Mutex<Vec<(String, String)>>,
    updates: Mutex<VecDeque<Vec<Update>>>,
    offsets: Mutex<Vec<Option<i64>>>,
}

impl MockTelegram {
    pub fn with_send_results(results: Vec<Result<(), ProviderError>>) -> Self {
        Self {
            send_results: Mutex::new(results.into()),
            ..Default::default()
        }
    }

    pub fn with_updates(batches: Vec<Vec<Update>>) -> Self {
        Self {
            updates: Mutex::new(batches.into()),
            ..Default::default()
        }
    }

    pub fn send_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn sent_messages(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.text.clone())
            .collect()
    }

    pub fn photos(&self) -> Vec<(String, String)> {
        self.photos.lock().unwrap().clone()
    }

    pub fn polled_offsets(&self) -> Vec<Option<i64>> {
        self.offsets.lock().unwrap().clone()
    }
}

#[async_trait]
impl TelegramApi for MockTelegram {
    async fn send_message(&self, message: &OutgoingMessage) -> Result<(), ProviderError> {
        self.sent.lock().unwrap().push(message.clone());
        self.send_results.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }

    async fn send_photo(&self, chat_id: &str, photo: &str) -> Result<(), ProviderError> {
        self.photos
            .lock()
            .unwrap()
            .push((chat_id.to_string(), photo.to_string()));
        Ok(())
    }

    async fn get_updates(
        &self,
        offset: Option<i64>,
        _timeout: Duration,
    ) -> Result<Vec<Update>, ProviderError> {
        self.offsets.lock().unwrap().push(offset);
        Ok(self.updates.lock().unwrap().pop_front().unwrap_or_default())
    }
}

/// Serves canned pages and blocks; unknown ids answer 404.
#[derive(Default)]
pub struct MockNotion {
    pages: HashMap<String, Value>,
    blocks: HashMap<String, Value>,
    page_failures: Mutex<VecDeque<ProviderError>>,
    page_calls: AtomicUsize,
    block_calls: AtomicUsize,
    title_updates: Mutex<Vec<(String, String, String)>>,
}

impl MockNotion {
    pub fn with_page(mut self, id: &str, page: Value) -> Self {
        self.pages.insert(id.to_string(), page);
        self
    }

    pub fn with_block(mut self, id: &str, block: Value) -> Self {
        self.blocks.insert(id.to_string(), block);
        self
    }

    /// Errors returned by the next `retrieve_page` calls, before the canned pages.
    pub fn fail_pages_with(self, failures: Vec<ProviderError>) -> Self {
        *self.page_failures.lock().unwrap() = failures.into();
        self
    }

    pub fn page_calls(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }

    pub fn block_calls(&self) -> usize {
        self.block_calls.load(Ordering::SeqCst)
    }

    pub fn title_updates(&self) -> Vec<(String, String, String)> {
        self.title_updates.lock().unwrap().clone()
    }

    fn not_found(id: &str) -> ProviderError {
        ProviderError::NotFound {
            body: format!("{{\"object\":\"error\",\"code\":\"object_not_found\",\"id\":\"{id}\"}}"),
        }
    }
}

#[async_trait]
impl NotionApi for MockNotion {
    async fn retrieve_page(&self, page_id: &str) -> Result<Value, ProviderError> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.page_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.pages
            .get(page_id)
            .cloned()
            .ok_or_else(|| Self::not_found(page_id))
    }

    async fn retrieve_block(&self, block_id: &str) -> Result<Value, ProviderError> {
        self.block_calls.fetch_add(1, Ordering::SeqCst);
        self.blocks
            .get(block_id)
            .cloned()
            .ok_or_else(|| Self::not_found(block_id))
    }

    async fn update_page_title(
        &self,
        page_id: &str,
        property: &str,
        title: &str,
    ) -> Result<Value, ProviderError> {
        self.title_updates.lock().unwrap().push((
            page_id.to_string(),
            property.to_string(),
            title.to_string(),
        ));
        self.retrieve_page(page_id).await
    }
}

/// Fixed quotes by symbol; symbols listed in `failing` answer with a timeout.
#[derive(Default)]
pub struct MockPrices {
    quotes: HashMap<String, String>,
    failing: Vec<String>,
    calls: Mutex<Vec<String>>,
}

impl MockPrices {
    pub fn with_quote(mut self, symbol: &str, price: &str) -> Self {
        self.quotes.insert(symbol.to_string(), price.to_string());
        self
    }

    pub fn failing(mut self, symbol: &str) -> Self {
        self.failing.push(symbol.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceSource for MockPrices {
    async fn spot_ticker(&self, symbol: &str) -> Result<Option<TickerQuote>, ProviderError> {
        self.calls.lock().unwrap().push(symbol.to_string());
        if self.failing.iter().any(|s| s == symbol) {
            return Err(ProviderError::Timeout);
        }
        Ok(self.quotes.get(symbol).map(|price| TickerQuote {
            symbol: symbol.to_string(),
            last_price: price.clone(),
        }))
    }
}

/// Profile store keyed by chat id; `register` pops scripted results, defaulting to success.
#[derive(Default)]
pub struct MockBackend {
    profiles: HashMap<i64, UserProfile>,
    register_results: Mutex<VecDeque<Result<(), ProviderError>>>,
    registrations: Mutex<Vec<(i64, String)>>,
    profile_calls: AtomicUsize,
}

impl MockBackend {
    pub fn with_profile(mut self, profile: UserProfile) -> Self {
        self.profiles.insert(profile.chat_id, profile);
        self
    }

    pub fn with_register_results(self, results: Vec<Result<(), ProviderError>>) -> Self {
        *self.register_results.lock().unwrap() = results.into();
        self
    }

    pub fn registrations(&self) -> Vec<(i64, String)> {
        self.registrations.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.registrations.lock().unwrap().len() + self.profile_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileBackend for MockBackend {
    async fn register(&self, chat_id: i64, email: &str) -> Result<(), ProviderError> {
        self.registrations
            .lock()
            .unwrap()
            .push((chat_id, email.to_string()));
        self.register_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }

    async fn profile(&self, chat_id: i64) -> Result<UserProfile, ProviderError> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        self.profiles
            .get(&chat_id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound {
                body: "{\"detail\":\"User not found\"}".into(),
            })
    }
}
