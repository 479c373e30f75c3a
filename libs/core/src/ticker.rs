use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::config::DEFAULT_TICKER_API_BASE;
use crate::error::ProviderError;
use crate::http::classify_response;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerQuote {
    pub symbol: String,
    /// Provider string, passed through verbatim.
    pub last_price: String,
}

#[async_trait]
pub trait PriceSource: Send + Sync {
    /// `Ok(None)` when the exchange answers but has no quote for the symbol.
    async fn spot_ticker(&self, symbol: &str) -> Result<Option<TickerQuote>, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct TickerEnvelope {
    #[serde(rename = "retCode")]
    ret_code: i64,
    #[serde(rename = "retMsg", default)]
    ret_msg: String,
    #[serde(default)]
    result: Option<TickerResult>,
}

#[derive(Debug, Default, Deserialize)]
struct TickerResult {
    #[serde(default)]
    list: Vec<TickerEntry>,
}

#[derive(Debug, Deserialize)]
struct TickerEntry {
    #[serde(default)]
    symbol: String,
    #[serde(rename = "lastPrice")]
    last_price: Option<String>,
}

/// Bybit v5 market API client (spot category).
#[derive(Clone)]
pub struct BybitTicker {
    client: Client,
    api_base: String,
}

impl BybitTicker {
    pub fn new(client: Client, api_base: Option<String>) -> Self {
        Self {
            client,
            api_base: api_base.unwrap_or_else(|| DEFAULT_TICKER_API_BASE.into()),
        }
    }

    fn url(&self) -> String {
        format!("{}/v5/market/tickers", self.api_base.trim_end_matches('/'))
    }
}

#[async_trait]
impl PriceSource for BybitTicker {
    async fn spot_ticker(&self, symbol: &str) -> Result<Option<TickerQuote>, ProviderError> {
        let res = self
            .client
            .get(self.url())
            .query(&[("category", "spot"), ("symbol", symbol)])
            .send()
            .await?;
        let envelope: TickerEnvelope = classify_response(res).await?.json().await?;
        if envelope.ret_code != 0 {
            tracing::debug!(
                symbol,
                ret_code = envelope.ret_code,
                ret_msg = %envelope.ret_msg,
                "ticker lookup rejected"
            );
            return Ok(None);
        }
        Ok(envelope
            .result
            .unwrap_or_default()
            .list
            .into_iter()
            .next()
            .and_then(|entry| {
                entry.last_price.map(|last_price| TickerQuote {
                    symbol: if entry.symbol.is_empty() {
                        symbol.to_string()
                    } else {
                        entry.symbol
                    },
                    last_price,
                })
            }))
    }
}
