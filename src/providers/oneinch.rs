//! 1inch API 어댑터
//!
//! 가격은 /quote, 실행 데이터는 /swap 두 번 호출한다. /swap이 실패해도
//! 견적 자체는 유효하므로 페이로드 없이 반환한다.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{
    apply_slippage, liquidity_score_from_impact, slippage_or_default, ProviderError,
    ProviderKind, QuoteProvider,
};
use crate::types::{ChainId, Quote, TradeRequest};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const SUPPORTED_CHAINS: [ChainId; 3] = [1, 56, 137];

pub struct OneInchProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct OneInchQuoteResponse {
    #[serde(rename = "toTokenAmount")]
    to_token_amount: String,
    #[serde(rename = "estimatedGas", default)]
    estimated_gas: u64,
}

#[derive(Debug, Deserialize)]
struct OneInchSwapResponse {
    tx: OneInchTransaction,
}

#[derive(Debug, Deserialize)]
struct OneInchTransaction {
    to: String,
    data: String,
    value: String,
    gas: u64,
}

impl OneInchProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: "https://api.1inch.io/v5.0".to_string(),
        }
    }

    fn build_headers(&self) -> reqwest::header::HeaderMap {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(ref api_key) = self.api_key {
            if let Ok(value) = format!("Bearer {api_key}").parse() {
                headers.insert("Authorization", value);
            }
        }
        headers
    }

    fn base_query(&self, request: &TradeRequest) -> HashMap<&'static str, String> {
        let mut query = HashMap::new();
        query.insert("fromTokenAddress", format!("{:#x}", request.source_token));
        query.insert("toTokenAddress", format!("{:#x}", request.dest_token));
        query.insert("amount", request.source_amount.clone());
        query
    }

    async fn fetch<T: serde::de::DeserializeOwned>(
        &self,
        url: String,
        query: &HashMap<&'static str, String>,
    ) -> Result<T, ProviderError> {
        let response = self
            .client
            .get(url)
            .headers(self.build_headers())
            .query(query)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api { status, body });
        }
        response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))
    }
}

#[async_trait]
impl QuoteProvider for OneInchProvider {
    fn id(&self) -> &str {
        "oneinch"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Aggregator
    }

    fn supports(&self, request: &TradeRequest) -> bool {
        !request.is_cross_chain() && SUPPORTED_CHAINS.contains(&request.source_chain_id)
    }

    async fn quote(&self, request: &TradeRequest) -> Result<Quote, ProviderError> {
        let chain_id = request.source_chain_id;
        let slippage_percent = slippage_or_default(request);

        debug!(
            "🔄 Requesting 1inch quote: {} -> {} ({})",
            request.source_token, request.dest_token, request.source_amount
        );

        let quote_response: OneInchQuoteResponse = self
            .fetch(
                format!("{}/{}/quote", self.base_url, chain_id),
                &self.base_query(request),
            )
            .await?;

        debug!("✅ 1inch quote received: {}", quote_response.to_token_amount);

        let mut quote = Quote::new(
            self.id(),
            quote_response.to_token_amount.clone(),
            apply_slippage(&quote_response.to_token_amount, slippage_percent),
        );
        quote.estimated_gas_units = quote_response.estimated_gas;
        quote.liquidity_score = liquidity_score_from_impact(0.0);

        // 실행 데이터는 부차적이다. swap 호출 실패는 견적을 죽이지 않는다
        let mut swap_query = self.base_query(request);
        swap_query.insert("fromAddress", format!("{:#x}", request.requester));
        swap_query.insert("slippage", slippage_percent.to_string());
        if let Some(recipient) = request.recipient {
            swap_query.insert("destReceiver", format!("{:#x}", recipient));
        }

        match self
            .fetch::<OneInchSwapResponse>(
                format!("{}/{}/swap", self.base_url, chain_id),
                &swap_query,
            )
            .await
        {
            Ok(swap) => {
                quote.estimated_gas_units = swap.tx.gas.max(quote.estimated_gas_units);
                quote.execution_payload = serde_json::json!({
                    "to": swap.tx.to,
                    "data": swap.tx.data,
                    "value": swap.tx.value,
                });
            }
            Err(err) => {
                warn!("1inch swap data unavailable, returning quote only: {err}");
            }
        }

        Ok(quote)
    }
}
