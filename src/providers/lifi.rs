//! LI.FI 어댑터 (크로스체인 전담)

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{
    apply_slippage, liquidity_score_from_impact, slippage_or_default, ProviderError,
    ProviderKind, QuoteProvider,
};
use crate::types::{Quote, TradeRequest};

// 브리지 라우팅은 단일 스왑보다 느리다
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct LiFiProvider {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct LiFiQuoteResponse {
    estimate: LiFiEstimate,
    #[serde(rename = "transactionRequest", default)]
    transaction_request: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct LiFiEstimate {
    #[serde(rename = "toAmount")]
    to_amount: String,
    #[serde(rename = "toAmountMin", default)]
    to_amount_min: Option<String>,
    #[serde(rename = "gasCosts", default)]
    gas_costs: Vec<LiFiGasCost>,
}

#[derive(Debug, Deserialize)]
struct LiFiGasCost {
    #[serde(default)]
    estimate: Option<String>,
}

impl LiFiProvider {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: "https://li.quest/v1".to_string(),
        }
    }
}

impl Default for LiFiProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuoteProvider for LiFiProvider {
    fn id(&self) -> &str {
        "lifi"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::CrossChain
    }

    fn supports(&self, request: &TradeRequest) -> bool {
        request.is_cross_chain()
    }

    async fn quote(&self, request: &TradeRequest) -> Result<Quote, ProviderError> {
        let slippage_percent = slippage_or_default(request);
        let recipient = request.recipient.unwrap_or(request.requester);

        let mut query: HashMap<&str, String> = HashMap::new();
        query.insert("fromChain", request.source_chain_id.to_string());
        query.insert("toChain", request.dest_chain_id.to_string());
        query.insert("fromToken", format!("{:#x}", request.source_token));
        query.insert("toToken", format!("{:#x}", request.dest_token));
        query.insert("fromAmount", request.source_amount.clone());
        query.insert("fromAddress", format!("{:#x}", request.requester));
        query.insert("toAddress", format!("{:#x}", recipient));
        // LI.FI는 비율(0.005 = 0.5%)을 받는다
        query.insert("slippage", (slippage_percent / 100.0).to_string());

        debug!(
            "🔄 Requesting LiFi cross-chain quote: chain {} -> chain {} ({})",
            request.source_chain_id, request.dest_chain_id, request.source_amount
        );

        let response = self
            .client
            .get(format!("{}/quote", self.base_url))
            .query(&query)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api { status, body });
        }

        let parsed: LiFiQuoteResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        debug!("✅ LiFi quote received: {}", parsed.estimate.to_amount);

        let dest_amount = parsed.estimate.to_amount;
        let dest_amount_min = parsed
            .estimate
            .to_amount_min
            .unwrap_or_else(|| apply_slippage(&dest_amount, slippage_percent));

        let mut quote = Quote::new(self.id(), dest_amount, dest_amount_min);
        quote.estimated_gas_units = parsed
            .estimate
            .gas_costs
            .iter()
            .filter_map(|c| c.estimate.as_deref())
            .filter_map(|s| s.parse::<u64>().ok())
            .sum();
        quote.liquidity_score = liquidity_score_from_impact(0.0);
        if let Some(tx) = parsed.transaction_request {
            quote.execution_payload = tx;
        }
        Ok(quote)
    }
}
