//! 0x Swap API 어댑터

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
use crate::types::{ChainId, Quote, TradeRequest};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

pub struct ZeroExProvider {
    client: Client,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ZeroExQuoteResponse {
    #[serde(rename = "sellAmount")]
    sell_amount: String,
    #[serde(rename = "buyAmount")]
    buy_amount: String,
    to: String,
    data: String,
    value: String,
    gas: String,
    #[serde(rename = "allowanceTarget")]
    allowance_target: String,
    #[serde(rename = "estimatedPriceImpact", default)]
    estimated_price_impact: Option<String>,
}

fn base_url(chain_id: ChainId) -> Option<&'static str> {
    match chain_id {
        1 => Some("https://api.0x.org"),
        56 => Some("https://bsc.api.0x.org"),
        137 => Some("https://polygon.api.0x.org"),
        _ => None,
    }
}

impl ZeroExProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
        }
    }

    fn build_headers(&self) -> reqwest::header::HeaderMap {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(ref api_key) = self.api_key {
            if let Ok(value) = api_key.parse() {
                headers.insert("0x-api-key", value);
            }
        }
        headers
    }
}

#[async_trait]
impl QuoteProvider for ZeroExProvider {
    fn id(&self) -> &str {
        "zeroex"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Aggregator
    }

    fn supports(&self, request: &TradeRequest) -> bool {
        !request.is_cross_chain() && base_url(request.source_chain_id).is_some()
    }

    async fn quote(&self, request: &TradeRequest) -> Result<Quote, ProviderError> {
        let base = base_url(request.source_chain_id).ok_or_else(|| {
            ProviderError::Unsupported(format!("chain {}", request.source_chain_id))
        })?;
        let slippage_percent = slippage_or_default(request);

        let mut query: HashMap<&str, String> = HashMap::new();
        query.insert("sellToken", format!("{:#x}", request.source_token));
        query.insert("buyToken", format!("{:#x}", request.dest_token));
        query.insert("sellAmount", request.source_amount.clone());
        // 0x는 비율(0.01 = 1%)을 받는다
        query.insert("slippagePercentage", (slippage_percent / 100.0).to_string());
        query.insert("takerAddress", format!("{:#x}", request.requester));

        debug!(
            "🔄 Requesting 0x quote: {} -> {} ({})",
            request.source_token, request.dest_token, request.source_amount
        );

        let response = self
            .client
            .get(format!("{base}/swap/v1/quote"))
            .headers(self.build_headers())
            .query(&query)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api { status, body });
        }

        let parsed: ZeroExQuoteResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        debug!(
            "✅ 0x quote received: {} -> {}",
            parsed.sell_amount, parsed.buy_amount
        );

        // 깨진 calldata를 실행 단계까지 흘려보내지 않는다
        hex::decode(parsed.data.trim_start_matches("0x"))
            .map_err(|e| ProviderError::Parse(format!("calldata: {e}")))?;

        let price_impact = parsed
            .estimated_price_impact
            .as_deref()
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(0.0);

        let mut quote = Quote::new(
            self.id(),
            parsed.buy_amount.clone(),
            apply_slippage(&parsed.buy_amount, slippage_percent),
        );
        quote.estimated_gas_units = parsed.gas.parse().unwrap_or(0);
        quote.price_impact_percent = price_impact;
        quote.liquidity_score = liquidity_score_from_impact(price_impact);
        quote.execution_payload = serde_json::json!({
            "to": parsed.to,
            "data": parsed.data,
            "value": parsed.value,
            "allowanceTarget": parsed.allowance_target,
        });
        Ok(quote)
    }
}
