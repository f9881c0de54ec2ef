//! OpenOcean API 어댑터. BSC에서는 체인 네이티브 애그리게이터 슬롯을 맡는다.

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

pub struct OpenOceanProvider {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct OpenOceanResponse {
    code: i64,
    data: Option<OpenOceanSwap>,
}

#[derive(Debug, Deserialize)]
struct OpenOceanSwap {
    #[serde(rename = "outAmount")]
    out_amount: String,
    #[serde(rename = "estimatedGas", default)]
    estimated_gas: Option<String>,
    #[serde(default)]
    to: Option<String>,
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    value: Option<String>,
    #[serde(rename = "priceImpact", default)]
    price_impact: Option<String>,
}

fn chain_slug(chain_id: ChainId) -> Option<&'static str> {
    match chain_id {
        1 => Some("eth"),
        56 => Some("bsc"),
        137 => Some("polygon"),
        _ => None,
    }
}

impl OpenOceanProvider {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: "https://open-api.openocean.finance/v3".to_string(),
        }
    }
}

impl Default for OpenOceanProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuoteProvider for OpenOceanProvider {
    fn id(&self) -> &str {
        "openocean"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::NativeDex
    }

    fn supports(&self, request: &TradeRequest) -> bool {
        !request.is_cross_chain() && chain_slug(request.source_chain_id).is_some()
    }

    async fn quote(&self, request: &TradeRequest) -> Result<Quote, ProviderError> {
        let slug = chain_slug(request.source_chain_id).ok_or_else(|| {
            ProviderError::Unsupported(format!("chain {}", request.source_chain_id))
        })?;
        let slippage_percent = slippage_or_default(request);

        let mut query: HashMap<&str, String> = HashMap::new();
        query.insert("inTokenAddress", format!("{:#x}", request.source_token));
        query.insert("outTokenAddress", format!("{:#x}", request.dest_token));
        query.insert("amount", request.source_amount.clone());
        query.insert("slippage", slippage_percent.to_string());
        query.insert("account", format!("{:#x}", request.requester));

        debug!(
            "🔄 Requesting OpenOcean quote: {} -> {} ({})",
            request.source_token, request.dest_token, request.source_amount
        );

        let response = self
            .client
            .get(format!("{}/{}/swap_quote", self.base_url, slug))
            .query(&query)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api { status, body });
        }

        let parsed: OpenOceanResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        // OpenOcean은 HTTP 200에 실패 코드를 담아 보낸다
        let swap = match (parsed.code, parsed.data) {
            (200, Some(data)) => data,
            (code, _) => {
                return Err(ProviderError::Api {
                    status: 200,
                    body: format!("openocean code {code}"),
                })
            }
        };

        debug!("✅ OpenOcean quote received: {}", swap.out_amount);

        let price_impact = swap
            .price_impact
            .as_deref()
            .map(|s| s.trim_end_matches('%'))
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(0.0);

        let mut quote = Quote::new(
            self.id(),
            swap.out_amount.clone(),
            apply_slippage(&swap.out_amount, slippage_percent),
        );
        quote.estimated_gas_units = swap
            .estimated_gas
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        quote.price_impact_percent = price_impact;
        quote.liquidity_score = liquidity_score_from_impact(price_impact);
        if let (Some(to), Some(data)) = (swap.to, swap.data) {
            quote.execution_payload = serde_json::json!({
                "to": to,
                "data": data,
                "value": swap.value.unwrap_or_else(|| "0".to_string()),
            });
        }
        Ok(quote)
    }
}
