//! 온체인 패스파인더를 평범한 프로바이더로 감싸는 어댑터.
//! 외부 API가 전부 침묵해도 이 경로는 남는다.

use std::collections::HashMap;

use alloy::primitives::U256;
use async_trait::async_trait;
use tracing::debug;

use super::{apply_slippage, liquidity_score_from_impact, ProviderError, ProviderKind, QuoteProvider};
use crate::pathfinder::Pathfinder;
use crate::types::{ChainId, Quote, TradeRequest};

// UniswapV2 스왑 가스: 첫 홉 + 추가 홉당
const BASE_SWAP_GAS: u64 = 120_000;
const PER_EXTRA_HOP_GAS: u64 = 60_000;

pub struct PathfinderProvider {
    pathfinders: HashMap<ChainId, Pathfinder>,
}

impl PathfinderProvider {
    pub fn new(pathfinders: HashMap<ChainId, Pathfinder>) -> Self {
        Self { pathfinders }
    }
}

#[async_trait]
impl QuoteProvider for PathfinderProvider {
    fn id(&self) -> &str {
        "pathfinder"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Onchain
    }

    fn supports(&self, request: &TradeRequest) -> bool {
        !request.is_cross_chain() && self.pathfinders.contains_key(&request.source_chain_id)
    }

    async fn quote(&self, request: &TradeRequest) -> Result<Quote, ProviderError> {
        let pathfinder = self.pathfinders.get(&request.source_chain_id).ok_or_else(|| {
            ProviderError::Unsupported(format!("chain {}", request.source_chain_id))
        })?;

        let amount_in = U256::from_str_radix(&request.source_amount, 10)
            .map_err(|e| ProviderError::Parse(format!("source amount: {e}")))?;

        let route = pathfinder
            .find_best_route(request.source_token, request.dest_token, amount_in)
            .await
            .ok_or_else(|| {
                ProviderError::Unsupported("no on-chain route with liquidity".to_string())
            })?;

        // 요청 슬리피지가 있으면 그것을, 없으면 경로에서 도출된 동적
        // 권고치를 쓴다
        let slippage_percent = request
            .slippage_tolerance_percent
            .unwrap_or(route.recommended_slippage_percent);

        let dest_amount = route.expected_output.to_string();
        let dest_amount_min = apply_slippage(&dest_amount, slippage_percent);

        debug!(
            chain = request.source_chain_id,
            hops = route.hop_count(),
            out = %dest_amount,
            slippage = slippage_percent,
            "✅ pathfinder quote"
        );

        let chain = pathfinder.chain();
        let mut quote = Quote::new(self.id(), dest_amount, dest_amount_min.clone());
        quote.estimated_gas_units =
            BASE_SWAP_GAS + PER_EXTRA_HOP_GAS * (route.hop_count().saturating_sub(1) as u64);
        quote.price_impact_percent = route.price_impact_percent;
        quote.liquidity_score = liquidity_score_from_impact(route.price_impact_percent);
        quote.execution_payload = serde_json::json!({
            "router": format!("{:#x}", chain.router),
            "path": route.path.iter().map(|a| format!("{a:#x}")).collect::<Vec<_>>(),
            "amountIn": request.source_amount,
            "amountOutMin": dest_amount_min,
        });
        quote.route = route.path;
        Ok(quote)
    }
}
