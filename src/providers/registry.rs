//! 프로바이더 레지스트리
//!
//! 체인별 동일 체인 프로바이더 순서(설정의 `providers` 목록)와 고정된
//! 크로스체인 목록을 관리한다. 순서가 곧 우선순위다.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use super::lifi::LiFiProvider;
use super::onchain::PathfinderProvider;
use super::oneinch::OneInchProvider;
use super::openocean::OpenOceanProvider;
use super::zeroex::ZeroExProvider;
use super::QuoteProvider;
use crate::config::Config;
use crate::onchain::{AmmClient, RpcAmmClient};
use crate::pathfinder::Pathfinder;
use crate::types::{ChainId, QuoteError, TradeRequest};

pub struct ProviderRegistry {
    same_chain: HashMap<ChainId, Vec<Arc<dyn QuoteProvider>>>,
    cross_chain: Vec<Arc<dyn QuoteProvider>>,
}

impl ProviderRegistry {
    pub fn new(
        same_chain: HashMap<ChainId, Vec<Arc<dyn QuoteProvider>>>,
        cross_chain: Vec<Arc<dyn QuoteProvider>>,
    ) -> Self {
        Self {
            same_chain,
            cross_chain,
        }
    }

    /// 설정에서 전체 레지스트리 조립 (체인별 RPC 클라이언트 포함)
    pub fn from_config(config: &Config) -> Result<Self> {
        let clients = Self::build_clients(config)?;
        Self::with_clients(config, &clients)
    }

    /// 체인별 AMM 클라이언트 생성. 레지스트리 밖(decimals 조회 등)에서도
    /// 같은 클라이언트를 공유할 수 있도록 분리돼 있다.
    pub fn build_clients(config: &Config) -> Result<HashMap<ChainId, Arc<dyn AmmClient>>> {
        let mut clients: HashMap<ChainId, Arc<dyn AmmClient>> = HashMap::new();
        for chain in &config.chains {
            clients.insert(chain.chain_id, Arc::new(RpcAmmClient::new(chain)?));
        }
        Ok(clients)
    }

    pub fn with_clients(
        config: &Config,
        clients: &HashMap<ChainId, Arc<dyn AmmClient>>,
    ) -> Result<Self> {
        let mut pathfinders: HashMap<ChainId, Pathfinder> = HashMap::new();
        for chain in &config.chains {
            if let Some(client) = clients.get(&chain.chain_id) {
                pathfinders.insert(
                    chain.chain_id,
                    Pathfinder::new(chain.clone(), Arc::clone(client)),
                );
            }
        }

        let pathfinder: Arc<dyn QuoteProvider> = Arc::new(PathfinderProvider::new(pathfinders));
        let zeroex: Arc<dyn QuoteProvider> = Arc::new(ZeroExProvider::new(
            config.api_key("zeroex").map(String::from),
        ));
        let oneinch: Arc<dyn QuoteProvider> = Arc::new(OneInchProvider::new(
            config.api_key("oneinch").map(String::from),
        ));
        let openocean: Arc<dyn QuoteProvider> = Arc::new(OpenOceanProvider::new());
        let lifi: Arc<dyn QuoteProvider> = Arc::new(LiFiProvider::new());

        let by_id: HashMap<&str, Arc<dyn QuoteProvider>> = HashMap::from([
            ("pathfinder", Arc::clone(&pathfinder)),
            ("zeroex", Arc::clone(&zeroex)),
            ("oneinch", Arc::clone(&oneinch)),
            ("openocean", Arc::clone(&openocean)),
            ("lifi", Arc::clone(&lifi)),
        ]);

        let mut same_chain: HashMap<ChainId, Vec<Arc<dyn QuoteProvider>>> = HashMap::new();
        for chain in &config.chains {
            let mut ordered = Vec::with_capacity(chain.providers.len());
            for id in &chain.providers {
                match by_id.get(id.as_str()) {
                    Some(provider) => ordered.push(Arc::clone(provider)),
                    None => warn!(chain = chain.chain_id, "unknown provider id in config: {id}"),
                }
            }
            info!(
                chain = chain.chain_id,
                providers = ordered.len(),
                "registered same-chain providers"
            );
            same_chain.insert(chain.chain_id, ordered);
        }

        Ok(Self {
            same_chain,
            cross_chain: vec![lifi],
        })
    }

    /// 요청에 맞는 프로바이더 목록 (우선순위 순, supports 필터 적용)
    pub fn providers_for(
        &self,
        request: &TradeRequest,
    ) -> Result<Vec<Arc<dyn QuoteProvider>>, QuoteError> {
        let candidates = if request.is_cross_chain() {
            &self.cross_chain
        } else {
            self.same_chain
                .get(&request.source_chain_id)
                .ok_or(QuoteError::UnsupportedChain {
                    chain_id: request.source_chain_id,
                })?
        };

        let supported: Vec<Arc<dyn QuoteProvider>> = candidates
            .iter()
            .filter(|p| p.supports(request))
            .map(Arc::clone)
            .collect();

        if supported.is_empty() {
            return Err(QuoteError::UnsupportedChain {
                chain_id: request.source_chain_id,
            });
        }
        Ok(supported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Address;

    fn request(source_chain: u64, dest_chain: u64) -> TradeRequest {
        TradeRequest {
            source_chain_id: source_chain,
            dest_chain_id: dest_chain,
            source_token: Address::from_slice(&[1u8; 20]),
            dest_token: Address::from_slice(&[2u8; 20]),
            source_amount: "1000".to_string(),
            requester: Address::from_slice(&[9u8; 20]),
            recipient: None,
            slippage_tolerance_percent: None,
        }
    }

    #[test]
    fn test_unsupported_chain_is_rejected() {
        let registry = ProviderRegistry::from_config(&Config::default()).unwrap();
        assert!(matches!(
            registry.providers_for(&request(424242, 424242)),
            Err(QuoteError::UnsupportedChain { chain_id: 424242 })
        ));
    }

    #[test]
    fn test_same_chain_order_follows_config() {
        let registry = ProviderRegistry::from_config(&Config::default()).unwrap();
        let providers = registry.providers_for(&request(56, 56)).unwrap();
        // BSC에서는 체인 네이티브 애그리게이터가 선두
        assert_eq!(providers[0].id(), "openocean");
        assert!(providers.iter().all(|p| p.id() != "lifi"));
    }

    #[test]
    fn test_cross_chain_routes_to_bridge_providers() {
        let registry = ProviderRegistry::from_config(&Config::default()).unwrap();
        let providers = registry.providers_for(&request(1, 56)).unwrap();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].id(), "lifi");
    }
}
