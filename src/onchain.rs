//! 온체인 읽기 계층
//!
//! UniswapV2 계열 팩토리/페어/라우터에 대한 읽기 전용 호출을 감싼다.
//! 배포된 AMM 시맨틱과 비트 단위로 일치해야 하는 경계이며, 패스파인더는
//! 이 트레이트만 바라본다.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::sol;
use async_trait::async_trait;
use tracing::debug;

use crate::cache::TtlCache;
use crate::config::ChainConfig;
use crate::constants::{DEFAULT_DECIMALS, NATIVE_TOKEN};
use crate::types::ChainId;

sol! {
    #[sol(rpc)]
    interface IUniswapV2Factory {
        function getPair(address tokenA, address tokenB) external view returns (address pair);
    }

    #[sol(rpc)]
    interface IUniswapV2Pair {
        function getReserves() external view returns (uint256 reserve0, uint256 reserve1, uint32 blockTimestampLast);
        function token0() external view returns (address);
    }

    #[sol(rpc)]
    interface IUniswapV2Router {
        function getAmountsOut(uint256 amountIn, address[] calldata path) external view returns (uint256[] memory amounts);
    }

    #[sol(rpc)]
    interface IERC20 {
        function decimals() external view returns (uint8);
    }
}

/// 온체인 호출 에러. 유동성 부족 계열 revert와 전송 장애를 구분한다.
/// 전자는 패스파인더의 조향 신호(프로브 재시도)로 쓰인다.
#[derive(Debug, thiserror::Error)]
pub enum OnchainError {
    #[error("Insufficient liquidity: {0}")]
    InsufficientLiquidity(String),

    #[error("RPC error: {0}")]
    Rpc(String),
}

/// 페어 조회 결과: (reserve0, reserve1, token0)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairReserves {
    pub reserve0: U256,
    pub reserve1: U256,
    pub token0: Address,
}

/// AMM 읽기 전용 클라이언트 (체인당 하나)
#[async_trait]
pub trait AmmClient: Send + Sync {
    fn chain_id(&self) -> ChainId;

    /// 토큰 쌍의 페어 주소 조회. 페어가 없으면 None
    async fn pair_for(
        &self,
        token_a: Address,
        token_b: Address,
    ) -> Result<Option<Address>, OnchainError>;

    /// 페어의 리저브 조회
    async fn reserves(&self, pair: Address) -> Result<PairReserves, OnchainError>;

    /// 라우터의 getAmountsOut. 경로가 유효하지 않거나 유동성이 부족하면
    /// `InsufficientLiquidity`로 revert를 분류해 반환한다
    async fn amounts_out(
        &self,
        amount_in: U256,
        path: &[Address],
    ) -> Result<Vec<U256>, OnchainError>;

    /// ERC-20 decimals 조회
    async fn decimals_of(&self, token: Address) -> Result<u8, OnchainError>;
}

/// 표시용 decimals 조회 심 (코어는 실패 시 18로 폴백)
#[async_trait]
pub trait DecimalsResolver: Send + Sync {
    async fn decimals_of(&self, token: Address, chain_id: ChainId) -> Option<u8>;
}

/// AmmClient 묶음 위의 DecimalsResolver 구현
pub struct AmmDecimalsResolver {
    clients: HashMap<ChainId, Arc<dyn AmmClient>>,
}

impl AmmDecimalsResolver {
    pub fn new(clients: HashMap<ChainId, Arc<dyn AmmClient>>) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl DecimalsResolver for AmmDecimalsResolver {
    async fn decimals_of(&self, token: Address, chain_id: ChainId) -> Option<u8> {
        if token == NATIVE_TOKEN {
            return Some(DEFAULT_DECIMALS);
        }
        let client = self.clients.get(&chain_id)?;
        client.decimals_of(token).await.ok()
    }
}

/// alloy RPC 기반 AmmClient 구현
pub struct RpcAmmClient {
    chain_id: ChainId,
    provider: DynProvider,
    router: Address,
    factory: Address,
    /// 페어 주소는 불변에 가까우므로 짧은 TTL 캐시로 중복 조회만 줄인다
    pair_cache: TtlCache<(Address, Address), Option<Address>>,
}

impl RpcAmmClient {
    pub fn new(chain: &ChainConfig) -> anyhow::Result<Self> {
        let url = chain.rpc_url.parse()?;
        let provider = ProviderBuilder::new().connect_http(url).erased();
        Ok(Self {
            chain_id: chain.chain_id,
            provider,
            router: chain.router,
            factory: chain.factory,
            pair_cache: TtlCache::new(Duration::from_secs(60)),
        })
    }

    fn pair_key(token_a: Address, token_b: Address) -> (Address, Address) {
        if token_a <= token_b {
            (token_a, token_b)
        } else {
            (token_b, token_a)
        }
    }
}

/// revert 계열 메시지를 유동성 부족 신호로 분류한다
fn classify_call_error(err: impl std::fmt::Display) -> OnchainError {
    let message = err.to_string();
    let lowered = message.to_lowercase();
    if lowered.contains("revert")
        || lowered.contains("insufficient")
        || lowered.contains("ds-math")
    {
        OnchainError::InsufficientLiquidity(message)
    } else {
        OnchainError::Rpc(message)
    }
}

#[async_trait]
impl AmmClient for RpcAmmClient {
    fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    async fn pair_for(
        &self,
        token_a: Address,
        token_b: Address,
    ) -> Result<Option<Address>, OnchainError> {
        let key = Self::pair_key(token_a, token_b);
        if let Some(cached) = self.pair_cache.get(&key) {
            return Ok(cached);
        }

        let factory = IUniswapV2Factory::new(self.factory, self.provider.clone());
        let pair = factory
            .getPair(token_a, token_b)
            .call()
            .await
            .map_err(|e| OnchainError::Rpc(e.to_string()))?;

        let result = (pair != Address::ZERO).then_some(pair);
        self.pair_cache.insert(key, result);
        debug!(chain = self.chain_id, ?token_a, ?token_b, ?result, "pair lookup");
        Ok(result)
    }

    async fn reserves(&self, pair: Address) -> Result<PairReserves, OnchainError> {
        let contract = IUniswapV2Pair::new(pair, self.provider.clone());
        let reserves = contract
            .getReserves()
            .call()
            .await
            .map_err(|e| OnchainError::Rpc(e.to_string()))?;
        let token0 = contract
            .token0()
            .call()
            .await
            .map_err(|e| OnchainError::Rpc(e.to_string()))?;

        Ok(PairReserves {
            reserve0: reserves.reserve0,
            reserve1: reserves.reserve1,
            token0,
        })
    }

    async fn amounts_out(
        &self,
        amount_in: U256,
        path: &[Address],
    ) -> Result<Vec<U256>, OnchainError> {
        let router = IUniswapV2Router::new(self.router, self.provider.clone());
        router
            .getAmountsOut(amount_in, path.to_vec())
            .call()
            .await
            .map_err(classify_call_error)
    }

    async fn decimals_of(&self, token: Address) -> Result<u8, OnchainError> {
        let erc20 = IERC20::new(token, self.provider.clone());
        erc20
            .decimals()
            .call()
            .await
            .map_err(|e| OnchainError::Rpc(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_call_error() {
        assert!(matches!(
            classify_call_error("execution reverted: PancakeLibrary: INSUFFICIENT_LIQUIDITY"),
            OnchainError::InsufficientLiquidity(_)
        ));
        assert!(matches!(
            classify_call_error("execution reverted: ds-math-sub-underflow"),
            OnchainError::InsufficientLiquidity(_)
        ));
        assert!(matches!(
            classify_call_error("connection refused"),
            OnchainError::Rpc(_)
        ));
    }

    #[test]
    fn test_pair_key_is_order_insensitive() {
        let a = Address::from_slice(&[1u8; 20]);
        let b = Address::from_slice(&[2u8; 20]);
        assert_eq!(RpcAmmClient::pair_key(a, b), RpcAmmClient::pair_key(b, a));
    }
}
