use std::collections::HashMap;

use alloy::primitives::{Address, U256};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::constants;
use crate::types::ChainId;

/// 체인별 라우팅 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: ChainId,
    pub name: String,
    pub rpc_url: String,
    /// UniswapV2 계열 라우터 (getAmountsOut 제공)
    pub router: Address,
    /// UniswapV2 계열 팩토리 (getPair 제공)
    pub factory: Address,
    /// 네이티브 의사 주소를 치환할 래핑 토큰
    pub wrapped_native: Address,
    /// 경유 후보로 쓰는 소수의 기준 자산 (스테이블, 체인 대표 DEX 토큰)
    #[serde(default)]
    pub reference_assets: Vec<Address>,
    /// fee-on-transfer로 알려진 토큰 목록 (슬리피지 가산용 휴리스틱)
    #[serde(default)]
    pub fee_on_transfer_tokens: Vec<Address>,
    /// AMM 스왑 수수료 (basis points, 30 = 0.3%)
    #[serde(default = "default_swap_fee_bps")]
    pub swap_fee_bps: u32,
    /// 이보다 얕은 유동성은 저유동성으로 취급 (최소 단위)
    #[serde(default = "default_min_liquidity")]
    pub min_liquidity: U256,
    /// 동일 체인 프로바이더 우선순위 (네이티브 DEX 먼저, 애그리게이터 뒤)
    #[serde(default)]
    pub providers: Vec<String>,
}

impl ChainConfig {
    pub fn is_fee_on_transfer(&self, token: Address) -> bool {
        self.fee_on_transfer_tokens.contains(&token)
    }
}

/// 오케스트레이터 전역 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 견적 캐시 TTL (초)
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// 레이스 티어에서 동시에 띄우는 프로바이더 수 (K)
    #[serde(default = "default_race_width")]
    pub race_width: usize,
    /// 레이스 티어 프로바이더별 타임아웃 (ms)
    #[serde(default = "default_race_timeout_ms")]
    pub race_timeout_ms: u64,
    /// 순차 티어 타임아웃 (ms, 레이스보다 짧게)
    #[serde(default = "default_sequential_timeout_ms")]
    pub sequential_timeout_ms: u64,
    /// 전수 티어 타임아웃 (ms)
    #[serde(default = "default_exhaustive_timeout_ms")]
    pub exhaustive_timeout_ms: u64,
    /// 프로바이더 API 키 (provider id -> key)
    #[serde(default)]
    pub api_keys: HashMap<String, String>,
    /// 지원 체인 목록
    #[serde(default)]
    pub chains: Vec<ChainConfig>,
}

fn default_cache_ttl_secs() -> u64 {
    10
}

fn default_race_width() -> usize {
    4
}

fn default_race_timeout_ms() -> u64 {
    3_000
}

fn default_sequential_timeout_ms() -> u64 {
    1_500
}

fn default_exhaustive_timeout_ms() -> u64 {
    5_000
}

fn default_swap_fee_bps() -> u32 {
    constants::DEFAULT_SWAP_FEE_BPS
}

fn default_min_liquidity() -> U256 {
    // ~1000 tokens at 18 decimals
    U256::from(10u64).pow(U256::from(21u64))
}

impl Config {
    /// 설정 파일(TOML)과 `QUOTE_ROUTER_*` 환경 변수를 합쳐 로드
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(
                config::Environment::with_prefix("QUOTE_ROUTER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("failed to read config from {path}"))?;

        settings
            .try_deserialize()
            .context("failed to deserialize quote-router config")
    }

    pub fn chain(&self, chain_id: ChainId) -> Option<&ChainConfig> {
        self.chains.iter().find(|c| c.chain_id == chain_id)
    }

    pub fn api_key(&self, provider_id: &str) -> Option<&str> {
        self.api_keys.get(provider_id).map(String::as_str)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            race_width: default_race_width(),
            race_timeout_ms: default_race_timeout_ms(),
            sequential_timeout_ms: default_sequential_timeout_ms(),
            exhaustive_timeout_ms: default_exhaustive_timeout_ms(),
            api_keys: HashMap::new(),
            chains: vec![
                ChainConfig {
                    chain_id: 1,
                    name: "ethereum".to_string(),
                    rpc_url: "https://eth.llamarpc.com".to_string(),
                    router: constants::UNISWAP_V2_ROUTER,
                    factory: constants::UNISWAP_V2_FACTORY,
                    wrapped_native: constants::WETH,
                    reference_assets: constants::reference_assets(1),
                    fee_on_transfer_tokens: Vec::new(),
                    swap_fee_bps: default_swap_fee_bps(),
                    min_liquidity: default_min_liquidity(),
                    providers: vec![
                        "pathfinder".to_string(),
                        "zeroex".to_string(),
                        "oneinch".to_string(),
                        "openocean".to_string(),
                    ],
                },
                ChainConfig {
                    chain_id: 56,
                    name: "bsc".to_string(),
                    rpc_url: "https://bsc-dataseed.binance.org".to_string(),
                    router: constants::PANCAKE_V2_ROUTER,
                    factory: constants::PANCAKE_V2_FACTORY,
                    wrapped_native: constants::WBNB,
                    reference_assets: constants::reference_assets(56),
                    fee_on_transfer_tokens: Vec::new(),
                    swap_fee_bps: 25, // Pancake V2: 0.25%
                    min_liquidity: default_min_liquidity(),
                    providers: vec![
                        "openocean".to_string(),
                        "pathfinder".to_string(),
                        "oneinch".to_string(),
                        "zeroex".to_string(),
                    ],
                },
                ChainConfig {
                    chain_id: 137,
                    name: "polygon".to_string(),
                    rpc_url: "https://polygon-rpc.com".to_string(),
                    router: constants::QUICKSWAP_ROUTER,
                    factory: constants::QUICKSWAP_FACTORY,
                    wrapped_native: constants::WMATIC,
                    reference_assets: constants::reference_assets(137),
                    fee_on_transfer_tokens: Vec::new(),
                    swap_fee_bps: default_swap_fee_bps(),
                    min_liquidity: default_min_liquidity(),
                    providers: vec![
                        "pathfinder".to_string(),
                        "oneinch".to_string(),
                        "zeroex".to_string(),
                        "openocean".to_string(),
                    ],
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_covers_known_chains() {
        let cfg = Config::default();
        for chain_id in [1u64, 56, 137] {
            let chain = cfg.chain(chain_id).expect("chain configured");
            assert_eq!(chain.wrapped_native, constants::wrapped_native(chain_id).unwrap());
            assert!(!chain.providers.is_empty());
            assert!(!chain.reference_assets.is_empty());
        }
        assert!(cfg.chain(424242).is_none());
    }

    #[test]
    fn test_bsc_native_dex_provider_first() {
        let cfg = Config::default();
        let bsc = cfg.chain(56).unwrap();
        assert_eq!(bsc.providers[0], "openocean");
    }

    #[test]
    fn test_fee_on_transfer_lookup() {
        let mut cfg = Config::default();
        let token = Address::from_slice(&[7u8; 20]);
        assert!(!cfg.chain(56).unwrap().is_fee_on_transfer(token));
        cfg.chains
            .iter_mut()
            .find(|c| c.chain_id == 56)
            .unwrap()
            .fee_on_transfer_tokens
            .push(token);
        assert!(cfg.chain(56).unwrap().is_fee_on_transfer(token));
    }
}
