use alloy::primitives::{address, Address};

use crate::types::ChainId;

/// Reserved pseudo-address for a chain's native asset (ETH, BNB, MATIC, ...).
/// AMM pools never hold this address; the pathfinder substitutes the wrapped
/// native token before any pool lookup.
pub const NATIVE_TOKEN: Address = address!("EeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

// Wrapped native tokens
pub const WETH: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
pub const WBNB: Address = address!("bb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c");
pub const WMATIC: Address = address!("0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270");

// Ethereum mainnet reference assets
pub const USDC: Address = address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
pub const USDT: Address = address!("dAC17F958D2ee523a2206206994597C13D831ec7");
pub const DAI: Address = address!("6B175474E89094C44Da98b954EedeAC495271d0F");

// BSC reference assets
pub const BUSD: Address = address!("e9e7CEA3DedcA5984780Bafc599bD69ADd087D56");
pub const USDT_BSC: Address = address!("55d398326f99059fF775485246999027B3197955");
pub const CAKE: Address = address!("0E09FaBB73Bd3Ade0a17ECC321fD13a19e81cE82");

// Polygon reference assets
pub const USDC_POLYGON: Address = address!("2791Bca1f2de4661ED88A30C99A7a9449Aa84174");
pub const USDT_POLYGON: Address = address!("c2132D05D31c914a87C6611C10748AEb04B58e8F");
pub const DAI_POLYGON: Address = address!("8f3Cf7ad23Cd3CaDbD9735AFf958023239c6A063");

// UniswapV2-family routers and factories
pub const UNISWAP_V2_ROUTER: Address = address!("7a250d5630B4cF539739dF2C5dAcb4c659F2488D");
pub const UNISWAP_V2_FACTORY: Address = address!("5C69bEe701ef814a2B6a3EDD4B1652CB9cc5aA6f");
pub const PANCAKE_V2_ROUTER: Address = address!("10ED43C718714eb63d5aA57B78B54704E256024E");
pub const PANCAKE_V2_FACTORY: Address = address!("cA143Ce32Fe78f1f7019d7d551a6402fC5350c73");
pub const QUICKSWAP_ROUTER: Address = address!("a5E0829CaCEd8fFDD4De3c43696c57F7D7A678ff");
pub const QUICKSWAP_FACTORY: Address = address!("5757371414417b8C6CAad45bAeF941aBc7d3Ab32");

/// Standard UniswapV2-family swap fee (0.3%) in basis points
pub const DEFAULT_SWAP_FEE_BPS: u32 = 30;

/// Token decimals fallback when the on-chain lookup fails
pub const DEFAULT_DECIMALS: u8 = 18;

/// Slippage applied when the request carries no tolerance (%)
pub const DEFAULT_SLIPPAGE_PERCENT: f64 = 0.5;

/// Hard cap on the dynamic slippage recommendation (%)
pub const MAX_SLIPPAGE_PERCENT: f64 = 50.0;

/// Maximum hops in a pathfinder route
pub const MAX_HOPS: usize = 3;

/// Bound on the candidate path set per pathfinder call
pub const MAX_CANDIDATE_PATHS: usize = 24;

/// Wrapped native token for a chain, if configured here
pub fn wrapped_native(chain_id: ChainId) -> Option<Address> {
    match chain_id {
        1 => Some(WETH),
        56 => Some(WBNB),
        137 => Some(WMATIC),
        _ => None,
    }
}

/// Curated routing reference assets per chain (stables plus the chain's
/// dominant DEX asset). Small by design: candidate paths are enumerated
/// over this list, not over the full pool graph.
pub fn reference_assets(chain_id: ChainId) -> Vec<Address> {
    match chain_id {
        1 => vec![USDC, USDT, DAI],
        56 => vec![BUSD, USDT_BSC, CAKE],
        137 => vec![USDC_POLYGON, USDT_POLYGON, DAI_POLYGON],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapped_native_lookup() {
        assert_eq!(wrapped_native(1), Some(WETH));
        assert_eq!(wrapped_native(56), Some(WBNB));
        assert_eq!(wrapped_native(137), Some(WMATIC));
        assert_eq!(wrapped_native(99999), None);
    }

    #[test]
    fn test_reference_assets_exclude_wrapped_native() {
        for chain in [1u64, 56, 137] {
            let wnative = wrapped_native(chain).unwrap();
            assert!(!reference_assets(chain).contains(&wnative));
        }
    }

    #[test]
    fn test_reference_assets_bounded() {
        assert!(reference_assets(1).len() <= 4);
        assert!(reference_assets(56).len() <= 4);
        assert!(reference_assets(99999).is_empty());
    }
}
