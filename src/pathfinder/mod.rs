//! 온체인 패스파인더
//!
//! 오프체인 소스가 답하지 못할 때 AMM 풀을 직접 경유해 스왑 출력과
//! 가격 영향을 추정한다. 유동성 부족은 에러가 아니라 조향 신호다:
//! 전체 수량이 revert하면 부분 수량으로 프로브하고, 그것마저 실패하면
//! 리저브에 constant-product 공식을 직접 적용한 보수적 추정으로
//! 폴백한다. "없음"은 마지막 추정까지 계산 불가능할 때만 반환한다.

pub mod candidates;
pub mod slippage;

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use futures::future::join_all;
use tracing::{debug, warn};

use crate::config::ChainConfig;
use crate::constants::NATIVE_TOKEN;
use crate::onchain::{AmmClient, OnchainError};
use crate::types::Route;

/// 프로브 수량 비율 (%): 전체 수량 revert 시 병렬로 재시도
const PROBE_PERCENTS: [u64; 3] = [50, 10, 1];

/// 리저브 폴백 추정에 적용하는 추가 헤어컷 (basis points)
const RESERVE_ESTIMATE_HAIRCUT_BPS: u64 = 1_000;

pub struct Pathfinder {
    chain: ChainConfig,
    client: Arc<dyn AmmClient>,
}

impl Pathfinder {
    pub fn new(chain: ChainConfig, client: Arc<dyn AmmClient>) -> Self {
        Self { chain, client }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain.chain_id
    }

    pub fn chain(&self) -> &ChainConfig {
        &self.chain
    }

    /// 최적 경로 탐색. 어떤 후보도 (마지막 리저브 추정 포함) 계산할 수
    /// 없을 때만 None을 반환한다.
    pub async fn find_best_route(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> Option<Route> {
        // 풀은 네이티브 의사 주소를 보유하지 않으므로 먼저 치환한다
        let token_in = self.resolve_native(token_in);
        let token_out = self.resolve_native(token_out);
        if token_in == token_out || amount_in.is_zero() {
            return None;
        }

        let candidate_paths = candidates::build(
            token_in,
            token_out,
            self.chain.wrapped_native,
            &self.chain.reference_assets,
        );

        let mut scored: Vec<(Vec<Address>, U256)> = Vec::new();
        for path in &candidate_paths {
            if let Some(output) = self.expected_output(amount_in, path).await {
                if !output.is_zero() {
                    scored.push((path.clone(), output));
                }
            }
        }

        if scored.is_empty() {
            debug!(
                chain = self.chain.chain_id,
                "all probes failed, falling back to reserve estimate"
            );
            if let Some(estimate) = self.reserve_estimate(amount_in, &candidate_paths).await {
                scored.push(estimate);
            }
        }

        let best_output = scored.iter().map(|(_, out)| *out).max()?;
        let tied: Vec<Vec<Address>> = scored
            .into_iter()
            .filter(|(_, out)| *out == best_output)
            .map(|(path, _)| path)
            .collect();

        // 동률이면 유동성 깊이가 큰(= 가격 영향이 작은) 경로를 택한다
        let mut winner: Option<(Vec<Address>, U256)> = None;
        for path in tied {
            let depth = self.aggregate_depth(&path).await.unwrap_or(U256::ZERO);
            match &winner {
                Some((_, best_depth)) if depth <= *best_depth => {}
                _ => winner = Some((path, depth)),
            }
        }
        let (path, depth) = winner?;

        let price_impact = slippage::price_impact_percent(amount_in, depth);
        let fee_on_transfer =
            self.chain.is_fee_on_transfer(token_in) || self.chain.is_fee_on_transfer(token_out);
        let low_liquidity = depth < self.chain.min_liquidity;
        let recommended_slippage =
            slippage::dynamic_slippage_percent(price_impact, fee_on_transfer, low_liquidity);

        debug!(
            chain = self.chain.chain_id,
            hops = path.len() - 1,
            output = %best_output,
            impact = price_impact,
            "pathfinder route selected"
        );

        Some(Route {
            path,
            expected_output: best_output,
            price_impact_percent: price_impact,
            aggregate_liquidity: depth,
            recommended_slippage_percent: recommended_slippage,
        })
    }

    fn resolve_native(&self, token: Address) -> Address {
        if token == NATIVE_TOKEN {
            self.chain.wrapped_native
        } else {
            token
        }
    }

    /// 한 후보 경로의 예상 출력. 전체 수량 호출이 유동성 부족으로
    /// 실패하면 프로브-외삽으로 넘어간다.
    async fn expected_output(&self, amount_in: U256, path: &[Address]) -> Option<U256> {
        match self.client.amounts_out(amount_in, path).await {
            Ok(amounts) => amounts.last().copied().filter(|out| !out.is_zero()),
            Err(OnchainError::InsufficientLiquidity(_)) => {
                self.probe_and_extrapolate(amount_in, path).await
            }
            Err(OnchainError::Rpc(message)) => {
                warn!(chain = self.chain.chain_id, %message, "amountsOut RPC failure");
                None
            }
        }
    }

    /// 50% / 10% / 1% 수량으로 병렬 프로브 후 전체 수량으로 외삽.
    /// 비율에 비례해 커지는 볼록성 할인을 적용한 보수적 추정이다.
    async fn probe_and_extrapolate(&self, amount_in: U256, path: &[Address]) -> Option<U256> {
        let probe_amounts: Vec<U256> = PROBE_PERCENTS
            .iter()
            .map(|pct| amount_in * U256::from(*pct) / U256::from(100u64))
            .collect();

        let results = join_all(
            probe_amounts
                .iter()
                .map(|probe| self.client.amounts_out(*probe, path)),
        )
        .await;

        for ((pct, probe_amount), result) in
            PROBE_PERCENTS.iter().zip(&probe_amounts).zip(results)
        {
            if probe_amount.is_zero() {
                continue;
            }
            let Ok(amounts) = result else { continue };
            let Some(probe_out) = amounts.last().copied().filter(|out| !out.is_zero()) else {
                continue;
            };

            let ratio = 100 / pct;
            let scaled = probe_out.checked_mul(amount_in)? / *probe_amount;
            let discount_bps = slippage::convexity_discount_bps(ratio);
            let estimate =
                scaled * U256::from(10_000 - discount_bps) / U256::from(10_000u64);

            debug!(
                chain = self.chain.chain_id,
                probe_pct = pct,
                discount_bps,
                estimate = %estimate,
                "probe extrapolation"
            );
            return Some(estimate).filter(|out| !out.is_zero());
        }
        None
    }

    /// 최후 수단: 라우터 없이 각 홉의 리저브에 constant-product 공식을
    /// 직접 적용하고 추가 헤어컷을 얹는다.
    async fn reserve_estimate(
        &self,
        amount_in: U256,
        candidate_paths: &[Vec<Address>],
    ) -> Option<(Vec<Address>, U256)> {
        'candidate: for path in candidate_paths {
            let mut amount = amount_in;
            for hop in path.windows(2) {
                let Some((reserve_in, reserve_out)) = self.hop_reserves(hop[0], hop[1]).await
                else {
                    continue 'candidate;
                };
                amount = slippage::constant_product_out(
                    amount,
                    reserve_in,
                    reserve_out,
                    self.chain.swap_fee_bps,
                );
                if amount.is_zero() {
                    continue 'candidate;
                }
            }
            let haircut =
                amount * U256::from(10_000 - RESERVE_ESTIMATE_HAIRCUT_BPS) / U256::from(10_000u64);
            if !haircut.is_zero() {
                return Some((path.clone(), haircut));
            }
        }
        None
    }

    /// 한 홉의 (reserve_in, reserve_out)
    async fn hop_reserves(&self, token_in: Address, token_out: Address) -> Option<(U256, U256)> {
        let pair = self.client.pair_for(token_in, token_out).await.ok()??;
        let reserves = self.client.reserves(pair).await.ok()?;
        if reserves.token0 == token_in {
            Some((reserves.reserve0, reserves.reserve1))
        } else {
            Some((reserves.reserve1, reserves.reserve0))
        }
    }

    /// 경로 전체의 유동성 깊이: 각 홉 입력측 리저브의 합
    async fn aggregate_depth(&self, path: &[Address]) -> Option<U256> {
        let mut depth = U256::ZERO;
        for hop in path.windows(2) {
            let (reserve_in, _) = self.hop_reserves(hop[0], hop[1]).await?;
            depth = depth.checked_add(reserve_in)?;
        }
        Some(depth)
    }
}
