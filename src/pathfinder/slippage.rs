//! 가격 영향과 동적 슬리피지 계산 (순수 함수)

use alloy::primitives::U256;

use crate::constants::MAX_SLIPPAGE_PERCENT;

const BPS_DENOMINATOR: u64 = 10_000;

/// x·y=k 공식으로 스왑 출력 계산.
/// `amount_out = amount_in·(1−fee)·reserve_out / (reserve_in + amount_in·(1−fee))`
/// 오버플로우 시 0을 반환해 해당 후보를 탈락시킨다.
pub fn constant_product_out(
    amount_in: U256,
    reserve_in: U256,
    reserve_out: U256,
    fee_bps: u32,
) -> U256 {
    if amount_in.is_zero() || reserve_in.is_zero() || reserve_out.is_zero() {
        return U256::ZERO;
    }
    let fee_numerator = U256::from(BPS_DENOMINATOR - u64::from(fee_bps));
    let denominator_bps = U256::from(BPS_DENOMINATOR);

    let amount_with_fee = match amount_in.checked_mul(fee_numerator) {
        Some(v) => v,
        None => return U256::ZERO,
    };
    let numerator = match amount_with_fee.checked_mul(reserve_out) {
        Some(v) => v,
        None => return U256::ZERO,
    };
    let denominator = match reserve_in
        .checked_mul(denominator_bps)
        .and_then(|v| v.checked_add(amount_with_fee))
    {
        Some(v) => v,
        None => return U256::ZERO,
    };
    if denominator.is_zero() {
        return U256::ZERO;
    }
    numerator / denominator
}

/// U256를 근사 f64로 변환 (표시/비율 계산 전용)
pub fn u256_to_f64(value: U256) -> f64 {
    value.to_string().parse::<f64>().unwrap_or(f64::MAX)
}

/// 거래 수량을 경로 전체 리저브 깊이에 대한 백분율로 환산, 100 상한
pub fn price_impact_percent(amount_in: U256, aggregate_reserve_in: U256) -> f64 {
    if aggregate_reserve_in.is_zero() {
        return 100.0;
    }
    let impact = u256_to_f64(amount_in) / u256_to_f64(aggregate_reserve_in) * 100.0;
    impact.min(100.0)
}

/// 프로브 추정치에 적용하는 볼록성 할인 (basis points).
/// 실제 수량과 프로브 수량의 비율이 커질수록 할인도 커진다. 30% 상한.
pub fn convexity_discount_bps(ratio: u64) -> u64 {
    (ratio.saturating_sub(1)).saturating_mul(150).min(3_000)
}

/// 동적 슬리피지 권고치 (%). 사용자 입력이 아니라 경로 특성에서 도출된다.
///
/// 기본 0.5%에 가격 영향 구간별 가산(>5 → +2, >10 → +5, >20 → +10,
/// >50 → +20, 누적), fee-on-transfer 플래그 시 +15, 저유동성 시 +10을
/// 더하고 50%로 자른다.
pub fn dynamic_slippage_percent(
    price_impact_percent: f64,
    fee_on_transfer: bool,
    low_liquidity: bool,
) -> f64 {
    let mut slippage: f64 = 0.5;
    if price_impact_percent > 5.0 {
        slippage += 2.0;
    }
    if price_impact_percent > 10.0 {
        slippage += 5.0;
    }
    if price_impact_percent > 20.0 {
        slippage += 10.0;
    }
    if price_impact_percent > 50.0 {
        slippage += 20.0;
    }
    if fee_on_transfer {
        slippage += 15.0;
    }
    if low_liquidity {
        slippage += 10.0;
    }
    slippage.min(MAX_SLIPPAGE_PERCENT)
}
