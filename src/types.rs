use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::amount;
use crate::constants::DEFAULT_DECIMALS;

/// EVM 체인 식별자 (1 = Ethereum, 56 = BSC, 137 = Polygon, ...)
pub type ChainId = u64;

/// 견적 조회 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum QuoteError {
    #[error("Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    #[error("No route found (attempted providers: {})", attempted.join(", "))]
    NoRoute { attempted: Vec<String> },

    #[error("Unsupported chain: {chain_id}")]
    UnsupportedChain { chain_id: ChainId },
}

/// 사용자 스왑 요청
///
/// `source_amount`는 최소 단위(wei 등)의 정수 문자열이어야 한다.
/// 네이티브 자산은 예약된 의사 주소(`constants::NATIVE_TOKEN`)로 표현된다.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeRequest {
    /// 소스 체인 ID
    pub source_chain_id: ChainId,
    /// 목적 체인 ID (동일 체인 스왑이면 소스와 같음)
    pub dest_chain_id: ChainId,
    /// 판매 토큰 주소
    pub source_token: Address,
    /// 구매 토큰 주소
    pub dest_token: Address,
    /// 판매 수량 (최소 단위 정수 문자열)
    pub source_amount: String,
    /// 요청자 지갑 주소
    pub requester: Address,
    /// 수령자 주소 (생략 시 요청자와 동일)
    pub recipient: Option<Address>,
    /// 슬리피지 허용치 (%, 생략 시 기본값)
    pub slippage_tolerance_percent: Option<f64>,
}

impl TradeRequest {
    /// 크로스체인 요청 여부
    pub fn is_cross_chain(&self) -> bool {
        self.source_chain_id != self.dest_chain_id
    }

    /// 요청 불변식 검증: 체인 ID는 양수, 수량은 음이 아닌 정수 문자열
    pub fn validate(&self) -> Result<(), QuoteError> {
        if self.source_chain_id == 0 || self.dest_chain_id == 0 {
            return Err(QuoteError::UnsupportedChain { chain_id: 0 });
        }
        let normalized = amount::normalize(&self.source_amount)?;
        if !amount::is_canonical_nonneg_int(&normalized) {
            return Err(QuoteError::InvalidAmount {
                reason: format!("source amount must be non-negative: {}", self.source_amount),
            });
        }
        Ok(())
    }
}

/// 프로바이더가 생성한 견적
///
/// `execution_payload`는 코어 입장에서 의미 없는 불투명 데이터로,
/// 호출자가 실행 트랜잭션을 구성할 때 그대로 전달한다.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quote {
    /// 견적을 생성한 프로바이더 ID
    pub provider_id: String,
    /// 예상 수령 수량 (최소 단위 정수 문자열)
    pub dest_amount: String,
    /// 최소 수령 수량 (슬리피지 반영, dest_amount 이하)
    pub dest_amount_min: String,
    /// 가스 추정량
    pub estimated_gas_units: u64,
    /// 유동성 점수 (0~100, 높을수록 좋음)
    pub liquidity_score: u8,
    /// 가격 영향 (%, 0~100)
    pub price_impact_percent: f64,
    /// 스왑 경로 토큰 목록 (불투명 견적은 빈 목록)
    pub route: Vec<Address>,
    /// 실행 트랜잭션 구성용 불투명 페이로드
    pub execution_payload: serde_json::Value,
    /// 구매 토큰의 소수점 자릿수 (표시용, 조회 실패 시 18)
    pub dest_token_decimals: u8,
    /// 견적 생성 시간
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Quote {
    pub fn new(
        provider_id: impl Into<String>,
        dest_amount: String,
        dest_amount_min: String,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            dest_amount,
            dest_amount_min,
            estimated_gas_units: 0,
            liquidity_score: 0,
            price_impact_percent: 0.0,
            route: Vec::new(),
            execution_payload: serde_json::Value::Null,
            dest_token_decimals: DEFAULT_DECIMALS,
            created_at: chrono::Utc::now(),
        }
    }

    /// 최소 수령 수량이 예상 수량을 초과하지 않는지 확인
    pub fn min_within_bounds(&self) -> bool {
        use num_bigint::BigUint;
        let amount = BigUint::parse_bytes(self.dest_amount.as_bytes(), 10);
        let min = BigUint::parse_bytes(self.dest_amount_min.as_bytes(), 10);
        match (amount, min) {
            (Some(amount), Some(min)) => min <= amount,
            _ => false,
        }
    }
}

/// AMM 풀 정보 (패스파인더 내부용)
///
/// token0/token1 순서는 온체인 팩토리가 결정하며 이 시스템은 건드리지 않는다.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pool {
    pub pair: Address,
    pub token0: Address,
    pub token1: Address,
    pub reserve0: U256,
    pub reserve1: U256,
}

impl Pool {
    /// 주어진 입력 토큰 기준으로 (reserve_in, reserve_out)을 반환
    pub fn reserves_for(&self, token_in: Address) -> Option<(U256, U256)> {
        if token_in == self.token0 {
            Some((self.reserve0, self.reserve1))
        } else if token_in == self.token1 {
            Some((self.reserve1, self.reserve0))
        } else {
            None
        }
    }
}

/// 패스파인더가 찾아낸 스왑 경로
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Route {
    /// 토큰 주소 경로 (2개 이상, 중복 없음, 최대 3홉)
    pub path: Vec<Address>,
    /// 예상 출력 수량
    pub expected_output: U256,
    /// 가격 영향 (%, 0~100)
    pub price_impact_percent: f64,
    /// 경로 전체의 유동성 깊이 (비교용 단위)
    pub aggregate_liquidity: U256,
    /// 동적 슬리피지 권고치 (%)
    pub recommended_slippage_percent: f64,
}

impl Route {
    /// 홉 수 (경로 길이 - 1)
    pub fn hop_count(&self) -> usize {
        self.path.len().saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::from_slice(&[n; 20])
    }

    fn request() -> TradeRequest {
        TradeRequest {
            source_chain_id: 56,
            dest_chain_id: 56,
            source_token: addr(1),
            dest_token: addr(2),
            source_amount: "1000000".to_string(),
            requester: addr(9),
            recipient: None,
            slippage_tolerance_percent: None,
        }
    }

    #[test]
    fn test_cross_chain_detection() {
        let mut req = request();
        assert!(!req.is_cross_chain());
        req.dest_chain_id = 1;
        assert!(req.is_cross_chain());
    }

    #[test]
    fn test_validate_rejects_zero_chain() {
        let mut req = request();
        req.source_chain_id = 0;
        assert!(matches!(
            req.validate(),
            Err(QuoteError::UnsupportedChain { chain_id: 0 })
        ));
    }

    #[test]
    fn test_validate_rejects_negative_amount() {
        let mut req = request();
        req.source_amount = "-5".to_string();
        assert!(matches!(req.validate(), Err(QuoteError::InvalidAmount { .. })));
    }

    #[test]
    fn test_quote_min_within_bounds() {
        let ok = Quote::new("p", "100".to_string(), "95".to_string());
        assert!(ok.min_within_bounds());

        let bad = Quote::new("p", "100".to_string(), "101".to_string());
        assert!(!bad.min_within_bounds());
    }

    #[test]
    fn test_pool_reserve_ordering() {
        let pool = Pool {
            pair: addr(3),
            token0: addr(1),
            token1: addr(2),
            reserve0: U256::from(100u64),
            reserve1: U256::from(200u64),
        };
        assert_eq!(
            pool.reserves_for(addr(1)),
            Some((U256::from(100u64), U256::from(200u64)))
        );
        assert_eq!(
            pool.reserves_for(addr(2)),
            Some((U256::from(200u64), U256::from(100u64)))
        );
        assert_eq!(pool.reserves_for(addr(7)), None);
    }

    #[test]
    fn test_request_serde_round_trip() {
        let req = request();
        let json = serde_json::to_string(&req).unwrap();
        let back: TradeRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(req, back);
    }
}
