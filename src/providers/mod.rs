//! 견적 프로바이더 어댑터
//!
//! 외부 소스(애그리게이터 API, 크로스체인 브리지, 온체인 패스파인더)를
//! 동일한 `QuoteProvider` 인터페이스 뒤로 감춘다. 응답 형태 번역은 전부
//! 어댑터 내부에서 끝나며, 전송/상태/파싱 장애는 `ProviderError`가 되어
//! 오케스트레이터 호출 지점에서 "없음"으로 강등된다.

pub mod lifi;
pub mod onchain;
pub mod oneinch;
pub mod openocean;
pub mod registry;
pub mod zeroex;

use async_trait::async_trait;
use num_bigint::BigUint;

use crate::constants::DEFAULT_SLIPPAGE_PERCENT;
use crate::types::{Quote, TradeRequest};

pub use registry::ProviderRegistry;

/// 프로바이더 분류. 레지스트리가 체인별 우선순위를 정할 때 쓴다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// 체인 대표 DEX/애그리게이터 (해당 체인에서 우선)
    NativeDex,
    /// 범용 애그리게이터
    Aggregator,
    /// 크로스체인 브리지
    CrossChain,
    /// 온체인 패스파인더
    Onchain,
}

impl ProviderKind {
    pub fn is_cross_chain(&self) -> bool {
        matches!(self, ProviderKind::CrossChain)
    }
}

/// 어댑터 경계 내부 에러. 오케스트레이터 밖으로 전파되지 않는다.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Unsupported request: {0}")]
    Unsupported(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Http(err.to_string())
    }
}

/// 견적 프로바이더 공통 인터페이스
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// 안정적인 프로바이더 ID (설정의 우선순위 목록과 일치)
    fn id(&self) -> &str;

    fn kind(&self) -> ProviderKind;

    /// 이 요청을 처리할 수 있는지 (체인 지원 여부 등)
    fn supports(&self, request: &TradeRequest) -> bool;

    async fn quote(&self, request: &TradeRequest) -> Result<Quote, ProviderError>;
}

/// 요청 슬리피지 또는 시스템 기본값 (%)
pub(crate) fn slippage_or_default(request: &TradeRequest) -> f64 {
    request
        .slippage_tolerance_percent
        .unwrap_or(DEFAULT_SLIPPAGE_PERCENT)
}

/// 슬리피지를 반영한 최소 수령량. 정수 문자열에 대해 정확한 정수
/// 연산으로 계산한다 (내림, 음수 없음).
pub(crate) fn apply_slippage(dest_amount: &str, slippage_percent: f64) -> String {
    let Some(amount) = BigUint::parse_bytes(dest_amount.as_bytes(), 10) else {
        return "0".to_string();
    };
    let slippage_bps = (slippage_percent.clamp(0.0, 100.0) * 100.0).round() as u64;
    let kept = 10_000u64.saturating_sub(slippage_bps);
    (amount * BigUint::from(kept) / BigUint::from(10_000u64)).to_string()
}

/// 가격 영향에서 유동성 점수(0~100)를 도출하는 공용 휴리스틱
pub(crate) fn liquidity_score_from_impact(price_impact_percent: f64) -> u8 {
    (100.0 - price_impact_percent.clamp(0.0, 100.0) * 2.0).clamp(0.0, 100.0) as u8
}
