//! 견적 오케스트레이터
//!
//! 단일 진입점 `get_quote`는 캐시 → 레이스 → 순차 → 전수 순서의
//! 체감 티어로 프로바이더를 소진한다. 프로바이더 실패·타임아웃·0 출력은
//! 모두 "없음"으로 강등되며 에러로 전파되지 않는다. 모든 티어가 비면
//! 시도한 프로바이더 목록과 함께 `NoRoute`를 돌려준다.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use futures::stream::{FuturesUnordered, StreamExt};
use num_bigint::BigUint;
use num_traits::Zero;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::cache::QuoteCache;
use crate::config::Config;
use crate::onchain::{AmmDecimalsResolver, DecimalsResolver};
use crate::providers::{ProviderRegistry, QuoteProvider};
use crate::types::{Quote, QuoteError, TradeRequest};

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// 레이스 티어에서 동시에 띄우는 프로바이더 수
    pub race_width: usize,
    pub race_timeout: Duration,
    pub sequential_timeout: Duration,
    pub exhaustive_timeout: Duration,
    pub cache_ttl: Duration,
}

impl From<&Config> for OrchestratorSettings {
    fn from(config: &Config) -> Self {
        Self {
            race_width: config.race_width,
            race_timeout: Duration::from_millis(config.race_timeout_ms),
            sequential_timeout: Duration::from_millis(config.sequential_timeout_ms),
            exhaustive_timeout: Duration::from_millis(config.exhaustive_timeout_ms),
            cache_ttl: Duration::from_secs(config.cache_ttl_secs),
        }
    }
}

pub struct QuoteOrchestrator {
    registry: Arc<ProviderRegistry>,
    decimals: Arc<dyn DecimalsResolver>,
    cache: QuoteCache,
    settings: OrchestratorSettings,
}

impl QuoteOrchestrator {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        decimals: Arc<dyn DecimalsResolver>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            registry,
            decimals,
            cache: QuoteCache::new(settings.cache_ttl),
            settings,
        }
    }

    /// 설정에서 전체 스택(레지스트리, RPC 클라이언트, decimals 조회) 조립
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let clients = ProviderRegistry::build_clients(config)?;
        let registry = ProviderRegistry::with_clients(config, &clients)?;
        let decimals = Arc::new(AmmDecimalsResolver::new(clients));
        Ok(Self::new(
            Arc::new(registry),
            decimals,
            OrchestratorSettings::from(config),
        ))
    }

    pub async fn get_quote(&self, request: &TradeRequest) -> Result<Quote, QuoteError> {
        request.validate()?;

        if let Some(cached) = self.cache.get(request) {
            debug!(provider = %cached.provider_id, "💾 cache hit, suppressing provider calls");
            return Ok(cached);
        }

        let providers = self.registry.providers_for(request)?;
        let attempted: Vec<String> = providers.iter().map(|p| p.id().to_string()).collect();

        // 티어 1: 선두 K개 레이스, 첫 성공 채택
        let race_count = providers.len().min(self.settings.race_width);
        if race_count > 0 {
            if let Some(quote) = self.race_tier(&providers[..race_count], request).await {
                return Ok(self.finish(request, quote, "race").await);
            }
        }

        // 티어 2: 나머지를 더 짧은 타임아웃으로 순차 시도
        for provider in &providers[race_count..] {
            if let Some(quote) = call_provider(
                Arc::clone(provider),
                request.clone(),
                self.settings.sequential_timeout,
            )
            .await
            {
                return Ok(self.finish(request, quote, "sequential").await);
            }
        }

        // 티어 3: 전체를 가장 긴 타임아웃으로 동시 재시도, 전부 기다린 뒤
        // 정확한 정수 비교로 순위를 매긴다
        let results = join_all(providers.iter().map(|provider| {
            call_provider(
                Arc::clone(provider),
                request.clone(),
                self.settings.exhaustive_timeout,
            )
        }))
        .await;

        if let Some(quote) = rank_quotes(results.into_iter().flatten().collect()) {
            return Ok(self.finish(request, quote, "exhaustive").await);
        }

        warn!(
            chain = request.source_chain_id,
            attempted = ?attempted,
            "❌ no route from any provider"
        );
        Err(QuoteError::NoRoute { attempted })
    }

    /// 레이스 티어: 태스크로 띄우고 먼저 완주한 성공을 채택한다.
    /// 패자 태스크는 분리된 채 완주 후 버려진다.
    async fn race_tier(
        &self,
        providers: &[Arc<dyn QuoteProvider>],
        request: &TradeRequest,
    ) -> Option<Quote> {
        let mut inflight = FuturesUnordered::new();
        for provider in providers {
            inflight.push(tokio::spawn(call_provider(
                Arc::clone(provider),
                request.clone(),
                self.settings.race_timeout,
            )));
        }

        while let Some(joined) = inflight.next().await {
            if let Ok(Some(quote)) = joined {
                debug!(winner = %quote.provider_id, "🏁 race tier adopted first success");
                return Some(quote);
            }
        }
        None
    }

    async fn finish(&self, request: &TradeRequest, mut quote: Quote, tier: &str) -> Quote {
        // 표시용 decimals 보강 (실패 시 기본 18 유지)
        if let Some(decimals) = self
            .decimals
            .decimals_of(request.dest_token, request.dest_chain_id)
            .await
        {
            quote.dest_token_decimals = decimals;
        }
        self.cache.insert(request, quote.clone());
        info!(
            provider = %quote.provider_id,
            tier,
            dest_amount = %quote.dest_amount,
            "✅ quote selected"
        );
        quote
    }
}

/// 한 프로바이더 호출을 타임아웃 아래에서 실행하고 결과를 "있음/없음"으로
/// 접는다. 실패, 타임아웃, 0 출력은 모두 없음이다.
async fn call_provider(
    provider: Arc<dyn QuoteProvider>,
    request: TradeRequest,
    limit: Duration,
) -> Option<Quote> {
    match timeout(limit, provider.quote(&request)).await {
        Ok(Ok(quote)) => {
            if !parse_amount(&quote.dest_amount).is_zero() {
                Some(quote)
            } else {
                debug!(provider = provider.id(), "null quote (zero output)");
                None
            }
        }
        Ok(Err(err)) => {
            debug!(provider = provider.id(), "provider failed: {err}");
            None
        }
        Err(_) => {
            warn!(
                provider = provider.id(),
                timeout_ms = limit.as_millis() as u64,
                "provider timed out"
            );
            None
        }
    }
}

fn parse_amount(text: &str) -> BigUint {
    BigUint::parse_bytes(text.as_bytes(), 10).unwrap_or_default()
}

/// 전수 티어 순위: 수령량 내림차순(정확한 정수 비교, 부동소수점 금지),
/// 동률이면 유동성 점수 내림차순, 다시 동률이면 가격 영향 오름차순
fn rank_quotes(quotes: Vec<Quote>) -> Option<Quote> {
    quotes.into_iter().max_by(|a, b| {
        parse_amount(&a.dest_amount)
            .cmp(&parse_amount(&b.dest_amount))
            .then(a.liquidity_score.cmp(&b.liquidity_score))
            .then(
                b.price_impact_percent
                    .partial_cmp(&a.price_impact_percent)
                    .unwrap_or(Ordering::Equal),
            )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ProviderError, ProviderKind};
    use alloy::primitives::Address;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    fn addr(n: u8) -> Address {
        Address::from_slice(&[n; 20])
    }

    fn request() -> TradeRequest {
        TradeRequest {
            source_chain_id: 56,
            dest_chain_id: 56,
            source_token: addr(1),
            dest_token: addr(2),
            source_amount: "1000000000000000000".to_string(),
            requester: addr(9),
            recipient: None,
            slippage_tolerance_percent: None,
        }
    }

    enum Behavior {
        Respond {
            dest_amount: &'static str,
            liquidity_score: u8,
            price_impact: f64,
        },
        Fail,
        Slow {
            delay: Duration,
            dest_amount: &'static str,
        },
    }

    struct MockProvider {
        id: &'static str,
        behavior: Behavior,
        calls: AtomicUsize,
    }

    impl MockProvider {
        fn respond(id: &'static str, dest_amount: &'static str) -> Arc<Self> {
            Arc::new(Self {
                id,
                behavior: Behavior::Respond {
                    dest_amount,
                    liquidity_score: 50,
                    price_impact: 0.1,
                },
                calls: AtomicUsize::new(0),
            })
        }

        fn fail(id: &'static str) -> Arc<Self> {
            Arc::new(Self {
                id,
                behavior: Behavior::Fail,
                calls: AtomicUsize::new(0),
            })
        }

        fn slow(id: &'static str, delay_ms: u64, dest_amount: &'static str) -> Arc<Self> {
            Arc::new(Self {
                id,
                behavior: Behavior::Slow {
                    delay: Duration::from_millis(delay_ms),
                    dest_amount,
                },
                calls: AtomicUsize::new(0),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(AtomicOrdering::SeqCst)
        }
    }

    #[async_trait]
    impl QuoteProvider for MockProvider {
        fn id(&self) -> &str {
            self.id
        }

        fn kind(&self) -> ProviderKind {
            ProviderKind::Aggregator
        }

        fn supports(&self, _request: &TradeRequest) -> bool {
            true
        }

        async fn quote(&self, _request: &TradeRequest) -> Result<Quote, ProviderError> {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            match &self.behavior {
                Behavior::Respond {
                    dest_amount,
                    liquidity_score,
                    price_impact,
                } => {
                    let mut quote =
                        Quote::new(self.id, dest_amount.to_string(), dest_amount.to_string());
                    quote.liquidity_score = *liquidity_score;
                    quote.price_impact_percent = *price_impact;
                    Ok(quote)
                }
                Behavior::Fail => Err(ProviderError::Http("connection refused".to_string())),
                Behavior::Slow { delay, dest_amount } => {
                    tokio::time::sleep(*delay).await;
                    Ok(Quote::new(
                        self.id,
                        dest_amount.to_string(),
                        dest_amount.to_string(),
                    ))
                }
            }
        }
    }

    struct FixedDecimals(u8);

    #[async_trait]
    impl DecimalsResolver for FixedDecimals {
        async fn decimals_of(&self, _token: Address, _chain_id: u64) -> Option<u8> {
            Some(self.0)
        }
    }

    fn settings() -> OrchestratorSettings {
        OrchestratorSettings {
            race_width: 4,
            race_timeout: Duration::from_millis(200),
            sequential_timeout: Duration::from_millis(100),
            exhaustive_timeout: Duration::from_millis(2_000),
            cache_ttl: Duration::from_secs(10),
        }
    }

    fn orchestrator(
        providers: Vec<Arc<dyn QuoteProvider>>,
        settings: OrchestratorSettings,
    ) -> QuoteOrchestrator {
        let registry = ProviderRegistry::new(HashMap::from([(56u64, providers)]), Vec::new());
        QuoteOrchestrator::new(Arc::new(registry), Arc::new(FixedDecimals(6)), settings)
    }

    fn quote_with(dest_amount: &str, liquidity_score: u8, price_impact: f64) -> Quote {
        let mut quote = Quote::new("p", dest_amount.to_string(), dest_amount.to_string());
        quote.liquidity_score = liquidity_score;
        quote.price_impact_percent = price_impact;
        quote
    }

    #[test]
    fn test_rank_by_exact_integer_amount() {
        let winner = rank_quotes(vec![
            quote_with("100", 50, 0.1),
            quote_with("90", 50, 0.1),
            quote_with("110", 50, 0.1),
        ])
        .unwrap();
        assert_eq!(winner.dest_amount, "110");

        // f64로는 구분 불가능한 자릿수에서도 정확히 비교해야 한다
        let winner = rank_quotes(vec![
            quote_with("10000000000000000000000000", 50, 0.1),
            quote_with("10000000000000000000000001", 50, 0.1),
        ])
        .unwrap();
        assert_eq!(winner.dest_amount, "10000000000000000000000001");
    }

    #[test]
    fn test_rank_tie_breaks_on_liquidity_then_impact() {
        let winner = rank_quotes(vec![
            quote_with("100", 40, 0.1),
            quote_with("100", 80, 0.1),
        ])
        .unwrap();
        assert_eq!(winner.liquidity_score, 80);

        let winner = rank_quotes(vec![
            quote_with("100", 50, 2.0),
            quote_with("100", 50, 0.5),
        ])
        .unwrap();
        assert_eq!(winner.price_impact_percent, 0.5);
    }

    #[tokio::test]
    async fn test_race_adopts_first_success() {
        // 느린 쪽이 더 좋은 견적을 내더라도 레이스 티어는 첫 완주를 택한다
        let fast = MockProvider::respond("fast", "100");
        let slow = MockProvider::slow("slow", 150, "200");
        let orchestrator = orchestrator(vec![slow, Arc::clone(&fast) as _], settings());

        let quote = orchestrator.get_quote(&request()).await.unwrap();
        assert_eq!(quote.provider_id, "fast");
    }

    #[tokio::test]
    async fn test_sequential_tier_after_race_failures() {
        let mut cfg = settings();
        cfg.race_width = 1;
        let backup = MockProvider::respond("backup", "100");
        let orchestrator =
            orchestrator(vec![MockProvider::fail("down") as _, Arc::clone(&backup) as _], cfg);

        let quote = orchestrator.get_quote(&request()).await.unwrap();
        assert_eq!(quote.provider_id, "backup");
    }

    #[tokio::test]
    async fn test_exhaustive_tier_recovers_slow_provider() {
        // 레이스/순차 타임아웃은 넘기고 전수 타임아웃 안에는 완주하는 경우
        let mut cfg = settings();
        cfg.race_timeout = Duration::from_millis(100);
        cfg.sequential_timeout = Duration::from_millis(50);
        let provider = MockProvider::slow("tortoise", 300, "100");
        let orchestrator = orchestrator(vec![Arc::clone(&provider) as _], cfg);

        let quote = orchestrator.get_quote(&request()).await.unwrap();
        assert_eq!(quote.provider_id, "tortoise");
    }

    #[tokio::test]
    async fn test_no_route_lists_attempted_providers() {
        let orchestrator = orchestrator(
            vec![MockProvider::fail("a") as _, MockProvider::fail("b") as _],
            settings(),
        );
        match orchestrator.get_quote(&request()).await {
            Err(QuoteError::NoRoute { attempted }) => {
                assert_eq!(attempted, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("expected NoRoute, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_zero_output_is_treated_as_null() {
        let orchestrator = orchestrator(vec![MockProvider::respond("zero", "0") as _], settings());
        assert!(matches!(
            orchestrator.get_quote(&request()).await,
            Err(QuoteError::NoRoute { .. })
        ));
    }

    #[tokio::test]
    async fn test_cache_suppresses_second_call() {
        let provider = MockProvider::respond("only", "100");
        let orchestrator = orchestrator(vec![Arc::clone(&provider) as _], settings());

        let first = orchestrator.get_quote(&request()).await.unwrap();
        let second = orchestrator.get_quote(&request()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_cache_expiry_triggers_fresh_fetch() {
        let mut cfg = settings();
        cfg.cache_ttl = Duration::from_millis(50);
        let provider = MockProvider::respond("only", "100");
        let orchestrator = orchestrator(vec![Arc::clone(&provider) as _], cfg);

        orchestrator.get_quote(&request()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        orchestrator.get_quote(&request()).await.unwrap();
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_validation_rejects_before_any_provider_call() {
        let provider = MockProvider::respond("only", "100");
        let orchestrator = orchestrator(vec![Arc::clone(&provider) as _], settings());

        let mut bad = request();
        bad.source_amount = "-5".to_string();
        assert!(matches!(
            orchestrator.get_quote(&bad).await,
            Err(QuoteError::InvalidAmount { .. })
        ));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unsupported_chain() {
        let orchestrator = orchestrator(vec![MockProvider::respond("only", "100") as _], settings());
        let mut req = request();
        req.source_chain_id = 424242;
        req.dest_chain_id = 424242;
        assert!(matches!(
            orchestrator.get_quote(&req).await,
            Err(QuoteError::UnsupportedChain { chain_id: 424242 })
        ));
    }

    #[tokio::test]
    async fn test_end_to_end_bsc_flow() {
        // 실패 / 정상 / 0 출력 프로바이더가 섞인 BSC 요청:
        // 정상 견적이 채택되고 decimals가 보강되며 재요청은 캐시로 흡수된다
        let healthy = MockProvider::respond("healthy", "950000000000000000");
        let providers: Vec<Arc<dyn QuoteProvider>> = vec![
            MockProvider::fail("down") as _,
            Arc::clone(&healthy) as _,
            MockProvider::respond("empty", "0") as _,
        ];
        let orchestrator = orchestrator(providers, settings());

        let quote = orchestrator.get_quote(&request()).await.unwrap();
        assert_eq!(quote.provider_id, "healthy");
        assert_eq!(quote.dest_amount, "950000000000000000");
        assert_eq!(quote.dest_token_decimals, 6);
        assert!(quote.min_within_bounds());

        let again = orchestrator.get_quote(&request()).await.unwrap();
        assert_eq!(again, quote);
        assert_eq!(healthy.call_count(), 1);
    }
}
