// quote-router: 멀티체인 스왑 견적 라우팅 코어

pub mod amount;
pub mod cache;
pub mod config;
pub mod constants;
pub mod onchain;
pub mod orchestrator;
pub mod pathfinder;
pub mod providers;
pub mod types;

// Re-exports for convenience
pub use config::{ChainConfig, Config};
pub use orchestrator::{OrchestratorSettings, QuoteOrchestrator};
pub use providers::{ProviderKind, ProviderRegistry, QuoteProvider};
pub use types::{Pool, Quote, QuoteError, Route, TradeRequest};

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// 전역 tracing 구독자 초기화. `RUST_LOG`를 존중하며 중복 호출은 무시된다.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    });
}
