//! TTL 기반 핑거프린트 캐시
//!
//! 짧은 TTL(수 초~수십 초)로 중복/연속 요청만 흡수한다. 시간이 지나도
//! 유효한 가격 소스가 아니다. 만료 항목은 `get` 시점에 게으르게 제거되며
//! 백그라운드 스윕은 없다.

use std::hash::Hash;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::amount;
use crate::constants::DEFAULT_SLIPPAGE_PERCENT;
use crate::types::{Quote, TradeRequest};

/// 범용 TTL 키-값 저장소. 항목은 불변이며 삽입으로만 교체된다
/// (동시 put은 last-write-wins).
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: DashMap<K, CacheEntry<V>>,
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    created_at: Instant,
    expires_at: Instant,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// 만료된 키는 미스로 취급하고 그 자리에서 제거한다
    pub fn get(&self, key: &K) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some(entry) => {
                debug_assert!(entry.created_at < entry.expires_at);
                if Instant::now() < entry.expires_at {
                    return Some(entry.value.clone());
                }
                true
            }
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }
        None
    }

    pub fn insert(&self, key: K, value: V) {
        let now = Instant::now();
        self.entries.insert(
            key,
            CacheEntry {
                value,
                created_at: now,
                expires_at: now + self.ttl,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Deterministic fingerprint over the price-relevant request fields.
/// Two requests that agree on chains, tokens, normalized amount and
/// slippage collide regardless of how the caller assembled them.
pub fn fingerprint(request: &TradeRequest) -> Option<String> {
    let amount = amount::normalize(&request.source_amount).ok()?;
    let slippage = request
        .slippage_tolerance_percent
        .unwrap_or(DEFAULT_SLIPPAGE_PERCENT);
    Some(format!(
        "{}:{}:{:#x}:{:#x}:{}:{}",
        request.source_chain_id,
        request.dest_chain_id,
        request.source_token,
        request.dest_token,
        amount,
        slippage,
    ))
}

/// 견적 캐시: TradeRequest 핑거프린트 -> Quote
pub struct QuoteCache {
    inner: TtlCache<String, Quote>,
}

impl QuoteCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: TtlCache::new(ttl),
        }
    }

    pub fn get(&self, request: &TradeRequest) -> Option<Quote> {
        let key = fingerprint(request)?;
        self.inner.get(&key)
    }

    pub fn insert(&self, request: &TradeRequest, quote: Quote) {
        if let Some(key) = fingerprint(request) {
            self.inner.insert(key, quote);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
