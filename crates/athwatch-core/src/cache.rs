//! Injected peak cache.
//!
//! Peak resolution stays pure; callers that want to skip repeat history
//! fetches hand the batch retriever a [`PeakCache`]. Nothing is persisted
//! across process restarts.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::{PeakRecord, Symbol};

/// Default lifetime of a cached peak.
pub const DEFAULT_PEAK_TTL: Duration = Duration::from_secs(60 * 60);

pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Cache contract for resolved peaks.
pub trait PeakCache: Send + Sync {
    fn get<'a>(&'a self, symbol: &'a Symbol) -> CacheFuture<'a, Option<PeakRecord>>;

    fn put<'a>(&'a self, symbol: Symbol, record: PeakRecord, ttl: Duration) -> CacheFuture<'a, ()>;
}

/// Cache that stores nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPeakCache;

impl PeakCache for NoopPeakCache {
    fn get<'a>(&'a self, _symbol: &'a Symbol) -> CacheFuture<'a, Option<PeakRecord>> {
        Box::pin(async { None })
    }

    fn put<'a>(&'a self, _symbol: Symbol, _record: PeakRecord, _ttl: Duration) -> CacheFuture<'a, ()> {
        Box::pin(async {})
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    record: PeakRecord,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|expires_at| now <= expires_at)
    }
}

/// Thread-safe in-process cache with per-entry expiry.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPeakCache {
    inner: Arc<tokio::sync::RwLock<HashMap<Symbol, CacheEntry>>>,
}

impl InMemoryPeakCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove expired entries.
    pub async fn clear_expired(&self) {
        let now = Instant::now();
        self.inner.write().await.retain(|_, entry| entry.is_live(now));
    }

    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }

    /// Number of entries, including expired ones not yet cleared.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

impl PeakCache for InMemoryPeakCache {
    fn get<'a>(&'a self, symbol: &'a Symbol) -> CacheFuture<'a, Option<PeakRecord>> {
        Box::pin(async move {
            let store = self.inner.read().await;
            store
                .get(symbol)
                .filter(|entry| entry.is_live(Instant::now()))
                .map(|entry| entry.record.clone())
        })
    }

    fn put<'a>(&'a self, symbol: Symbol, record: PeakRecord, ttl: Duration) -> CacheFuture<'a, ()> {
        Box::pin(async move {
            if ttl.is_zero() {
                return;
            }
            let expires_at = Instant::now().checked_add(ttl);
            self.inner
                .write()
                .await
                .insert(symbol, CacheEntry { record, expires_at });
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UtcDateTime;

    fn record(raw: &str, price: f64) -> (Symbol, PeakRecord) {
        let symbol = Symbol::parse(raw).expect("symbol");
        let record = PeakRecord::resolved(symbol.clone(), price, UtcDateTime::now());
        (symbol, record)
    }

    #[tokio::test]
    async fn stores_and_overwrites_records() {
        let cache = InMemoryPeakCache::new();
        let (symbol, first) = record("VTI", 300.0);

        assert!(cache.get(&symbol).await.is_none());

        cache.put(symbol.clone(), first.clone(), Duration::from_secs(60)).await;
        assert_eq!(cache.get(&symbol).await, Some(first));

        let (_, second) = record("VTI", 310.0);
        cache.put(symbol.clone(), second.clone(), Duration::from_secs(60)).await;
        assert_eq!(cache.get(&symbol).await, Some(second));
    }

    #[tokio::test]
    async fn expired_entries_are_not_returned() {
        let cache = InMemoryPeakCache::new();
        let (symbol, peak) = record("QQQ", 500.0);

        cache.put(symbol.clone(), peak, Duration::from_millis(20)).await;
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(cache.get(&symbol).await.is_none());
        assert_eq!(cache.len().await, 1);
        cache.clear_expired().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn zero_ttl_is_not_stored() {
        let cache = InMemoryPeakCache::new();
        let (symbol, peak) = record("SPY", 600.0);

        cache.put(symbol.clone(), peak, Duration::ZERO).await;
        assert!(cache.get(&symbol).await.is_none());
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn oversized_ttl_keeps_entry_without_expiry() {
        let cache = InMemoryPeakCache::new();
        let (symbol, peak) = record("DIA", 420.0);

        cache.put(symbol.clone(), peak.clone(), Duration::from_secs(u64::MAX)).await;
        cache.clear_expired().await;

        assert_eq!(cache.get(&symbol).await, Some(peak));
    }

    #[tokio::test]
    async fn noop_cache_never_returns_anything() {
        let (symbol, peak) = record("SPY", 600.0);
        NoopPeakCache.put(symbol.clone(), peak, DEFAULT_PEAK_TTL).await;
        assert!(NoopPeakCache.get(&symbol).await.is_none());
    }
}
