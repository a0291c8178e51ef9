//! Rate-limited batch peak retrieval.
//!
//! Symbols are processed one after another through a [`RequestPacer`]; each
//! history fetch is retried per [`RetryConfig`] and a symbol whose attempts are
//! exhausted receives a fallback [`PeakRecord`]. The returned map always holds
//! exactly one record per distinct input symbol.
//!
//! Worst-case duration is bounded by
//! `symbols × attempts × pause + symbols × worst_case_backoff`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::cache::{NoopPeakCache, PeakCache, DEFAULT_PEAK_TTL};
use crate::data_source::{MarketDataSource, SourceError};
use crate::pacing::RequestPacer;
use crate::peak::PeakResolver;
use crate::retry::RetryConfig;
use crate::{PeakConfidence, PeakRecord, Symbol, SymbolSeries};

/// How a symbol's record was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeakOutcome {
    Resolved,
    Cached,
    /// Provider failed or returned no usable history; `error` is the last
    /// failure seen.
    Fallback { error: SourceError },
}

/// Result of one batch run.
#[derive(Debug, Clone, Default)]
pub struct PeakBatch {
    pub peaks: HashMap<Symbol, PeakRecord>,
    pub outcomes: HashMap<Symbol, PeakOutcome>,
    pub elapsed: Duration,
}

impl PeakBatch {
    pub fn get(&self, symbol: &Symbol) -> Option<&PeakRecord> {
        self.peaks.get(symbol)
    }

    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    pub fn fallback_count(&self) -> usize {
        self.peaks
            .values()
            .filter(|record| record.confidence == PeakConfidence::Fallback)
            .count()
    }

    /// True when every symbol fell back because the provider transport failed.
    pub fn provider_unreachable(&self) -> bool {
        !self.outcomes.is_empty()
            && self.outcomes.values().all(|outcome| {
                matches!(outcome, PeakOutcome::Fallback { error } if error.is_transport())
            })
    }
}

/// Sequenced, paced peak resolution for many symbols.
#[derive(Clone)]
pub struct BatchRetriever {
    source: Arc<dyn MarketDataSource>,
    resolver: PeakResolver,
    pacer: RequestPacer,
    retry: RetryConfig,
    cache: Arc<dyn PeakCache>,
    cache_ttl: Duration,
}

impl BatchRetriever {
    pub fn new(source: Arc<dyn MarketDataSource>) -> Self {
        Self {
            source,
            resolver: PeakResolver::default(),
            pacer: RequestPacer::default(),
            retry: RetryConfig::default(),
            cache: Arc::new(NoopPeakCache),
            cache_ttl: DEFAULT_PEAK_TTL,
        }
    }

    pub fn with_resolver(mut self, resolver: PeakResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_pacer(mut self, pacer: RequestPacer) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn PeakCache>, ttl: Duration) -> Self {
        self.cache = cache;
        self.cache_ttl = ttl;
        self
    }

    pub fn resolver(&self) -> &PeakResolver {
        &self.resolver
    }

    /// Resolves a peak for every distinct symbol. Never fails.
    pub async fn retrieve(&self, symbols: &[Symbol]) -> PeakBatch {
        let started = Instant::now();
        let mut batch = PeakBatch::default();

        for symbol in symbols {
            if batch.peaks.contains_key(symbol) {
                continue;
            }

            let (record, outcome) = self.retrieve_one(symbol).await;
            batch.peaks.insert(symbol.clone(), record);
            batch.outcomes.insert(symbol.clone(), outcome);
        }

        batch.elapsed = started.elapsed();
        info!(
            source = self.source.id(),
            symbols = batch.len(),
            fallback = batch.fallback_count(),
            elapsed_ms = batch.elapsed.as_millis() as u64,
            "peak batch complete"
        );
        batch
    }

    async fn retrieve_one(&self, symbol: &Symbol) -> (PeakRecord, PeakOutcome) {
        if let Some(cached) = self.cache.get(symbol).await {
            debug!(%symbol, "peak served from cache");
            return (cached, PeakOutcome::Cached);
        }

        match self.fetch_with_retry(symbol).await {
            Ok(series) => {
                let record = self.resolver.resolve(&series, None);
                self.cache
                    .put(symbol.clone(), record.clone(), self.cache_ttl)
                    .await;
                (record, PeakOutcome::Resolved)
            }
            Err(error) => {
                warn!(%symbol, %error, "using fallback peak");
                (self.resolver.fallback(symbol, None), PeakOutcome::Fallback { error })
            }
        }
    }

    /// Fetches history until it yields a usable peak or retries run out.
    async fn fetch_with_retry(&self, symbol: &Symbol) -> Result<SymbolSeries, SourceError> {
        let mut attempt = 0;
        loop {
            let result = self
                .pacer
                .run(self.source.weekly_history(symbol.clone()))
                .await
                .and_then(|series| self.ensure_usable(series));

            let error = match result {
                Ok(series) => return Ok(series),
                Err(error) => error,
            };

            if !self.retry.should_retry(&error, attempt) {
                return Err(error);
            }

            let delay = self.retry.delay_for_attempt(attempt);
            warn!(
                %symbol,
                %error,
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                "history fetch failed, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    fn ensure_usable(&self, series: SymbolSeries) -> Result<SymbolSeries, SourceError> {
        if self.resolver.corrector().correct(&series).is_empty() {
            return Err(SourceError::unavailable(format!(
                "no usable history for {}",
                series.symbol
            )));
        }
        Ok(series)
    }
}

impl std::fmt::Debug for BatchRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchRetriever")
            .field("source", &self.source.id())
            .field("pacer", &self.pacer)
            .field("retry", &self.retry)
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}
