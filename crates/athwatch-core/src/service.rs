//! Watchlist operations exposed to front-ends.
//!
//! [`WatchService`] combines one multi-symbol quote call with the paced peak
//! batch, runs both concurrently, and turns the pair into metric rows,
//! summaries and single-symbol detail payloads.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::aggregate::{summarize, Summary};
use crate::batch::BatchRetriever;
use crate::cache::{InMemoryPeakCache, PeakCache};
use crate::config::{Threshold, WatchConfig};
use crate::data_source::{MarketDataSource, QuoteBatch, QuoteRequest, SourceError};
use crate::metrics::compute_metrics;
use crate::peak::merge_quote;
use crate::{
    AssetType, ChartPoint, ChartRange, CoreError, DerivedMetrics, PeakConfidence, PeakRecord,
    QuoteSnapshot, Symbol, UtcDateTime,
};

/// Payload of the single-symbol view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolDetail {
    pub quote: QuoteSnapshot,
    pub chart_data: Vec<ChartPoint>,
    pub peak_price: f64,
    pub peak_date: UtcDateTime,
    pub confidence: PeakConfidence,
}

#[derive(Clone)]
pub struct WatchService {
    source: Arc<dyn MarketDataSource>,
    retriever: BatchRetriever,
    config: WatchConfig,
}

impl WatchService {
    /// Service with an in-memory peak cache using `config.cache_ttl`.
    pub fn new(source: Arc<dyn MarketDataSource>, config: WatchConfig) -> Self {
        Self::with_cache(source, config, Arc::new(InMemoryPeakCache::new()))
    }

    pub fn with_cache(
        source: Arc<dyn MarketDataSource>,
        config: WatchConfig,
        cache: Arc<dyn PeakCache>,
    ) -> Self {
        let retriever = BatchRetriever::new(Arc::clone(&source))
            .with_pacer(config.pacer())
            .with_retry(config.retry.clone())
            .with_cache(cache, config.cache_ttl);

        Self {
            source,
            retriever,
            config,
        }
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    pub fn source_id(&self) -> &'static str {
        self.source.id()
    }

    /// Metric rows for `symbols`, in order of first appearance.
    ///
    /// Symbols the quote call does not return are left out. Fails only when
    /// the quote call itself fails, since no row is computable without a
    /// current price.
    pub async fn metrics_batch(
        &self,
        symbols: &[Symbol],
        threshold: Threshold,
    ) -> Result<Vec<DerivedMetrics>, CoreError> {
        let symbols = dedup(symbols);
        let Ok(request) = QuoteRequest::new(symbols.clone()) else {
            return Ok(Vec::new());
        };

        let (quotes, peaks) = tokio::join!(self.source.quotes(request), self.retriever.retrieve(&symbols));

        let quotes = quotes.map_err(|error| {
            if peaks.provider_unreachable() {
                CoreError::provider_unavailable(format!("{} is unreachable: {error}", self.source.id()))
            } else {
                quote_failure(&error)
            }
        })?;

        let now = UtcDateTime::now();
        let mut rows = Vec::with_capacity(symbols.len());
        for symbol in &symbols {
            let Some(quote) = quotes.find(symbol) else {
                warn!(%symbol, "no quote returned, omitting symbol");
                continue;
            };

            let peak = match peaks.get(symbol) {
                Some(peak) => peak.clone(),
                None => self.retriever.resolver().fallback(symbol, Some(quote)),
            };
            let peak = merge_quote(peak, quote, now);
            rows.push(compute_metrics(quote, &peak, threshold.value()));
        }

        info!(
            requested = symbols.len(),
            returned = rows.len(),
            fallback = rows.iter().filter(|row| row.confidence == PeakConfidence::Fallback).count(),
            "metrics batch complete"
        );
        Ok(rows)
    }

    pub async fn metrics_for(&self, symbol: &Symbol, threshold: Threshold) -> Result<DerivedMetrics, CoreError> {
        self.metrics_batch(std::slice::from_ref(symbol), threshold)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::provider_unavailable(format!("no quote returned for {symbol}")))
    }

    /// Summary of `metrics` restricted to `types`; an empty set keeps all.
    pub fn summary(&self, metrics: &[DerivedMetrics], types: &BTreeSet<AssetType>) -> Option<Summary> {
        if types.is_empty() {
            return summarize(metrics);
        }
        let filtered: Vec<DerivedMetrics> = metrics
            .iter()
            .filter(|row| types.contains(&row.asset_type))
            .cloned()
            .collect();
        summarize(&filtered)
    }

    /// Quote, chart and peak for one symbol. A failed chart fetch yields an
    /// empty chart; a failed quote is an error.
    pub async fn detail(&self, symbol: &Symbol, range: ChartRange) -> Result<SymbolDetail, CoreError> {
        let request = QuoteRequest {
            symbols: vec![symbol.clone()],
        };
        let peak_symbols = [symbol.clone()];

        let (quotes, peaks, chart) = tokio::join!(
            self.source.quotes(request),
            self.retriever.retrieve(&peak_symbols),
            self.source.chart(symbol.clone(), range)
        );

        let quote = find_quote(quotes, symbol)?;

        let chart_data = chart.unwrap_or_else(|error| {
            warn!(%symbol, %error, range = range.as_str(), "chart unavailable");
            Vec::new()
        });

        let peak = peaks
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| self.retriever.resolver().fallback(symbol, Some(&quote)));
        let PeakRecord {
            peak_price,
            peak_date,
            confidence,
            ..
        } = merge_quote(peak, &quote, UtcDateTime::now());

        Ok(SymbolDetail {
            quote,
            chart_data,
            peak_price,
            peak_date,
            confidence,
        })
    }
}

impl std::fmt::Debug for WatchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchService")
            .field("source", &self.source.id())
            .field("retriever", &self.retriever)
            .field("config", &self.config)
            .finish()
    }
}

fn find_quote(quotes: Result<QuoteBatch, SourceError>, symbol: &Symbol) -> Result<QuoteSnapshot, CoreError> {
    let batch = quotes.map_err(|error| quote_failure(&error))?;
    batch
        .find(symbol)
        .cloned()
        .ok_or_else(|| CoreError::provider_unavailable(format!("no quote returned for {symbol}")))
}

fn quote_failure(error: &SourceError) -> CoreError {
    CoreError::provider_unavailable(format!("quote request failed: {error}"))
}

fn dedup(symbols: &[Symbol]) -> Vec<Symbol> {
    let mut seen = HashSet::with_capacity(symbols.len());
    symbols
        .iter()
        .filter(|symbol| seen.insert((*symbol).clone()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::FixtureSource;
    use crate::retry::RetryConfig;
    use std::time::Duration;

    fn symbol(raw: &str) -> Symbol {
        Symbol::parse(raw).expect("symbol")
    }

    fn fast_config() -> WatchConfig {
        WatchConfig {
            pause: Duration::ZERO,
            retry: RetryConfig::linear(Duration::from_millis(1), 2),
            ..WatchConfig::default()
        }
    }

    #[tokio::test]
    async fn duplicates_collapse_in_first_seen_order() {
        let service = WatchService::new(Arc::new(FixtureSource::synthetic()), fast_config());
        let rows = service
            .metrics_batch(&[symbol("VTI"), symbol("AAPL"), symbol("VTI")], Threshold::DEFAULT)
            .await
            .expect("rows");

        let symbols: Vec<_> = rows.iter().map(|row| row.symbol.as_str()).collect();
        assert_eq!(symbols, ["VTI", "AAPL"]);
    }

    #[tokio::test]
    async fn empty_input_is_empty_output() {
        let service = WatchService::new(Arc::new(FixtureSource::new()), fast_config());
        let rows = service.metrics_batch(&[], Threshold::DEFAULT).await.expect("rows");
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn summary_respects_type_filter() {
        let service = WatchService::new(Arc::new(FixtureSource::synthetic()), fast_config());
        let rows = service
            .metrics_batch(&[symbol("BTC-USD"), symbol("GC=F")], Threshold::DEFAULT)
            .await
            .expect("rows");

        let crypto_only = BTreeSet::from([AssetType::Crypto]);
        let summary = service.summary(&rows, &crypto_only).expect("one crypto row");
        assert_eq!(summary.count, 1);

        let etf_only = BTreeSet::from([AssetType::Etf]);
        assert!(service.summary(&rows, &etf_only).is_none());
    }
}
