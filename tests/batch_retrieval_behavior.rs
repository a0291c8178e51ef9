//! Behavior tests for batch peak retrieval.
//!
//! These tests verify HOW a watchlist is processed: one symbol at a time,
//! with a pause after every request, retries with linear backoff, and a
//! fallback record for any symbol whose retries run out.

use std::sync::Arc;
use std::time::Duration;

use athwatch_core::{
    BatchRetriever, FixtureSource, InMemoryPeakCache, PeakConfidence, PeakOutcome, RequestPacer,
    RetryConfig, SourceErrorKind, Symbol,
};

fn symbol(raw: &str) -> Symbol {
    Symbol::parse(raw).expect("valid symbol")
}

fn three_symbol_source() -> FixtureSource {
    FixtureSource::new()
        .with_flat_series(symbol("AAA"), 10.0, 20)
        .with_flat_series(symbol("BBB"), 20.0, 20)
        .with_flat_series(symbol("CCC"), 30.0, 20)
}

// =============================================================================
// Failure isolation
// =============================================================================

#[tokio::test(start_paused = true)]
async fn when_one_symbol_exhausts_retries_system_still_returns_every_symbol() {
    // Given: three symbols where B fails on every one of its attempts
    let source = Arc::new(three_symbol_source().fail_history(symbol("BBB"), 3));
    let retriever = BatchRetriever::new(source.clone());

    // When: the batch runs with the default policy (2 retries)
    let batch = retriever
        .retrieve(&[symbol("AAA"), symbol("BBB"), symbol("CCC")])
        .await;

    // Then: all three are present and only B is a fallback
    assert_eq!(batch.len(), 3);
    assert_eq!(batch.get(&symbol("AAA")).expect("A").confidence, PeakConfidence::Resolved);
    assert_eq!(batch.get(&symbol("BBB")).expect("B").confidence, PeakConfidence::Fallback);
    assert_eq!(batch.get(&symbol("CCC")).expect("C").confidence, PeakConfidence::Resolved);
    assert_eq!(batch.fallback_count(), 1);

    // And: B was tried exactly 1 + 2 times
    assert_eq!(source.history_calls(&symbol("BBB")), 3);
    assert!(matches!(
        batch.outcomes.get(&symbol("BBB")),
        Some(PeakOutcome::Fallback { error }) if error.kind() == SourceErrorKind::Unavailable
    ));
}

#[tokio::test(start_paused = true)]
async fn when_one_symbol_fails_twice_with_one_retry_system_falls_back() {
    // Given: a policy allowing one retry and a symbol failing twice
    let source = Arc::new(three_symbol_source().fail_history(symbol("BBB"), 2));
    let retriever = BatchRetriever::new(source.clone())
        .with_retry(RetryConfig::linear(Duration::from_millis(500), 1));

    // When: the batch runs
    let batch = retriever
        .retrieve(&[symbol("AAA"), symbol("BBB"), symbol("CCC")])
        .await;

    // Then: B falls back while the batch completes
    assert_eq!(batch.len(), 3);
    assert!(batch.get(&symbol("BBB")).expect("B").is_fallback());
    assert_eq!(source.history_calls(&symbol("BBB")), 2);
}

#[tokio::test(start_paused = true)]
async fn when_symbol_is_unknown_system_does_not_retry() {
    // Given: a symbol the provider has never heard of
    let source = Arc::new(FixtureSource::new());
    let retriever = BatchRetriever::new(source.clone());

    // When: the batch runs
    let batch = retriever.retrieve(&[symbol("NOPE")]).await;

    // Then: a not-found error is final
    assert_eq!(source.history_calls(&symbol("NOPE")), 1);
    assert!(batch.get(&symbol("NOPE")).expect("present").is_fallback());
    assert!(!batch.provider_unreachable());
}

// =============================================================================
// Pacing and backoff
// =============================================================================

#[tokio::test(start_paused = true)]
async fn when_retries_happen_system_waits_linearly_longer_each_time() {
    // Given: one symbol failing twice before succeeding, with no pause
    let source = Arc::new(
        FixtureSource::new()
            .with_flat_series(symbol("AAA"), 10.0, 20)
            .fail_history(symbol("AAA"), 2),
    );
    let retriever = BatchRetriever::new(source.clone())
        .with_pacer(RequestPacer::sequential(Duration::ZERO))
        .with_retry(RetryConfig::default());

    // When: the batch runs on a paused clock
    let started = tokio::time::Instant::now();
    let batch = retriever.retrieve(&[symbol("AAA")]).await;
    let waited = started.elapsed();

    // Then: the backoff was 500ms then 1000ms
    assert!(!batch.get(&symbol("AAA")).expect("present").is_fallback());
    assert!(waited >= Duration::from_millis(1_500), "waited {waited:?}");
    assert!(waited < Duration::from_millis(1_600), "waited {waited:?}");
}

#[tokio::test(start_paused = true)]
async fn when_batch_runs_system_pauses_after_every_request() {
    // Given: three healthy symbols and the default 50ms pause
    let source = Arc::new(three_symbol_source());
    let retriever = BatchRetriever::new(source).with_pacer(RequestPacer::default());

    // When: the batch runs on a paused clock
    let started = tokio::time::Instant::now();
    retriever
        .retrieve(&[symbol("AAA"), symbol("BBB"), symbol("CCC")])
        .await;

    // Then: three requests each held their slot for the pause
    assert!(started.elapsed() >= Duration::from_millis(150));
}

// =============================================================================
// Outage and caching
// =============================================================================

#[tokio::test(start_paused = true)]
async fn when_provider_is_down_system_still_completes_batch() {
    // Given: a provider that fails every request
    let source = Arc::new(three_symbol_source().with_outage());
    let retriever = BatchRetriever::new(source);

    // When: the batch runs
    let batch = retriever
        .retrieve(&[symbol("AAA"), symbol("BBB"), symbol("CCC")])
        .await;

    // Then: every symbol falls back and the batch reports the outage
    assert_eq!(batch.fallback_count(), 3);
    assert!(batch.provider_unreachable());
}

#[tokio::test(start_paused = true)]
async fn when_peak_is_cached_system_skips_the_provider() {
    // Given: a retriever with an in-memory cache
    let source = Arc::new(three_symbol_source());
    let cache = Arc::new(InMemoryPeakCache::new());
    let retriever = BatchRetriever::new(source.clone()).with_cache(cache.clone(), Duration::from_secs(300));

    // When: the same symbols are requested twice
    retriever.retrieve(&[symbol("AAA"), symbol("BBB")]).await;
    let second = retriever.retrieve(&[symbol("AAA"), symbol("BBB")]).await;

    // Then: the provider saw each symbol once
    assert_eq!(source.history_calls(&symbol("AAA")), 1);
    assert_eq!(source.history_calls(&symbol("BBB")), 1);
    assert_eq!(second.outcomes.get(&symbol("AAA")), Some(&PeakOutcome::Cached));
    assert_eq!(cache.len().await, 2);
}
