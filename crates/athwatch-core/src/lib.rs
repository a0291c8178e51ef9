//! # Athwatch Core
//!
//! All-time-high tracking for a watchlist of tickers.
//!
//! ## Overview
//!
//! For every symbol the crate resolves a split-adjusted peak price from weekly
//! history, merges it with the live quote, and derives how far the instrument
//! trades below that peak:
//!
//! - **Series correction** repairs highs a provider forgot to rebase for splits
//! - **Peak resolution** with a freshness override and a reference-table fallback
//! - **Batch retrieval** that is paced, retried and isolates per-symbol failures
//! - **Metrics, summaries and sorting** as pure functions over the results
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Yahoo and in-memory fixture providers |
//! | [`aggregate`] | Watchlist summary (deepest discount, nearest peak, ...) |
//! | [`batch`] | Paced, retried peak retrieval for many symbols |
//! | [`cache`] | Injectable peak cache |
//! | [`config`] | Threshold and runtime settings |
//! | [`correction`] | Split-artifact correction of weekly highs |
//! | [`data_source`] | Provider trait and error type |
//! | [`domain`] | Domain models |
//! | [`error`] | Core error types |
//! | [`http_client`] | HTTP transport seam |
//! | [`metrics`] | Percent-down, percent-to-peak, asset classification |
//! | [`pacing`] | Bounded-concurrency request pacer |
//! | [`peak`] | Peak resolution and quote merge |
//! | [`reference`] | Built-in reference peaks |
//! | [`retry`] | Retry and backoff policy |
//! | [`service`] | Batch metrics, summary and detail operations |
//! | [`sort_filter`] | Text/type filtering and stable sorting |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use athwatch_core::{Symbol, Threshold, WatchConfig, WatchService, YahooSource};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = WatchService::new(Arc::new(YahooSource::default()), WatchConfig::from_env());
//!     let symbols = Symbol::parse_unique(["AAPL", "VTI", "BTC-USD"])?;
//!
//!     for row in service.metrics_batch(&symbols, Threshold::DEFAULT).await? {
//!         println!("{} {:.2}% below peak", row.symbol, row.percent_down);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! A symbol whose history cannot be fetched gets a fallback peak record
//! (`confidence = fallback`) and the batch carries on. Only a failed quote
//! call surfaces as [`CoreError::ProviderUnavailable`].

pub mod adapters;
pub mod aggregate;
pub mod batch;
pub mod cache;
pub mod config;
pub mod correction;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod metrics;
pub mod pacing;
pub mod peak;
pub mod reference;
pub mod retry;
pub mod service;
pub mod sort_filter;

// Adapter implementations
pub use adapters::{FixtureSource, YahooSource};

// Pure engines
pub use aggregate::{summarize, Summary};
pub use correction::{CorrectedHigh, SeriesCorrector};
pub use metrics::{classify_asset, compute_metrics};
pub use peak::{merge_quote, PeakResolver};
pub use sort_filter::{sort_filter, SortDirection, SortField, Sortable};

// Batch retrieval
pub use batch::{BatchRetriever, PeakBatch, PeakOutcome};
pub use cache::{InMemoryPeakCache, NoopPeakCache, PeakCache};
pub use pacing::RequestPacer;
pub use retry::{Backoff, RetryConfig};

// Configuration
pub use config::{Threshold, WatchConfig};

// Data source trait and types
pub use data_source::{MarketDataSource, QuoteBatch, QuoteRequest, SourceError, SourceErrorKind};

// Domain models
pub use domain::{
    AssetType, ChartPoint, ChartRange, DerivedMetrics, PeakConfidence, PeakRecord, PricePoint,
    QuoteExtras, QuoteSnapshot, Symbol, SymbolSeries, UtcDateTime,
};

// Error types
pub use error::{CoreError, ValidationError};

// HTTP client types
pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};

// Reference peaks
pub use reference::ReferenceTable;

// Service
pub use service::{SymbolDetail, WatchService};
