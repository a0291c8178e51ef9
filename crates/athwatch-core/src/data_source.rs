//! Market data provider contract.
//!
//! The provider is an external collaborator exposing two capabilities the core
//! depends on: weekly history since inception and live quote snapshots. A
//! third, chart samples for a lookback window, is a read-through used only by
//! the detail view.
//!
//! | Capability | Request | Response |
//! |------------|---------|----------|
//! | Weekly history | [`Symbol`] | [`SymbolSeries`] |
//! | Quotes | [`QuoteRequest`] | [`QuoteBatch`] |
//! | Chart | [`Symbol`] + [`ChartRange`] | `Vec<ChartPoint>` |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::{ChartPoint, ChartRange, QuoteSnapshot, Symbol, SymbolSeries};

/// Boxed future returned by provider calls.
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

/// Provider error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Unavailable,
    RateLimited,
    InvalidRequest,
    NotFound,
    Internal,
}

/// Structured provider error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::NotFound,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    /// Transport-level failure, as opposed to a symbol-specific one.
    pub const fn is_transport(&self) -> bool {
        matches!(
            self.kind,
            SourceErrorKind::Unavailable | SourceErrorKind::RateLimited
        )
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::NotFound => "source.not_found",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Multi-symbol quote request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub symbols: Vec<Symbol>,
}

impl QuoteRequest {
    pub fn new(symbols: Vec<Symbol>) -> Result<Self, SourceError> {
        if symbols.is_empty() {
            return Err(SourceError::invalid_request(
                "quote request must include at least one symbol",
            ));
        }
        Ok(Self { symbols })
    }
}

/// Quotes returned for a request; may cover only part of it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteBatch {
    pub quotes: Vec<QuoteSnapshot>,
}

impl QuoteBatch {
    pub fn find(&self, symbol: &Symbol) -> Option<&QuoteSnapshot> {
        self.quotes.iter().find(|quote| &quote.symbol == symbol)
    }
}

/// Provider adapter contract.
///
/// Implementations must be `Send + Sync`; a single adapter is shared by the
/// batch retriever and the quote path, which may run concurrently.
pub trait MarketDataSource: Send + Sync {
    /// Short provider identifier used in logs.
    fn id(&self) -> &'static str;

    /// Weekly bars from inception to now. May be empty.
    fn weekly_history<'a>(&'a self, symbol: Symbol) -> SourceFuture<'a, SymbolSeries>;

    /// Live quotes for one or more symbols. Unknown symbols are omitted.
    fn quotes<'a>(&'a self, req: QuoteRequest) -> SourceFuture<'a, QuoteBatch>;

    /// Price samples for the detail chart.
    fn chart<'a>(&'a self, symbol: Symbol, range: ChartRange) -> SourceFuture<'a, Vec<ChartPoint>>;
}
