//! # Domain Models
//!
//! Canonical types flowing through peak resolution and metrics.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`PricePoint`] | One weekly bar with optional high/close/adjusted close |
//! | [`SymbolSeries`] | Chronological weekly history for one symbol |
//! | [`QuoteSnapshot`] | Live quote validated at the provider boundary |
//! | [`PeakRecord`] | Resolved all-time-high with its [`PeakConfidence`] |
//! | [`DerivedMetrics`] | Distance-from-peak figures for one instrument |
//! | [`AssetType`] | etf / stock / crypto / materials tag |
//! | [`ChartRange`] | Lookback window for the detail chart |
//! | [`Symbol`] | Normalized ticker |
//! | [`UtcDateTime`] | UTC timestamp |
//!
//! Provider payloads are loosely typed; everything here is validated once
//! when an adapter builds it, so downstream code never re-checks optionality.

mod models;
mod range;
mod symbol;
mod timestamp;

pub use models::{
    validate_currency_code, AssetType, ChartPoint, DerivedMetrics, PeakConfidence, PeakRecord,
    PricePoint, QuoteExtras, QuoteSnapshot, SymbolSeries,
};
pub use range::ChartRange;
pub use symbol::Symbol;
pub use timestamp::UtcDateTime;
