//! Static reference peaks used when provider history is unavailable.
//!
//! Values are best-effort snapshots and go stale; they only keep a batch
//! renderable while the provider is failing for a symbol.

use std::collections::HashMap;

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::Date;

use crate::{Symbol, UtcDateTime};

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

const BUILTIN_PEAKS: &[(&str, f64, &str)] = &[
    ("AAPL", 260.10, "2024-12-26"),
    ("MSFT", 468.35, "2024-07-05"),
    ("NVDA", 153.13, "2025-01-07"),
    ("AMZN", 242.52, "2025-02-04"),
    ("GOOGL", 207.05, "2025-02-04"),
    ("META", 740.91, "2025-02-14"),
    ("TSLA", 488.54, "2024-12-18"),
    ("SPY", 613.23, "2025-02-19"),
    ("VOO", 563.90, "2025-02-19"),
    ("VTI", 303.39, "2025-01-23"),
    ("QQQ", 540.81, "2025-02-19"),
    ("SCHD", 29.72, "2024-11-29"),
    ("GLD", 268.59, "2025-02-24"),
    ("BTC-USD", 109_114.88, "2025-01-20"),
    ("ETH-USD", 4_891.70, "2021-11-16"),
    ("GC=F", 2_974.00, "2025-02-20"),
    ("SI=F", 49.82, "1980-01-18"),
];

/// Reference peak for one symbol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferencePeak {
    pub price: f64,
    pub date: UtcDateTime,
}

/// Lookup table of reference peaks keyed by symbol.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    entries: HashMap<Symbol, ReferencePeak>,
}

impl ReferenceTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Table seeded with the bundled reference peaks.
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for (raw_symbol, price, raw_date) in BUILTIN_PEAKS {
            let (Ok(symbol), Some(date)) = (Symbol::parse(raw_symbol), parse_day(raw_date)) else {
                continue;
            };
            table.entries.insert(symbol, ReferencePeak { price: *price, date });
        }
        table
    }

    pub fn with_entry(mut self, symbol: Symbol, price: f64, date: UtcDateTime) -> Self {
        self.entries.insert(symbol, ReferencePeak { price, date });
        self
    }

    pub fn lookup(&self, symbol: &Symbol) -> Option<ReferencePeak> {
        self.entries.get(symbol).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_day(raw: &str) -> Option<UtcDateTime> {
    let date = Date::parse(raw, DATE_FORMAT).ok()?;
    UtcDateTime::from_offset_datetime(date.midnight().assume_utc()).ok()
}
