//! In-memory provider for tests and offline runs.
//!
//! Holds registered series, quotes and charts, can be scripted to fail
//! history calls for a symbol a fixed number of times or to fail everything,
//! and optionally synthesizes deterministic data for unregistered symbols.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::data_source::{MarketDataSource, QuoteBatch, QuoteRequest, SourceError, SourceFuture};
use crate::{
    ChartPoint, ChartRange, PricePoint, QuoteSnapshot, Symbol, SymbolSeries, UtcDateTime,
};

const WEEK_SECONDS: i64 = 7 * 86_400;
const DAY_SECONDS: i64 = 86_400;

#[derive(Debug, Default)]
pub struct FixtureSource {
    series: HashMap<Symbol, SymbolSeries>,
    quotes: HashMap<Symbol, QuoteSnapshot>,
    charts: HashMap<Symbol, Vec<ChartPoint>>,
    pending_failures: Mutex<HashMap<Symbol, u32>>,
    history_calls: Mutex<HashMap<Symbol, u32>>,
    quote_calls: AtomicU32,
    outage: AtomicBool,
    quotes_down: AtomicBool,
    synthetic: bool,
}

impl FixtureSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixture that fabricates deterministic history and quotes for any
    /// symbol it has not been given explicitly.
    pub fn synthetic() -> Self {
        Self {
            synthetic: true,
            ..Self::default()
        }
    }

    pub fn with_series(mut self, series: SymbolSeries) -> Self {
        self.series.insert(series.symbol.clone(), series);
        self
    }

    /// Registers `weeks` of history closing at `close` with a 2% weekly high.
    pub fn with_flat_series(self, symbol: Symbol, close: f64, weeks: usize) -> Self {
        let start = UtcDateTime::now().unix_timestamp() - weeks as i64 * WEEK_SECONDS;
        let points = (0..weeks)
            .filter_map(|week| {
                let date = UtcDateTime::from_unix_timestamp(start + week as i64 * WEEK_SECONDS).ok()?;
                Some(PricePoint::new(date, Some(close * 1.02), Some(close), Some(close)))
            })
            .collect();
        self.with_series(SymbolSeries::new(symbol, points))
    }

    pub fn with_quote(mut self, quote: QuoteSnapshot) -> Self {
        self.quotes.insert(quote.symbol.clone(), quote);
        self
    }

    pub fn with_chart(mut self, symbol: Symbol, points: Vec<ChartPoint>) -> Self {
        self.charts.insert(symbol, points);
        self
    }

    /// The next `times` history calls for `symbol` fail with a retryable error.
    pub fn fail_history(self, symbol: Symbol, times: u32) -> Self {
        self.pending_failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(symbol, times);
        self
    }

    /// Every call fails as if the provider were unreachable.
    pub fn with_outage(self) -> Self {
        self.outage.store(true, Ordering::SeqCst);
        self
    }

    /// Only the quote endpoint fails.
    pub fn with_quotes_down(self) -> Self {
        self.quotes_down.store(true, Ordering::SeqCst);
        self
    }

    pub fn history_calls(&self, symbol: &Symbol) -> u32 {
        self.history_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(symbol)
            .copied()
            .unwrap_or(0)
    }

    pub fn quote_calls(&self) -> u32 {
        self.quote_calls.load(Ordering::SeqCst)
    }

    fn check_outage(&self) -> Result<(), SourceError> {
        if self.outage.load(Ordering::SeqCst) {
            return Err(SourceError::unavailable("fixture provider is unreachable"));
        }
        Ok(())
    }

    fn history_for(&self, symbol: Symbol) -> Result<SymbolSeries, SourceError> {
        *self
            .history_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(symbol.clone())
            .or_insert(0) += 1;

        self.check_outage()?;

        {
            let mut failures = self
                .pending_failures
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(remaining) = failures.get_mut(&symbol) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(SourceError::unavailable(format!(
                        "scripted history failure for {symbol}"
                    )));
                }
            }
        }

        if let Some(series) = self.series.get(&symbol) {
            return Ok(series.clone());
        }
        if self.synthetic {
            return Ok(synthetic_series(&symbol));
        }
        Err(SourceError::not_found(format!("no history for {symbol}")))
    }

    fn quote_for(&self, symbol: &Symbol) -> Option<QuoteSnapshot> {
        if let Some(quote) = self.quotes.get(symbol) {
            return Some(quote.clone());
        }
        if self.synthetic {
            return synthetic_quote(symbol);
        }
        None
    }

    fn chart_for(&self, symbol: &Symbol, range: ChartRange) -> Vec<ChartPoint> {
        if let Some(points) = self.charts.get(symbol) {
            return points.clone();
        }
        if self.synthetic {
            return synthetic_chart(symbol, range);
        }
        Vec::new()
    }
}

impl MarketDataSource for FixtureSource {
    fn id(&self) -> &'static str {
        "fixture"
    }

    fn weekly_history<'a>(&'a self, symbol: Symbol) -> SourceFuture<'a, SymbolSeries> {
        Box::pin(async move { self.history_for(symbol) })
    }

    fn quotes<'a>(&'a self, req: QuoteRequest) -> SourceFuture<'a, QuoteBatch> {
        Box::pin(async move {
            self.quote_calls.fetch_add(1, Ordering::SeqCst);
            self.check_outage()?;
            if self.quotes_down.load(Ordering::SeqCst) {
                return Err(SourceError::unavailable("fixture quote endpoint is down"));
            }

            let quotes = req
                .symbols
                .iter()
                .filter_map(|symbol| self.quote_for(symbol))
                .collect();
            Ok(QuoteBatch { quotes })
        })
    }

    fn chart<'a>(&'a self, symbol: Symbol, range: ChartRange) -> SourceFuture<'a, Vec<ChartPoint>> {
        Box::pin(async move {
            self.check_outage()?;
            Ok(self.chart_for(&symbol, range))
        })
    }
}

fn symbol_seed(symbol: &Symbol) -> u64 {
    symbol
        .as_str()
        .bytes()
        .fold(0_u64, |acc, byte| acc.wrapping_mul(33).wrapping_add(u64::from(byte)))
}

/// Price curve shared by synthetic history, quotes and charts: rises to a
/// peak two thirds of the way through, then retraces by a seed-dependent
/// amount.
fn synthetic_price(seed: u64, position: f64) -> f64 {
    let base = 20.0 + (seed % 400) as f64;
    let retrace = 0.02 + (seed % 23) as f64 / 100.0;
    if position <= 2.0 / 3.0 {
        base * (0.4 + 0.6 * position * 1.5)
    } else {
        let decline = (position - 2.0 / 3.0) * 3.0;
        base * (1.0 - retrace * decline)
    }
}

fn synthetic_series(symbol: &Symbol) -> SymbolSeries {
    const WEEKS: i64 = 260;
    let seed = symbol_seed(symbol);
    let now = UtcDateTime::now().unix_timestamp();

    let points = (0..WEEKS)
        .filter_map(|week| {
            let date = UtcDateTime::from_unix_timestamp(now - (WEEKS - week) * WEEK_SECONDS).ok()?;
            let close = synthetic_price(seed, week as f64 / (WEEKS - 1) as f64);
            Some(PricePoint::new(date, Some(close * 1.015), Some(close), Some(close)))
        })
        .collect();
    SymbolSeries::new(symbol.clone(), points)
}

fn synthetic_quote(symbol: &Symbol) -> Option<QuoteSnapshot> {
    let seed = symbol_seed(symbol);
    let price = synthetic_price(seed, 1.0);
    let change = ((seed % 61) as f64 - 30.0) / 10.0;
    let expense_ratio = (seed % 3 == 0).then_some(0.0003 + (seed % 7) as f64 / 10_000.0);

    QuoteSnapshot::new(symbol.clone(), symbol.as_str(), price, "USD")
        .ok()
        .map(|quote| {
            quote
                .with_daily_change_percent(Some(change))
                .with_dividend_yield(Some((seed % 5) as f64 / 100.0))
                .with_expense_ratio(expense_ratio)
        })
}

fn synthetic_chart(symbol: &Symbol, range: ChartRange) -> Vec<ChartPoint> {
    let days: i64 = match range {
        ChartRange::OneMonth => 30,
        ChartRange::ThreeMonths => 90,
        ChartRange::SixMonths => 180,
        ChartRange::OneYear => 365,
        ChartRange::FiveYears => 5 * 365,
        ChartRange::Max => 10 * 365,
    };
    let step = if range.bar_interval() == "1wk" { 7 } else { 1 };
    let seed = symbol_seed(symbol);
    let now = UtcDateTime::now().unix_timestamp();
    let total = days as f64;

    (0..days)
        .step_by(step)
        .filter_map(|day| {
            let timestamp = UtcDateTime::from_unix_timestamp(now - (days - day) * DAY_SECONDS).ok()?;
            let position = 1.0 - (days - day) as f64 / total / 3.0;
            Some(ChartPoint {
                timestamp,
                price: synthetic_price(seed, position),
            })
        })
        .collect()
}
