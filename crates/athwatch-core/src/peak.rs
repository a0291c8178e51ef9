//! All-time-high resolution.
//!
//! A peak is the largest corrected weekly high (see [`crate::correction`]),
//! then merged with the live quote so the reported peak never sits below the
//! current price. When history is unusable the resolver falls back to the
//! reference table, then to the current price, then to
//! [`DEFAULT_FALLBACK_PEAK`], so callers always get a well-formed record.

use tracing::debug;

use crate::correction::{CorrectedHigh, SeriesCorrector};
use crate::reference::ReferenceTable;
use crate::{PeakRecord, QuoteSnapshot, Symbol, SymbolSeries, UtcDateTime};

/// Peak used when neither history, reference data nor a quote is available.
pub const DEFAULT_FALLBACK_PEAK: f64 = 0.0;

/// Turns weekly history into [`PeakRecord`]s.
#[derive(Debug, Clone)]
pub struct PeakResolver {
    corrector: SeriesCorrector,
    reference: ReferenceTable,
}

impl Default for PeakResolver {
    fn default() -> Self {
        Self::new(SeriesCorrector::default(), ReferenceTable::builtin())
    }
}

impl PeakResolver {
    pub fn new(corrector: SeriesCorrector, reference: ReferenceTable) -> Self {
        Self {
            corrector,
            reference,
        }
    }

    pub fn corrector(&self) -> &SeriesCorrector {
        &self.corrector
    }

    /// Resolves the peak of `series`, merging `quote` when supplied.
    ///
    /// An empty or fully unusable series yields a fallback record.
    pub fn resolve(&self, series: &SymbolSeries, quote: Option<&QuoteSnapshot>) -> PeakRecord {
        let corrected = self.corrector.correct(series);
        let record = match scan_peak(&corrected) {
            Some(peak) => {
                debug!(
                    symbol = %series.symbol,
                    peak_price = peak.adjusted_high,
                    points = series.len(),
                    "resolved peak from history"
                );
                PeakRecord::resolved(series.symbol.clone(), peak.adjusted_high, peak.date)
            }
            None => {
                debug!(symbol = %series.symbol, "history has no usable points");
                return self.fallback(&series.symbol, quote);
            }
        };

        match quote {
            Some(quote) => merge_quote(record, quote, UtcDateTime::now()),
            None => record,
        }
    }

    /// Builds the record used when history could not be obtained.
    pub fn fallback(&self, symbol: &Symbol, quote: Option<&QuoteSnapshot>) -> PeakRecord {
        let now = UtcDateTime::now();
        let record = match (self.reference.lookup(symbol), quote) {
            (Some(reference), _) => PeakRecord::fallback(symbol.clone(), reference.price, reference.date),
            (None, Some(quote)) => PeakRecord::fallback(symbol.clone(), quote.current_price, now),
            (None, None) => PeakRecord::fallback(symbol.clone(), DEFAULT_FALLBACK_PEAK, now),
        };

        match quote {
            Some(quote) => merge_quote(record, quote, now),
            None => record,
        }
    }
}

/// Maximum corrected high; ties keep the earliest point.
pub fn scan_peak(corrected: &[CorrectedHigh]) -> Option<CorrectedHigh> {
    corrected.iter().copied().fold(None, |best, candidate| match best {
        Some(best) if best.adjusted_high >= candidate.adjusted_high => Some(best),
        _ => Some(candidate),
    })
}

/// Freshness override: a current price at or above the recorded peak becomes
/// the peak, dated `now`. Confidence is left untouched.
pub fn merge_quote(record: PeakRecord, quote: &QuoteSnapshot, now: UtcDateTime) -> PeakRecord {
    if quote.current_price >= record.peak_price {
        PeakRecord {
            peak_price: quote.current_price,
            peak_date: now,
            ..record
        }
    } else {
        record
    }
}
