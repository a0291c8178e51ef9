//! Distance-from-peak metrics.
//!
//! [`compute_metrics`] is a pure function of a quote, a peak record and a
//! near-peak threshold. Divisions are guarded so degenerate prices yield 0
//! instead of NaN or infinity.

use crate::{AssetType, DerivedMetrics, PeakRecord, QuoteSnapshot, Symbol};

const CRYPTO_SYMBOLS: &[&str] = &[
    "BTC", "ETH", "SOL", "XRP", "ADA", "DOGE", "DOT", "LTC", "AVAX", "LINK", "BNB", "MATIC",
    "SHIB", "TRX", "XLM", "BCH", "ATOM", "UNI",
];

/// Quote legs that mark a crypto pair such as `BTC-USD`.
const CRYPTO_PAIR_QUOTES: &[&str] = &["USD", "USDT", "USDC", "EUR", "GBP", "BTC", "ETH"];

const MATERIALS_SYMBOLS: &[&str] = &[
    "GLD", "IAU", "SGOL", "SLV", "SIVR", "PPLT", "PALL", "GDX", "GDXJ", "DBC", "DBA", "USO",
    "UNG", "CPER", "GSG", "PDBC",
];

/// Futures contracts carry an `=F` suffix (`GC=F`, `CL=F`).
const FUTURES_SUFFIX: &str = "=F";

/// Builds the metrics row for one instrument.
///
/// `peak` is expected to be merged with `quote` already; when it is not, a
/// current price above the peak simply yields a negative `percent_down` and
/// `is_near_peak == false`.
pub fn compute_metrics(quote: &QuoteSnapshot, peak: &PeakRecord, threshold: f64) -> DerivedMetrics {
    let current = quote.current_price;
    let peak_price = peak.peak_price;

    let percent_down = percent_down(current, peak_price);

    DerivedMetrics {
        symbol: quote.symbol.clone(),
        name: quote.name.clone(),
        current_price: current,
        peak_price,
        peak_date: peak.peak_date,
        percent_down,
        percent_to_peak: percent_to_peak(current, peak_price),
        is_near_peak: is_near_peak(percent_down, threshold),
        asset_type: classify_asset(&quote.symbol, quote.expense_ratio),
        currency: quote.currency.clone(),
        daily_change_percent: quote.daily_change_percent,
        dividend_yield: quote.dividend_yield,
        expense_ratio: quote.expense_ratio,
        confidence: peak.confidence,
    }
}

pub fn percent_down(current: f64, peak: f64) -> f64 {
    if peak > 0.0 {
        (peak - current) / peak * 100.0
    } else {
        0.0
    }
}

pub fn percent_to_peak(current: f64, peak: f64) -> f64 {
    if current > 0.0 {
        (peak - current) / current * 100.0
    } else {
        0.0
    }
}

/// Inclusive on both ends: `percent_down == threshold` is near.
pub fn is_near_peak(percent_down: f64, threshold: f64) -> bool {
    (0.0..=threshold).contains(&percent_down)
}

/// Crypto wins over materials, materials over ETF, and an instrument with an
/// expense ratio but no other match is an ETF.
pub fn classify_asset(symbol: &Symbol, expense_ratio: Option<f64>) -> AssetType {
    if is_crypto(symbol.as_str()) {
        AssetType::Crypto
    } else if is_materials(symbol.as_str()) {
        AssetType::Materials
    } else if expense_ratio.is_some() {
        AssetType::Etf
    } else {
        AssetType::Stock
    }
}

fn is_crypto(symbol: &str) -> bool {
    if CRYPTO_SYMBOLS.contains(&symbol) {
        return true;
    }

    // A pair has exactly one '-' separating a base and a recognized quote leg.
    match symbol.split_once('-') {
        Some((base, quote)) => {
            !base.is_empty()
                && !quote.contains(['-', '.', '='])
                && CRYPTO_PAIR_QUOTES.contains(&quote)
        }
        None => false,
    }
}

fn is_materials(symbol: &str) -> bool {
    MATERIALS_SYMBOLS.contains(&symbol) || symbol.ends_with(FUTURES_SUFFIX)
}
