use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Symbol, UtcDateTime, ValidationError};

/// One weekly bar of provider history.
///
/// Every price field is optional because provider histories contain gaps;
/// consumers skip points whose fields are missing instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: UtcDateTime,
    pub high: Option<f64>,
    pub close: Option<f64>,
    pub adjusted_close: Option<f64>,
}

impl PricePoint {
    pub fn new(
        date: UtcDateTime,
        high: Option<f64>,
        close: Option<f64>,
        adjusted_close: Option<f64>,
    ) -> Self {
        Self {
            date,
            high: high.filter(|value| value.is_finite()),
            close: close.filter(|value| value.is_finite()),
            adjusted_close: adjusted_close.filter(|value| value.is_finite()),
        }
    }

    /// Returns `(high, close, adjusted_close)` when all three are present.
    pub fn complete_fields(&self) -> Option<(f64, f64, f64)> {
        Some((self.high?, self.close?, self.adjusted_close?))
    }
}

/// Chronological weekly history for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolSeries {
    pub symbol: Symbol,
    pub points: Vec<PricePoint>,
}

impl SymbolSeries {
    /// Builds a series, ordering points chronologically.
    pub fn new(symbol: Symbol, mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|point| point.date);
        Self { symbol, points }
    }

    pub fn empty(symbol: Symbol) -> Self {
        Self {
            symbol,
            points: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }
}

/// Quote fields only shown on the single-symbol detail view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteExtras {
    pub previous_close: Option<f64>,
    pub day_high: Option<f64>,
    pub day_low: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub market_cap: Option<f64>,
    pub volume: Option<u64>,
}

/// Live quote snapshot as validated at the provider boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub symbol: Symbol,
    pub name: String,
    pub current_price: f64,
    pub currency: String,
    pub daily_change_percent: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub expense_ratio: Option<f64>,
    #[serde(default)]
    pub extras: QuoteExtras,
}

impl QuoteSnapshot {
    pub fn new(
        symbol: Symbol,
        name: impl Into<String>,
        current_price: f64,
        currency: impl AsRef<str>,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("current_price", current_price)?;
        let name = name.into();
        let name = if name.trim().is_empty() {
            symbol.as_str().to_owned()
        } else {
            name
        };

        Ok(Self {
            symbol,
            name,
            current_price,
            currency: validate_currency_code(currency.as_ref())?,
            daily_change_percent: None,
            dividend_yield: None,
            expense_ratio: None,
            extras: QuoteExtras::default(),
        })
    }

    pub fn with_daily_change_percent(mut self, value: Option<f64>) -> Self {
        self.daily_change_percent = value.filter(|value| value.is_finite());
        self
    }

    pub fn with_dividend_yield(mut self, value: Option<f64>) -> Self {
        self.dividend_yield = value.filter(|value| value.is_finite() && *value >= 0.0);
        self
    }

    pub fn with_expense_ratio(mut self, value: Option<f64>) -> Self {
        self.expense_ratio = value.filter(|value| value.is_finite() && *value >= 0.0);
        self
    }

    pub fn with_extras(mut self, extras: QuoteExtras) -> Self {
        self.extras = extras;
        self
    }
}

/// How a peak price was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeakConfidence {
    /// Computed from provider history.
    Resolved,
    /// Taken from the reference table or a default after the provider failed.
    Fallback,
}

/// Resolved all-time-high for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakRecord {
    pub symbol: Symbol,
    pub peak_price: f64,
    pub peak_date: UtcDateTime,
    pub confidence: PeakConfidence,
}

impl PeakRecord {
    pub fn resolved(symbol: Symbol, peak_price: f64, peak_date: UtcDateTime) -> Self {
        Self::new(symbol, peak_price, peak_date, PeakConfidence::Resolved)
    }

    pub fn fallback(symbol: Symbol, peak_price: f64, peak_date: UtcDateTime) -> Self {
        Self::new(symbol, peak_price, peak_date, PeakConfidence::Fallback)
    }

    fn new(
        symbol: Symbol,
        peak_price: f64,
        peak_date: UtcDateTime,
        confidence: PeakConfidence,
    ) -> Self {
        // peak_price >= 0 always holds, even for garbage input.
        let peak_price = if peak_price.is_finite() {
            peak_price.max(0.0)
        } else {
            0.0
        };

        Self {
            symbol,
            peak_price,
            peak_date,
            confidence,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.confidence == PeakConfidence::Fallback
    }
}

/// Instrument category shown next to each metric row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    Etf,
    Stock,
    Crypto,
    Materials,
}

impl AssetType {
    pub const ALL: [Self; 4] = [Self::Etf, Self::Stock, Self::Crypto, Self::Materials];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Etf => "etf",
            Self::Stock => "stock",
            Self::Crypto => "crypto",
            Self::Materials => "materials",
        }
    }
}

impl Display for AssetType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetType {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "etf" => Ok(Self::Etf),
            "stock" => Ok(Self::Stock),
            "crypto" => Ok(Self::Crypto),
            "materials" | "commodity" | "commodities" => Ok(Self::Materials),
            _ => Err(ValidationError::InvalidAssetType {
                value: value.to_owned(),
            }),
        }
    }
}

/// Per-instrument distance-from-peak figures.
///
/// Always rebuilt from a quote, a peak record and a threshold; never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub symbol: Symbol,
    pub name: String,
    pub current_price: f64,
    pub peak_price: f64,
    pub peak_date: UtcDateTime,
    pub percent_down: f64,
    pub percent_to_peak: f64,
    pub is_near_peak: bool,
    pub asset_type: AssetType,
    pub currency: String,
    pub daily_change_percent: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub expense_ratio: Option<f64>,
    pub confidence: PeakConfidence,
}

/// One (timestamp, price) sample of a display chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub timestamp: UtcDateTime,
    pub price: f64,
}

/// Validate and normalize currency to an uppercase 3-letter code.
pub fn validate_currency_code(input: &str) -> Result<String, ValidationError> {
    let normalized = input.trim().to_ascii_uppercase();
    let is_valid = normalized.len() == 3 && normalized.chars().all(|ch| ch.is_ascii_alphabetic());

    if !is_valid {
        return Err(ValidationError::InvalidCurrency {
            value: input.to_owned(),
        });
    }

    Ok(normalized)
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(value: &str) -> UtcDateTime {
        UtcDateTime::parse(value).expect("timestamp")
    }

    #[test]
    fn series_orders_points_chronologically() {
        let symbol = Symbol::parse("VTI").expect("symbol");
        let late = PricePoint::new(ts("2024-02-05T00:00:00Z"), Some(2.0), Some(2.0), Some(2.0));
        let early = PricePoint::new(ts("2024-01-01T00:00:00Z"), Some(1.0), Some(1.0), Some(1.0));

        let series = SymbolSeries::new(symbol, vec![late, early]);
        assert_eq!(series.points[0], early);
        assert_eq!(series.points[1], late);
    }

    #[test]
    fn price_point_drops_non_finite_fields() {
        let point = PricePoint::new(ts("2024-01-01T00:00:00Z"), Some(f64::NAN), Some(1.0), Some(1.0));
        assert_eq!(point.high, None);
        assert_eq!(point.complete_fields(), None);
    }

    #[test]
    fn quote_rejects_negative_price_and_bad_currency() {
        let symbol = Symbol::parse("SPY").expect("symbol");
        assert!(matches!(
            QuoteSnapshot::new(symbol.clone(), "SPDR", -1.0, "USD"),
            Err(ValidationError::NegativeValue { .. })
        ));
        assert!(matches!(
            QuoteSnapshot::new(symbol, "SPDR", 1.0, "USDT"),
            Err(ValidationError::InvalidCurrency { .. })
        ));
    }

    #[test]
    fn quote_name_defaults_to_symbol() {
        let symbol = Symbol::parse("spy").expect("symbol");
        let quote = QuoteSnapshot::new(symbol, "  ", 500.0, "usd").expect("valid");
        assert_eq!(quote.name, "SPY");
        assert_eq!(quote.currency, "USD");
    }

    #[test]
    fn peak_record_never_negative() {
        let symbol = Symbol::parse("X").expect("symbol");
        let now = UtcDateTime::now();
        assert_eq!(PeakRecord::resolved(symbol.clone(), -3.0, now).peak_price, 0.0);
        assert_eq!(PeakRecord::fallback(symbol, f64::INFINITY, now).peak_price, 0.0);
    }

    #[test]
    fn asset_type_parses_aliases() {
        assert_eq!("ETF".parse::<AssetType>().expect("etf"), AssetType::Etf);
        assert_eq!(
            "commodities".parse::<AssetType>().expect("alias"),
            AssetType::Materials
        );
        assert!("bond".parse::<AssetType>().is_err());
    }
}
