//! Filtering and ordering of metric rows for display.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{AssetType, DerivedMetrics, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Symbol,
    Name,
    CurrentPrice,
    PeakPrice,
    #[default]
    PercentDown,
    PercentToPeak,
    DailyChange,
    DividendYield,
    ExpenseRatio,
    AssetType,
}

impl SortField {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Symbol => "symbol",
            Self::Name => "name",
            Self::CurrentPrice => "current_price",
            Self::PeakPrice => "peak_price",
            Self::PercentDown => "percent_down",
            Self::PercentToPeak => "percent_to_peak",
            Self::DailyChange => "daily_change",
            Self::DividendYield => "dividend_yield",
            Self::ExpenseRatio => "expense_ratio",
            Self::AssetType => "asset_type",
        }
    }
}

impl Display for SortField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortField {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        let field = match normalized.as_str() {
            "symbol" => Self::Symbol,
            "name" => Self::Name,
            "current_price" | "price" => Self::CurrentPrice,
            "peak_price" | "peak" => Self::PeakPrice,
            "percent_down" | "down" => Self::PercentDown,
            "percent_to_peak" | "to_peak" => Self::PercentToPeak,
            "daily_change" | "change" => Self::DailyChange,
            "dividend_yield" | "yield" => Self::DividendYield,
            "expense_ratio" => Self::ExpenseRatio,
            "asset_type" | "type" => Self::AssetType,
            _ => {
                return Err(ValidationError::InvalidSortField {
                    value: value.to_owned(),
                })
            }
        };
        Ok(field)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// Value a row exposes for one [`SortField`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SortKey<'a> {
    Text(&'a str),
    Number(Option<f64>),
}

/// A row that can be filtered by text and type and ordered by [`SortField`].
pub trait Sortable {
    fn symbol_text(&self) -> &str;
    fn display_name(&self) -> &str;
    fn asset_type(&self) -> AssetType;
    fn sort_key(&self, field: SortField) -> SortKey<'_>;
}

impl Sortable for DerivedMetrics {
    fn symbol_text(&self) -> &str {
        self.symbol.as_str()
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn asset_type(&self) -> AssetType {
        self.asset_type
    }

    fn sort_key(&self, field: SortField) -> SortKey<'_> {
        match field {
            SortField::Symbol => SortKey::Text(self.symbol.as_str()),
            SortField::Name => SortKey::Text(&self.name),
            SortField::AssetType => SortKey::Text(self.asset_type.as_str()),
            SortField::CurrentPrice => SortKey::Number(Some(self.current_price)),
            SortField::PeakPrice => SortKey::Number(Some(self.peak_price)),
            SortField::PercentDown => SortKey::Number(Some(self.percent_down)),
            SortField::PercentToPeak => SortKey::Number(Some(self.percent_to_peak)),
            SortField::DailyChange => SortKey::Number(self.daily_change_percent),
            SortField::DividendYield => SortKey::Number(self.dividend_yield),
            SortField::ExpenseRatio => SortKey::Number(self.expense_ratio),
        }
    }
}

/// Filters by text and asset type, then stable-sorts.
///
/// `query` matches case-insensitively against symbol or name; an empty query
/// or an empty `types` set does not restrict. Rows missing a numeric sort
/// value go last in either direction.
pub fn sort_filter<T>(
    items: Vec<T>,
    field: SortField,
    direction: SortDirection,
    query: &str,
    types: &BTreeSet<AssetType>,
) -> Vec<T>
where
    T: Sortable,
{
    let needle = query.trim().to_lowercase();

    let mut filtered: Vec<T> = items
        .into_iter()
        .filter(|item| types.is_empty() || types.contains(&item.asset_type()))
        .filter(|item| {
            needle.is_empty()
                || item.symbol_text().to_lowercase().contains(&needle)
                || item.display_name().to_lowercase().contains(&needle)
        })
        .collect();

    filtered.sort_by(|left, right| compare(left.sort_key(field), right.sort_key(field), direction));
    filtered
}

fn compare(left: SortKey<'_>, right: SortKey<'_>, direction: SortDirection) -> Ordering {
    let directed = |ordering: Ordering| match direction {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    };

    match (left, right) {
        (SortKey::Text(left), SortKey::Text(right)) => directed(left.cmp(right)),
        (SortKey::Number(Some(left)), SortKey::Number(Some(right))) => {
            directed(left.total_cmp(&right))
        }
        (SortKey::Number(None), SortKey::Number(None)) => Ordering::Equal,
        (SortKey::Number(None), SortKey::Number(Some(_))) => Ordering::Greater,
        (SortKey::Number(Some(_)), SortKey::Number(None)) => Ordering::Less,
        // A field always yields the same key variant.
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PeakConfidence, Symbol, UtcDateTime};

    fn row(symbol: &str, name: &str, down: f64, change: Option<f64>, kind: AssetType) -> DerivedMetrics {
        DerivedMetrics {
            symbol: Symbol::parse(symbol).expect("symbol"),
            name: name.to_owned(),
            current_price: 10.0,
            peak_price: 10.0,
            peak_date: UtcDateTime::now(),
            percent_down: down,
            percent_to_peak: 0.0,
            is_near_peak: false,
            asset_type: kind,
            currency: String::from("USD"),
            daily_change_percent: change,
            dividend_yield: None,
            expense_ratio: None,
            confidence: PeakConfidence::Resolved,
        }
    }

    fn symbols(rows: &[DerivedMetrics]) -> Vec<&str> {
        rows.iter().map(|row| row.symbol.as_str()).collect()
    }

    fn rows() -> Vec<DerivedMetrics> {
        vec![
            row("VTI", "Vanguard Total Market", 2.0, Some(0.5), AssetType::Etf),
            row("AAPL", "Apple Inc.", 10.0, None, AssetType::Stock),
            row("BTC-USD", "Bitcoin USD", 30.0, Some(-3.0), AssetType::Crypto),
            row("VOO", "Vanguard S&P 500", 2.0, Some(1.0), AssetType::Etf),
        ]
    }

    #[test]
    fn numeric_sort_is_stable_in_both_directions() {
        let ascending = sort_filter(rows(), SortField::PercentDown, SortDirection::Ascending, "", &BTreeSet::new());
        assert_eq!(symbols(&ascending), ["VTI", "VOO", "AAPL", "BTC-USD"]);

        let descending = sort_filter(rows(), SortField::PercentDown, SortDirection::Descending, "", &BTreeSet::new());
        assert_eq!(symbols(&descending), ["BTC-USD", "AAPL", "VTI", "VOO"]);
    }

    #[test]
    fn missing_values_sort_last() {
        let sorted = sort_filter(rows(), SortField::DailyChange, SortDirection::Descending, "", &BTreeSet::new());
        assert_eq!(symbols(&sorted), ["VOO", "VTI", "BTC-USD", "AAPL"]);
    }

    #[test]
    fn text_query_matches_symbol_or_name() {
        let by_name = sort_filter(rows(), SortField::Symbol, SortDirection::Ascending, "vanguard", &BTreeSet::new());
        assert_eq!(symbols(&by_name), ["VOO", "VTI"]);

        let by_symbol = sort_filter(rows(), SortField::Symbol, SortDirection::Ascending, "btc", &BTreeSet::new());
        assert_eq!(symbols(&by_symbol), ["BTC-USD"]);
    }

    #[test]
    fn type_filter_restricts_membership() {
        let types = BTreeSet::from([AssetType::Stock, AssetType::Crypto]);
        let filtered = sort_filter(rows(), SortField::Symbol, SortDirection::Ascending, "", &types);
        assert_eq!(symbols(&filtered), ["AAPL", "BTC-USD"]);
    }

    #[test]
    fn sort_field_parses_aliases() {
        assert_eq!("percent-down".parse::<SortField>().expect("field"), SortField::PercentDown);
        assert_eq!("change".parse::<SortField>().expect("alias"), SortField::DailyChange);
        assert!("volume".parse::<SortField>().is_err());
    }
}
