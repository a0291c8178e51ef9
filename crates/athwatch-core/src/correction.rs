//! Split-adjustment correction for weekly high prices.
//!
//! Providers adjust `close`/`adjusted_close` for splits but occasionally leave
//! the `high` field of old weeks on the pre-split scale. Without a split
//! calendar the only signal is the high/close ratio: a normal week trades a few
//! percent above its close, a broken week sits at a whole multiple of it.
//!
//! [`SeriesCorrector`] estimates the normal ratio ("intraday premium") from the
//! most recent weeks and treats any week whose ratio exceeds a multiple of that
//! baseline as an artifact. Genuinely volatile weeks can be misread and small
//! splits (3:2) slip through; the detector is best-effort by nature.

use serde::{Deserialize, Serialize};

use crate::{PricePoint, SymbolSeries, UtcDateTime};

/// Number of most recent valid points averaged into the baseline premium.
pub const BASELINE_WINDOW: usize = 10;

/// Premium assumed when the series has no usable recent point.
pub const DEFAULT_INTRADAY_PREMIUM: f64 = 1.02;

/// A week is an artifact when its high/close ratio exceeds this multiple of
/// the baseline premium.
pub const ARTIFACT_RATIO_MULTIPLE: f64 = 2.0;

/// Adjusted high computed for one source point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrectedHigh {
    /// Position of the source point in the series.
    pub index: usize,
    pub date: UtcDateTime,
    pub adjusted_high: f64,
    /// Inferred split factor when the point was classified as an artifact.
    pub split_factor: Option<f64>,
}

impl CorrectedHigh {
    pub fn is_split_artifact(&self) -> bool {
        self.split_factor.is_some()
    }
}

/// Tunables for artifact detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesCorrector {
    pub baseline_window: usize,
    pub default_premium: f64,
    pub artifact_multiple: f64,
}

impl Default for SeriesCorrector {
    fn default() -> Self {
        Self {
            baseline_window: BASELINE_WINDOW,
            default_premium: DEFAULT_INTRADAY_PREMIUM,
            artifact_multiple: ARTIFACT_RATIO_MULTIPLE,
        }
    }
}

impl SeriesCorrector {
    /// Mean high/close ratio over the most recent valid points.
    pub fn baseline_premium(&self, series: &SymbolSeries) -> f64 {
        let ratios: Vec<f64> = series
            .points
            .iter()
            .rev()
            .filter_map(high_close_ratio)
            .take(self.baseline_window.max(1))
            .collect();

        if ratios.is_empty() {
            return self.default_premium;
        }

        ratios.iter().sum::<f64>() / ratios.len() as f64
    }

    /// Produces one adjusted high per usable point, in series order.
    ///
    /// Points missing high, close or adjusted close, or with a non-positive
    /// close, produce nothing.
    pub fn correct(&self, series: &SymbolSeries) -> Vec<CorrectedHigh> {
        let baseline = self.baseline_premium(series);
        let artifact_threshold = baseline * self.artifact_multiple;

        series
            .points
            .iter()
            .enumerate()
            .filter_map(|(index, point)| {
                let (high, close, adjusted_close) = point.complete_fields()?;
                if close <= 0.0 {
                    return None;
                }

                let ratio = high / close;
                let (adjusted_high, split_factor) = if ratio > artifact_threshold {
                    let factor = ratio / baseline;
                    (high / factor, Some(factor))
                } else {
                    (high * (adjusted_close / close), None)
                };

                adjusted_high.is_finite().then_some(CorrectedHigh {
                    index,
                    date: point.date,
                    adjusted_high,
                    split_factor,
                })
            })
            .collect()
    }
}

fn high_close_ratio(point: &PricePoint) -> Option<f64> {
    let high = point.high?;
    let close = point.close?;
    if close <= 0.0 {
        return None;
    }
    let ratio = high / close;
    ratio.is_finite().then_some(ratio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Symbol;

    fn week(index: i64) -> UtcDateTime {
        UtcDateTime::from_unix_timestamp(1_500_000_000 + index * 7 * 86_400).expect("timestamp")
    }

    fn series(points: Vec<PricePoint>) -> SymbolSeries {
        SymbolSeries::new(Symbol::parse("TEST").expect("symbol"), points)
    }

    fn flat_point(index: i64, close: f64) -> PricePoint {
        PricePoint::new(week(index), Some(close * 1.02), Some(close), Some(close))
    }

    #[test]
    fn empty_series_has_default_premium_and_no_output() {
        let corrector = SeriesCorrector::default();
        let empty = series(Vec::new());

        assert_eq!(corrector.baseline_premium(&empty), DEFAULT_INTRADAY_PREMIUM);
        assert!(corrector.correct(&empty).is_empty());
    }

    #[test]
    fn baseline_uses_only_most_recent_window() {
        let mut points: Vec<PricePoint> = (0..5)
            .map(|i| PricePoint::new(week(i), Some(150.0), Some(100.0), Some(100.0)))
            .collect();
        points.extend((5..15).map(|i| PricePoint::new(week(i), Some(110.0), Some(100.0), Some(100.0))));

        let baseline = SeriesCorrector::default().baseline_premium(&series(points));
        assert!((baseline - 1.10).abs() < 1e-9);
    }

    #[test]
    fn standard_adjustment_scales_high_by_adjusted_close_ratio() {
        let point = PricePoint::new(week(0), Some(102.0), Some(100.0), Some(50.0));
        let corrected = SeriesCorrector::default().correct(&series(vec![point]));

        assert_eq!(corrected.len(), 1);
        assert!((corrected[0].adjusted_high - 51.0).abs() < 1e-9);
        assert!(!corrected[0].is_split_artifact());
    }

    #[test]
    fn four_to_one_artifact_is_rescaled_to_neighbour_magnitude() {
        let mut points: Vec<PricePoint> = (0..20).map(|i| flat_point(i, 100.0)).collect();
        // Week 3 high left on the pre-split scale.
        points[3] = PricePoint::new(week(3), Some(408.0), Some(100.0), Some(100.0));

        let corrected = SeriesCorrector::default().correct(&series(points));
        let artifact = corrected
            .iter()
            .find(|value| value.index == 3)
            .expect("artifact point corrected");

        assert!(artifact.is_split_artifact());
        let factor = artifact.split_factor.expect("factor");
        assert!((factor - 4.0).abs() < 1e-9, "factor was {factor}");
        assert!((artifact.adjusted_high - 102.0).abs() < 1e-6);
    }

    #[test]
    fn points_with_missing_fields_are_skipped() {
        let points = vec![
            PricePoint::new(week(0), None, Some(100.0), Some(100.0)),
            PricePoint::new(week(1), Some(101.0), Some(100.0), None),
            PricePoint::new(week(2), Some(101.0), Some(0.0), Some(0.0)),
            flat_point(3, 100.0),
        ];

        let corrected = SeriesCorrector::default().correct(&series(points));
        assert_eq!(corrected.len(), 1);
        assert_eq!(corrected[0].index, 3);
    }

    #[test]
    fn volatile_week_below_threshold_is_not_an_artifact() {
        let mut points: Vec<PricePoint> = (0..12).map(|i| flat_point(i, 100.0)).collect();
        points[0] = PricePoint::new(week(0), Some(180.0), Some(100.0), Some(100.0));

        let corrected = SeriesCorrector::default().correct(&series(points));
        assert!(!corrected[0].is_split_artifact());
        assert!((corrected[0].adjusted_high - 180.0).abs() < 1e-9);
    }
}
