//! Watchlist summary over a set of metric rows.

use serde::{Deserialize, Serialize};

use crate::DerivedMetrics;

/// Summary of a (possibly filtered) metrics collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub deepest_discount: DerivedMetrics,
    /// Closest instrument still below its peak; `None` when all are at peak.
    pub nearest_peak: Option<DerivedMetrics>,
    pub at_peak_count: usize,
    pub top_performer: Option<DerivedMetrics>,
    pub worst_performer: Option<DerivedMetrics>,
    pub average_percent_down: f64,
}

/// Summarizes `metrics`, or returns `None` for an empty collection.
///
/// Ties resolve to the first element encountered.
pub fn summarize(metrics: &[DerivedMetrics]) -> Option<Summary> {
    let first = metrics.first()?;

    let mut deepest = first;
    let mut nearest: Option<&DerivedMetrics> = None;
    let mut top: Option<(&DerivedMetrics, f64)> = None;
    let mut worst: Option<(&DerivedMetrics, f64)> = None;
    let mut at_peak_count = 0;
    let mut total_down = 0.0;

    for item in metrics {
        total_down += item.percent_down;

        if item.percent_down > deepest.percent_down {
            deepest = item;
        }

        if item.percent_down > 0.0
            && nearest.is_none_or(|current| item.percent_down < current.percent_down)
        {
            nearest = Some(item);
        }

        if item.is_near_peak || item.percent_down == 0.0 {
            at_peak_count += 1;
        }

        if let Some(change) = item.daily_change_percent {
            if top.is_none_or(|(_, best)| change > best) {
                top = Some((item, change));
            }
            if worst.is_none_or(|(_, lowest)| change < lowest) {
                worst = Some((item, change));
            }
        }
    }

    Some(Summary {
        count: metrics.len(),
        deepest_discount: deepest.clone(),
        nearest_peak: nearest.cloned(),
        at_peak_count,
        top_performer: top.map(|(item, _)| item.clone()),
        worst_performer: worst.map(|(item, _)| item.clone()),
        average_percent_down: total_down / metrics.len() as f64,
    })
}
