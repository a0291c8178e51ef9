//! Runtime configuration.
//!
//! Malformed values never abort a run; they coerce to the documented default
//! and are logged at `warn`.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cache::DEFAULT_PEAK_TTL;
use crate::pacing::{RequestPacer, DEFAULT_PAUSE};
use crate::retry::{Backoff, RetryConfig};
use crate::ChartRange;

/// Near-peak cutoff in percent, within `[0, 10]` on a `0.5` grid.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Threshold(f64);

impl Threshold {
    pub const DEFAULT: Self = Self(1.0);
    pub const MAX: f64 = 10.0;
    pub const STEP: f64 = 0.5;

    /// Rounds `value` to the nearest step; `None` when outside `[0, 10]` or
    /// not finite.
    pub fn new(value: f64) -> Option<Self> {
        if !value.is_finite() || !(0.0..=Self::MAX).contains(&value) {
            return None;
        }
        Some(Self((value / Self::STEP).round() * Self::STEP))
    }

    pub fn from_value_or_default(value: f64) -> Self {
        Self::new(value).unwrap_or_else(|| {
            warn!(value, default = Self::DEFAULT.0, "threshold out of range, using default");
            Self::DEFAULT
        })
    }

    pub fn parse_or_default(input: &str) -> Self {
        match input.trim().parse::<f64>() {
            Ok(value) => Self::from_value_or_default(value),
            Err(_) => {
                warn!(input, default = Self::DEFAULT.0, "threshold is not a number, using default");
                Self::DEFAULT
            }
        }
    }

    pub const fn value(self) -> f64 {
        self.0
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Settings shared by the service and the CLI.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchConfig {
    pub threshold: Threshold,
    pub pause: Duration,
    pub retry: RetryConfig,
    pub pacer_capacity: usize,
    pub requests_per_minute: Option<u32>,
    pub cache_ttl: Duration,
    pub default_range: ChartRange,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            threshold: Threshold::DEFAULT,
            pause: DEFAULT_PAUSE,
            retry: RetryConfig::default(),
            pacer_capacity: 1,
            requests_per_minute: None,
            cache_ttl: DEFAULT_PEAK_TTL,
            default_range: ChartRange::default(),
        }
    }
}

impl WatchConfig {
    /// Reads `ATHWATCH_*` variables over the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let threshold = lookup("ATHWATCH_THRESHOLD")
            .map(|raw| Threshold::parse_or_default(&raw))
            .unwrap_or(defaults.threshold);
        let pause = parsed::<u64>(&lookup, "ATHWATCH_PAUSE_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.pause);
        let max_retries =
            parsed::<u32>(&lookup, "ATHWATCH_MAX_RETRIES").unwrap_or(defaults.retry.max_retries);
        let backoff_step = parsed::<u64>(&lookup, "ATHWATCH_BACKOFF_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.retry.backoff.step());
        let backoff = match lookup("ATHWATCH_BACKOFF") {
            Some(kind) => Backoff::from_name(&kind, backoff_step).unwrap_or_else(|| {
                warn!(key = "ATHWATCH_BACKOFF", value = %kind, "unknown backoff, using linear");
                Backoff::Linear { step: backoff_step }
            }),
            None => Backoff::Linear { step: backoff_step },
        };
        let pacer_capacity = parsed::<usize>(&lookup, "ATHWATCH_PACER_CAPACITY")
            .filter(|capacity| *capacity > 0)
            .unwrap_or(defaults.pacer_capacity);
        let requests_per_minute = parsed::<u32>(&lookup, "ATHWATCH_RPM").filter(|rpm| *rpm > 0);
        let cache_ttl = parsed::<u64>(&lookup, "ATHWATCH_CACHE_TTL_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.cache_ttl);
        let default_range = lookup("ATHWATCH_RANGE")
            .map(|raw| ChartRange::parse_or_default(&raw))
            .unwrap_or(defaults.default_range);

        Self {
            threshold,
            pause,
            retry: RetryConfig {
                max_retries,
                backoff,
            },
            pacer_capacity,
            requests_per_minute,
            cache_ttl,
            default_range,
        }
    }

    pub fn with_threshold(mut self, threshold: Threshold) -> Self {
        self.threshold = threshold;
        self
    }

    /// Pacer built from capacity, pause and the optional per-minute quota.
    pub fn pacer(&self) -> RequestPacer {
        let pacer = RequestPacer::new(self.pacer_capacity, self.pause);
        match self.requests_per_minute {
            Some(rpm) => pacer.with_quota(Duration::from_secs(60), rpm),
            None => pacer,
        }
    }
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T: FromStr,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring malformed setting");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn threshold_rounds_to_half_steps() {
        assert_eq!(Threshold::parse_or_default("2.3").value(), 2.5);
        assert_eq!(Threshold::parse_or_default("0").value(), 0.0);
        assert_eq!(Threshold::parse_or_default("10").value(), 10.0);
    }

    #[test]
    fn malformed_threshold_coerces_to_default() {
        assert_eq!(Threshold::parse_or_default("abc"), Threshold::DEFAULT);
        assert_eq!(Threshold::parse_or_default("NaN"), Threshold::DEFAULT);
        assert_eq!(Threshold::parse_or_default("-1"), Threshold::DEFAULT);
        assert_eq!(Threshold::parse_or_default("10.5"), Threshold::DEFAULT);
    }

    #[test]
    fn lookup_overrides_defaults_and_ignores_garbage() {
        let vars = HashMap::from([
            ("ATHWATCH_THRESHOLD", "3"),
            ("ATHWATCH_PAUSE_MS", "200"),
            ("ATHWATCH_MAX_RETRIES", "oops"),
            ("ATHWATCH_PACER_CAPACITY", "0"),
            ("ATHWATCH_RPM", "120"),
            ("ATHWATCH_RANGE", "5y"),
        ]);
        let config = WatchConfig::from_lookup(|key| vars.get(key).map(|value| value.to_string()));

        assert_eq!(config.threshold.value(), 3.0);
        assert_eq!(config.pause, Duration::from_millis(200));
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.pacer_capacity, 1);
        assert_eq!(config.requests_per_minute, Some(120));
        assert_eq!(config.default_range, ChartRange::FiveYears);
    }

    #[test]
    fn lookup_selects_backoff_strategy() {
        let vars = HashMap::from([("ATHWATCH_BACKOFF", "exponential"), ("ATHWATCH_BACKOFF_MS", "100")]);
        let config = WatchConfig::from_lookup(|key| vars.get(key).map(|value| value.to_string()));

        assert!(matches!(
            config.retry.backoff,
            Backoff::Exponential { base, jitter: true, .. } if base == Duration::from_millis(100)
        ));

        let vars = HashMap::from([("ATHWATCH_BACKOFF", "zigzag")]);
        let config = WatchConfig::from_lookup(|key| vars.get(key).map(|value| value.to_string()));
        assert_eq!(config.retry.backoff, Backoff::default());
    }

    #[test]
    fn oversized_cache_ttl_is_kept_and_never_overflows() {
        let max = u64::MAX.to_string();
        let config = WatchConfig::from_lookup(|key| {
            (key == "ATHWATCH_CACHE_TTL_SECS").then(|| max.clone())
        });

        assert_eq!(config.cache_ttl, Duration::from_secs(u64::MAX));
    }

    #[test]
    fn empty_environment_yields_defaults() {
        assert_eq!(WatchConfig::from_lookup(|_| None), WatchConfig::default());
    }
}
