//! Retry policy for per-symbol provider calls.

use std::time::Duration;

use crate::data_source::SourceError;

/// Backoff strategy between retries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed {
        delay: Duration,
    },
    /// Delay grows by `step` per retry: `step * retry_number`.
    Linear {
        step: Duration,
    },
    /// Delay is `base * factor^attempt`, capped at `max`.
    Exponential {
        base: Duration,
        factor: f64,
        max: Duration,
        /// Apply random jitter (+/- 50%) to the delay.
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Linear {
            step: Duration::from_millis(500),
        }
    }
}

/// Cap applied to exponential delays built from configuration.
pub const MAX_EXPONENTIAL_DELAY: Duration = Duration::from_secs(30);

impl Backoff {
    /// Strategy named `kind` (`fixed`, `linear` or `exponential`) scaled by `step`.
    ///
    /// Exponential backoff doubles from `step` with jitter, capped at
    /// [`MAX_EXPONENTIAL_DELAY`].
    pub fn from_name(kind: &str, step: Duration) -> Option<Self> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "fixed" => Some(Self::Fixed { delay: step }),
            "linear" => Some(Self::Linear { step }),
            "exponential" | "exp" => Some(Self::Exponential {
                base: step,
                factor: 2.0,
                max: MAX_EXPONENTIAL_DELAY,
                jitter: true,
            }),
            _ => None,
        }
    }

    /// Base delay of the strategy.
    pub fn step(self) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Linear { step } => step,
            Self::Exponential { base, .. } => base,
        }
    }

    /// Delay before retry `attempt` (0-based: 0 is the first retry).
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Linear { step } => step.saturating_mul(attempt.saturating_add(1)),
            Self::Exponential {
                base,
                factor,
                max,
                jitter,
            } => {
                let scale = factor.powi(attempt as i32);
                let seconds = base.as_secs_f64() * scale;
                let capped_seconds = seconds.min(max.as_secs_f64());

                let mut delay = Duration::from_secs_f64(capped_seconds);

                if jitter {
                    let jitter_ms = (delay.as_millis() as f64 * 0.5) as u64;
                    let random_offset = fastrand::u64(0..=(jitter_ms * 2));
                    let total_ms =
                        delay.as_millis() as i64 + (random_offset as i64 - jitter_ms as i64);
                    delay = Duration::from_millis(total_ms.max(0) as u64);
                }

                delay
            }
        }
    }
}

/// Retry configuration for a single fetch-and-resolve attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts = `max_retries + 1`.
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff: Backoff::default(),
        }
    }
}

impl RetryConfig {
    pub fn linear(step: Duration, max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Backoff::Linear { step },
        }
    }

    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Whether another attempt should follow a failure on retry `attempt`.
    pub fn should_retry(&self, error: &SourceError, attempt: u32) -> bool {
        error.retryable() && attempt < self.max_retries
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }

    /// Sum of every backoff delay when all retries are used.
    pub fn worst_case_backoff(&self) -> Duration {
        (0..self.max_retries)
            .map(|attempt| self.delay_for_attempt(attempt))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}
