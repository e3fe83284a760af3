//! Delay policies for retry scheduling
//!
//! A [`BackoffPolicy`] computes how long to wait before re-dispatching a
//! failed operation. The growth curve is pluggable: fixed delays,
//! exponential doubling with a cap, or a caller-supplied function. An
//! optional jitter factor spreads retries out to avoid synchronized bursts.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

/// Default base delay for exponential backoff
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Default upper bound on any computed delay
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Cap on the backoff exponent to prevent overflow
pub const MAX_BACKOFF_EXPONENT: u32 = 30;

/// Type alias for caller-supplied delay functions to reduce complexity
type DelayFn = Arc<dyn Fn(u32) -> Duration + Send + Sync>;

/// How the delay between retry attempts grows
pub enum BackoffStrategy {
    /// The same delay before every attempt
    Fixed(Duration),
    /// `base * 2^(attempt - 1)`, capped at `max`
    Exponential {
        /// Delay before the first retry
        base: Duration,
        /// Upper bound on any computed delay
        max: Duration,
    },
    /// Caller-supplied function of the attempt number (1-based)
    Custom(DelayFn),
}

impl BackoffStrategy {
    /// Raw delay for an attempt, before jitter
    ///
    /// Attempts are 1-based: attempt 1 is the first retry. An attempt of 0
    /// is treated as 1.
    fn base_delay(&self, attempt: u32) -> Duration {
        match self {
            Self::Fixed(delay) => *delay,
            Self::Exponential { base, max } => {
                let base_millis = base.as_millis() as u64;
                let max_millis = max.as_millis() as u64;

                // Cap exponent to prevent overflow
                let exponent = attempt.max(1).saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
                let multiplier = 2_u64.saturating_pow(exponent);

                let delay_millis = base_millis.saturating_mul(multiplier).min(max_millis);
                Duration::from_millis(delay_millis)
            }
            Self::Custom(f) => f(attempt),
        }
    }
}

impl Clone for BackoffStrategy {
    fn clone(&self) -> Self {
        match self {
            Self::Fixed(delay) => Self::Fixed(*delay),
            Self::Exponential { base, max } => Self::Exponential { base: *base, max: *max },
            Self::Custom(f) => Self::Custom(Arc::clone(f)),
        }
    }
}

impl fmt::Debug for BackoffStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(delay) => f.debug_tuple("Fixed").field(delay).finish(),
            Self::Exponential { base, max } => {
                f.debug_struct("Exponential").field("base", base).field("max", max).finish()
            }
            Self::Custom(_) => write!(f, "Custom(<function>)"),
        }
    }
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self::Exponential { base: DEFAULT_BASE_DELAY, max: DEFAULT_MAX_DELAY }
    }
}

/// Backoff policy combining a growth strategy with optional jitter
///
/// The default policy doubles a one second base delay per attempt, caps the
/// result at thirty seconds, and applies no jitter.
#[derive(Debug, Clone, Default)]
pub struct BackoffPolicy {
    strategy: BackoffStrategy,
    jitter_factor: f64,
}

impl BackoffPolicy {
    /// Create a policy from an explicit strategy with no jitter
    pub fn new(strategy: BackoffStrategy) -> Self {
        Self { strategy, jitter_factor: 0.0 }
    }

    /// Fixed delay before every attempt
    pub fn fixed(delay: Duration) -> Self {
        Self::new(BackoffStrategy::Fixed(delay))
    }

    /// Exponential doubling from `base`, capped at `max`
    pub fn exponential(base: Duration, max: Duration) -> Self {
        Self::new(BackoffStrategy::Exponential { base, max })
    }

    /// Caller-supplied delay function of the attempt number
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        Self::new(BackoffStrategy::Custom(Arc::new(f)))
    }

    /// Set the jitter factor (0.0 = no jitter, 1.0 = full jitter)
    ///
    /// Values outside `[0.0, 1.0]` are clamped.
    pub fn with_jitter_factor(mut self, factor: f64) -> Self {
        self.jitter_factor = factor.clamp(0.0, 1.0);
        self
    }

    /// The configured growth strategy
    pub fn strategy(&self) -> &BackoffStrategy {
        &self.strategy
    }

    /// The configured jitter factor
    pub fn jitter_factor(&self) -> f64 {
        self.jitter_factor
    }

    /// Check the policy for internally inconsistent settings
    pub fn validate(&self) -> Result<(), String> {
        if let BackoffStrategy::Exponential { base, max } = &self.strategy {
            if base > max {
                return Err(format!(
                    "base delay ({:?}) cannot be greater than max delay ({:?})",
                    base, max
                ));
            }
        }
        Ok(())
    }

    /// Calculate the delay before the given retry attempt
    ///
    /// Attempts are 1-based: `delay_for(1)` is the wait before the first
    /// retry. With the default exponential strategy this yields `base`,
    /// `2 * base`, `4 * base`, ... up to the configured cap.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.apply_jitter(self.strategy.base_delay(attempt))
    }

    /// Apply jitter to spread out synchronized retries
    fn apply_jitter(&self, delay: Duration) -> Duration {
        if self.jitter_factor == 0.0 {
            return delay;
        }

        let mut rng = rand::thread_rng();
        let delay_millis = delay.as_millis() as f64;
        let jitter_range = delay_millis * self.jitter_factor;

        // Add random jitter: -jitter_range/2 to +jitter_range/2
        let jitter = rng.gen_range(-jitter_range / 2.0..=jitter_range / 2.0);
        let final_millis = (delay_millis + jitter).max(0.0) as u64;

        Duration::from_millis(final_millis)
    }
}
