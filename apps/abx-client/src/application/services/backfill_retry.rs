//! Backfill Retry Policy
//!
//! Bounded exponential backoff with jitter between resend attempts for a
//! single missing sequence. With the default of one attempt no delay is
//! ever produced.

use std::time::Duration;

use rand::Rng;

/// Configuration for backfill retries.
#[derive(Debug, Clone)]
pub struct BackfillRetryConfig {
    /// Total resend attempts per missing sequence, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Upper bound on any delay.
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each retry.
    pub multiplier: f64,
    /// Jitter factor as a fraction (0.1 = ±10%).
    pub jitter_factor: f64,
}

impl Default for BackfillRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl BackfillRetryConfig {
    /// Configuration with `max_attempts` attempts and no jitter.
    #[must_use]
    pub fn with_attempts(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            jitter_factor: 0.0,
            ..Self::default()
        }
    }
}

/// Retry state for one missing sequence.
///
/// The first attempt is counted on construction; [`next_delay`](Self::next_delay)
/// grants each further attempt.
#[derive(Debug)]
pub struct BackfillRetryPolicy {
    config: BackfillRetryConfig,
    current_delay: Duration,
    attempts: u32,
}

impl BackfillRetryPolicy {
    /// Create a policy for a fresh sequence.
    #[must_use]
    pub const fn new(config: BackfillRetryConfig) -> Self {
        let initial_delay = config.initial_delay;
        Self {
            config,
            current_delay: initial_delay,
            attempts: 1,
        }
    }

    /// Delay before the next attempt, or `None` once attempts are exhausted.
    #[must_use]
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.config.max_attempts {
            return None;
        }
        self.attempts += 1;

        let delay = self.apply_jitter(self.current_delay);

        #[allow(clippy::cast_precision_loss)]
        let scaled = (self.current_delay.as_millis() as f64 * self.config.multiplier).round();
        let next_millis = if scaled.is_finite() && scaled > 0.0 {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                scaled as u128
            }
        } else {
            0
        };
        let capped = next_millis.min(self.config.max_delay.as_millis());
        self.current_delay = Duration::from_millis(u64::try_from(capped).unwrap_or(u64::MAX));

        Some(delay)
    }

    /// Attempts granted so far, including the first.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    fn apply_jitter(&self, duration: Duration) -> Duration {
        if self.config.jitter_factor <= 0.0 {
            return duration;
        }

        #[allow(clippy::cast_precision_loss)]
        let base_millis = duration.as_millis() as f64;
        let jitter_range = base_millis * self.config.jitter_factor;
        let jitter: f64 = rand::rng().random_range(-jitter_range..=jitter_range);
        let adjusted_millis = (base_millis + jitter).max(1.0);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let adjusted = adjusted_millis as u64;
        Duration::from_millis(adjusted)
    }
}
