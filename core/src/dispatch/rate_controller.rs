//! Admission pacing for the submission loop

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{clock::DefaultClock, state::InMemoryState, state::NotKeyed, Quota, RateLimiter};

use crate::config::MIN_RATE;

/// Global admission pacer using the GCRA token bucket from the governor crate
///
/// One cell is replenished every `1/R` seconds with a burst of one, so the
/// first admission is immediate and `N` admissions take at least `(N-1)/R`
/// seconds. Only the submission loop calls [`acquire`](Self::acquire).
pub struct RateController {
    limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    rate: Option<f64>,
}

impl RateController {
    /// Create a controller for `rate` admissions per second
    ///
    /// `None`, zero, negative and non-finite rates disable pacing. Rates below
    /// [`MIN_RATE`] are paced as `MIN_RATE`.
    ///
    /// # Examples
    /// ```
    /// use smtp_bench_core::RateController;
    ///
    /// let paced = RateController::new(Some(7.0));
    /// assert!(paced.is_enabled());
    ///
    /// let unlimited = RateController::new(Some(0.0));
    /// assert!(!unlimited.is_enabled());
    /// ```
    pub fn new(rate: Option<f64>) -> Self {
        let rate = rate
            .filter(|r| r.is_finite() && *r > 0.0)
            .map(|r| r.max(MIN_RATE));
        let limiter = rate.and_then(|r| {
            let period = Duration::try_from_secs_f64(1.0 / r)
                .unwrap_or(Duration::ZERO)
                .max(Duration::from_nanos(1));
            let quota = Quota::with_period(period)?.allow_burst(NonZeroU32::MIN);
            Some(RateLimiter::direct(quota))
        });

        Self { limiter, rate }
    }

    /// Create a controller that never waits
    pub fn unlimited() -> Self {
        Self::new(None)
    }

    /// Wait until the next admission is allowed
    ///
    /// Returns immediately when pacing is disabled.
    pub async fn acquire(&self) {
        if let Some(ref limiter) = self.limiter {
            limiter.until_ready().await;
        }
    }

    /// Check if pacing is enabled
    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }

    /// Configured admissions per second
    pub fn rate(&self) -> Option<f64> {
        self.rate
    }

    /// Shortest wall-clock time `admissions` acquisitions can take
    pub fn min_duration(&self, admissions: u64) -> Duration {
        match self.rate {
            Some(rate) if admissions > 1 => {
                Duration::try_from_secs_f64((admissions - 1) as f64 / rate).unwrap_or(Duration::MAX)
            }
            _ => Duration::ZERO,
        }
    }
}

impl Default for RateController {
    fn default() -> Self {
        Self::unlimited()
    }
}

impl std::fmt::Debug for RateController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateController")
            .field("rate", &self.rate)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
