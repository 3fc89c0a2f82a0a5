//! Monotonic-clock token-bucket rate limiter.
//!
//! One instance per stage; never shared across stages. Must not use
//! wall-clock time, since NTP adjustments would corrupt pacing.

use std::time::{Duration, Instant};

/// Paces calls to at most `qps` per second. A `qps` of `0.0` disables
/// pacing entirely (`wait` becomes a no-op), matching the Python
/// `RateLimiter` this is ported from.
pub struct RateLimiter {
    min_interval: Duration,
    next_allowed_at: Option<Instant>,
}

impl RateLimiter {
    /// Builds a limiter allowing at most `qps` calls per second.
    #[must_use]
    pub fn new(qps: f64) -> Self {
        let min_interval = if qps <= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(1.0 / qps)
        };
        Self {
            min_interval,
            next_allowed_at: None,
        }
    }

    /// Blocks the current thread until the next slot is available, then
    /// reserves the following one.
    pub fn wait(&mut self) {
        if self.min_interval.is_zero() {
            return;
        }
        let now = Instant::now();
        if let Some(next_at) = self.next_allowed_at {
            if now < next_at {
                std::thread::sleep(next_at - now);
            }
        }
        self.next_allowed_at = Some(Instant::now() + self.min_interval);
    }

    /// Async variant of [`Self::wait`] for Tokio-based stages.
    pub async fn wait_async(&mut self) {
        if self.min_interval.is_zero() {
            return;
        }
        let now = Instant::now();
        if let Some(next_at) = self.next_allowed_at {
            if now < next_at {
                tokio::time::sleep(next_at - now).await;
            }
        }
        self.next_allowed_at = Some(Instant::now() + self.min_interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_qps_never_blocks() {
        let mut limiter = RateLimiter::new(0.0);
        let start = Instant::now();
        limiter.wait();
        limiter.wait();
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn positive_qps_spaces_calls() {
        let mut limiter = RateLimiter::new(20.0);
        let start = Instant::now();
        limiter.wait();
        limiter.wait();
        limiter.wait();
        assert!(start.elapsed() >= Duration::from_millis(90));
    }
}
