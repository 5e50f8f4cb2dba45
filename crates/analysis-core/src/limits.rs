use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::BudgetExceeded;

/// Per-run cap on external calls. Injected into the live data source and
/// acquired once before every outbound request; exhaustion terminates the
/// run with [`BudgetExceeded`].
#[derive(Debug)]
pub struct CallBudget {
    max_calls: u32,
    used: AtomicU32,
}

impl CallBudget {
    pub fn new(max_calls: u32) -> Self {
        Self {
            max_calls,
            used: AtomicU32::new(0),
        }
    }

    /// Consume one call slot, or fail if the budget is spent.
    pub fn try_acquire(&self) -> Result<(), BudgetExceeded> {
        let prev = self.used.fetch_add(1, Ordering::SeqCst);
        if prev >= self.max_calls {
            Err(BudgetExceeded {
                max: self.max_calls,
                used: prev,
            })
        } else {
            Ok(())
        }
    }

    pub fn used(&self) -> u32 {
        self.used.load(Ordering::SeqCst).min(self.max_calls)
    }

    pub fn max_calls(&self) -> u32 {
        self.max_calls
    }

    /// Explicit reset for reuse across runs.
    pub fn reset(&self) {
        self.used.store(0, Ordering::SeqCst);
    }
}

/// Sliding-window rate limiter: at most `max_requests` per `window`,
/// shared process-wide across provider clients and concurrent runs.
#[derive(Clone)]
pub struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests,
            window,
        }
    }

    /// Requests-per-minute limiter, the shape the providers meter by.
    pub fn per_minute(max_requests: usize) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    pub async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            // Drop timestamps that fell out of the window
            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            let oldest = *ts.front().expect("window is full, front exists");
            let sleep_dur =
                (oldest + self.window).duration_since(now) + Duration::from_millis(50);
            drop(ts);
            tracing::debug!(
                "rate limiter: waiting {:.1}s for a request slot",
                sleep_dur.as_secs_f64()
            );
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_allows_exactly_max_calls() {
        let budget = CallBudget::new(3);
        assert!(budget.try_acquire().is_ok());
        assert!(budget.try_acquire().is_ok());
        assert!(budget.try_acquire().is_ok());
        let err = budget.try_acquire().unwrap_err();
        assert_eq!(err.max, 3);
        assert_eq!(budget.used(), 3);
    }

    #[test]
    fn budget_reset_restores_capacity() {
        let budget = CallBudget::new(1);
        assert!(budget.try_acquire().is_ok());
        assert!(budget.try_acquire().is_err());
        budget.reset();
        assert!(budget.try_acquire().is_ok());
    }

    #[tokio::test]
    async fn limiter_admits_burst_within_window() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        // All five should pass without sleeping
        for _ in 0..5 {
            limiter.acquire().await;
        }
    }
}
