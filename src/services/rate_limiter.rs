//! Fixed-window Rate Limiter
//!
//! Counts sends in a window that starts at first use. When the window is full
//! the caller is suspended until it flips; every caller stalled on the same
//! window is released together.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Default window length
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct WindowState {
    count: u32,
    window_start: Instant,
}

/// Rate limiter
#[derive(Debug)]
pub struct RateLimiter {
    state: Mutex<WindowState>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    /// Limiter allowing `limit` calls per window. A zero limit is raised to one.
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            state: Mutex::new(WindowState {
                count: 0,
                window_start: Instant::now(),
            }),
            limit: limit.max(1),
            window,
        }
    }

    pub fn per_minute(max_per_minute: u32) -> Self {
        Self::new(max_per_minute, DEFAULT_WINDOW)
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Account for one call, waiting for the window to flip if it is full
    pub async fn check_limit(&self) {
        let wait = {
            let mut state = self.state.lock().await;
            let now = Instant::now();

            if now.duration_since(state.window_start) >= self.window {
                state.count = 0;
                state.window_start = now;
            }

            if state.count < self.limit {
                state.count += 1;
                return;
            }

            self.window
                .saturating_sub(now.duration_since(state.window_start))
        };

        debug!(
            limit = self.limit,
            wait_ms = wait.as_millis() as u64,
            "Rate limit reached, waiting for window reset"
        );
        sleep(wait).await;

        let mut state = self.state.lock().await;
        state.count = 0;
        state.window_start = Instant::now();
        state.count += 1;
    }

    /// Start a fresh window now
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.count = 0;
        state.window_start = Instant::now();
    }

    pub async fn current_count(&self) -> u32 {
        self.state.lock().await.count
    }

    pub async fn time_until_reset(&self) -> Duration {
        let state = self.state.lock().await;
        self.window
            .saturating_sub(Instant::now().duration_since(state.window_start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_calls_within_limit_do_not_wait() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let start = Instant::now();

        for _ in 0..3 {
            limiter.check_limit().await;
        }

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.current_count().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_over_limit_waits_for_window() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let start = Instant::now();

        for _ in 0..3 {
            limiter.check_limit().await;
        }
        tokio::time::advance(Duration::from_secs(10)).await;
        limiter.check_limit().await;

        assert!(start.elapsed() >= Duration::from_secs(60));
        assert!(start.elapsed() < Duration::from_secs(61));
        assert_eq!(limiter.current_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fourth_call_is_pending_until_flip() {
        let limiter = Arc::new(RateLimiter::new(3, Duration::from_secs(60)));
        for _ in 0..3 {
            limiter.check_limit().await;
        }

        let waiting = tokio::spawn({
            let limiter = Arc::clone(&limiter);
            async move { limiter.check_limit().await }
        });

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert!(!waiting.is_finished());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(waiting.is_finished());
        waiting.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_expiry_resets_count() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        limiter.check_limit().await;
        limiter.check_limit().await;

        tokio::time::advance(Duration::from_secs(60)).await;
        let start = Instant::now();
        limiter.check_limit().await;

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.current_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_at_boundary_released_together() {
        let limiter = Arc::new(RateLimiter::new(1, Duration::from_secs(60)));
        limiter.check_limit().await;
        let start = Instant::now();

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    limiter.check_limit().await;
                    Instant::now()
                })
            })
            .collect();

        for handle in handles {
            let released = handle.await.unwrap();
            assert!(released.duration_since(start) >= Duration::from_secs(60));
            assert!(released.duration_since(start) < Duration::from_secs(61));
        }
        assert_eq!(limiter.current_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_and_introspection() {
        let limiter = RateLimiter::per_minute(5);
        limiter.check_limit().await;
        tokio::time::advance(Duration::from_secs(15)).await;

        assert_eq!(limiter.current_count().await, 1);
        assert_eq!(limiter.time_until_reset().await, Duration::from_secs(45));

        limiter.reset().await;
        assert_eq!(limiter.current_count().await, 0);
        assert_eq!(limiter.time_until_reset().await, Duration::from_secs(60));
    }
}
