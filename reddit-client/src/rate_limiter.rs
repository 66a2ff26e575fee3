use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::sleep;

/// Pacing policy for one class of upstream calls.
#[derive(Debug, Clone)]
pub struct PacingConfig {
    pub interval: Duration,
}

impl PacingConfig {
    /// Delay between pattern searches. Keeps a full subreddit x pattern
    /// sweep under Reddit's request budget.
    pub fn search() -> Self {
        Self {
            interval: Duration::from_secs(1),
        }
    }

    /// Delay between per-post comment fetches.
    pub fn comments() -> Self {
        Self {
            interval: Duration::from_millis(500),
        }
    }

    /// No delay. Only useful in tests.
    pub fn unpaced() -> Self {
        Self {
            interval: Duration::ZERO,
        }
    }
}

/// Fixed-interval gate on the single execution path. External calls stay
/// strictly sequential; `pause` inserts the full interval after each unit of
/// work, preserving the pipeline's total pacing delay. Swappable for a
/// shared token bucket if fetches ever go concurrent, without changing the
/// call-ordering guarantee.
#[derive(Debug)]
pub struct Pacer {
    interval: Duration,
    pauses_taken: AtomicU64,
}

impl Pacer {
    pub fn new(config: PacingConfig) -> Self {
        Self {
            interval: config.interval,
            pauses_taken: AtomicU64::new(0),
        }
    }

    /// Block (await) for the configured interval.
    pub async fn pause(&self) {
        if !self.interval.is_zero() {
            sleep(self.interval).await;
        }
        self.pauses_taken.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of pauses taken so far, for progress logging.
    pub fn pauses_taken(&self) -> u64 {
        self.pauses_taken.load(Ordering::Relaxed)
    }
}
