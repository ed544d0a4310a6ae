//! Sequential request pacing.

use std::time::Duration;
use tokio::time::Instant;

/// Keeps consecutive requests at least `interval` apart.
///
/// Remembers when the last request started and sleeps off whatever is left
/// of the interval before the next one. Callers are sequential; this is not
/// a concurrent rate limiter.
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until the next request may start, then mark it as started.
    pub async fn wait(&mut self) {
        if let Some(last) = self.last {
            let elapsed = last.elapsed();
            if elapsed < self.interval {
                tokio::time::sleep(self.interval - elapsed).await;
            }
        }
        self.last = Some(Instant::now());
    }
}
