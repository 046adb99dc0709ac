//! Fixed delay between consecutive items.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Enforces a minimum gap between the end of one item and the start of the
/// next.
#[derive(Debug)]
pub struct Pacer {
    delay: Duration,
    last_finished: Option<Instant>,
}

impl Pacer {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_finished: None,
        }
    }

    /// Records that an item just finished.
    pub fn mark_finished(&mut self) {
        self.last_finished = Some(Instant::now());
    }

    /// Sleeps until the delay since the last finished item has elapsed.
    /// Returns immediately before the first item.
    pub async fn wait(&self) {
        let Some(last) = self.last_finished else {
            return;
        };
        let ready_at = last + self.delay;
        if Instant::now() < ready_at {
            debug!(delay_ms = self.delay.as_millis(), "pacing before next item");
            tokio::time::sleep_until(ready_at).await;
        }
    }
}
