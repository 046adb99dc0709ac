//! External confirmation that a manual login has finished.

use std::io::{self, BufRead, IsTerminal};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

/// Grace period used when no interactive confirmation is possible.
pub const FALLBACK_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// Suspends until a human reports that the login is done.
///
/// This is the only unbounded wait in the pipeline.
#[async_trait]
pub trait LoginSignal: Send + Sync {
    async fn wait_for_confirmation(&self);
}

/// Prompts on the terminal and waits for Enter.
///
/// When stdin is not a terminal or cannot be read, waits for a fixed grace
/// period instead and continues.
#[derive(Debug, Clone)]
pub struct StdinConfirmation {
    grace_period: Duration,
}

impl StdinConfirmation {
    #[must_use]
    pub fn new() -> Self {
        Self {
            grace_period: FALLBACK_GRACE_PERIOD,
        }
    }

    #[must_use]
    pub fn with_grace_period(grace_period: Duration) -> Self {
        Self { grace_period }
    }
}

impl Default for StdinConfirmation {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LoginSignal for StdinConfirmation {
    async fn wait_for_confirmation(&self) {
        // Printed directly so the prompt survives `--quiet`.
        eprintln!("Log in to the platform in the opened browser window.");
        eprintln!("When the login is complete, return here and press Enter to continue...");
        info!("waiting for login confirmation");

        let confirmed = if io::stdin().is_terminal() {
            tokio::task::spawn_blocking(|| {
                let mut line = String::new();
                io::stdin().lock().read_line(&mut line).map(|read| read > 0)
            })
            .await
            .ok()
            .and_then(Result::ok)
            .unwrap_or(false)
        } else {
            false
        };

        if !confirmed {
            warn!(
                grace_secs = self.grace_period.as_secs(),
                "no interactive confirmation available; continuing after grace period"
            );
            tokio::time::sleep(self.grace_period).await;
        }
    }
}
