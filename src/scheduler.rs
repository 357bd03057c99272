//! Randomized poll scheduling
//!
//! Every tick is followed by a fresh one-shot delay drawn uniformly from
//! whole seconds in `[min, max]`. The delay is re-rolled after each tick
//! completes, so the poll period is never fixed.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

use crate::config::ScheduleConfig;
use crate::error::{GmailError, Result};

/// Produces the delay before the next poll tick
#[derive(Debug)]
pub struct PollScheduler<R = StdRng> {
    min_secs: u64,
    max_secs: u64,
    rng: R,
}

impl PollScheduler<StdRng> {
    /// Scheduler seeded from OS entropy
    pub fn from_config(config: &ScheduleConfig) -> Result<Self> {
        Self::with_rng(config.min_delay_secs, config.max_delay_secs, StdRng::from_entropy())
    }
}

impl<R: Rng> PollScheduler<R> {
    /// Scheduler drawing from an injected random source
    pub fn with_rng(min_secs: u64, max_secs: u64, rng: R) -> Result<Self> {
        if min_secs == 0 || min_secs > max_secs {
            return Err(GmailError::ConfigError(format!(
                "Invalid poll delay range [{}, {}] seconds",
                min_secs, max_secs
            )));
        }

        Ok(Self {
            min_secs,
            max_secs,
            rng,
        })
    }

    /// Roll the delay for the next tick
    pub fn next_delay(&mut self) -> Duration {
        Duration::from_secs(self.rng.gen_range(self.min_secs..=self.max_secs))
    }

    pub fn bounds(&self) -> (Duration, Duration) {
        (
            Duration::from_secs(self.min_secs),
            Duration::from_secs(self.max_secs),
        )
    }
}

/// Waits out a one-shot delay
#[async_trait]
pub trait Timer: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

/// Timer backed by the tokio clock
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimer;

#[async_trait]
impl Timer for TokioTimer {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}
