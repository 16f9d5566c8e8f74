use crate::config::{DebounceConfig, TickPolicy};
use crate::flusher::Flusher;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

/// Drives [`Flusher::flush_once`] on a fixed cadence.
///
/// Cycles never overlap: each one runs to completion inside the loop before
/// the next tick is awaited. Under [`TickPolicy::Skip`] ticks missed during a
/// long cycle are dropped; under [`TickPolicy::FixedGap`] the next cycle waits
/// a full interval after the previous one finished.
pub struct FlushScheduler {
    flusher: Arc<Flusher>,
    interval: Duration,
    policy: TickPolicy,
}

impl FlushScheduler {
    /// A zero interval is raised to one millisecond.
    pub fn new(flusher: Arc<Flusher>, interval: Duration, policy: TickPolicy) -> Self {
        Self {
            flusher,
            interval: interval.max(Duration::from_millis(1)),
            policy,
        }
    }

    /// Interval and tick policy taken from `config`.
    pub fn from_config(flusher: Arc<Flusher>, config: &DebounceConfig) -> Self {
        Self::new(flusher, config.flush_interval(), config.tick_policy)
    }

    /// Spawn the loop on the current runtime. It runs until the handle is
    /// aborted or the runtime shuts down.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// The scheduler loop itself.
    pub async fn run(self) {
        info!(
            interval_ms = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX),
            policy = ?self.policy,
            "Flush scheduler started"
        );

        match self.policy {
            TickPolicy::Skip => {
                let mut ticker = tokio::time::interval(self.interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    ticker.tick().await;
                    self.run_cycle().await;
                }
            }
            TickPolicy::FixedGap => loop {
                tokio::time::sleep(self.interval).await;
                self.run_cycle().await;
            },
        }
    }

    async fn run_cycle(&self) {
        if let Err(e) = self.flusher.flush_once().await {
            error!(error = %e, "Flush cycle failed");
        }
    }
}
