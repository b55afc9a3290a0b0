//! Simulator - Periodic weighted status draws written to the Status Store.
//!
//! Each tick draws a fresh status for every machine on the floor from a
//! stationary categorical distribution. A draw equal to the machine's
//! current status is not written. Changed statuses go through
//! [`StatusStore::write_status`], the same path an operator uses, so they
//! reach clients only via the store's change channel.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::domain::foundation::Timestamp;
use crate::domain::machine::FloorLayout;
use crate::domain::simulation::{SimulatorState, StatusDraw, StatusWeights, WeightsError};
use crate::ports::{StatusStore, StoreError};

use super::shutdown_requested;

/// Simulator tuning.
#[derive(Debug, Clone)]
pub struct SimulatorSettings {
    pub interval: Duration,
    pub weights: StatusWeights,
    /// Fixed RNG seed; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(4),
            weights: StatusWeights::default(),
            seed: None,
        }
    }
}

/// Outcome of one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Status changes written to the store.
    pub written: usize,
    /// Draws equal to the current status.
    pub unchanged: usize,
    /// Machines the store has no row for.
    pub skipped: usize,
    /// Writes the store rejected for other reasons.
    pub failed: usize,
}

pub struct Simulator {
    store: Arc<dyn StatusStore>,
    layout: Arc<FloorLayout>,
    draw: StatusDraw,
    interval: Duration,
    state: SimulatorState,
    rng: StdRng,
}

impl Simulator {
    /// Fails if the weight distribution cannot produce a draw.
    pub fn new(
        store: Arc<dyn StatusStore>,
        layout: Arc<FloorLayout>,
        settings: SimulatorSettings,
    ) -> Result<Self, WeightsError> {
        let draw = StatusDraw::new(settings.weights)?;
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            store,
            layout,
            draw,
            interval: settings.interval,
            state: SimulatorState::new(),
            rng,
        })
    }

    pub fn state(&self) -> &SimulatorState {
        &self.state
    }

    /// Runs one draw for every machine.
    ///
    /// Returns an error only if the current statuses cannot be read; the
    /// tick then writes nothing.
    pub async fn tick(&mut self) -> Result<TickReport, StoreError> {
        let current = self.store.latest_statuses().await?;
        let now = Timestamp::now();
        let mut report = TickReport::default();

        for machine in self.layout.machines() {
            if let Some(record) = current.get(&machine.name) {
                let seen_at = record.updated_at.unwrap_or(now);
                self.state
                    .observe(&machine.name, record.status.clone(), seen_at);
            }

            let next = self.draw.sample(&mut self.rng);
            if self.state.status_of(&machine.name) == Some(&next) {
                report.unchanged += 1;
                continue;
            }

            match self.store.write_status(&machine.name, &next, now).await {
                Ok(()) => {
                    tracing::debug!(
                        machine = %machine.name,
                        line = %machine.line,
                        status = %next,
                        "Simulated status change"
                    );
                    self.state.record_write(&machine.name, next, now);
                    report.written += 1;
                }
                Err(StoreError::UnknownMachine(_)) => {
                    tracing::trace!(machine = %machine.name, "No status row, skipping");
                    report.skipped += 1;
                }
                Err(e) => {
                    tracing::warn!(machine = %machine.name, error = %e, "Simulated write failed");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Ticks at the configured interval until shutdown.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = self.interval.as_secs_f64(),
            machines = self.layout.total_machines(),
            "Simulator started"
        );

        loop {
            tokio::select! {
                _ = shutdown_requested(&mut shutdown) => break,
                _ = ticker.tick() => {}
            }

            match self.tick().await {
                Ok(report) => tracing::debug!(
                    written = report.written,
                    unchanged = report.unchanged,
                    skipped = report.skipped,
                    failed = report.failed,
                    "Simulator tick"
                ),
                Err(e) => tracing::warn!(error = %e, "Simulator could not read current statuses"),
            }
        }

        tracing::info!(writes = self.state.writes(), "Simulator stopped");
    }
}
