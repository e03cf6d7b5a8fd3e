//! Tick loop task and its control handle.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::config::{ConfigError, HerdConfig, HerdConfigPatch};
use crate::engine::{HerdEngine, HerdRecord, ResetSummary, TickReport};
use crate::herd::Pasture;
use crate::stats::HerdStats;
use crate::strays::StrayAlert;
use crate::upstream::HerdSink;

use super::state::SimState;

/// A running loop: its stop signal and task
struct LoopHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Handle for controlling the herd simulation.
///
/// Ticks never overlap: each one holds the tick gate from movement until
/// its push has finished, and [`Simulator::reset`] takes the same gate.
pub struct Simulator<S: HerdSink + 'static> {
    engine: Mutex<HerdEngine>,
    tick_gate: Mutex<()>,
    sink: S,
    interval: Duration,
    stats_interval: u64,
    running: Mutex<Option<LoopHandle>>,
}

impl<S: HerdSink + 'static> Simulator<S> {
    pub fn new(engine: HerdEngine, sink: S, interval: Duration) -> Self {
        Self {
            engine: Mutex::new(engine),
            tick_gate: Mutex::new(()),
            sink,
            interval,
            stats_interval: 10,
            running: Mutex::new(None),
        }
    }

    /// Log a stats line every `ticks` ticks (0 disables it)
    pub fn with_stats_interval(mut self, ticks: u64) -> Self {
        self.stats_interval = ticks;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Spawn the tick loop. Returns false if it was already running.
    pub async fn start(self: &Arc<Self>) -> bool {
        let mut running = self.running.lock().await;
        if running.as_ref().map_or(false, |h| !h.task.is_finished()) {
            return false;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(run_loop(Arc::clone(self), stop_rx));
        *running = Some(LoopHandle { stop_tx, task });
        log::info!(
            "Herd simulation started, ticking every {} ms",
            self.interval.as_millis()
        );
        true
    }

    /// Stop the tick loop and wait for it to exit. A tick already in
    /// flight finishes, push included. Returns false if it was not running.
    pub async fn stop(&self) -> bool {
        let Some(handle) = self.running.lock().await.take() else {
            return false;
        };
        let _ = handle.stop_tx.send(true);
        if let Err(e) = handle.task.await {
            log::warn!("Tick loop ended abnormally: {}", e);
        }
        log::info!("Herd simulation stopped");
        true
    }

    pub async fn state(&self) -> SimState {
        match self.running.lock().await.as_ref() {
            Some(h) if !h.task.is_finished() => SimState::Running,
            _ => SimState::Stopped,
        }
    }

    pub async fn is_running(&self) -> bool {
        self.state().await.is_running()
    }

    /// Run one tick and push the result, outside the timer
    pub async fn tick_once(&self) -> TickReport {
        let _gate = self.tick_gate.lock().await;
        let now = Utc::now();

        let (report, payload, summary) = {
            let mut engine = self.engine.lock().await;
            let report = engine.tick(now);
            let summary = (self.stats_interval > 0 && report.tick % self.stats_interval == 0)
                .then(|| engine.stats_at(now).summary());
            (report, engine.payload(now), summary)
        };
        if let Some(line) = summary {
            log::info!("{}", line);
        }

        match self.sink.push(&payload).await {
            Ok(()) => log::debug!(
                "Pushed {} cattle for tick {} ({} away)",
                payload.herd.len(),
                report.tick,
                report.active_strays
            ),
            Err(e) => log::warn!("Failed to push herd for tick {}: {}", report.tick, e),
        }
        report
    }

    /// Regenerate the herd, waiting for any in-flight tick first
    pub async fn reset(&self) -> ResetSummary {
        let _gate = self.tick_gate.lock().await;
        self.engine.lock().await.reset(Utc::now())
    }

    /// Merge and apply a partial config; rejected as a whole on any bad value
    pub async fn apply_config(&self, patch: &HerdConfigPatch) -> Result<HerdConfig, ConfigError> {
        let mut engine = self.engine.lock().await;
        engine.apply_config(patch).cloned()
    }

    /// Swap the pasture; anchors move at the next reset
    pub async fn set_pasture(&self, pasture: Pasture) {
        self.engine.lock().await.set_pasture(pasture);
    }

    pub async fn config(&self) -> HerdConfig {
        self.engine.lock().await.config().clone()
    }

    pub async fn stats(&self) -> HerdStats {
        self.engine.lock().await.stats_at(Utc::now())
    }

    pub async fn alerts(&self) -> Vec<StrayAlert> {
        self.engine.lock().await.alerts().to_vec()
    }

    /// Last tick's records with the config and stats they were built from
    pub async fn snapshot(&self) -> (Vec<HerdRecord>, HerdConfig, HerdStats) {
        let engine = self.engine.lock().await;
        (
            engine.records().to_vec(),
            engine.config().clone(),
            engine.stats_at(Utc::now()),
        )
    }

    /// Exclusive access to the engine, between ticks
    pub async fn with_engine<T>(&self, f: impl FnOnce(&mut HerdEngine) -> T) -> T {
        let mut engine = self.engine.lock().await;
        f(&mut engine)
    }
}

/// Tick, push, then sleep until the next tick or a stop signal
async fn run_loop<S: HerdSink + 'static>(sim: Arc<Simulator<S>>, mut stop_rx: watch::Receiver<bool>) {
    loop {
        if *stop_rx.borrow() {
            break;
        }
        sim.tick_once().await;

        tokio::select! {
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
            _ = tokio::time::sleep(sim.interval) => {}
        }
    }
    log::debug!("Tick loop exited");
}
