//! Periodic ETA driver.
//!
//! Runs [`TrackingService::run_cycle`] on a fixed interval. At most one
//! cycle is in flight at a time: a tick that arrives while the previous
//! cycle is still running is dropped, not queued.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::notify::Notifier;
use crate::service::{CycleReport, TrackingService};
use crate::store::FleetStore;

/// Configuration for the ETA worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Time between cycle starts.
    pub interval: Duration,

    /// Shuttles computed concurrently within a cycle.
    pub batch_size: usize,

    /// Upper bound on one shuttle's computation.
    pub lookup_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15),
            batch_size: 8,
            lookup_timeout: Duration::from_secs(5),
        }
    }
}

/// Single-flight flag for ETA cycles.
#[derive(Debug, Default)]
pub struct CycleGate {
    running: AtomicBool,
}

impl CycleGate {
    /// Claim the gate, or `None` if a cycle already holds it.
    pub fn try_enter(self: &Arc<Self>) -> Option<CycleGuard> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CycleGuard {
                gate: Arc::clone(self),
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Releases the [`CycleGate`] when dropped.
#[derive(Debug)]
pub struct CycleGuard {
    gate: Arc<CycleGate>,
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        self.gate.running.store(false, Ordering::Release);
    }
}

/// Drives ETA cycles for a [`TrackingService`].
pub struct EtaWorker<S, N> {
    service: Arc<TrackingService<S, N>>,
    config: WorkerConfig,
    gate: Arc<CycleGate>,
}

impl<S, N> EtaWorker<S, N>
where
    S: FleetStore + 'static,
    N: Notifier + 'static,
{
    pub fn new(service: Arc<TrackingService<S, N>>, config: WorkerConfig) -> Self {
        Self {
            service,
            config,
            gate: Arc::default(),
        }
    }

    pub fn gate(&self) -> &Arc<CycleGate> {
        &self.gate
    }

    /// Start a cycle in the background unless one is already running.
    pub fn tick(&self) -> Option<JoinHandle<Option<CycleReport>>> {
        let Some(guard) = self.gate.try_enter() else {
            info!("Previous ETA cycle still running, skipping tick");
            return None;
        };

        let service = Arc::clone(&self.service);
        let config = self.config.clone();
        Some(tokio::spawn(async move {
            let _guard = guard;
            match service.run_cycle(&config).await {
                Ok(report) => Some(report),
                Err(e) => {
                    warn!(error = %e, "ETA cycle failed");
                    None
                }
            }
        }))
    }

    /// Tick until `shutdown` resolves, then wait for the cycle in flight.
    ///
    /// Returns the number of cycles started.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> usize {
        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!(interval_secs = self.config.interval.as_secs(), "ETA worker started");

        let mut started = 0;
        let mut in_flight = None;
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = interval.tick() => {
                    if let Some(handle) = self.tick() {
                        started += 1;
                        in_flight = Some(handle);
                    }
                }
            }
        }

        if let Some(handle) = in_flight {
            if let Err(e) = handle.await {
                warn!(error = %e, "ETA cycle task panicked");
            }
        }
        info!(cycles = started, "ETA worker stopped");
        started
    }
}
