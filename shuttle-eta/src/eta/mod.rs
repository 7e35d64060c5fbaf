//! Arrival-time estimation.
//!
//! For a shuttle on a route this answers "how long until it reaches each
//! stop, and how much should a rider trust that number". The estimate is
//! assembled from three pieces:
//!
//! - the route's modeled segment times ([`crate::topology`])
//! - a speed estimate from recent pings ([`crate::speed`])
//! - a confidence heuristic ([`confidence()`])

mod calculator;
mod confidence;
mod config;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{RouteId, ShuttleId, StopId};
use crate::store::StoreError;

pub use calculator::{EtaCalculator, StopEta};
pub use confidence::confidence;
pub use config::EtaConfig;

/// Errors from an ETA computation.
#[derive(Debug, thiserror::Error)]
pub enum EtaError {
    #[error("shuttle {0} not found")]
    ShuttleNotFound(ShuttleId),

    #[error("route {0} not found")]
    RouteNotFound(RouteId),

    #[error("stop {0} not found")]
    StopNotFound(StopId),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The store did not answer within the configured lookup timeout.
    #[error("timed out computing arrivals for shuttle {0}")]
    Timeout(ShuttleId),
}

/// Why a shuttle was not given arrivals this cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Not in service, or no route assigned.
    NotInService,
    /// The assigned route is inactive.
    RouteInactive,
    /// The assigned route has no stops.
    EmptyRoute,
}

/// Per-stop entry of a [`ComputationSummary`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopEstimate {
    pub stop: StopId,
    /// Stop display name, if the stop record was found.
    pub name: Option<String>,
    pub eta_secs: u32,
    pub eta_minutes: u32,
    pub confidence: f64,
}

/// Result of computing arrivals for one shuttle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComputationSummary {
    pub shuttle: ShuttleId,
    pub route: RouteId,
    pub arrivals: Vec<StopEstimate>,
    pub computed_at: DateTime<Utc>,
}

/// Outcome of attempting to compute arrivals for one shuttle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ComputeOutcome {
    Computed(ComputationSummary),
    Skipped { shuttle: ShuttleId, reason: SkipReason },
}

impl ComputeOutcome {
    /// Number of arrivals written, 0 for a skip.
    pub fn arrivals_written(&self) -> usize {
        match self {
            ComputeOutcome::Computed(summary) => summary.arrivals.len(),
            ComputeOutcome::Skipped { .. } => 0,
        }
    }
}
