//! Fleet data access.
//!
//! [`FleetStore`] is the seam between the tracking logic and whatever holds
//! stops, routes, shuttles and telemetry. [`MemoryStore`] keeps everything
//! in process and can be seeded from a JSON [`snapshot::FleetSnapshot`].

mod memory;
pub mod snapshot;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::{Coordinate, Ping, Route, RouteId, Shuttle, ShuttleId, Stop, StopId, ValidationError};

pub use memory::MemoryStore;

/// Errors from a fleet store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid record: {0}")]
    Invalid(#[from] ValidationError),
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

/// Configuration for telemetry retention and geo queries.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Pings older than this (relative to the newest) are discarded.
    pub ping_retention: Duration,

    /// At most this many pings are kept per shuttle.
    pub max_pings_per_shuttle: usize,

    /// A shuttle counts as live if it pinged within this window.
    pub live_ping_window: Duration,

    /// Radius for nearby-stop queries, in meters.
    pub nearby_radius_m: f64,

    /// Maximum stops returned by a nearby-stop query.
    pub nearby_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            ping_retention: Duration::from_secs(60 * 60),
            max_pings_per_shuttle: 100,
            live_ping_window: Duration::from_secs(5 * 60),
            nearby_radius_m: 5000.0,
            nearby_limit: 10,
        }
    }
}

/// Access to fleet entities.
///
/// Lookups by id return `Ok(None)` for unknown ids; `Err` is reserved for
/// the store itself failing.
pub trait FleetStore: Send + Sync {
    fn stop(&self, id: &StopId) -> impl Future<Output = Result<Option<Arc<Stop>>, StoreError>> + Send;

    /// Resolve several stops at once. Unknown ids are absent from the map.
    fn stops(
        &self,
        ids: &[StopId],
    ) -> impl Future<Output = Result<HashMap<StopId, Arc<Stop>>, StoreError>> + Send;

    /// Stops within `max_distance_m` of `near`, closest first, with their
    /// distance in meters.
    fn nearest_stops(
        &self,
        near: Coordinate,
        max_distance_m: f64,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<(Arc<Stop>, f64)>, StoreError>> + Send;

    fn route(&self, id: &RouteId) -> impl Future<Output = Result<Option<Arc<Route>>, StoreError>> + Send;

    fn active_routes(&self) -> impl Future<Output = Result<Vec<Arc<Route>>, StoreError>> + Send;

    fn shuttle(&self, id: &ShuttleId) -> impl Future<Output = Result<Option<Shuttle>, StoreError>> + Send;

    /// Shuttles that are in service with a route assigned.
    fn shuttles_in_service(&self) -> impl Future<Output = Result<Vec<Shuttle>, StoreError>> + Send;

    /// Insert or replace a shuttle.
    fn save_shuttle(&self, shuttle: Shuttle) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn append_ping(&self, ping: Ping) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Up to `limit` most recent pings for a shuttle, newest first.
    fn recent_pings(
        &self,
        shuttle: &ShuttleId,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Ping>, StoreError>> + Send;

    /// The newest ping for a shuttle taken at or after `since`.
    fn latest_ping_since(
        &self,
        shuttle: &ShuttleId,
        since: DateTime<Utc>,
    ) -> impl Future<Output = Result<Option<Ping>, StoreError>> + Send;
}
