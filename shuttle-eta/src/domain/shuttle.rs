//! Shuttles and their stop-relative state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::geo::Coordinate;
use super::ids::{RouteId, ShuttleId, StopId};
use super::route::Direction;

/// Operational status of a shuttle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShuttleStatus {
    #[default]
    Available,
    InService,
    OutOfService,
    Maintenance,
}

/// Default seating capacity.
pub const DEFAULT_CAPACITY: u32 = 40;

/// A shuttle and its position relative to its assigned route.
///
/// The tracker keeps `is_at_stop` consistent: when it is true,
/// `current_stop` and `arrived_at_current_stop_at` are both set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Shuttle {
    pub id: ShuttleId,
    pub label: String,
    pub capacity: u32,
    pub route: Option<RouteId>,
    pub status: ShuttleStatus,

    pub location: Option<Coordinate>,
    pub speed_kph: Option<f64>,
    /// Compass heading in degrees, 0..=359.
    pub heading: Option<u16>,
    pub last_ping_at: Option<DateTime<Utc>>,

    /// Current stop, or the last stop visited.
    pub current_stop: Option<StopId>,
    pub next_stop: Option<StopId>,
    /// Index into the route's stop sequence.
    pub current_sequence: Option<usize>,
    /// Only meaningful on bidirectional routes.
    pub current_direction: Option<Direction>,
    pub is_at_stop: bool,
    pub arrived_at_current_stop_at: Option<DateTime<Utc>>,
    pub departed_from_current_stop_at: Option<DateTime<Utc>>,
    /// Fraction of the current pass completed, in [0, 1].
    pub trip_progress: f64,
    /// Reset externally at shift change.
    pub stops_completed_this_shift: u32,
}

impl Shuttle {
    /// Create an idle shuttle with no route and no position.
    pub fn new(id: ShuttleId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            capacity: DEFAULT_CAPACITY,
            route: None,
            status: ShuttleStatus::Available,
            location: None,
            speed_kph: None,
            heading: None,
            last_ping_at: None,
            current_stop: None,
            next_stop: None,
            current_sequence: None,
            current_direction: None,
            is_at_stop: false,
            arrived_at_current_stop_at: None,
            departed_from_current_stop_at: None,
            trip_progress: 0.0,
            stops_completed_this_shift: 0,
        }
    }

    /// Assign a route and put the shuttle in service.
    pub fn in_service_on(mut self, route: RouteId) -> Self {
        self.route = Some(route);
        self.status = ShuttleStatus::InService;
        self
    }

    /// Only in-service shuttles with an assigned route get ETAs.
    pub fn participates_in_eta(&self) -> bool {
        self.status == ShuttleStatus::InService && self.route.is_some()
    }

    /// Zero the per-shift counter (called at shift change).
    pub fn reset_shift(&mut self) {
        self.stops_completed_this_shift = 0;
    }
}
