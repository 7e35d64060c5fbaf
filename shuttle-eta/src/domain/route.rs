//! Routes and their ordered stop sequences.
//!
//! A [`Route`] guarantees that its stops carry sequence numbers `0..N-1`
//! with no gaps or duplicates, stored in sequence order. Traversal
//! semantics (wrap-around, reversal) live in [`crate::topology`], not here.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use super::ids::{RouteId, StopId};

/// How a shuttle moves along a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteType {
    /// A -> B -> C, the last stop has no successor.
    Linear,
    /// A -> B -> C -> A, continuous circuit.
    Loop,
    /// A <-> B <-> C, back and forth.
    Bidirectional,
}

/// Which riders a stop serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopType {
    Pickup,
    Dropoff,
    #[default]
    Both,
}

/// Direction of travel on a bidirectional route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Increasing sequence index (0 -> 1 -> 2).
    Forward,
    /// Decreasing sequence index (2 -> 1 -> 0).
    Backward,
}

/// One element of a route's ordered stop sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteStop {
    pub stop: StopId,
    pub sequence: u32,
    pub stop_type: StopType,
    /// Modeled travel time from the previous stop, in seconds.
    pub time_from_previous_secs: Option<u32>,
    /// Distance from the previous stop, in meters.
    pub distance_from_previous_m: Option<f64>,
}

impl RouteStop {
    /// Create a route stop with no segment metadata.
    pub fn new(stop: StopId, sequence: u32) -> Self {
        Self {
            stop,
            sequence,
            stop_type: StopType::Both,
            time_from_previous_secs: None,
            distance_from_previous_m: None,
        }
    }

    pub fn with_time(mut self, secs: u32) -> Self {
        self.time_from_previous_secs = Some(secs);
        self
    }

    pub fn with_distance(mut self, meters: f64) -> Self {
        self.distance_from_previous_m = Some(meters);
        self
    }

    pub fn with_stop_type(mut self, stop_type: StopType) -> Self {
        self.stop_type = stop_type;
        self
    }
}

/// A named per-direction stop list (bidirectional routes only).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteDirection {
    pub name: String,
    pub stops: Vec<StopId>,
}

/// Daily service window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OperatingHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Default for OperatingHours {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(7, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(22, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// Default lap time for loop routes, in seconds.
pub const DEFAULT_AVERAGE_LOOP_TIME_SECS: u32 = 1800;

/// Default headway between shuttles on the same route, in minutes.
pub const DEFAULT_FREQUENCY_MINS: u32 = 15;

/// A route: identity, display fields, traversal mode and stop sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    pub id: RouteId,
    pub name: String,
    pub short_name: String,
    pub long_name: String,
    /// Display color, e.g. `#3B82F6`.
    pub color: String,
    pub route_type: RouteType,
    stops: Vec<RouteStop>,
    pub directions: Vec<RouteDirection>,
    pub average_loop_time_secs: u32,
    pub operating_hours: OperatingHours,
    pub frequency_mins: u32,
    pub active: bool,
}

impl Route {
    /// Create an active route from its stops.
    ///
    /// Stops may be given in any order; they are sorted by sequence and the
    /// sequence numbers must then be exactly `0..N-1`.
    pub fn new(
        id: RouteId,
        name: impl Into<String>,
        route_type: RouteType,
        mut stops: Vec<RouteStop>,
    ) -> Result<Self, ValidationError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::EmptyField("route name"));
        }

        stops.sort_by_key(|s| s.sequence);
        for (idx, stop) in stops.iter().enumerate() {
            if stop.sequence as usize != idx {
                return Err(ValidationError::NonContiguousSequence {
                    route: id.to_string(),
                    sequence: stop.sequence,
                });
            }
        }

        Ok(Self {
            id,
            short_name: name.clone(),
            long_name: name.clone(),
            name,
            color: "#3B82F6".to_string(),
            route_type,
            stops,
            directions: Vec::new(),
            average_loop_time_secs: DEFAULT_AVERAGE_LOOP_TIME_SECS,
            operating_hours: OperatingHours::default(),
            frequency_mins: DEFAULT_FREQUENCY_MINS,
            active: true,
        })
    }

    pub fn with_display_names(
        mut self,
        short_name: impl Into<String>,
        long_name: impl Into<String>,
    ) -> Self {
        self.short_name = short_name.into();
        self.long_name = long_name.into();
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn with_average_loop_time(mut self, secs: u32) -> Self {
        self.average_loop_time_secs = secs;
        self
    }

    pub fn with_operating_hours(mut self, hours: OperatingHours) -> Self {
        self.operating_hours = hours;
        self
    }

    pub fn with_frequency(mut self, mins: u32) -> Self {
        self.frequency_mins = mins;
        self
    }

    pub fn with_directions(mut self, directions: Vec<RouteDirection>) -> Self {
        self.directions = directions;
        self
    }

    /// Stops in sequence order. `stops()[i].sequence == i` always holds.
    pub fn stops(&self) -> &[RouteStop] {
        &self.stops
    }

    pub fn total_stops(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// All stop ids in sequence order.
    pub fn stop_ids(&self) -> impl Iterator<Item = &StopId> {
        self.stops.iter().map(|s| &s.stop)
    }
}
