//! Position tracking against a route.
//!
//! Each location sample either lands within the at-stop radius of a route
//! stop (AT_STOP) or it doesn't (IN_TRANSIT). The tracker moves a
//! [`Shuttle`] between those two states and keeps its sequence index,
//! next stop, direction and progress in step. It never touches arrivals.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{Coordinate, Direction, RouteType, Shuttle, StopId};
use crate::topology::RouteTopology;

/// Default radius within which a shuttle counts as at a stop, in meters.
pub const DEFAULT_AT_STOP_RADIUS_M: f64 = 50.0;

/// Configuration for the position tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// Distances strictly below this are "at the stop".
    pub at_stop_radius_m: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            at_stop_radius_m: DEFAULT_AT_STOP_RADIUS_M,
        }
    }
}

/// The route stop nearest to a sample.
#[derive(Debug, Clone, PartialEq)]
pub struct StopSnap {
    pub index: usize,
    pub stop: StopId,
    pub distance_m: f64,
    pub at_stop: bool,
}

/// What a sample did to the shuttle's stop-relative state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TrackerEvent {
    /// Entered a stop's radius (counted toward the shift).
    Arrived { stop: StopId, sequence: usize },
    /// Still within a stop's radius.
    Dwelling { stop: StopId },
    /// Left the radius of the stop it was at.
    Departed { stop: StopId },
    /// Between stops, and was already between stops.
    InTransit,
    /// The route has no stops; only the location was recorded.
    NoTopology,
}

/// Applies location samples to shuttle state.
#[derive(Debug, Clone, Default)]
pub struct PositionTracker {
    config: TrackerConfig,
}

impl PositionTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self { config }
    }

    /// Find the route stop closest to `location`.
    ///
    /// Stops without a resolved location are ignored. Returns `None` when no
    /// stop could be measured.
    pub fn snap_to_stop(&self, location: &Coordinate, topology: &RouteTopology) -> Option<StopSnap> {
        let mut best: Option<(usize, f64)> = None;
        for index in 0..topology.len() {
            let Some(stop_location) = topology.location(index) else {
                continue;
            };
            let distance = location.distance_to(&stop_location);
            if best.is_none_or(|(_, d)| distance < d) {
                best = Some((index, distance));
            }
        }

        let (index, distance_m) = best?;
        let stop = topology.stop_id(index)?.clone();
        Some(StopSnap {
            index,
            stop,
            distance_m,
            at_stop: distance_m < self.config.at_stop_radius_m,
        })
    }

    /// Record a location sample taken at `at`.
    pub fn apply(
        &self,
        shuttle: &mut Shuttle,
        location: Coordinate,
        at: DateTime<Utc>,
        topology: &RouteTopology,
    ) -> TrackerEvent {
        shuttle.location = Some(location);

        if topology.is_empty() {
            return TrackerEvent::NoTopology;
        }

        let snap = self
            .snap_to_stop(&location, topology)
            .filter(|snap| snap.at_stop);

        let event = match snap {
            Some(snap) => {
                let previous = shuttle.current_sequence;
                shuttle.is_at_stop = true;
                shuttle.current_stop = Some(snap.stop.clone());
                shuttle.current_sequence = Some(snap.index);

                if topology.route_type() == RouteType::Bidirectional {
                    shuttle.current_direction = Some(infer_direction(
                        previous,
                        snap.index,
                        topology.len(),
                        shuttle.current_direction,
                    ));
                }

                if shuttle.arrived_at_current_stop_at.is_none() {
                    shuttle.arrived_at_current_stop_at = Some(at);
                    shuttle.departed_from_current_stop_at = None;
                    shuttle.stops_completed_this_shift += 1;
                    TrackerEvent::Arrived {
                        stop: snap.stop,
                        sequence: snap.index,
                    }
                } else {
                    TrackerEvent::Dwelling { stop: snap.stop }
                }
            }
            None => {
                let was_at_stop = shuttle.is_at_stop;
                shuttle.is_at_stop = false;
                shuttle.arrived_at_current_stop_at = None;
                match (was_at_stop, shuttle.current_stop.clone()) {
                    (true, Some(stop)) => {
                        shuttle.departed_from_current_stop_at = Some(at);
                        TrackerEvent::Departed { stop }
                    }
                    _ => TrackerEvent::InTransit,
                }
            }
        };

        if let Some(sequence) = shuttle.current_sequence {
            shuttle.next_stop = topology
                .successor(sequence, shuttle.current_direction)
                .and_then(|next| topology.stop_id(next))
                .cloned();
            shuttle.trip_progress = trip_progress(
                sequence,
                topology.len(),
                topology.route_type(),
                shuttle.current_direction,
            );
        }

        event
    }
}

/// Direction of travel after arriving at `index`.
///
/// The ends of the route force a reversal; otherwise the direction follows
/// the change in sequence index, keeping the previous direction when the
/// index did not move.
fn infer_direction(
    previous: Option<usize>,
    index: usize,
    len: usize,
    current: Option<Direction>,
) -> Direction {
    if len > 1 && index == len - 1 {
        return Direction::Backward;
    }
    if index == 0 {
        return Direction::Forward;
    }
    match previous {
        Some(p) if index > p => Direction::Forward,
        Some(p) if index < p => Direction::Backward,
        _ => current.unwrap_or(Direction::Forward),
    }
}

/// Fraction of the current pass completed at `sequence`.
fn trip_progress(
    sequence: usize,
    len: usize,
    route_type: RouteType,
    direction: Option<Direction>,
) -> f64 {
    if len <= 1 {
        return 0.0;
    }
    let last = (len - 1) as f64;
    let progress = match (route_type, direction) {
        (RouteType::Loop, _) => sequence as f64 / len as f64,
        (RouteType::Bidirectional, Some(Direction::Backward)) => (last - sequence as f64) / last,
        _ => sequence as f64 / last,
    };
    progress.clamp(0.0, 1.0)
}
