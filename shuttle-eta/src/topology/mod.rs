//! Route topology: stop ordering and traversal semantics.
//!
//! Every question of the form "what comes after this stop" or "how long
//! from here to there" is answered here, so the loop/linear/bidirectional
//! distinction is matched on in exactly one place.
//!
//! Indices are positions in the route's stop sequence (`0..N`). Lookups by
//! stop id use the first occurrence; routes that visit the same stop twice
//! are not supported.

mod config;

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{Coordinate, Direction, Route, RouteStop, RouteType, Stop, StopId};

pub use config::{DEFAULT_FALLBACK_SEGMENT_SECS, TopologyConfig};

/// Seconds per hour divided by meters per kilometer.
const KPH_TO_MPS: f64 = 1000.0 / 3600.0;

/// A route together with its resolved stops.
#[derive(Debug, Clone)]
pub struct RouteTopology {
    route: Arc<Route>,
    /// Resolved stop records, aligned with `route.stops()`.
    stops: Vec<Option<Arc<Stop>>>,
    fallback_segment_secs: u32,
}

impl RouteTopology {
    /// Build a topology with no stop records resolved.
    ///
    /// Ordering queries work immediately; location-based queries return
    /// `None` until [`RouteTopology::with_stops`] is called.
    pub fn new(route: Arc<Route>, config: &TopologyConfig) -> Self {
        let stops = vec![None; route.total_stops()];
        Self {
            route,
            stops,
            fallback_segment_secs: config.fallback_segment_secs,
        }
    }

    /// Attach stop records. Stops missing from `resolved` stay unresolved.
    pub fn with_stops(mut self, resolved: &HashMap<StopId, Arc<Stop>>) -> Self {
        self.stops = self
            .route
            .stops()
            .iter()
            .map(|rs| resolved.get(&rs.stop).cloned())
            .collect();
        self
    }

    pub fn route(&self) -> &Arc<Route> {
        &self.route
    }

    pub fn route_type(&self) -> RouteType {
        self.route.route_type
    }

    pub fn len(&self) -> usize {
        self.route.total_stops()
    }

    pub fn is_empty(&self) -> bool {
        self.route.is_empty()
    }

    pub fn last_index(&self) -> Option<usize> {
        self.len().checked_sub(1)
    }

    pub fn fallback_segment_secs(&self) -> u32 {
        self.fallback_segment_secs
    }

    pub fn route_stop(&self, index: usize) -> Option<&RouteStop> {
        self.route.stops().get(index)
    }

    pub fn stop_id(&self, index: usize) -> Option<&StopId> {
        self.route_stop(index).map(|rs| &rs.stop)
    }

    /// Resolved stop record at `index`, if known.
    pub fn stop(&self, index: usize) -> Option<&Stop> {
        self.stops.get(index).and_then(|s| s.as_deref())
    }

    pub fn location(&self, index: usize) -> Option<Coordinate> {
        self.stop(index).map(|s| s.location)
    }

    /// Sequence index of the first occurrence of `stop`.
    pub fn index_of(&self, stop: &StopId) -> Option<usize> {
        self.route.stops().iter().position(|rs| &rs.stop == stop)
    }

    /// The index visited after `index`.
    ///
    /// - loop: wraps from the last index to 0
    /// - linear: `None` after the last index
    /// - bidirectional: +1 going forward, -1 going backward, clamped to the
    ///   ends. A missing direction counts as forward.
    pub fn successor(&self, index: usize, direction: Option<Direction>) -> Option<usize> {
        let n = self.len();
        if index >= n {
            return None;
        }
        match self.route_type() {
            RouteType::Loop => Some((index + 1) % n),
            RouteType::Linear => (index + 1 < n).then_some(index + 1),
            RouteType::Bidirectional => match direction.unwrap_or(Direction::Forward) {
                Direction::Forward => Some((index + 1).min(n - 1)),
                Direction::Backward => Some(index.saturating_sub(1)),
            },
        }
    }

    /// The stop visited after `stop`, if any.
    pub fn next_stop_after(&self, stop: &StopId, direction: Option<Direction>) -> Option<&StopId> {
        let index = self.index_of(stop)?;
        self.successor(index, direction)
            .and_then(|next| self.stop_id(next))
    }

    /// Modeled time from `from` to `to` within one pass, in seconds.
    ///
    /// Sums `time_from_previous` over indices `from+1..=to`, substituting the
    /// fallback for each missing value. Returns 0 when `to <= from`.
    pub fn segment_time(&self, from: usize, to: usize) -> u32 {
        self.segment_indices(from, to)
            .map(|i| self.modeled_time(i))
            .sum()
    }

    /// Like [`RouteTopology::segment_time`], but a segment with no modeled
    /// time is estimated from its distance at `speed_kph` before falling back
    /// to the constant.
    pub fn segment_estimate(&self, from: usize, to: usize, speed_kph: f64) -> f64 {
        self.segment_indices(from, to)
            .map(|i| {
                let rs = &self.route.stops()[i];
                match (rs.time_from_previous_secs, rs.distance_from_previous_m) {
                    (Some(secs), _) => f64::from(secs),
                    (None, Some(meters)) if speed_kph > 0.0 => meters / (speed_kph * KPH_TO_MPS),
                    _ => f64::from(self.fallback_segment_secs),
                }
            })
            .sum()
    }

    /// True iff both stops are on the route and `dropoff` comes strictly
    /// after `pickup`.
    pub fn serves_in_order(&self, pickup: &StopId, dropoff: &StopId) -> bool {
        match (self.index_of(pickup), self.index_of(dropoff)) {
            (Some(p), Some(d)) => d > p,
            _ => false,
        }
    }

    /// Modeled time between two stops on this route.
    ///
    /// `None` if either stop is missing or `to` does not come after `from`.
    pub fn time_between_stops(&self, from: &StopId, to: &StopId) -> Option<u32> {
        let from = self.index_of(from)?;
        let to = self.index_of(to)?;
        (to > from).then(|| self.segment_time(from, to))
    }

    /// Timing-only estimate from `current_sequence` to `target`.
    ///
    /// Stops behind the current position are reached by finishing the lap
    /// on a loop route and are unreachable otherwise.
    pub fn eta_to_stop(&self, current_sequence: usize, target: &StopId) -> Option<u32> {
        let target = self.index_of(target)?;
        if target >= current_sequence {
            return Some(self.segment_time(current_sequence, target));
        }
        match self.route_type() {
            RouteType::Loop => Some(self.lap_remainder(current_sequence, target)),
            RouteType::Linear | RouteType::Bidirectional => None,
        }
    }

    /// Time to finish the lap from `current` and continue from index 0 to
    /// `target`.
    pub fn lap_remainder(&self, current: usize, target: usize) -> u32 {
        match self.last_index() {
            Some(last) => self.segment_time(current, last) + self.segment_time(0, target),
            None => 0,
        }
    }

    /// Indices `from+1..=to`, clamped to the route; empty when `to <= from`.
    fn segment_indices(&self, from: usize, to: usize) -> std::ops::Range<usize> {
        let end = match self.last_index() {
            Some(last) => to.min(last) + 1,
            None => 0,
        };
        let start = from.saturating_add(1).min(end);
        start..end
    }

    fn modeled_time(&self, index: usize) -> u32 {
        self.route.stops()[index]
            .time_from_previous_secs
            .unwrap_or(self.fallback_segment_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RouteId;

    fn sid(s: &str) -> StopId {
        StopId::parse(s).unwrap()
    }

    fn route(route_type: RouteType, stops: Vec<RouteStop>) -> Arc<Route> {
        Arc::new(Route::new(RouteId::parse("r").unwrap(), "Route", route_type, stops).unwrap())
    }

    /// Walb(0, t=0) -> BuildingH(1, t=240) -> Clubhouse(2, t=150)
    fn campus(route_type: RouteType) -> RouteTopology {
        let stops = vec![
            RouteStop::new(sid("walb"), 0).with_time(0),
            RouteStop::new(sid("building-h"), 1).with_time(240),
            RouteStop::new(sid("clubhouse"), 2).with_time(150),
        ];
        RouteTopology::new(route(route_type, stops), &TopologyConfig::default())
    }

    /// Four stops, no timing on the last two.
    fn partial_timing(config: &TopologyConfig) -> RouteTopology {
        let stops = vec![
            RouteStop::new(sid("a"), 0),
            RouteStop::new(sid("b"), 1).with_time(100),
            RouteStop::new(sid("c"), 2).with_distance(500.0),
            RouteStop::new(sid("d"), 3),
        ];
        RouteTopology::new(route(RouteType::Linear, stops), config)
    }

    #[test]
    fn index_of_finds_first_occurrence() {
        let topo = campus(RouteType::Loop);
        assert_eq!(topo.index_of(&sid("walb")), Some(0));
        assert_eq!(topo.index_of(&sid("clubhouse")), Some(2));
        assert_eq!(topo.index_of(&sid("nowhere")), None);
    }

    #[test]
    fn loop_successor_wraps() {
        let topo = campus(RouteType::Loop);
        assert_eq!(topo.successor(0, None), Some(1));
        assert_eq!(topo.successor(2, None), Some(0));
        assert_eq!(topo.successor(3, None), None);
    }

    #[test]
    fn linear_successor_ends() {
        let topo = campus(RouteType::Linear);
        assert_eq!(topo.successor(1, None), Some(2));
        assert_eq!(topo.successor(2, None), None);
    }

    #[test]
    fn bidirectional_successor_follows_direction() {
        let topo = campus(RouteType::Bidirectional);
        assert_eq!(topo.successor(1, Some(Direction::Forward)), Some(2));
        assert_eq!(topo.successor(1, Some(Direction::Backward)), Some(0));
        assert_eq!(topo.successor(2, Some(Direction::Forward)), Some(2));
        assert_eq!(topo.successor(0, Some(Direction::Backward)), Some(0));
        assert_eq!(topo.successor(1, None), Some(2));
    }

    #[test]
    fn next_stop_after_by_id() {
        let topo = campus(RouteType::Loop);
        assert_eq!(topo.next_stop_after(&sid("clubhouse"), None), Some(&sid("walb")));
        assert_eq!(topo.next_stop_after(&sid("unknown"), None), None);
    }

    #[test]
    fn segment_time_sums_following_segments() {
        let topo = campus(RouteType::Loop);
        assert_eq!(topo.segment_time(0, 1), 240);
        assert_eq!(topo.segment_time(0, 2), 390);
        assert_eq!(topo.segment_time(1, 2), 150);
        assert_eq!(topo.segment_time(2, 2), 0);
        assert_eq!(topo.segment_time(0, 0), 0);
        assert_eq!(topo.segment_time(2, 1), 0);
    }

    #[test]
    fn segment_time_clamps_past_end() {
        let topo = campus(RouteType::Loop);
        assert_eq!(topo.segment_time(1, 10), 150);
    }

    #[test]
    fn segment_time_uses_configured_fallback() {
        let topo = partial_timing(&TopologyConfig::default());
        // b=100, c and d missing -> 120 each
        assert_eq!(topo.segment_time(0, 3), 100 + 120 + 120);
    }

    /// The arrival computation historically used 120s for a missing segment
    /// while the live pickup query used 60s. Both read the same setting now,
    /// so switching it changes every caller consistently.
    #[test]
    fn fallback_discrepancy_is_one_setting() {
        let eta_path = partial_timing(&TopologyConfig::new(120));
        let live_query_path = partial_timing(&TopologyConfig::new(60));
        assert_eq!(eta_path.segment_time(1, 3), 240);
        assert_eq!(live_query_path.segment_time(1, 3), 120);
        assert_ne!(eta_path.segment_time(1, 3), live_query_path.segment_time(1, 3));
    }

    #[test]
    fn segment_estimate_prefers_time_then_distance() {
        let topo = partial_timing(&TopologyConfig::default());
        // b: 100s modeled; c: 500m at 36 km/h = 10 m/s -> 50s; d: fallback 120s
        let estimate = topo.segment_estimate(0, 3, 36.0);
        assert!((estimate - 270.0).abs() < 1e-9, "got {estimate}");
    }

    #[test]
    fn segment_estimate_without_speed_uses_fallback() {
        let topo = partial_timing(&TopologyConfig::default());
        assert_eq!(topo.segment_estimate(1, 2, 0.0), 120.0);
    }

    #[test]
    fn serves_in_order() {
        let topo = campus(RouteType::Loop);
        assert!(topo.serves_in_order(&sid("walb"), &sid("clubhouse")));
        assert!(!topo.serves_in_order(&sid("clubhouse"), &sid("walb")));
        assert!(!topo.serves_in_order(&sid("walb"), &sid("walb")));
        assert!(!topo.serves_in_order(&sid("walb"), &sid("nowhere")));
    }

    #[test]
    fn time_between_stops() {
        let topo = campus(RouteType::Loop);
        assert_eq!(topo.time_between_stops(&sid("walb"), &sid("clubhouse")), Some(390));
        assert_eq!(topo.time_between_stops(&sid("clubhouse"), &sid("walb")), None);
        assert_eq!(topo.time_between_stops(&sid("walb"), &sid("walb")), None);
    }

    #[test]
    fn eta_to_stop_wraps_on_loop_only() {
        let looped = campus(RouteType::Loop);
        // At building-h (1): finish lap (150) then 0 -> walb.
        assert_eq!(looped.eta_to_stop(1, &sid("walb")), Some(150));
        assert_eq!(looped.eta_to_stop(0, &sid("clubhouse")), Some(390));

        let linear = campus(RouteType::Linear);
        assert_eq!(linear.eta_to_stop(1, &sid("walb")), None);
        assert_eq!(linear.eta_to_stop(1, &sid("clubhouse")), Some(150));
    }

    #[test]
    fn lap_from_last_stop_restarts_immediately() {
        let topo = campus(RouteType::Loop);
        assert_eq!(topo.lap_remainder(2, 0), 0);
        assert_eq!(topo.lap_remainder(2, 1), 240);
    }

    #[test]
    fn empty_route() {
        let topo = RouteTopology::new(route(RouteType::Loop, vec![]), &TopologyConfig::default());
        assert!(topo.is_empty());
        assert_eq!(topo.last_index(), None);
        assert_eq!(topo.successor(0, None), None);
        assert_eq!(topo.segment_time(0, 3), 0);
        assert_eq!(topo.lap_remainder(0, 0), 0);
    }

    #[test]
    fn with_stops_resolves_locations() {
        let topo = campus(RouteType::Loop);
        assert_eq!(topo.location(0), None);

        let walb = Arc::new(
            Stop::new(sid("walb"), "Walb", None, Coordinate::new(41.58, -87.47).unwrap()).unwrap(),
        );
        let resolved: HashMap<_, _> = [(sid("walb"), walb)].into_iter().collect();
        let topo = topo.with_stops(&resolved);

        assert!(topo.location(0).is_some());
        assert_eq!(topo.stop(0).map(|s| s.name.as_str()), Some("Walb"));
        assert_eq!(topo.location(1), None);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::domain::RouteId;
    use proptest::prelude::*;

    fn topology_strategy() -> impl Strategy<Value = RouteTopology> {
        (
            prop::collection::vec(prop::option::of(0u32..600), 1..12),
            prop_oneof![
                Just(RouteType::Linear),
                Just(RouteType::Loop),
                Just(RouteType::Bidirectional)
            ],
        )
            .prop_map(|(times, route_type)| {
                let stops = times
                    .into_iter()
                    .enumerate()
                    .map(|(i, t)| {
                        let rs = RouteStop::new(StopId::parse(format!("s{i}")).unwrap(), i as u32);
                        match t {
                            Some(t) => rs.with_time(t),
                            None => rs,
                        }
                    })
                    .collect();
                let route =
                    Route::new(RouteId::parse("r").unwrap(), "Route", route_type, stops).unwrap();
                RouteTopology::new(Arc::new(route), &TopologyConfig::default())
            })
    }

    proptest! {
        #[test]
        fn segment_time_is_additive(topo in topology_strategy(), a in 0usize..12, b in 0usize..12, c in 0usize..12) {
            let mut idx = [a % topo.len(), b % topo.len(), c % topo.len()];
            idx.sort();
            let [a, b, c] = idx;
            prop_assert_eq!(topo.segment_time(a, b) + topo.segment_time(b, c), topo.segment_time(a, c));
        }

        #[test]
        fn successor_stays_in_bounds(topo in topology_strategy(), i in 0usize..12, forward in any::<bool>()) {
            let i = i % topo.len();
            let dir = if forward { Direction::Forward } else { Direction::Backward };
            if let Some(next) = topo.successor(i, Some(dir)) {
                prop_assert!(next < topo.len());
            }
        }

        #[test]
        fn serves_in_order_is_antisymmetric(topo in topology_strategy(), p in 0usize..12, q in 0usize..12) {
            let p = topo.stop_id(p % topo.len()).unwrap().clone();
            let q = topo.stop_id(q % topo.len()).unwrap().clone();
            prop_assert!(!(topo.serves_in_order(&p, &q) && topo.serves_in_order(&q, &p)));
        }
    }
}
