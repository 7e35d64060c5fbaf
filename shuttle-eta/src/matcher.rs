//! Connecting-route lookup for a pickup/dropoff pair.

use std::sync::Arc;

use tracing::debug;

use crate::domain::{Route, StopId};
use crate::topology::{RouteTopology, TopologyConfig};

/// Finds routes that carry a rider from one stop to another.
#[derive(Debug, Clone, Default)]
pub struct RouteMatcher {
    topology: TopologyConfig,
}

impl RouteMatcher {
    pub fn new(topology: TopologyConfig) -> Self {
        Self { topology }
    }

    /// Active routes on which `dropoff` comes strictly after `pickup`.
    ///
    /// Direction matters: swapping the stops can change the answer. Order of
    /// `routes` is preserved.
    pub fn find_connecting_routes(
        &self,
        routes: &[Arc<Route>],
        pickup: &StopId,
        dropoff: &StopId,
    ) -> Vec<Arc<Route>> {
        let matched: Vec<Arc<Route>> = routes
            .iter()
            .filter(|route| route.active)
            .filter(|route| {
                RouteTopology::new(Arc::clone(route), &self.topology)
                    .serves_in_order(pickup, dropoff)
            })
            .cloned()
            .collect();

        debug!(
            pickup = %pickup,
            dropoff = %dropoff,
            candidates = routes.len(),
            matched = matched.len(),
            "Matched connecting routes"
        );
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RouteId, RouteStop, RouteType};

    fn sid(s: &str) -> StopId {
        StopId::parse(s).unwrap()
    }

    fn route(id: &str, stops: &[&str]) -> Arc<Route> {
        let stops = stops
            .iter()
            .enumerate()
            .map(|(i, s)| RouteStop::new(sid(s), i as u32))
            .collect();
        Arc::new(Route::new(RouteId::parse(id).unwrap(), id, RouteType::Loop, stops).unwrap())
    }

    fn ids(routes: &[Arc<Route>]) -> Vec<&str> {
        routes.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn finds_routes_in_order() {
        let routes = vec![
            route("red", &["walb", "building-h", "clubhouse"]),
            route("blue", &["clubhouse", "walb"]),
            route("green", &["library", "gym"]),
        ];
        let matcher = RouteMatcher::default();

        let found = matcher.find_connecting_routes(&routes, &sid("walb"), &sid("clubhouse"));
        assert_eq!(ids(&found), vec!["red"]);
    }

    #[test]
    fn swapping_stops_changes_answer() {
        let routes = vec![
            route("red", &["walb", "building-h", "clubhouse"]),
            route("blue", &["clubhouse", "walb"]),
        ];
        let matcher = RouteMatcher::default();

        let found = matcher.find_connecting_routes(&routes, &sid("clubhouse"), &sid("walb"));
        assert_eq!(ids(&found), vec!["blue"]);
    }

    #[test]
    fn inactive_routes_ignored() {
        let inactive = Arc::new(
            Route::clone(&route("red", &["walb", "clubhouse"])).with_active(false),
        );
        let found = RouteMatcher::default().find_connecting_routes(
            &[inactive],
            &sid("walb"),
            &sid("clubhouse"),
        );
        assert!(found.is_empty());
    }

    #[test]
    fn same_stop_never_matches() {
        let routes = vec![route("red", &["walb", "clubhouse"])];
        let found =
            RouteMatcher::default().find_connecting_routes(&routes, &sid("walb"), &sid("walb"));
        assert!(found.is_empty());
    }
}
