//! Per-stop ETA computation for one shuttle.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{Arrival, Direction, RouteType, Shuttle, ShuttleId, StopId, eta_minutes};
use crate::speed::SpeedEstimate;
use crate::topology::RouteTopology;

use super::config::EtaConfig;
use super::confidence::confidence;

/// The estimate for one stop of the route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopEta {
    /// Sequence index of the stop.
    pub index: usize,
    pub stop: StopId,
    pub eta_secs: u32,
    pub confidence: f64,
}

impl StopEta {
    pub fn eta_minutes(&self) -> u32 {
        eta_minutes(self.eta_secs)
    }

    pub fn into_arrival(self, shuttle: &ShuttleId, computed_at: DateTime<Utc>) -> Arrival {
        Arrival {
            stop: self.stop,
            shuttle: shuttle.clone(),
            eta_secs: self.eta_secs,
            confidence: self.confidence,
            computed_at,
        }
    }
}

/// Computes ETAs for every reachable stop of a shuttle's route.
#[derive(Debug, Clone, Default)]
pub struct EtaCalculator {
    config: EtaConfig,
}

impl EtaCalculator {
    pub fn new(config: EtaConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EtaConfig {
        &self.config
    }

    /// ETA for each stop reachable from the shuttle's current position.
    ///
    /// A shuttle with no known sequence is treated as being at index 0.
    /// Stops behind the shuttle are reachable only on a loop route (by
    /// finishing the lap); on other routes they are omitted. A shuttle
    /// heading backward on a bidirectional route is handled as the mirror
    /// image: stops at higher indices are behind it.
    ///
    /// The result is deterministic in its inputs and is empty for a route
    /// with no stops.
    pub fn compute(
        &self,
        shuttle: &Shuttle,
        topology: &RouteTopology,
        speed: &SpeedEstimate,
    ) -> Vec<StopEta> {
        let Some(last) = topology.last_index() else {
            return Vec::new();
        };
        let current = shuttle.current_sequence.unwrap_or(0).min(last);
        let backward = topology.route_type() == RouteType::Bidirectional
            && shuttle.current_direction == Some(Direction::Backward);

        let mut etas = Vec::with_capacity(topology.len());
        for index in 0..topology.len() {
            let Some(stop) = topology.stop_id(index) else {
                continue;
            };

            let (raw_secs, stops_ahead) = if index == current {
                (self.time_to_current(shuttle, topology, index, speed), 0)
            } else if backward {
                if index > current {
                    continue;
                }
                (
                    topology.segment_estimate(index, current, speed.effective_kph),
                    (current - index) as i64,
                )
            } else if index < current {
                if topology.route_type() != RouteType::Loop {
                    continue;
                }
                (
                    f64::from(topology.lap_remainder(current, index)),
                    index as i64 - current as i64,
                )
            } else {
                (
                    topology.segment_estimate(current, index, speed.effective_kph),
                    (index - current) as i64,
                )
            };

            let eta_secs = round_secs(raw_secs);
            etas.push(StopEta {
                index,
                stop: stop.clone(),
                eta_secs,
                confidence: confidence(&self.config, eta_secs, speed, stops_ahead),
            });
        }
        etas
    }

    /// Time to the stop at the shuttle's own sequence index.
    ///
    /// Zero when the shuttle is there; otherwise straight-line distance at
    /// the effective speed, or the fallback segment time when either
    /// position is unknown.
    fn time_to_current(
        &self,
        shuttle: &Shuttle,
        topology: &RouteTopology,
        index: usize,
        speed: &SpeedEstimate,
    ) -> f64 {
        if shuttle.is_at_stop {
            return 0.0;
        }
        match (shuttle.location, topology.location(index)) {
            (Some(here), Some(there)) if speed.effective_mps() > 0.0 => {
                here.distance_to(&there) / speed.effective_mps()
            }
            _ => f64::from(topology.fallback_segment_secs()),
        }
    }
}

/// Floor at zero and round to the nearest whole second.
fn round_secs(secs: f64) -> u32 {
    if !secs.is_finite() {
        return 0;
    }
    secs.max(0.0).round().min(f64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use super::*;
    use crate::domain::{Coordinate, Route, RouteId, RouteStop, Stop};
    use crate::speed::SpeedEstimator;
    use crate::topology::TopologyConfig;

    fn sid(s: &str) -> StopId {
        StopId::parse(s).unwrap()
    }

    fn coord(lat: f64) -> Coordinate {
        Coordinate::new(lat, -87.47).unwrap()
    }

    /// Walb(0, t=0) -> BuildingH(1, t=240) -> Clubhouse(2, t=150)
    fn campus(route_type: RouteType) -> RouteTopology {
        let stops = vec![
            RouteStop::new(sid("walb"), 0).with_time(0),
            RouteStop::new(sid("building-h"), 1).with_time(240),
            RouteStop::new(sid("clubhouse"), 2).with_time(150),
        ];
        let route = Route::new(RouteId::parse("r").unwrap(), "Campus", route_type, stops).unwrap();
        let resolved: HashMap<_, _> = [("walb", 41.580), ("building-h", 41.585), ("clubhouse", 41.590)]
            .into_iter()
            .map(|(id, lat)| (sid(id), Arc::new(Stop::new(sid(id), id, None, coord(lat)).unwrap())))
            .collect();
        RouteTopology::new(Arc::new(route), &TopologyConfig::default()).with_stops(&resolved)
    }

    fn shuttle_at(sequence: usize, at_stop: bool) -> Shuttle {
        let mut s = Shuttle::new(ShuttleId::parse("s1").unwrap(), "Shuttle 1")
            .in_service_on(RouteId::parse("r").unwrap());
        s.current_sequence = Some(sequence);
        s.is_at_stop = at_stop;
        s
    }

    fn reliable() -> SpeedEstimate {
        SpeedEstimator::default().floor(25.0)
    }

    fn by_stop(etas: &[StopEta]) -> HashMap<String, u32> {
        etas.iter()
            .map(|e| (e.stop.to_string(), e.eta_secs))
            .collect()
    }

    #[test]
    fn loop_at_first_stop() {
        let etas = EtaCalculator::default().compute(
            &shuttle_at(0, true),
            &campus(RouteType::Loop),
            &reliable(),
        );
        let m = by_stop(&etas);
        assert_eq!(m["walb"], 0);
        assert_eq!(m["building-h"], 240);
        assert_eq!(m["clubhouse"], 390);

        let minutes: Vec<u32> = etas.iter().map(|e| e.eta_minutes()).collect();
        assert_eq!(minutes, vec![0, 4, 7]);
    }

    #[test]
    fn loop_at_last_stop_restarts_at_first() {
        let etas = EtaCalculator::default().compute(
            &shuttle_at(2, true),
            &campus(RouteType::Loop),
            &reliable(),
        );
        let m = by_stop(&etas);
        assert_eq!(m["walb"], 0);
        assert_eq!(m["building-h"], 240);
        assert_eq!(m["clubhouse"], 0);
    }

    #[test]
    fn loop_behind_stops_finish_the_lap() {
        let topo = campus(RouteType::Loop);
        let etas = EtaCalculator::default().compute(&shuttle_at(1, true), &topo, &reliable());
        let m = by_stop(&etas);
        // segment_time(1, 2) + segment_time(0, 0)
        assert_eq!(m["walb"], topo.segment_time(1, 2) + topo.segment_time(0, 0));
        assert_eq!(m["walb"], 150);
    }

    #[test]
    fn linear_skips_passed_stops() {
        let etas = EtaCalculator::default().compute(
            &shuttle_at(1, true),
            &campus(RouteType::Linear),
            &reliable(),
        );
        let stops: Vec<_> = etas.iter().map(|e| e.stop.as_str()).collect();
        assert_eq!(stops, vec!["building-h", "clubhouse"]);
    }

    #[test]
    fn bidirectional_backward_mirrors() {
        let mut shuttle = shuttle_at(2, true);
        shuttle.current_direction = Some(Direction::Backward);
        let etas =
            EtaCalculator::default().compute(&shuttle, &campus(RouteType::Bidirectional), &reliable());
        let m = by_stop(&etas);
        assert_eq!(m.len(), 3);
        assert_eq!(m["clubhouse"], 0);
        assert_eq!(m["building-h"], 150);
        assert_eq!(m["walb"], 390);

        let mut shuttle = shuttle_at(1, true);
        shuttle.current_direction = Some(Direction::Backward);
        let etas =
            EtaCalculator::default().compute(&shuttle, &campus(RouteType::Bidirectional), &reliable());
        assert!(etas.iter().all(|e| e.stop.as_str() != "clubhouse"));
    }

    #[test]
    fn bidirectional_forward_behaves_like_linear() {
        let mut shuttle = shuttle_at(1, true);
        shuttle.current_direction = Some(Direction::Forward);
        let etas =
            EtaCalculator::default().compute(&shuttle, &campus(RouteType::Bidirectional), &reliable());
        assert!(etas.iter().all(|e| e.stop.as_str() != "walb"));
    }

    #[test]
    fn approaching_current_stop_uses_distance() {
        let mut shuttle = shuttle_at(1, false);
        // 0.0025 deg south of building-h, about 278m away.
        shuttle.location = Some(coord(41.5825));
        // 36 km/h = 10 m/s
        let speed = SpeedEstimator::default().floor(36.0);
        let etas = EtaCalculator::default().compute(&shuttle, &campus(RouteType::Loop), &speed);
        let m = by_stop(&etas);
        assert_eq!(m["building-h"], 28);
    }

    #[test]
    fn unknown_location_falls_back_to_constant() {
        let shuttle = shuttle_at(1, false);
        let etas = EtaCalculator::default().compute(&shuttle, &campus(RouteType::Loop), &reliable());
        assert_eq!(by_stop(&etas)["building-h"], 120);
    }

    #[test]
    fn unknown_sequence_counts_as_start() {
        let mut shuttle = shuttle_at(0, true);
        shuttle.current_sequence = None;
        let etas = EtaCalculator::default().compute(&shuttle, &campus(RouteType::Linear), &reliable());
        assert_eq!(by_stop(&etas)["clubhouse"], 390);
    }

    #[test]
    fn future_segment_without_time_uses_distance() {
        let stops = vec![
            RouteStop::new(sid("a"), 0),
            RouteStop::new(sid("b"), 1).with_distance(1000.0),
        ];
        let route = Route::new(RouteId::parse("r").unwrap(), "R", RouteType::Linear, stops).unwrap();
        let topo = RouteTopology::new(Arc::new(route), &TopologyConfig::default());
        // Unreliable speed: 20 km/h cruise -> 1000m in 180s.
        let speed = SpeedEstimator::default().floor(0.0);
        let etas = EtaCalculator::default().compute(&shuttle_at(0, true), &topo, &speed);
        assert_eq!(etas[1].eta_secs, 180);
        assert!((etas[1].confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn empty_route_yields_nothing() {
        let route = Route::new(RouteId::parse("r").unwrap(), "R", RouteType::Loop, vec![]).unwrap();
        let topo = RouteTopology::new(Arc::new(route), &TopologyConfig::default());
        assert!(EtaCalculator::default().compute(&shuttle_at(0, true), &topo, &reliable()).is_empty());
    }

    #[test]
    fn deterministic() {
        let topo = campus(RouteType::Loop);
        let mut shuttle = shuttle_at(1, false);
        shuttle.location = Some(coord(41.583));
        let calc = EtaCalculator::default();
        assert_eq!(
            calc.compute(&shuttle, &topo, &reliable()),
            calc.compute(&shuttle, &topo, &reliable())
        );
    }

    #[test]
    fn into_arrival_shares_timestamp() {
        let computed_at = chrono::Utc::now();
        let shuttle = shuttle_at(0, true);
        let arrivals: Vec<Arrival> = EtaCalculator::default()
            .compute(&shuttle, &campus(RouteType::Loop), &reliable())
            .into_iter()
            .map(|e| e.into_arrival(&shuttle.id, computed_at))
            .collect();
        assert!(arrivals.iter().all(|a| a.computed_at == computed_at));
        assert!(arrivals.iter().all(|a| a.shuttle == shuttle.id));
    }

    #[test]
    fn round_secs_floors_and_rounds() {
        assert_eq!(round_secs(-3.2), 0);
        assert_eq!(round_secs(27.5), 28);
        assert_eq!(round_secs(27.49), 27);
        assert_eq!(round_secs(f64::NAN), 0);
    }
}
