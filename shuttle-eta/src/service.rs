//! Tracking service.
//!
//! [`TrackingService`] ties the pieces together for callers: it ingests
//! telemetry, runs ETA computations (one-shot or as a batch cycle) and
//! answers the rider-facing queries. Shuttle state changes for one shuttle
//! are serialised through [`ShuttleLocks`]; different shuttles never wait
//! on each other.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::cache::ArrivalCache;
use crate::config::Config;
use crate::domain::{
    Arrival, Coordinate, Ping, Route, RouteId, Shuttle, ShuttleId, ShuttleStatus, Stop, StopId,
};
use crate::eta::{
    ComputationSummary, ComputeOutcome, EtaCalculator, EtaError, SkipReason, StopEstimate,
};
use crate::matcher::RouteMatcher;
use crate::notify::{FleetEvent, Notifier, NotifyError, ShuttleUpdate};
use crate::speed::SpeedEstimator;
use crate::store::{FleetStore, StoreConfig};
use crate::topology::{RouteTopology, TopologyConfig};
use crate::tracker::{PositionTracker, TrackerEvent};
use crate::worker::WorkerConfig;

type LockTable = HashMap<ShuttleId, Arc<Mutex<()>>>;

/// One async mutex per shuttle id.
///
/// Entries exist only while some task holds or awaits the shuttle's lock.
#[derive(Clone, Default)]
pub struct ShuttleLocks {
    locks: Arc<StdMutex<LockTable>>,
}

impl ShuttleLocks {
    /// Wait for exclusive access to `shuttle`'s state.
    pub async fn lock(&self, shuttle: &ShuttleId) -> ShuttleGuard {
        let entry = LockEntry {
            lock: Arc::clone(self.table().entry(shuttle.clone()).or_default()),
            locks: self.clone(),
            shuttle: shuttle.clone(),
        };
        let guard = Arc::clone(&entry.lock).lock_owned().await;
        ShuttleGuard {
            _guard: guard,
            _entry: entry,
        }
    }

    /// Number of shuttles currently locked or awaited.
    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }

    fn table(&self) -> MutexGuard<'_, LockTable> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive access to one shuttle, released on drop.
pub struct ShuttleGuard {
    // Field order matters: the mutex is released before the entry is pruned.
    _guard: OwnedMutexGuard<()>,
    _entry: LockEntry,
}

struct LockEntry {
    locks: ShuttleLocks,
    shuttle: ShuttleId,
    lock: Arc<Mutex<()>>,
}

impl Drop for LockEntry {
    fn drop(&mut self) {
        let mut table = self.locks.table();
        // Only the table and this entry still reference the mutex.
        if Arc::strong_count(&self.lock) == 2 {
            table.remove(&self.shuttle);
        }
    }
}

/// Summary of one batch cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    /// Shuttles whose arrivals were computed.
    pub shuttles_processed: usize,
    pub arrivals_updated: usize,
    pub skipped: usize,
    /// Shuttles whose computation failed, with the error message.
    pub failures: Vec<(ShuttleId, String)>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Fresh arrivals at one stop of a route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopArrivals {
    pub stop: StopId,
    pub name: Option<String>,
    pub sequence: usize,
    pub arrivals: Vec<Arrival>,
}

#[derive(Debug, Clone)]
pub struct NearbyStop {
    pub stop: Arc<Stop>,
    pub distance_m: f64,
}

/// Which in-service shuttles to list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveFilter {
    All,
    Route(RouteId),
}

/// An in-service shuttle and its most recent telemetry.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveShuttle {
    pub shuttle: Shuttle,
    /// Newest ping within the live window, if any.
    pub latest_ping: Option<Ping>,
    /// Only set for pickup/dropoff queries, and only when the shuttle's
    /// position is known and the pickup is ahead of it.
    pub eta_to_pickup_secs: Option<u32>,
    pub eta_to_dropoff_secs: Option<u32>,
}

/// Answer to "which shuttles take me from pickup to dropoff".
#[derive(Debug, Clone)]
pub enum StopPairResult {
    /// No active route visits dropoff after pickup.
    NoValidRoute,
    /// Connecting routes and their in-service shuttles, soonest pickup
    /// first; shuttles without a pickup estimate come last. `shuttles` may
    /// be empty when nothing is running yet.
    Served {
        routes: Vec<Arc<Route>>,
        shuttles: Vec<LiveShuttle>,
    },
}

/// Fleet tracking and ETA facade.
pub struct TrackingService<S, N> {
    store: S,
    notifier: N,
    cache: ArrivalCache,
    topology: TopologyConfig,
    tracker: PositionTracker,
    speed: SpeedEstimator,
    calculator: EtaCalculator,
    matcher: RouteMatcher,
    store_config: StoreConfig,
    locks: ShuttleLocks,
}

impl<S: FleetStore, N: Notifier> TrackingService<S, N> {
    pub fn new(store: S, notifier: N, config: &Config) -> Self {
        Self {
            store,
            notifier,
            cache: ArrivalCache::new(&config.cache),
            topology: config.topology.clone(),
            tracker: PositionTracker::new(config.tracker.clone()),
            speed: SpeedEstimator::new(config.speed.clone()),
            calculator: EtaCalculator::new(config.eta.clone()),
            matcher: RouteMatcher::new(config.topology.clone()),
            store_config: config.store.clone(),
            locks: ShuttleLocks::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cache(&self) -> &ArrivalCache {
        &self.cache
    }

    /// Record a telemetry sample and update the shuttle's position state.
    pub async fn ingest_ping(&self, ping: Ping) -> Result<TrackerEvent, EtaError> {
        let _guard = self.locks.lock(&ping.shuttle).await;

        let mut shuttle = self
            .store
            .shuttle(&ping.shuttle)
            .await?
            .ok_or_else(|| EtaError::ShuttleNotFound(ping.shuttle.clone()))?;

        self.store.append_ping(ping.clone()).await?;

        shuttle.speed_kph = Some(ping.speed_kph);
        shuttle.heading = ping.heading.or(shuttle.heading);
        shuttle.last_ping_at = Some(ping.ts);

        let event = match self.shuttle_topology(&shuttle).await? {
            Some(topology) => self.tracker.apply(&mut shuttle, ping.location, ping.ts, &topology),
            None => {
                shuttle.location = Some(ping.location);
                TrackerEvent::NoTopology
            }
        };

        debug!(shuttle = %shuttle.id, ?event, "Ingested ping");

        self.store.save_shuttle(shuttle.clone()).await?;
        self.notify(FleetEvent::ShuttleUpdate(ShuttleUpdate::new(
            &shuttle,
            event.clone(),
            ping.ts,
        )));
        Ok(event)
    }

    /// Compute and store arrivals for `shuttle` on `route`.
    ///
    /// Unknown ids are errors. A shuttle that is out of service, or a route
    /// that is inactive or has no stops, is skipped without writing
    /// anything.
    pub async fn compute_arrivals(
        &self,
        shuttle: &ShuttleId,
        route: &RouteId,
    ) -> Result<ComputeOutcome, EtaError> {
        let _guard = self.locks.lock(shuttle).await;

        let shuttle = self
            .store
            .shuttle(shuttle)
            .await?
            .ok_or_else(|| EtaError::ShuttleNotFound(shuttle.clone()))?;
        if shuttle.status != ShuttleStatus::InService {
            return Ok(skipped(&shuttle, SkipReason::NotInService));
        }

        let route = self
            .store
            .route(route)
            .await?
            .ok_or_else(|| EtaError::RouteNotFound(route.clone()))?;
        if !route.active {
            return Ok(skipped(&shuttle, SkipReason::RouteInactive));
        }
        if route.is_empty() {
            return Ok(skipped(&shuttle, SkipReason::EmptyRoute));
        }

        let topology = self.resolve_topology(Arc::clone(&route)).await?;
        let pings = self
            .store
            .recent_pings(&shuttle.id, self.speed.config().sample_window)
            .await?;
        let speed = self.speed.estimate(&pings);

        let etas = self.calculator.compute(&shuttle, &topology, &speed);
        let computed_at = Utc::now();

        let estimates: Vec<StopEstimate> = etas
            .iter()
            .map(|eta| StopEstimate {
                stop: eta.stop.clone(),
                name: topology.stop(eta.index).map(|s| s.name.clone()),
                eta_secs: eta.eta_secs,
                eta_minutes: eta.eta_minutes(),
                confidence: eta.confidence,
            })
            .collect();

        let arrivals: Vec<Arrival> = etas
            .into_iter()
            .map(|eta| eta.into_arrival(&shuttle.id, computed_at))
            .collect();
        for arrival in &arrivals {
            self.cache.upsert(arrival.clone()).await;
        }
        for arrival in arrivals {
            self.notify(FleetEvent::ArrivalUpdate(arrival));
        }

        debug!(
            shuttle = %shuttle.id,
            route = %route.id,
            arrivals = estimates.len(),
            speed_kph = speed.raw_kph,
            reliable = speed.reliable,
            "Computed arrivals"
        );

        Ok(ComputeOutcome::Computed(ComputationSummary {
            shuttle: shuttle.id.clone(),
            route: route.id.clone(),
            arrivals: estimates,
            computed_at,
        }))
    }

    /// Compute arrivals for every in-service shuttle.
    ///
    /// Shuttles are processed concurrently in batches of
    /// `config.batch_size`, each bounded by `config.lookup_timeout`. A
    /// failure for one shuttle is recorded and does not stop the others.
    pub async fn run_cycle(&self, config: &WorkerConfig) -> Result<CycleReport, EtaError> {
        let started_at = Utc::now();
        let shuttles = self.store.shuttles_in_service().await?;

        let mut report = CycleReport {
            shuttles_processed: 0,
            arrivals_updated: 0,
            skipped: 0,
            failures: Vec::new(),
            started_at,
            finished_at: started_at,
        };

        let work: Vec<(ShuttleId, Option<RouteId>)> = shuttles
            .into_iter()
            .map(|s| (s.id, s.route))
            .collect();

        for batch in work.chunks(config.batch_size.max(1)) {
            let futures: Vec<_> = batch
                .iter()
                .cloned()
                .map(|(shuttle, route)| async move {
                    let Some(route) = route else {
                        return (shuttle, Ok(None));
                    };
                    let result =
                        tokio::time::timeout(config.lookup_timeout, self.compute_arrivals(&shuttle, &route))
                            .await
                            .unwrap_or_else(|_| Err(EtaError::Timeout(shuttle.clone())))
                            .map(Some);
                    (shuttle, result)
                })
                .collect();

            for (shuttle, result) in join_all(futures).await {
                match result {
                    Ok(Some(ComputeOutcome::Computed(summary))) => {
                        report.shuttles_processed += 1;
                        report.arrivals_updated += summary.arrivals.len();
                    }
                    Ok(Some(ComputeOutcome::Skipped { reason, .. })) => {
                        debug!(shuttle = %shuttle, ?reason, "Skipped shuttle");
                        report.skipped += 1;
                    }
                    Ok(None) => {
                        debug!(shuttle = %shuttle, "Skipped shuttle with no route");
                        report.skipped += 1;
                    }
                    Err(e @ (EtaError::ShuttleNotFound(_) | EtaError::RouteNotFound(_))) => {
                        debug!(shuttle = %shuttle, error = %e, "Skipped shuttle");
                        report.skipped += 1;
                    }
                    Err(e) => {
                        warn!(shuttle = %shuttle, error = %e, "Failed to compute arrivals");
                        report.failures.push((shuttle, e.to_string()));
                    }
                }
            }
        }

        report.finished_at = Utc::now();
        info!(
            shuttles_processed = report.shuttles_processed,
            arrivals_updated = report.arrivals_updated,
            skipped = report.skipped,
            failures = report.failures.len(),
            "ETA cycle complete"
        );
        Ok(report)
    }

    /// Fresh arrivals at a stop, soonest first.
    ///
    /// `limit` defaults to the cache's per-stop query limit.
    pub async fn arrivals_for_stop(
        &self,
        stop: &StopId,
        limit: Option<usize>,
    ) -> Result<Vec<Arrival>, EtaError> {
        if self.store.stop(stop).await?.is_none() {
            return Err(EtaError::StopNotFound(stop.clone()));
        }
        Ok(self.cache.for_stop(stop, limit, Utc::now()))
    }

    /// Fresh arrivals for every stop of a route, in route order.
    pub async fn arrivals_for_route(&self, route: &RouteId) -> Result<Vec<StopArrivals>, EtaError> {
        let route = self
            .store
            .route(route)
            .await?
            .ok_or_else(|| EtaError::RouteNotFound(route.clone()))?;
        let topology = self.resolve_topology(Arc::clone(&route)).await?;

        let stop_ids: HashSet<StopId> = route.stop_ids().cloned().collect();
        let mut by_stop: HashMap<StopId, Vec<Arrival>> = HashMap::new();
        for arrival in self.cache.for_stops(&stop_ids, Utc::now()) {
            by_stop.entry(arrival.stop.clone()).or_default().push(arrival);
        }

        let mut grouped = Vec::with_capacity(topology.len());
        for (sequence, stop) in route.stop_ids().enumerate() {
            if topology.index_of(stop) != Some(sequence) {
                continue;
            }
            grouped.push(StopArrivals {
                stop: stop.clone(),
                name: topology.stop(sequence).map(|s| s.name.clone()),
                sequence,
                arrivals: by_stop.remove(stop).unwrap_or_default(),
            });
        }
        Ok(grouped)
    }

    /// Fresh arrivals of one shuttle, soonest first.
    pub async fn arrivals_for_shuttle(&self, shuttle: &ShuttleId) -> Result<Vec<Arrival>, EtaError> {
        if self.store.shuttle(shuttle).await?.is_none() {
            return Err(EtaError::ShuttleNotFound(shuttle.clone()));
        }
        Ok(self.cache.for_shuttle(shuttle, Utc::now()))
    }

    /// Stops near `location`, closest first.
    pub async fn nearby_stops(&self, location: Coordinate) -> Result<Vec<NearbyStop>, EtaError> {
        let found = self
            .store
            .nearest_stops(
                location,
                self.store_config.nearby_radius_m,
                self.store_config.nearby_limit,
            )
            .await?;
        Ok(found
            .into_iter()
            .map(|(stop, distance_m)| NearbyStop { stop, distance_m })
            .collect())
    }

    /// Active routes on which `dropoff` comes after `pickup`.
    pub async fn find_connecting_routes(
        &self,
        pickup: &StopId,
        dropoff: &StopId,
    ) -> Result<Vec<Arc<Route>>, EtaError> {
        for stop in [pickup, dropoff] {
            if self.store.stop(stop).await?.is_none() {
                return Err(EtaError::StopNotFound(stop.clone()));
            }
        }
        let routes = self.store.active_routes().await?;
        Ok(self.matcher.find_connecting_routes(&routes, pickup, dropoff))
    }

    /// In-service shuttles, each with its newest ping from the live window.
    pub async fn live_shuttles(&self, filter: &LiveFilter) -> Result<Vec<LiveShuttle>, EtaError> {
        let shuttles = self.store.shuttles_in_service().await?;
        let mut live = Vec::with_capacity(shuttles.len());
        for shuttle in shuttles {
            if let LiveFilter::Route(route) = filter {
                if shuttle.route.as_ref() != Some(route) {
                    continue;
                }
            }
            let latest_ping = self.latest_live_ping(&shuttle.id).await?;
            live.push(LiveShuttle {
                shuttle,
                latest_ping,
                eta_to_pickup_secs: None,
                eta_to_dropoff_secs: None,
            });
        }
        Ok(live)
    }

    /// In-service shuttles on routes that take a rider from `pickup` to
    /// `dropoff`.
    ///
    /// Estimates use modeled segment times only. A shuttle gets no estimate
    /// when it has not been placed on its route yet, or when its route
    /// cannot reach the pickup from its current position this trip.
    pub async fn shuttles_between(
        &self,
        pickup: &StopId,
        dropoff: &StopId,
    ) -> Result<StopPairResult, EtaError> {
        let routes = self.find_connecting_routes(pickup, dropoff).await?;
        if routes.is_empty() {
            return Ok(StopPairResult::NoValidRoute);
        }

        let mut shuttles = Vec::new();
        for route in &routes {
            let topology = RouteTopology::new(Arc::clone(route), &self.topology);
            let ride_secs = topology.time_between_stops(pickup, dropoff).unwrap_or(0);

            for mut live in self.live_shuttles(&LiveFilter::Route(route.id.clone())).await? {
                live.eta_to_pickup_secs = live
                    .shuttle
                    .current_sequence
                    .and_then(|current| topology.eta_to_stop(current, pickup));
                live.eta_to_dropoff_secs = live.eta_to_pickup_secs.map(|secs| secs + ride_secs);
                shuttles.push(live);
            }
        }
        shuttles.sort_by_key(|s| (s.eta_to_pickup_secs.is_none(), s.eta_to_pickup_secs));

        Ok(StopPairResult::Served { routes, shuttles })
    }

    async fn latest_live_ping(&self, shuttle: &ShuttleId) -> Result<Option<Ping>, EtaError> {
        let window = chrono::Duration::from_std(self.store_config.live_ping_window)
            .unwrap_or_else(|_| chrono::Duration::minutes(5));
        self.store
            .latest_ping_since(shuttle, Utc::now() - window)
            .await
            .map_err(EtaError::from)
    }

    /// The topology of the shuttle's assigned route, if it has one.
    async fn shuttle_topology(&self, shuttle: &Shuttle) -> Result<Option<RouteTopology>, EtaError> {
        let Some(route_id) = &shuttle.route else {
            return Ok(None);
        };
        match self.store.route(route_id).await? {
            Some(route) => Ok(Some(self.resolve_topology(route).await?)),
            None => {
                debug!(shuttle = %shuttle.id, route = %route_id, "Assigned route not found");
                Ok(None)
            }
        }
    }

    async fn resolve_topology(&self, route: Arc<Route>) -> Result<RouteTopology, EtaError> {
        let ids: Vec<StopId> = route.stop_ids().cloned().collect();
        let stops = self.store.stops(&ids).await?;
        for id in ids.iter().filter(|id| !stops.contains_key(*id)) {
            debug!(route = %route.id, stop = %id, "Route stop has no stop record");
        }
        Ok(RouteTopology::new(route, &self.topology).with_stops(&stops))
    }

    fn notify(&self, event: FleetEvent) {
        match self.notifier.publish(event) {
            Ok(()) => {}
            Err(NotifyError::NoSubscribers) => debug!("No subscribers for fleet event"),
            Err(e) => warn!(error = %e, "Failed to publish fleet event"),
        }
    }
}

fn skipped(shuttle: &Shuttle, reason: SkipReason) -> ComputeOutcome {
    debug!(shuttle = %shuttle.id, ?reason, "Nothing to compute");
    ComputeOutcome::Skipped {
        shuttle: shuttle.id.clone(),
        reason,
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
