//! In-process fleet store.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::{Coordinate, Ping, Route, RouteId, Shuttle, ShuttleId, Stop, StopId};

use super::snapshot::FleetSnapshot;
use super::{FleetStore, StoreConfig, StoreError};

/// Fleet store backed by in-memory maps.
///
/// Cloning is cheap and clones share the same data.
#[derive(Clone)]
pub struct MemoryStore {
    stops: Arc<RwLock<HashMap<StopId, Arc<Stop>>>>,
    routes: Arc<RwLock<HashMap<RouteId, Arc<Route>>>>,
    shuttles: Arc<RwLock<HashMap<ShuttleId, Shuttle>>>,
    /// Per shuttle, oldest first.
    pings: Arc<RwLock<HashMap<ShuttleId, VecDeque<Ping>>>>,
    ping_retention: chrono::Duration,
    max_pings_per_shuttle: usize,
}

impl MemoryStore {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            stops: Arc::default(),
            routes: Arc::default(),
            shuttles: Arc::default(),
            pings: Arc::default(),
            ping_retention: chrono::Duration::from_std(config.ping_retention)
                .unwrap_or_else(|_| chrono::Duration::hours(1)),
            max_pings_per_shuttle: config.max_pings_per_shuttle.max(1),
        }
    }

    /// Build a store from a snapshot, validating every record.
    pub async fn from_snapshot(
        snapshot: FleetSnapshot,
        config: &StoreConfig,
    ) -> Result<Self, StoreError> {
        let store = Self::new(config);
        for record in snapshot.stops {
            store.insert_stop(Stop::try_from(record)?).await;
        }
        for record in snapshot.routes {
            store.insert_route(Route::try_from(record)?).await;
        }
        for record in snapshot.shuttles {
            store.save_shuttle(Shuttle::try_from(record)?).await?;
        }
        for record in snapshot.pings {
            store.append_ping(Ping::try_from(record)?).await?;
        }

        debug!(
            stops = store.stops.read().await.len(),
            routes = store.routes.read().await.len(),
            shuttles = store.shuttles.read().await.len(),
            "Loaded fleet snapshot"
        );
        Ok(store)
    }

    /// Read and load a JSON snapshot file.
    pub async fn load(path: impl AsRef<Path>, config: &StoreConfig) -> Result<Self, StoreError> {
        let json = tokio::fs::read_to_string(path.as_ref()).await?;
        let snapshot = FleetSnapshot::from_json(&json)?;
        Self::from_snapshot(snapshot, config).await
    }

    pub async fn insert_stop(&self, stop: Stop) {
        self.stops.write().await.insert(stop.id.clone(), Arc::new(stop));
    }

    pub async fn insert_route(&self, route: Route) {
        self.routes.write().await.insert(route.id.clone(), Arc::new(route));
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(&StoreConfig::default())
    }
}

impl FleetStore for MemoryStore {
    async fn stop(&self, id: &StopId) -> Result<Option<Arc<Stop>>, StoreError> {
        Ok(self.stops.read().await.get(id).cloned())
    }

    async fn stops(&self, ids: &[StopId]) -> Result<HashMap<StopId, Arc<Stop>>, StoreError> {
        let stops = self.stops.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| stops.get(id).map(|s| (id.clone(), Arc::clone(s))))
            .collect())
    }

    async fn nearest_stops(
        &self,
        near: Coordinate,
        max_distance_m: f64,
        limit: usize,
    ) -> Result<Vec<(Arc<Stop>, f64)>, StoreError> {
        let stops = self.stops.read().await;
        let mut nearby: Vec<(Arc<Stop>, f64)> = stops
            .values()
            .map(|s| (Arc::clone(s), near.distance_to(&s.location)))
            .filter(|(_, d)| *d <= max_distance_m)
            .collect();
        nearby.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.id.cmp(&b.0.id)));
        nearby.truncate(limit);
        Ok(nearby)
    }

    async fn route(&self, id: &RouteId) -> Result<Option<Arc<Route>>, StoreError> {
        Ok(self.routes.read().await.get(id).cloned())
    }

    async fn active_routes(&self) -> Result<Vec<Arc<Route>>, StoreError> {
        let mut routes: Vec<Arc<Route>> = self
            .routes
            .read()
            .await
            .values()
            .filter(|r| r.active)
            .cloned()
            .collect();
        routes.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(routes)
    }

    async fn shuttle(&self, id: &ShuttleId) -> Result<Option<Shuttle>, StoreError> {
        Ok(self.shuttles.read().await.get(id).cloned())
    }

    async fn shuttles_in_service(&self) -> Result<Vec<Shuttle>, StoreError> {
        let mut shuttles: Vec<Shuttle> = self
            .shuttles
            .read()
            .await
            .values()
            .filter(|s| s.participates_in_eta())
            .cloned()
            .collect();
        shuttles.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(shuttles)
    }

    async fn save_shuttle(&self, shuttle: Shuttle) -> Result<(), StoreError> {
        self.shuttles.write().await.insert(shuttle.id.clone(), shuttle);
        Ok(())
    }

    async fn append_ping(&self, ping: Ping) -> Result<(), StoreError> {
        let mut pings = self.pings.write().await;
        let history = pings.entry(ping.shuttle.clone()).or_default();

        // Keep the deque ordered by timestamp; late samples are rare.
        let at = history.partition_point(|p| p.ts <= ping.ts);
        history.insert(at, ping);

        if let Some(newest) = history.back().map(|p| p.ts) {
            let cutoff = newest - self.ping_retention;
            while history.front().is_some_and(|p| p.ts < cutoff) {
                history.pop_front();
            }
        }
        while history.len() > self.max_pings_per_shuttle {
            history.pop_front();
        }
        Ok(())
    }

    async fn recent_pings(&self, shuttle: &ShuttleId, limit: usize) -> Result<Vec<Ping>, StoreError> {
        Ok(self
            .pings
            .read()
            .await
            .get(shuttle)
            .map(|history| history.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn latest_ping_since(
        &self,
        shuttle: &ShuttleId,
        since: DateTime<Utc>,
    ) -> Result<Option<Ping>, StoreError> {
        Ok(self
            .pings
            .read()
            .await
            .get(shuttle)
            .and_then(|history| history.back())
            .filter(|p| p.ts >= since)
            .cloned())
    }
}
