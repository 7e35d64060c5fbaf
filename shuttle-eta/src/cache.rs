//! Arrival store.
//!
//! Holds the latest [`Arrival`] per `(stop, shuttle)`. Entries expire after
//! the retention period; reads additionally hide anything computed before
//! the recency window so a shuttle that stopped reporting drops out of the
//! rider-facing queries well before its records are evicted.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache as MokaCache;

use crate::domain::{Arrival, ShuttleId, StopId};

type ArrivalKey = (StopId, ShuttleId);

/// Configuration for the arrival cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Reads ignore arrivals computed longer ago than this.
    pub recency: Duration,

    /// Arrivals are evicted this long after being written.
    pub retention: Duration,

    /// Maximum number of cached arrivals.
    pub max_capacity: u64,

    /// How many arrivals a per-stop query returns.
    pub stop_query_limit: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            recency: Duration::from_secs(2 * 60),
            retention: Duration::from_secs(60 * 60),
            max_capacity: 10_000,
            stop_query_limit: 5,
        }
    }
}

/// Latest arrival per `(stop, shuttle)`.
#[derive(Clone)]
pub struct ArrivalCache {
    arrivals: MokaCache<ArrivalKey, Arrival>,
    recency: chrono::Duration,
    stop_query_limit: usize,
}

impl ArrivalCache {
    pub fn new(config: &CacheConfig) -> Self {
        let arrivals = MokaCache::builder()
            .time_to_live(config.retention)
            .max_capacity(config.max_capacity)
            .build();

        Self {
            arrivals,
            recency: chrono::Duration::from_std(config.recency)
                .unwrap_or_else(|_| chrono::Duration::minutes(2)),
            stop_query_limit: config.stop_query_limit,
        }
    }

    /// Insert or replace the arrival for its `(stop, shuttle)` key.
    pub async fn upsert(&self, arrival: Arrival) {
        self.arrivals.insert(arrival.key(), arrival).await;
    }

    /// Upsert every arrival. Returns how many were written.
    pub async fn upsert_all(&self, arrivals: impl IntoIterator<Item = Arrival>) -> usize {
        let mut written = 0;
        for arrival in arrivals {
            self.upsert(arrival).await;
            written += 1;
        }
        written
    }

    /// The stored arrival for a key, regardless of recency.
    pub async fn get(&self, stop: &StopId, shuttle: &ShuttleId) -> Option<Arrival> {
        self.arrivals.get(&(stop.clone(), shuttle.clone())).await
    }

    /// Whether `arrival` is recent enough to show at `now`.
    pub fn is_fresh(&self, arrival: &Arrival, now: DateTime<Utc>) -> bool {
        arrival.computed_at >= now - self.recency
    }

    /// Fresh arrivals at one stop, soonest first, at most `limit` of them
    /// (`stop_query_limit` when `None`).
    pub fn for_stop(&self, stop: &StopId, limit: Option<usize>, now: DateTime<Utc>) -> Vec<Arrival> {
        let mut arrivals = self.fresh_where(now, |a| &a.stop == stop);
        arrivals.truncate(limit.unwrap_or(self.stop_query_limit));
        arrivals
    }

    /// Fresh arrivals of one shuttle, soonest first.
    pub fn for_shuttle(&self, shuttle: &ShuttleId, now: DateTime<Utc>) -> Vec<Arrival> {
        self.fresh_where(now, |a| &a.shuttle == shuttle)
    }

    /// Fresh arrivals at any of `stops`, soonest first.
    pub fn for_stops(&self, stops: &HashSet<StopId>, now: DateTime<Utc>) -> Vec<Arrival> {
        self.fresh_where(now, |a| stops.contains(&a.stop))
    }

    /// Number of arrivals held (including ones no longer fresh).
    pub fn entry_count(&self) -> u64 {
        self.arrivals.entry_count()
    }

    /// Apply pending evictions and bookkeeping.
    pub async fn run_pending_tasks(&self) {
        self.arrivals.run_pending_tasks().await;
    }

    fn fresh_where(&self, now: DateTime<Utc>, keep: impl Fn(&Arrival) -> bool) -> Vec<Arrival> {
        let mut arrivals: Vec<Arrival> = self
            .arrivals
            .iter()
            .map(|(_, arrival)| arrival)
            .filter(|a| self.is_fresh(a, now) && keep(a))
            .collect();
        arrivals.sort_by(|a, b| {
            a.eta_secs
                .cmp(&b.eta_secs)
                .then_with(|| a.shuttle.cmp(&b.shuttle))
        });
        arrivals
    }
}
