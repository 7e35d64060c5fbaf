//! Update fan-out.
//!
//! Delivery is fire-and-forget: callers log a [`NotifyError`] and carry on.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::domain::{Arrival, Coordinate, RouteId, Shuttle, ShuttleId, StopId};
use crate::tracker::TrackerEvent;

/// Position update for one shuttle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShuttleUpdate {
    pub shuttle: ShuttleId,
    pub route: Option<RouteId>,
    pub location: Option<Coordinate>,
    pub speed_kph: Option<f64>,
    pub heading: Option<u16>,
    pub current_stop: Option<StopId>,
    pub next_stop: Option<StopId>,
    pub is_at_stop: bool,
    pub trip_progress: f64,
    pub event: TrackerEvent,
    pub timestamp: DateTime<Utc>,
}

impl ShuttleUpdate {
    pub fn new(shuttle: &Shuttle, event: TrackerEvent, timestamp: DateTime<Utc>) -> Self {
        Self {
            shuttle: shuttle.id.clone(),
            route: shuttle.route.clone(),
            location: shuttle.location,
            speed_kph: shuttle.speed_kph,
            heading: shuttle.heading,
            current_stop: shuttle.current_stop.clone(),
            next_stop: shuttle.next_stop.clone(),
            is_at_stop: shuttle.is_at_stop,
            trip_progress: shuttle.trip_progress,
            event,
            timestamp,
        }
    }
}

/// Events published to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FleetEvent {
    ShuttleUpdate(ShuttleUpdate),
    ArrivalUpdate(Arrival),
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("no subscribers")]
    NoSubscribers,

    #[error("notification channel closed")]
    Closed,
}

/// Publishes fleet events.
pub trait Notifier: Send + Sync {
    fn publish(&self, event: FleetEvent) -> Result<(), NotifyError>;
}

/// Sender for fleet events.
pub type FleetEventSender = broadcast::Sender<FleetEvent>;

/// Notifier backed by a tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: FleetEventSender,
}

impl BroadcastNotifier {
    /// Create a notifier with its own channel. Slow subscribers that fall
    /// more than `capacity` events behind skip ahead.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FleetEvent> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(256)
    }
}

impl Notifier for BroadcastNotifier {
    fn publish(&self, event: FleetEvent) -> Result<(), NotifyError> {
        if self.tx.receiver_count() == 0 {
            return Err(NotifyError::NoSubscribers);
        }
        self.tx.send(event).map(|_| ()).map_err(|_| NotifyError::Closed)
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn publish(&self, _event: FleetEvent) -> Result<(), NotifyError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arrival() -> Arrival {
        Arrival {
            stop: StopId::parse("walb").unwrap(),
            shuttle: ShuttleId::parse("s1").unwrap(),
            eta_secs: 240,
            confidence: 0.8,
            computed_at: Utc::now(),
        }
    }

    #[test]
    fn publish_without_subscribers() {
        let notifier = BroadcastNotifier::default();
        let err = notifier.publish(FleetEvent::ArrivalUpdate(arrival())).unwrap_err();
        assert!(matches!(err, NotifyError::NoSubscribers));
    }

    #[tokio::test]
    async fn subscribers_receive_events() {
        let notifier = BroadcastNotifier::default();
        let mut rx = notifier.subscribe();

        notifier.publish(FleetEvent::ArrivalUpdate(arrival())).unwrap();

        match rx.recv().await.unwrap() {
            FleetEvent::ArrivalUpdate(a) => assert_eq!(a.eta_secs, 240),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn event_json_is_tagged() {
        let json = serde_json::to_value(FleetEvent::ArrivalUpdate(arrival())).unwrap();
        assert_eq!(json["type"], "arrival_update");
        assert_eq!(json["stop"], "walb");
        assert_eq!(json["eta_secs"], 240);

        let shuttle = Shuttle::new(ShuttleId::parse("s1").unwrap(), "Shuttle 1");
        let update = ShuttleUpdate::new(&shuttle, TrackerEvent::InTransit, Utc::now());
        let json = serde_json::to_value(FleetEvent::ShuttleUpdate(update)).unwrap();
        assert_eq!(json["type"], "shuttle_update");
        assert_eq!(json["event"]["event"], "in_transit");
    }
}
