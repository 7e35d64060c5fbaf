//! Computed arrival estimates.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::display::eta_minutes;
use super::ids::{ShuttleId, StopId};

/// The latest ETA of one shuttle at one stop.
///
/// Keyed by `(stop, shuttle)`; every computation cycle replaces the
/// previous record for the key. All arrivals from one cycle for a given
/// shuttle share the same `computed_at`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Arrival {
    pub stop: StopId,
    pub shuttle: ShuttleId,
    pub eta_secs: u32,
    /// Heuristic reliability in [0.3, 1.0].
    pub confidence: f64,
    pub computed_at: DateTime<Utc>,
}

impl Arrival {
    /// Cache key for this arrival.
    pub fn key(&self) -> (StopId, ShuttleId) {
        (self.stop.clone(), self.shuttle.clone())
    }

    /// ETA in whole minutes, rounded up.
    pub fn eta_minutes(&self) -> u32 {
        eta_minutes(self.eta_secs)
    }

    /// Expected arrival instant.
    pub fn expected_at(&self) -> DateTime<Utc> {
        self.computed_at + chrono::Duration::seconds(i64::from(self.eta_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn minutes_and_expected_time() {
        let computed_at = Utc.with_ymd_and_hms(2024, 9, 3, 8, 0, 0).unwrap();
        let arrival = Arrival {
            stop: StopId::parse("clubhouse").unwrap(),
            shuttle: ShuttleId::parse("s1").unwrap(),
            eta_secs: 390,
            confidence: 0.8,
            computed_at,
        };
        assert_eq!(arrival.eta_minutes(), 7);
        assert_eq!(
            arrival.expected_at(),
            Utc.with_ymd_and_hms(2024, 9, 3, 8, 6, 30).unwrap()
        );
        assert_eq!(arrival.key().0.as_str(), "clubhouse");
    }
}
