//! Telemetry samples.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use super::geo::Coordinate;
use super::ids::ShuttleId;

/// Where a telemetry sample came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PingSource {
    #[default]
    DriverApp,
    DeviceGateway,
    Mock,
}

/// A single location/speed sample for a shuttle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ping {
    pub shuttle: ShuttleId,
    pub ts: DateTime<Utc>,
    pub location: Coordinate,
    pub speed_kph: f64,
    pub heading: Option<u16>,
    pub accuracy_m: Option<f64>,
    pub source: PingSource,
    pub battery_pct: Option<u8>,
}

impl Ping {
    /// Create a sample. Speed must be finite and non-negative.
    pub fn new(
        shuttle: ShuttleId,
        ts: DateTime<Utc>,
        location: Coordinate,
        speed_kph: f64,
    ) -> Result<Self, ValidationError> {
        if !speed_kph.is_finite() || speed_kph < 0.0 {
            return Err(ValidationError::Negative {
                field: "speedKph",
                value: speed_kph,
            });
        }
        Ok(Self {
            shuttle,
            ts,
            location,
            speed_kph,
            heading: None,
            accuracy_m: None,
            source: PingSource::default(),
            battery_pct: None,
        })
    }

    /// Attach a compass heading (0..=359 degrees).
    pub fn with_heading(mut self, heading: u16) -> Result<Self, ValidationError> {
        if heading > 359 {
            return Err(ValidationError::OutOfRange {
                field: "heading",
                value: heading as f64,
            });
        }
        self.heading = Some(heading);
        Ok(self)
    }

    pub fn with_accuracy(mut self, meters: f64) -> Result<Self, ValidationError> {
        if !meters.is_finite() || meters < 0.0 {
            return Err(ValidationError::Negative {
                field: "accuracyM",
                value: meters,
            });
        }
        self.accuracy_m = Some(meters);
        Ok(self)
    }

    pub fn with_battery(mut self, pct: u8) -> Result<Self, ValidationError> {
        if pct > 100 {
            return Err(ValidationError::OutOfRange {
                field: "batteryPct",
                value: pct as f64,
            });
        }
        self.battery_pct = Some(pct);
        Ok(self)
    }

    pub fn with_source(mut self, source: PingSource) -> Self {
        self.source = source;
        self
    }
}
