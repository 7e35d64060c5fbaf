//! Representative speed from recent telemetry.

use serde::Serialize;

use crate::domain::Ping;

/// Configuration for speed estimation.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedConfig {
    /// How many of the most recent samples to consider.
    pub sample_window: usize,

    /// Averages below this (km/h) are considered unreliable.
    pub min_reliable_kph: f64,

    /// Substituted for unreliable averages in distance-based math (km/h).
    pub default_cruise_kph: f64,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            sample_window: 10,
            min_reliable_kph: 5.0,
            default_cruise_kph: 20.0,
        }
    }
}

/// A speed estimate: the raw rolling average and the value to use for
/// distance-based ETA math.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpeedEstimate {
    /// Average of recent positive samples, 0 if there were none.
    pub raw_kph: f64,
    /// `raw_kph` if reliable, otherwise the default cruising speed.
    pub effective_kph: f64,
    pub reliable: bool,
}

impl SpeedEstimate {
    /// Effective speed in meters per second.
    pub fn effective_mps(&self) -> f64 {
        self.effective_kph * 1000.0 / 3600.0
    }
}

/// Derives a shuttle's representative speed from its recent pings.
#[derive(Debug, Clone, Default)]
pub struct SpeedEstimator {
    config: SpeedConfig,
}

impl SpeedEstimator {
    pub fn new(config: SpeedConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SpeedConfig {
        &self.config
    }

    /// Average positive speed over the most recent `sample_window` samples.
    ///
    /// `samples` may be in any order. Non-positive speeds are discarded
    /// after the window is taken, so a stationary stretch lowers the sample
    /// count rather than the average.
    pub fn average_speed(&self, samples: &[Ping]) -> f64 {
        let mut recent: Vec<&Ping> = samples.iter().collect();
        recent.sort_by(|a, b| b.ts.cmp(&a.ts));

        let speeds: Vec<f64> = recent
            .into_iter()
            .take(self.config.sample_window)
            .map(|p| p.speed_kph)
            .filter(|&s| s > 0.0)
            .collect();

        if speeds.is_empty() {
            return 0.0;
        }
        speeds.iter().sum::<f64>() / speeds.len() as f64
    }

    /// Apply the reliability floor to a raw average.
    pub fn floor(&self, raw_kph: f64) -> SpeedEstimate {
        let reliable = raw_kph >= self.config.min_reliable_kph;
        SpeedEstimate {
            raw_kph,
            effective_kph: if reliable {
                raw_kph
            } else {
                self.config.default_cruise_kph
            },
            reliable,
        }
    }

    /// Average and floor in one step.
    pub fn estimate(&self, samples: &[Ping]) -> SpeedEstimate {
        self.floor(self.average_speed(samples))
    }
}
