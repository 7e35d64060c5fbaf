//! Aggregate configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::eta::EtaConfig;
use crate::speed::SpeedConfig;
use crate::store::StoreConfig;
use crate::topology::TopologyConfig;
use crate::tracker::TrackerConfig;
use crate::worker::WorkerConfig;

/// Path to the JSON fleet snapshot to load at startup.
pub const SNAPSHOT_VAR: &str = "SHUTTLE_SNAPSHOT";
/// Seconds between ETA cycles.
pub const INTERVAL_VAR: &str = "ETA_INTERVAL_SECS";
/// Fallback time for a segment with no modeled timing.
pub const FALLBACK_SEGMENT_VAR: &str = "ETA_FALLBACK_SEGMENT_SECS";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid value for {var}: {value:?} ({reason})")]
pub struct ConfigError {
    var: &'static str,
    value: String,
    reason: &'static str,
}

/// Everything the service and worker need.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub snapshot: Option<PathBuf>,
    pub topology: TopologyConfig,
    pub tracker: TrackerConfig,
    pub speed: SpeedConfig,
    pub eta: EtaConfig,
    pub cache: CacheConfig,
    pub store: StoreConfig,
    pub worker: WorkerConfig,
}

impl Config {
    /// Defaults overridden by environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = lookup(SNAPSHOT_VAR).filter(|p| !p.trim().is_empty()) {
            config.snapshot = Some(PathBuf::from(path));
        }
        if let Some(value) = lookup(INTERVAL_VAR) {
            let secs = parse_positive(INTERVAL_VAR, &value)?;
            config.worker.interval = Duration::from_secs(u64::from(secs));
        }
        if let Some(value) = lookup(FALLBACK_SEGMENT_VAR) {
            config.topology.fallback_segment_secs = parse_positive(FALLBACK_SEGMENT_VAR, &value)?;
        }
        Ok(config)
    }
}

fn parse_positive(var: &'static str, value: &str) -> Result<u32, ConfigError> {
    let error = |reason: &'static str| ConfigError {
        var,
        value: value.to_string(),
        reason,
    };
    match value.trim().parse::<u32>() {
        Ok(0) => Err(error("must be greater than zero")),
        Ok(n) => Ok(n),
        Err(_) => Err(error("not a whole number")),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert!(config.snapshot.is_none());
        assert_eq!(config.worker.interval, Duration::from_secs(15));
        assert_eq!(config.topology.fallback_segment_secs, 120);
    }

    #[test]
    fn overrides() {
        let config = Config::from_lookup(lookup(&[
            (SNAPSHOT_VAR, "/var/lib/shuttle/fleet.json"),
            (INTERVAL_VAR, "30"),
            (FALLBACK_SEGMENT_VAR, " 60 "),
        ]))
        .unwrap();
        assert_eq!(config.snapshot, Some(PathBuf::from("/var/lib/shuttle/fleet.json")));
        assert_eq!(config.worker.interval, Duration::from_secs(30));
        assert_eq!(config.topology.fallback_segment_secs, 60);
    }

    #[test]
    fn malformed_values_rejected() {
        let err = Config::from_lookup(lookup(&[(INTERVAL_VAR, "soon")])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid value for ETA_INTERVAL_SECS: \"soon\" (not a whole number)"
        );

        let err = Config::from_lookup(lookup(&[(FALLBACK_SEGMENT_VAR, "0")])).unwrap_err();
        assert!(err.to_string().contains("greater than zero"));
    }
}
