//! Topology configuration.

/// Fallback travel time for a segment with no modeled timing, in seconds.
///
/// Two different values have been in use for this: the arrival computation
/// filled gaps with 120s while the live "which shuttle reaches my stop"
/// query filled them with 60s. Both now read this one setting.
pub const DEFAULT_FALLBACK_SEGMENT_SECS: u32 = 120;

/// Configuration for route topology calculations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyConfig {
    /// Seconds assumed for a segment with no `time_from_previous`
    /// (and, where distance is also unusable, no distance either).
    pub fallback_segment_secs: u32,
}

impl TopologyConfig {
    pub fn new(fallback_segment_secs: u32) -> Self {
        Self {
            fallback_segment_secs,
        }
    }
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self::new(DEFAULT_FALLBACK_SEGMENT_SECS)
    }
}
