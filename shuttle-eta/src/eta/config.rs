//! ETA and confidence configuration.

/// Parameters of the confidence heuristic.
///
/// Confidence starts at `base_confidence` and loses a fixed penalty for
/// each risk factor present, then is clamped to
/// `[min_confidence, max_confidence]`.
#[derive(Debug, Clone, PartialEq)]
pub struct EtaConfig {
    pub base_confidence: f64,

    /// Applied when the raw average speed is unreliable.
    pub low_speed_penalty: f64,

    /// Stops more than this many positions ahead are "far".
    pub far_stop_threshold: usize,
    pub far_stop_penalty: f64,

    /// ETAs longer than this (seconds) are "long".
    pub long_eta_threshold_secs: u32,
    pub long_eta_penalty: f64,

    pub min_confidence: f64,
    pub max_confidence: f64,
}

impl Default for EtaConfig {
    fn default() -> Self {
        Self {
            base_confidence: 0.8,
            low_speed_penalty: 0.2,
            far_stop_threshold: 5,
            far_stop_penalty: 0.1,
            long_eta_threshold_secs: 1800, // 30 minutes
            long_eta_penalty: 0.2,
            min_confidence: 0.3,
            max_confidence: 1.0,
        }
    }
}
