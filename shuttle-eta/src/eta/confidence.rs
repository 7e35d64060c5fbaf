//! Confidence scoring for ETAs.

use crate::speed::SpeedEstimate;

use super::config::EtaConfig;

/// Score the reliability of one ETA.
///
/// `stops_ahead` is how many positions along the direction of travel the
/// target lies from the shuttle's current sequence index (negative for
/// stops reached by wrapping around a loop).
pub fn confidence(config: &EtaConfig, eta_secs: u32, speed: &SpeedEstimate, stops_ahead: i64) -> f64 {
    let mut score = config.base_confidence;

    if !speed.reliable {
        score -= config.low_speed_penalty;
    }
    if stops_ahead > config.far_stop_threshold as i64 {
        score -= config.far_stop_penalty;
    }
    if eta_secs > config.long_eta_threshold_secs {
        score -= config.long_eta_penalty;
    }

    score.clamp(config.min_confidence, config.max_confidence)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn speed(reliable: bool) -> SpeedEstimate {
        SpeedEstimate {
            raw_kph: if reliable { 25.0 } else { 0.0 },
            effective_kph: if reliable { 25.0 } else { 20.0 },
            reliable,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn base_confidence() {
        let c = confidence(&EtaConfig::default(), 240, &speed(true), 1);
        assert!(approx(c, 0.8));
    }

    #[test]
    fn low_speed_penalty() {
        let c = confidence(&EtaConfig::default(), 240, &speed(false), 1);
        assert!(approx(c, 0.6));
    }

    #[test]
    fn far_stop_penalty_is_strictly_more_than_five() {
        let config = EtaConfig::default();
        assert!(approx(confidence(&config, 240, &speed(true), 5), 0.8));
        assert!(approx(confidence(&config, 240, &speed(true), 6), 0.7));
    }

    #[test]
    fn long_eta_penalty_is_strictly_more_than_1800() {
        let config = EtaConfig::default();
        assert!(approx(confidence(&config, 1800, &speed(true), 0), 0.8));
        assert!(approx(confidence(&config, 1801, &speed(true), 0), 0.6));
    }

    #[test]
    fn all_penalties_hit_the_floor() {
        let c = confidence(&EtaConfig::default(), 4000, &speed(false), 9);
        assert!(approx(c, 0.3));
    }

    #[test]
    fn wrapped_stops_are_not_far() {
        let c = confidence(&EtaConfig::default(), 240, &speed(true), -7);
        assert!(approx(c, 0.8));
    }

    #[test]
    fn clamped_to_max() {
        let config = EtaConfig {
            base_confidence: 1.4,
            ..EtaConfig::default()
        };
        assert_eq!(confidence(&config, 0, &speed(true), 0), 1.0);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn always_within_bounds(
            eta in any::<u32>(),
            raw in 0.0f64..120.0,
            stops_ahead in -50i64..50,
        ) {
            let speed = crate::speed::SpeedEstimator::default().floor(raw);
            let c = confidence(&EtaConfig::default(), eta, &speed, stops_ahead);
            prop_assert!((0.3..=1.0).contains(&c), "confidence {} out of range", c);
        }
    }
}
