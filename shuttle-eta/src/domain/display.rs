//! Rider-facing formatting of times and distances.

/// ETA in whole minutes, rounded up. `0` seconds is `0` minutes.
///
/// ```
/// use shuttle_eta::domain::eta_minutes;
///
/// assert_eq!(eta_minutes(0), 0);
/// assert_eq!(eta_minutes(1), 1);
/// assert_eq!(eta_minutes(240), 4);
/// assert_eq!(eta_minutes(390), 7);
/// ```
pub fn eta_minutes(secs: u32) -> u32 {
    secs.div_ceil(60)
}

/// Short human label for an ETA, e.g. `"< 1 min"`, `"1 min"`, `"6 mins"`.
pub fn format_eta(secs: u32) -> String {
    if secs < 60 {
        return "< 1 min".to_string();
    }
    let minutes = (f64::from(secs) / 60.0).round() as u32;
    if minutes == 1 {
        "1 min".to_string()
    } else {
        format!("{minutes} mins")
    }
}

/// Short human label for a distance, e.g. `"420m"` or `"1.3km"`.
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{}m", meters.round() as i64)
    } else {
        format!("{:.1}km", meters / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_eta_labels() {
        assert_eq!(format_eta(0), "< 1 min");
        assert_eq!(format_eta(59), "< 1 min");
        assert_eq!(format_eta(60), "1 min");
        assert_eq!(format_eta(89), "1 min");
        assert_eq!(format_eta(90), "2 mins");
        assert_eq!(format_eta(390), "7 mins");
    }

    #[test]
    fn format_distance_labels() {
        assert_eq!(format_distance(0.0), "0m");
        assert_eq!(format_distance(419.6), "420m");
        assert_eq!(format_distance(1000.0), "1.0km");
        assert_eq!(format_distance(1340.0), "1.3km");
    }

    #[test]
    fn minutes_round_up() {
        assert_eq!(eta_minutes(59), 1);
        assert_eq!(eta_minutes(60), 1);
        assert_eq!(eta_minutes(61), 2);
    }
}
