//! Domain validation errors.
//!
//! These are raised while turning boundary records into domain types.
//! Anything that reaches the topology, tracker or ETA code has already
//! passed these checks.

use super::ids::InvalidId;

/// Validation failures for incoming records.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Malformed identifier
    #[error(transparent)]
    Id(#[from] InvalidId),

    /// Latitude outside [-90, 90] or not finite
    #[error("latitude out of range: {0}")]
    Latitude(f64),

    /// Longitude outside [-180, 180] or not finite
    #[error("longitude out of range: {0}")]
    Longitude(f64),

    /// A required text field was empty
    #[error("{0} cannot be empty")]
    EmptyField(&'static str),

    /// A numeric field was negative or not finite
    #[error("{field} must be a non-negative number, got {value}")]
    Negative { field: &'static str, value: f64 },

    /// A numeric field was outside its allowed range
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },

    /// Route stop sequence numbers are not exactly 0..N-1
    #[error("route {route} stop sequence must be contiguous from 0, found gap or duplicate at {sequence}")]
    NonContiguousSequence { route: String, sequence: u32 },

    /// A time-of-day field was not HH:MM
    #[error("invalid time of day for {field}: {value}")]
    TimeOfDay { field: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ValidationError::Latitude(95.0);
        assert_eq!(err.to_string(), "latitude out of range: 95");

        let err = ValidationError::EmptyField("stop name");
        assert_eq!(err.to_string(), "stop name cannot be empty");

        let err = ValidationError::Negative {
            field: "speed",
            value: -3.0,
        };
        assert_eq!(err.to_string(), "speed must be a non-negative number, got -3");

        let err = ValidationError::NonContiguousSequence {
            route: "loop".into(),
            sequence: 2,
        };
        assert!(err.to_string().contains("contiguous"));

        let err = ValidationError::TimeOfDay {
            field: "operatingHours.start",
            value: "7am".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid time of day for operatingHours.start: 7am"
        );
    }
}
