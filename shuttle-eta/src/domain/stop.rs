//! Physical stops.

use serde::Serialize;

use super::error::ValidationError;
use super::geo::Coordinate;
use super::ids::StopId;

/// A physical stop. Immutable after creation; referenced by id elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stop {
    pub id: StopId,
    pub name: String,
    /// Short rider-facing code, if assigned.
    pub code: Option<String>,
    pub location: Coordinate,
}

impl Stop {
    /// Create a stop. The name must not be blank.
    pub fn new(
        id: StopId,
        name: impl Into<String>,
        code: Option<String>,
        location: Coordinate,
    ) -> Result<Self, ValidationError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::EmptyField("stop name"));
        }
        let code = code
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        Ok(Self {
            id,
            name,
            code,
            location,
        })
    }
}
