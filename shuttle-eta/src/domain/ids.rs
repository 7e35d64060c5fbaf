//! Entity identifiers.
//!
//! Stops, routes and shuttles are referenced by opaque string identifiers
//! everywhere in the system. The only structural requirement is that an
//! identifier is non-empty and made of ASCII alphanumerics, `-` or `_`
//! (this covers both database object ids and human-assigned slugs).

use std::fmt;

use serde::Serialize;

/// Error returned when parsing an invalid identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} id: {reason}")]
pub struct InvalidId {
    kind: &'static str,
    reason: &'static str,
}

fn validate(kind: &'static str, s: &str) -> Result<(), InvalidId> {
    if s.is_empty() {
        return Err(InvalidId {
            kind,
            reason: "cannot be empty",
        });
    }
    if !s
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        return Err(InvalidId {
            kind,
            reason: "must contain only ASCII letters, digits, '-' or '_'",
        });
    }
    Ok(())
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Parse an identifier, rejecting empty or malformed input.
            pub fn parse(s: impl Into<String>) -> Result<Self, InvalidId> {
                let s = s.into();
                validate($kind, &s)?;
                Ok(Self(s))
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

entity_id!(
    /// Identifier of a physical stop.
    ///
    /// ```
    /// use shuttle_eta::domain::StopId;
    ///
    /// let walb = StopId::parse("walb").unwrap();
    /// assert_eq!(walb.as_str(), "walb");
    /// assert!(StopId::parse("").is_err());
    /// ```
    StopId,
    "stop"
);

entity_id!(
    /// Identifier of a route.
    RouteId,
    "route"
);

entity_id!(
    /// Identifier of a shuttle vehicle.
    ShuttleId,
    "shuttle"
);
