//! Domain types for shuttle tracking.
//!
//! All types enforce their invariants at construction time, so the
//! topology, tracker and ETA code can trust the values they receive.
//! Untyped records from the outside world are converted in
//! [`crate::store::snapshot`].

mod arrival;
mod display;
mod error;
mod geo;
mod ids;
mod ping;
mod route;
mod shuttle;
mod stop;

pub use arrival::Arrival;
pub use display::{eta_minutes, format_distance, format_eta};
pub use error::ValidationError;
pub use geo::{Coordinate, EARTH_RADIUS_M};
pub use ids::{InvalidId, RouteId, ShuttleId, StopId};
pub use ping::{Ping, PingSource};
pub use route::{
    DEFAULT_AVERAGE_LOOP_TIME_SECS, DEFAULT_FREQUENCY_MINS, Direction, OperatingHours, Route,
    RouteDirection, RouteStop, RouteType, StopType,
};
pub use shuttle::{DEFAULT_CAPACITY, Shuttle, ShuttleStatus};
pub use stop::Stop;
