//! JSON fleet records and their conversion into domain types.
//!
//! Field names follow the camelCase documents produced by the fleet
//! database. Locations are GeoJSON points (`[lng, lat]`). Optional fields
//! get these defaults:
//!
//! | field                       | default        |
//! |-----------------------------|----------------|
//! | `routeType`                 | `loop`         |
//! | `stopType`                  | `both`         |
//! | `active`                    | `true`         |
//! | `averageLoopTime`           | 1800 seconds   |
//! | `frequency`                 | 15 minutes     |
//! | `operatingHours`            | 07:00 to 22:00 |
//! | shuttle `status`            | `available`    |
//! | shuttle `capacity`          | 40             |
//! | ping `source`               | `driver_app`   |
//!
//! A `0` for `estimatedTimeFromPrevious` or `distanceFromPrevious` means
//! "not modeled" and becomes `None`.

use chrono::{DateTime, NaiveTime, Utc};
use serde::Deserialize;

use crate::domain::{
    Coordinate, Direction, OperatingHours, Ping, PingSource, Route, RouteDirection, RouteId,
    RouteStop, RouteType, Shuttle, ShuttleId, ShuttleStatus, Stop, StopId, StopType,
    ValidationError, DEFAULT_CAPACITY,
};

/// A GeoJSON point.
#[derive(Debug, Clone, Deserialize)]
pub struct GeoPoint {
    /// `[longitude, latitude]`
    pub coordinates: [f64; 2],
}

impl TryFrom<GeoPoint> for Coordinate {
    type Error = ValidationError;

    fn try_from(point: GeoPoint) -> Result<Self, Self::Error> {
        Coordinate::from_lng_lat(point.coordinates)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    pub location: GeoPoint,
}

impl TryFrom<StopRecord> for Stop {
    type Error = ValidationError;

    fn try_from(record: StopRecord) -> Result<Self, Self::Error> {
        Stop::new(
            StopId::parse(record.id)?,
            record.name,
            record.code,
            record.location.try_into()?,
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStopRecord {
    pub stop_id: String,
    pub sequence: u32,
    #[serde(default)]
    pub stop_type: StopType,
    #[serde(default)]
    pub estimated_time_from_previous: Option<u32>,
    #[serde(default)]
    pub distance_from_previous: Option<f64>,
}

impl TryFrom<RouteStopRecord> for RouteStop {
    type Error = ValidationError;

    fn try_from(record: RouteStopRecord) -> Result<Self, Self::Error> {
        let mut stop = RouteStop::new(StopId::parse(record.stop_id)?, record.sequence)
            .with_stop_type(record.stop_type);
        if let Some(secs) = record.estimated_time_from_previous.filter(|&s| s > 0) {
            stop = stop.with_time(secs);
        }
        if let Some(meters) = record.distance_from_previous.filter(|&m| m != 0.0) {
            if !meters.is_finite() || meters < 0.0 {
                return Err(ValidationError::Negative {
                    field: "distanceFromPrevious",
                    value: meters,
                });
            }
            stop = stop.with_distance(meters);
        }
        Ok(stop)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteDirectionRecord {
    pub name: String,
    pub stops: Vec<String>,
}

impl TryFrom<RouteDirectionRecord> for RouteDirection {
    type Error = ValidationError;

    fn try_from(record: RouteDirectionRecord) -> Result<Self, Self::Error> {
        let stops = record
            .stops
            .into_iter()
            .map(StopId::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RouteDirection {
            name: record.name,
            stops,
        })
    }
}

/// Daily window as `"HH:MM"` strings.
#[derive(Debug, Clone, Deserialize)]
pub struct OperatingHoursRecord {
    pub start: String,
    pub end: String,
}

impl TryFrom<OperatingHoursRecord> for OperatingHours {
    type Error = ValidationError;

    fn try_from(record: OperatingHoursRecord) -> Result<Self, Self::Error> {
        Ok(OperatingHours {
            start: parse_time_of_day("operatingHours.start", &record.start)?,
            end: parse_time_of_day("operatingHours.end", &record.end)?,
        })
    }
}

fn parse_time_of_day(field: &'static str, value: &str) -> Result<NaiveTime, ValidationError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|_| ValidationError::TimeOfDay {
        field,
        value: value.to_string(),
    })
}

fn default_route_type() -> RouteType {
    RouteType::Loop
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub long_name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default = "default_route_type")]
    pub route_type: RouteType,
    #[serde(default)]
    pub stops: Vec<RouteStopRecord>,
    #[serde(default)]
    pub directions: Vec<RouteDirectionRecord>,
    /// Seconds.
    #[serde(default)]
    pub average_loop_time: Option<u32>,
    #[serde(default)]
    pub operating_hours: Option<OperatingHoursRecord>,
    /// Minutes between departures.
    #[serde(default)]
    pub frequency: Option<u32>,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl TryFrom<RouteRecord> for Route {
    type Error = ValidationError;

    fn try_from(record: RouteRecord) -> Result<Self, Self::Error> {
        let stops = record
            .stops
            .into_iter()
            .map(RouteStop::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let directions = record
            .directions
            .into_iter()
            .map(RouteDirection::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let mut route = Route::new(RouteId::parse(record.id)?, record.name, record.route_type, stops)?
            .with_directions(directions)
            .with_active(record.active);

        let short_name = record.short_name.unwrap_or_else(|| route.name.clone());
        let long_name = record.long_name.unwrap_or_else(|| route.name.clone());
        route = route.with_display_names(short_name, long_name);

        if let Some(color) = record.color {
            route = route.with_color(color);
        }
        if let Some(secs) = record.average_loop_time.filter(|&s| s > 0) {
            route = route.with_average_loop_time(secs);
        }
        if let Some(hours) = record.operating_hours {
            route = route.with_operating_hours(hours.try_into()?);
        }
        if let Some(mins) = record.frequency.filter(|&m| m > 0) {
            route = route.with_frequency(mins);
        }
        Ok(route)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShuttleRecord {
    pub id: String,
    /// Display label; the id is used when absent.
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub route_id: Option<String>,
    #[serde(default)]
    pub status: ShuttleStatus,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub current_sequence: Option<usize>,
    #[serde(default)]
    pub current_direction: Option<Direction>,
}

impl TryFrom<ShuttleRecord> for Shuttle {
    type Error = ValidationError;

    fn try_from(record: ShuttleRecord) -> Result<Self, Self::Error> {
        let id = ShuttleId::parse(record.id)?;
        let label = record.label.unwrap_or_else(|| id.to_string());
        let mut shuttle = Shuttle::new(id, label);
        shuttle.capacity = record.capacity.unwrap_or(DEFAULT_CAPACITY);
        shuttle.route = record.route_id.map(RouteId::parse).transpose()?;
        shuttle.status = record.status;
        shuttle.location = record.location.map(Coordinate::try_from).transpose()?;
        shuttle.current_sequence = record.current_sequence;
        shuttle.current_direction = record.current_direction;
        Ok(shuttle)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingRecord {
    pub shuttle_id: String,
    pub timestamp: DateTime<Utc>,
    pub location: GeoPoint,
    /// km/h
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub heading: Option<u16>,
    /// Meters.
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub source: PingSource,
    #[serde(default)]
    pub battery: Option<u8>,
}

impl TryFrom<PingRecord> for Ping {
    type Error = ValidationError;

    fn try_from(record: PingRecord) -> Result<Self, Self::Error> {
        let mut ping = Ping::new(
            ShuttleId::parse(record.shuttle_id)?,
            record.timestamp,
            record.location.try_into()?,
            record.speed,
        )?
        .with_source(record.source);
        if let Some(heading) = record.heading {
            ping = ping.with_heading(heading)?;
        }
        if let Some(accuracy) = record.accuracy {
            ping = ping.with_accuracy(accuracy)?;
        }
        if let Some(battery) = record.battery {
            ping = ping.with_battery(battery)?;
        }
        Ok(ping)
    }
}

/// Everything needed to seed a store.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FleetSnapshot {
    #[serde(default)]
    pub stops: Vec<StopRecord>,
    #[serde(default)]
    pub routes: Vec<RouteRecord>,
    #[serde(default)]
    pub shuttles: Vec<ShuttleRecord>,
    #[serde(default)]
    pub pings: Vec<PingRecord>,
}

impl FleetSnapshot {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
