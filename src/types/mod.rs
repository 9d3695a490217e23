pub mod linalg;

pub use linalg::*;

use serde::{Deserialize, Serialize};

use crate::error::{TrackError, TrackResult};

/// Latitude band where Web Mercator stays finite.
pub const MAX_MERCATOR_LAT: f64 = 85.0511;

/// WGS84 position in degrees
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lng: f64,
    pub lat: f64,
}

impl GeoPoint {
    /// Builds a point, clamping latitude into the Mercator band.
    pub fn new(lng: f64, lat: f64) -> Self {
        GeoPoint {
            lng,
            lat: lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT),
        }
    }

    /// Boundary constructor: rejects non-finite components and latitudes
    /// outside [-90, 90]. Polar latitudes are clamped into the Mercator band.
    pub fn try_new(lng: f64, lat: f64) -> TrackResult<Self> {
        if !lng.is_finite() || !lat.is_finite() || lat.abs() > 90.0 {
            return Err(TrackError::InvalidCoordinate { lng, lat });
        }
        Ok(Self::new(lng, lat))
    }

    pub fn validate(&self) -> TrackResult<()> {
        Self::try_new(self.lng, self.lat).map(|_| ())
    }
}

/// Projected position, only used for planar velocity math
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MercatorPoint {
    pub x: f64,
    pub y: f64,
}

impl MercatorPoint {
    pub fn to_vec(self) -> MercatorVec {
        MercatorVec::new(self.x, self.y)
    }
}

/// Immutable per-frame snapshot of the tracked vehicle
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: GeoPoint,
    /// Degrees in [0, 360)
    pub bearing: f64,
    /// m/s
    pub speed: f64,
    /// Monotonic milliseconds
    pub timestamp_ms: f64,
}

/// One point of a loaded track
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub position: GeoPoint,
    pub bearing: f64,
    pub timestamp_ms: i64,
}

/// Record handed over by an importer; bearing is optional
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub lng: f64,
    pub lat: f64,
    pub timestamp_ms: i64,
    #[serde(default)]
    pub bearing: Option<f64>,
}

impl TrackRecord {
    pub fn new(lng: f64, lat: f64, timestamp_ms: i64) -> Self {
        Self {
            lng,
            lat,
            timestamp_ms,
            bearing: None,
        }
    }

    pub fn with_bearing(mut self, bearing: f64) -> Self {
        self.bearing = Some(bearing);
        self
    }
}
