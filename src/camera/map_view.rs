//! Boundary to the external map renderer.

use serde::Serialize;

use crate::geo_math::normalize_bearing;
use crate::types::GeoPoint;

/// Camera move request; `duration_ms == 0` applies immediately
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct EaseOptions {
    pub center: GeoPoint,
    /// May be unwrapped outside [0, 360) so the renderer rotates the short way
    pub bearing: f64,
    pub pitch: f64,
    pub duration_ms: f64,
}

/// Capabilities the core consumes from a map view
pub trait MapView {
    fn center(&self) -> GeoPoint;
    /// `None` while the view has not reported a zoom yet
    fn zoom(&self) -> Option<f64>;
    /// Degrees in [0, 360)
    fn bearing(&self) -> f64;
    fn ease_to(&mut self, options: EaseOptions);
}

/// In-memory view that applies every move instantly and keeps a history.
/// Backs the demo binary and tests. Bearings are stored normalized, the
/// way a renderer reports them after an unwrapped ease.
#[derive(Clone, Debug)]
pub struct HeadlessMapView {
    center: GeoPoint,
    zoom: Option<f64>,
    bearing: f64,
    history: Vec<EaseOptions>,
}

impl HeadlessMapView {
    pub fn new(center: GeoPoint, zoom: Option<f64>) -> Self {
        Self {
            center,
            zoom,
            bearing: 0.0,
            history: Vec::new(),
        }
    }

    pub fn set_zoom(&mut self, zoom: Option<f64>) {
        self.zoom = zoom;
    }

    pub fn history(&self) -> &[EaseOptions] {
        &self.history
    }

    pub fn last_ease(&self) -> Option<&EaseOptions> {
        self.history.last()
    }
}

impl MapView for HeadlessMapView {
    fn center(&self) -> GeoPoint {
        self.center
    }

    fn zoom(&self) -> Option<f64> {
        self.zoom
    }

    fn bearing(&self) -> f64 {
        self.bearing
    }

    fn ease_to(&mut self, options: EaseOptions) {
        self.center = options.center;
        self.bearing = normalize_bearing(options.bearing);
        self.history.push(options);
    }
}
