//! Physics-based position smoother.
//!
//! Two update paths share one state record:
//!   - raw fixes are exponentially smoothed (position, velocity, bearing)
//!     with acceleration and speed clamps,
//!   - bracket interpolation overwrites position/bearing with a slerp between
//!     two known track points and leaves the kinematic history alone.
//!
//! Mixing both paths in one playback leaves a velocity discontinuity at the
//! switch; that is expected.

use log::{debug, warn};

use crate::config::EstimatorConfig;
use crate::error::TrackResult;
use crate::estimator::PositionUpdateRequest;
use crate::geo_math::{
    haversine_distance, initial_bearing, interpolate_bearing, normalize_bearing,
    shortest_bearing_delta, slerp, to_mercator,
};
use crate::types::{GeoPoint, MercatorVec, Pose};

#[derive(Clone, Debug, PartialEq)]
pub struct EstimatorState {
    pub position: GeoPoint,
    /// Mercator units per second
    pub velocity: MercatorVec,
    /// Mercator units per second², magnitude-clamped
    pub acceleration: MercatorVec,
    pub bearing: f64,
    pub speed: f64,
    pub last_timestamp_ms: f64,
    pub last_valid_bearing: f64,
}

impl EstimatorState {
    fn seeded(position: GeoPoint, bearing: f64, timestamp_ms: f64) -> Self {
        Self {
            position,
            velocity: MercatorVec::zeros(),
            acceleration: MercatorVec::zeros(),
            bearing,
            speed: 0.0,
            last_timestamp_ms: timestamp_ms,
            last_valid_bearing: bearing,
        }
    }

    fn pose(&self) -> Pose {
        Pose {
            position: self.position,
            bearing: self.bearing,
            speed: self.speed,
            timestamp_ms: self.last_timestamp_ms,
        }
    }
}

pub struct PositionEstimator {
    config: EstimatorConfig,
    state: Option<EstimatorState>,
    absorbed_fixes: u64,
}

impl PositionEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self {
            config,
            state: None,
            absorbed_fixes: 0,
        }
    }

    /// Dispatches a tagged request to the matching update path.
    pub fn apply(&mut self, request: &PositionUpdateRequest) -> TrackResult<Pose> {
        match *request {
            PositionUpdateRequest::RawFix {
                position,
                bearing_hint,
                timestamp_ms,
            } => self.ingest_fix(position, bearing_hint, timestamp_ms),
            PositionUpdateRequest::BracketInterpolation {
                source,
                target,
                source_bearing,
                target_bearing,
                t,
                timestamp_ms,
            } => Ok(self.ingest_interpolation(
                source,
                target,
                source_bearing,
                target_bearing,
                t,
                timestamp_ms,
            )),
        }
    }

    /// Smooths a raw fix into the running estimate.
    ///
    /// The first fix seeds the state unsmoothed. Fixes whose timestamp does
    /// not advance are absorbed and the previous pose is returned. Invalid
    /// coordinates are rejected before they touch the state.
    pub fn ingest_fix(
        &mut self,
        raw: GeoPoint,
        bearing_hint: Option<f64>,
        timestamp_ms: f64,
    ) -> TrackResult<Pose> {
        let raw = GeoPoint::try_new(raw.lng, raw.lat).map_err(|e| {
            warn!("Rejected fix: {}", e);
            e
        })?;
        let cfg = &self.config;
        let state = match self.state.as_mut() {
            None => {
                let bearing = normalize_bearing(bearing_hint.unwrap_or(0.0));
                let seeded = EstimatorState::seeded(raw, bearing, timestamp_ms);
                let pose = seeded.pose();
                self.state = Some(seeded);
                return Ok(pose);
            }
            Some(state) => state,
        };

        let dt = (timestamp_ms - state.last_timestamp_ms) / 1000.0;
        if dt <= 0.0 || !dt.is_finite() {
            self.absorbed_fixes += 1;
            debug!(
                "Absorbed fix at {:.0}ms (last {:.0}ms)",
                timestamp_ms, state.last_timestamp_ms
            );
            return Ok(state.pose());
        }

        let last = state.position;
        let distance = haversine_distance(&last, &raw);

        let target_bearing = if distance > cfg.min_speed_threshold {
            let b = initial_bearing(&last, &raw);
            state.last_valid_bearing = b;
            b
        } else {
            state.last_valid_bearing
        };

        // Mercator velocity, exponentially smoothed
        let merc_old = to_mercator(last.lng, last.lat).to_vec();
        let merc_new = to_mercator(raw.lng, raw.lat).to_vec();
        let v_target = (merc_new - merc_old) / dt;
        let v_old = state.velocity;
        let v_new = v_old + (v_target - v_old) * cfg.speed_smoothing;

        let mut accel = (v_new - v_old) / dt;
        let accel_mag = accel.norm();
        if accel_mag > cfg.max_acceleration {
            accel *= cfg.max_acceleration / accel_mag;
        }
        state.velocity = v_new;
        state.acceleration = accel;

        let diff = shortest_bearing_delta(state.bearing, target_bearing);
        state.bearing = normalize_bearing(state.bearing + diff * cfg.bearing_smoothing);

        state.speed = (distance / dt).min(cfg.max_speed);

        let k = cfg.position_smoothing;
        state.position = GeoPoint::new(
            last.lng + (raw.lng - last.lng) * k,
            last.lat + (raw.lat - last.lat) * k,
        );
        state.last_timestamp_ms = timestamp_ms;

        Ok(state.pose())
    }

    /// Places the estimate at fraction `t` between two bracketing points.
    ///
    /// Only position, bearing and the timestamp are written.
    pub fn ingest_interpolation(
        &mut self,
        source: GeoPoint,
        target: GeoPoint,
        source_bearing: f64,
        target_bearing: f64,
        t: f64,
        timestamp_ms: f64,
    ) -> Pose {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        let position = slerp(&source, &target, t);
        let bearing = interpolate_bearing(source_bearing, target_bearing, t);

        match self.state.as_mut() {
            None => {
                let seeded = EstimatorState::seeded(position, bearing, timestamp_ms);
                let pose = seeded.pose();
                self.state = Some(seeded);
                pose
            }
            Some(state) => {
                state.position = position;
                state.bearing = bearing;
                state.last_timestamp_ms = timestamp_ms;
                state.pose()
            }
        }
    }

    /// Drops all history; the next update seeds again.
    pub fn reset(&mut self) {
        self.state = None;
    }

    pub fn current_pose(&self) -> Option<Pose> {
        self.state.as_ref().map(EstimatorState::pose)
    }

    pub fn state(&self) -> Option<&EstimatorState> {
        self.state.as_ref()
    }

    pub fn velocity(&self) -> Option<MercatorVec> {
        self.state.as_ref().map(|s| s.velocity)
    }

    pub fn acceleration(&self) -> Option<MercatorVec> {
        self.state.as_ref().map(|s| s.acceleration)
    }

    pub fn is_seeded(&self) -> bool {
        self.state.is_some()
    }

    /// Fixes ignored because their timestamp did not advance
    pub fn absorbed_fixes(&self) -> u64 {
        self.absorbed_fixes
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }
}

impl Default for PositionEstimator {
    fn default() -> Self {
        Self::new(EstimatorConfig::default())
    }
}
