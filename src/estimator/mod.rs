pub mod position;
pub mod worker;

pub use position::{EstimatorState, PositionEstimator};
pub use worker::{EstimatorWorker, PositionUpdateResponse};

use serde::{Deserialize, Serialize};

use crate::error::{TrackError, TrackResult};
use crate::types::GeoPoint;

/// One unit of work for a position estimator
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum PositionUpdateRequest {
    /// Noisy fix to smooth into the running estimate
    RawFix {
        position: GeoPoint,
        bearing_hint: Option<f64>,
        timestamp_ms: f64,
    },
    /// Deterministic position at fraction `t` between two known track points
    BracketInterpolation {
        source: GeoPoint,
        target: GeoPoint,
        source_bearing: f64,
        target_bearing: f64,
        t: f64,
        timestamp_ms: f64,
    },
}

impl PositionUpdateRequest {
    /// Boundary check applied before a request is handed to an estimator.
    pub fn validate(&self) -> TrackResult<()> {
        match self {
            PositionUpdateRequest::RawFix { position, .. } => position.validate(),
            PositionUpdateRequest::BracketInterpolation {
                source, target, t, ..
            } => {
                source.validate()?;
                target.validate()?;
                if !t.is_finite() || !(0.0..=1.0).contains(t) {
                    return Err(TrackError::InvalidFraction(*t));
                }
                Ok(())
            }
        }
    }

    pub fn timestamp_ms(&self) -> f64 {
        match self {
            PositionUpdateRequest::RawFix { timestamp_ms, .. }
            | PositionUpdateRequest::BracketInterpolation { timestamp_ms, .. } => *timestamp_ms,
        }
    }
}
