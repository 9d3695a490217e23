//! Linear algebra aliases for the smoothing core
//!
//! Mercator-space kinematics are planar 2-vectors; slerp works on unit
//! 3-vectors on the sphere.

use nalgebra::{Vector2, Vector3};

/// Position / velocity / acceleration in normalized Mercator units.
pub type MercatorVec = Vector2<f64>;

/// Unit vector on the sphere (x toward lng 0, z toward the north pole).
pub type SphereVec = Vector3<f64>;
