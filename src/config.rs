use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{TrackError, TrackResult};

// ─── Estimator ───────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Below this displacement (m) the last valid bearing is kept
    pub min_speed_threshold: f64,
    pub speed_smoothing: f64,
    pub max_acceleration: f64,
    pub bearing_smoothing: f64,
    /// m/s
    pub max_speed: f64,
    pub position_smoothing: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            min_speed_threshold: 0.1,
            speed_smoothing: 0.8,
            max_acceleration: 3.0,
            bearing_smoothing: 0.75,
            max_speed: 55.0,
            position_smoothing: 0.85,
        }
    }
}

// ─── Camera ──────────────────────────────────────────────────────────────────

/// What the camera's speed normalization is measured against
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpeedBasis {
    /// Playback speed multiplier, normalized as min(mult, cap) / cap
    PlaybackMultiplier { cap: f64 },
    /// Vehicle speed in m/s, normalized as min(speed, max) / max
    Physical { max_speed_mps: f64 },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub pitch: f64,
    pub min_altitude: f64,
    pub max_altitude: f64,
    pub speed_basis: SpeedBasis,
    pub base_transition_ms: f64,
    pub min_transition_ms: f64,
    pub max_transition_ms: f64,
    pub default_zoom: f64,
    /// 1.0 is critical damping
    pub damping_ratio: f64,
    /// Natural frequency (rad/s) of the per-frame follow spring
    pub spring_frequency: f64,
    pub adaptive_pitch: bool,
    pub high_speed_pitch: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            pitch: 60.0,
            min_altitude: 200.0,
            max_altitude: 1000.0,
            speed_basis: SpeedBasis::PlaybackMultiplier { cap: 4.0 },
            base_transition_ms: 1000.0,
            min_transition_ms: 100.0,
            max_transition_ms: 1000.0,
            default_zoom: 16.0,
            damping_ratio: 1.0,
            spring_frequency: 8.0,
            adaptive_pitch: false,
            high_speed_pitch: 45.0,
        }
    }
}

// ─── Quality ─────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    pub window_size: usize,
    /// Downgrade when average fps falls below this
    pub downgrade_fps: f64,
    /// A single frame slower than this forces a downgrade
    pub critical_frame_ms: f64,
    /// Upgrade when average fps exceeds this...
    pub upgrade_fps: f64,
    /// ...and the average frame stays under this
    pub warning_frame_ms: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            window_size: 60,
            downgrade_fps: 30.0,
            critical_frame_ms: 100.0,
            upgrade_fps: 55.0,
            warning_frame_ms: 16.0,
        }
    }
}

// ─── Frame driver ────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    pub target_fps: f64,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self { target_fps: 60.0 }
    }
}

// ─── Aggregate ───────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowConfig {
    pub estimator: EstimatorConfig,
    pub camera: CameraConfig,
    pub quality: QualityConfig,
    pub frame: FrameConfig,
}

impl FollowConfig {
    /// Parses a JSON document; missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> TrackResult<Self> {
        serde_json::from_str(json).map_err(|e| TrackError::Config(e.to_string()))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> TrackResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| TrackError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }
}
