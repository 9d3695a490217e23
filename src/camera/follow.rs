//! Third-person follow camera.
//!
//! The offset is captured once when the lock engages and reused until the
//! next engage. Poses arrive as plain arguments; the controller never looks
//! anything up on its own.

use std::f64::consts::PI;

use log::{debug, info};

use crate::camera::map_view::{EaseOptions, MapView};
use crate::camera::spring::DampedSpring;
use crate::config::{CameraConfig, SpeedBasis};
use crate::geo_math::{normalize_bearing, shortest_bearing_delta};
use crate::types::{GeoPoint, Pose};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraOffset {
    pub dx: f64,
    pub dy: f64,
    pub zoom_at_capture: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CameraState {
    pub is_locked: bool,
    pub offset: Option<CameraOffset>,
    pub pitch: f64,
    pub damping_ratio: f64,
    pub last_update_ms: Option<f64>,
}

/// Where the camera should look for a given vehicle pose
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraTarget {
    pub center: GeoPoint,
    pub bearing: f64,
    pub pitch: f64,
}

/// Speed-dependent camera parameters
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpeedProfile {
    /// 0 at rest, 1 at or above the configured cap
    pub normalized: f64,
    pub altitude: f64,
    pub pitch: f64,
    pub transition_ms: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FollowMode {
    /// Renderer animates toward the target over the speed-scaled duration
    Eased,
    /// Spring-smoothed pose applied with zero duration every frame
    Immediate,
}

/// Camera move actually issued to the map view
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraMove {
    pub ease: EaseOptions,
    pub altitude: f64,
}

struct FollowSprings {
    lng: DampedSpring,
    lat: DampedSpring,
    bearing: DampedSpring,
}

pub struct CameraFollowController {
    config: CameraConfig,
    state: CameraState,
    springs: Option<FollowSprings>,
}

impl CameraFollowController {
    pub fn new(config: CameraConfig) -> Self {
        let state = CameraState {
            is_locked: false,
            offset: None,
            pitch: config.pitch,
            damping_ratio: config.damping_ratio,
            last_update_ms: None,
        };
        Self {
            config,
            state,
            springs: None,
        }
    }

    pub fn state(&self) -> &CameraState {
        &self.state
    }

    pub fn is_locked(&self) -> bool {
        self.state.is_locked
    }

    /// Locks onto the vehicle, capturing the current center offset.
    pub fn engage(&mut self, current_center: GeoPoint, vehicle: GeoPoint, current_zoom: Option<f64>) {
        let zoom = current_zoom.unwrap_or(self.config.default_zoom);
        self.state.offset = Some(CameraOffset {
            dx: current_center.lng - vehicle.lng,
            dy: current_center.lat - vehicle.lat,
            zoom_at_capture: zoom,
        });
        self.state.is_locked = true;
        self.state.last_update_ms = None;
        self.springs = None;
        info!("Camera locked at zoom {:.2}", zoom);
    }

    /// Releases the lock; the captured offset is kept.
    pub fn disengage(&mut self) {
        self.state.is_locked = false;
        self.springs = None;
        info!("Camera unlocked");
    }

    /// Target pose behind the vehicle, rotated so travel points up-screen.
    ///
    /// `None` when unlocked or when no vehicle pose exists yet.
    pub fn compute_target_pose(&self, vehicle: Option<&Pose>, current_zoom: Option<f64>) -> Option<CameraTarget> {
        if !self.state.is_locked {
            return None;
        }
        let vehicle = vehicle?;
        let offset = self.state.offset?;
        let zoom = current_zoom.unwrap_or(self.config.default_zoom);

        let rad = (vehicle.bearing - 90.0) * PI / 180.0;
        let distance = 2f64.powf(20.0 - zoom) * offset.zoom_at_capture;
        let center = GeoPoint::new(
            vehicle.position.lng + rad.cos() * distance,
            vehicle.position.lat + rad.sin() * distance,
        );

        Some(CameraTarget {
            center,
            bearing: vehicle.bearing,
            pitch: self.state.pitch,
        })
    }

    /// Altitude, pitch and transition duration for the current speed.
    pub fn speed_profile(&self, vehicle_speed: f64, speed_multiplier: f64) -> SpeedProfile {
        let cfg = &self.config;
        let normalized = match cfg.speed_basis {
            SpeedBasis::PlaybackMultiplier { cap } => normalize_against(speed_multiplier, cap),
            SpeedBasis::Physical { max_speed_mps } => normalize_against(vehicle_speed, max_speed_mps),
        };
        let altitude = cfg.min_altitude + (cfg.max_altitude - cfg.min_altitude) * normalized;
        let pitch = if cfg.adaptive_pitch {
            cfg.pitch + (cfg.high_speed_pitch - cfg.pitch) * normalized
        } else {
            cfg.pitch
        };
        SpeedProfile {
            normalized,
            altitude,
            pitch,
            transition_ms: self.transition_duration_ms(speed_multiplier),
        }
    }

    /// Faster playback gets a snappier camera.
    pub fn transition_duration_ms(&self, speed_multiplier: f64) -> f64 {
        let cfg = &self.config;
        let mult = if speed_multiplier > 0.0 { speed_multiplier } else { 1.0 };
        (cfg.base_transition_ms / mult).clamp(cfg.min_transition_ms, cfg.max_transition_ms)
    }

    /// Per-frame follow step.
    ///
    /// Does nothing when unlocked, without a pose, or when less than
    /// `min_interval_ms` has passed since the previous move.
    pub fn follow(
        &mut self,
        vehicle: Option<&Pose>,
        speed_multiplier: f64,
        now_ms: f64,
        min_interval_ms: f64,
        mode: FollowMode,
        view: &mut dyn MapView,
    ) -> Option<CameraMove> {
        if let Some(last) = self.state.last_update_ms {
            if now_ms - last < min_interval_ms {
                return None;
            }
        }
        let vehicle_speed = vehicle.map(|p| p.speed).unwrap_or(0.0);
        let profile = self.speed_profile(vehicle_speed, speed_multiplier);
        self.state.pitch = profile.pitch;

        let target = self.compute_target_pose(vehicle, view.zoom())?;
        let current_bearing = view.bearing();
        // unwrapped so the renderer turns the short way
        let bearing = current_bearing + shortest_bearing_delta(current_bearing, target.bearing);

        let ease = match mode {
            FollowMode::Eased => EaseOptions {
                center: target.center,
                bearing,
                pitch: target.pitch,
                duration_ms: profile.transition_ms,
            },
            FollowMode::Immediate => {
                let dt_secs = self
                    .state
                    .last_update_ms
                    .map(|last| (now_ms - last) / 1000.0)
                    .unwrap_or(0.0);
                let (center, bearing) = self.spring_step(view, target.center, bearing, dt_secs);
                EaseOptions {
                    center,
                    bearing,
                    pitch: target.pitch,
                    duration_ms: 0.0,
                }
            }
        };

        debug!(
            "Camera -> ({:.6}, {:.6}) bearing {:.1} over {:.0}ms",
            ease.center.lng, ease.center.lat, ease.bearing, ease.duration_ms
        );
        view.ease_to(ease);
        self.state.last_update_ms = Some(now_ms);

        Some(CameraMove {
            ease,
            altitude: profile.altitude,
        })
    }

    fn spring_step(
        &mut self,
        view: &dyn MapView,
        target_center: GeoPoint,
        target_bearing: f64,
        dt_secs: f64,
    ) -> (GeoPoint, f64) {
        let freq = self.config.spring_frequency;
        let zeta = self.state.damping_ratio;
        let springs = self.springs.get_or_insert_with(|| {
            let c = view.center();
            FollowSprings {
                lng: DampedSpring::new(c.lng, freq, zeta),
                lat: DampedSpring::new(c.lat, freq, zeta),
                bearing: DampedSpring::new(view.bearing(), freq, zeta),
            }
        });

        let lng = springs.lng.step(target_center.lng, dt_secs);
        let lat = springs.lat.step(target_center.lat, dt_secs);
        // keep the bearing spring on the same unwrapped branch as its target
        let b = springs.bearing.position;
        let bearing_target = b + shortest_bearing_delta(b, target_bearing);
        let bearing = springs.bearing.step(bearing_target, dt_secs);
        if bearing.abs() > 720.0 {
            springs.bearing.position = normalize_bearing(bearing);
        }

        (GeoPoint::new(lng, lat), bearing)
    }
}

impl Default for CameraFollowController {
    fn default() -> Self {
        Self::new(CameraConfig::default())
    }
}

fn normalize_against(value: f64, cap: f64) -> f64 {
    if !(cap > 0.0) || !value.is_finite() {
        return 0.0;
    }
    (value.max(0.0).min(cap) / cap).clamp(0.0, 1.0)
}
