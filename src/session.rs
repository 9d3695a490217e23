//! Per-frame orchestration of clock, camera and quality tier.
//!
//! Data flows one way: the frame timestamp feeds the governor and the
//! clock, the clock's pose is handed to the camera as an argument, and
//! everything observable comes back as [`PlaybackEvent`]s.

use log::{info, warn};

use crate::animation_clock::{AnimationClock, ClockTick, PlaybackState};
use crate::camera::{CameraFollowController, CameraMove, FollowMode, MapView};
use crate::config::FollowConfig;
use crate::error::{TrackError, TrackResult};
use crate::quality::{QualityChange, QualityGovernor, QualityTier};
use crate::track::Track;
use crate::types::{Pose, TrackRecord};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PlaybackEvent {
    PoseUpdated(Pose),
    PlaybackFinished(Pose),
    CameraMoved(CameraMove),
    QualityChanged(QualityChange),
}

pub struct PlaybackSession {
    clock: AnimationClock,
    camera: CameraFollowController,
    governor: QualityGovernor,
    follow_mode: FollowMode,
    last_frame_ms: Option<f64>,
    last_pose: Option<Pose>,
    // pose changed outside a tick (seek) and the camera has not caught up
    camera_stale: bool,
}

impl PlaybackSession {
    pub fn new(config: FollowConfig) -> Self {
        Self {
            clock: AnimationClock::new(config.estimator),
            camera: CameraFollowController::new(config.camera),
            governor: QualityGovernor::new(config.quality, QualityTier::High),
            follow_mode: FollowMode::Eased,
            last_frame_ms: None,
            last_pose: None,
            camera_stale: false,
        }
    }

    pub fn load_records(&mut self, records: &[TrackRecord]) -> TrackResult<()> {
        let track = Track::from_records(records).map_err(|e| {
            warn!("Track rejected: {}", e);
            e
        })?;
        self.load_track(track);
        Ok(())
    }

    pub fn load_track(&mut self, track: Track) {
        self.clock.on_track_loaded(track);
        self.last_pose = None;
        self.last_frame_ms = None;
        self.camera_stale = false;
    }

    pub fn play(&mut self) {
        self.clock.play();
    }

    pub fn pause(&mut self) {
        self.clock.pause();
    }

    pub fn seek(&mut self, sec: f64) -> TrackResult<Pose> {
        let pose = self.clock.seek_to(sec)?;
        self.last_pose = Some(pose);
        self.camera_stale = true;
        Ok(pose)
    }

    pub fn set_speed(&mut self, multiplier: f64) -> TrackResult<()> {
        self.clock.set_speed(multiplier)
    }

    pub fn set_follow_mode(&mut self, mode: FollowMode) {
        self.follow_mode = mode;
    }

    /// Locks the camera onto the vehicle. Before the first tick the track's
    /// first point stands in for the vehicle.
    pub fn engage_camera(&mut self, view: &dyn MapView) -> TrackResult<()> {
        let vehicle = match self.last_pose {
            Some(pose) => pose.position,
            None => {
                self.clock
                    .track()
                    .ok_or(TrackError::NoTrackLoaded)?
                    .first()
                    .position
            }
        };
        self.camera.engage(view.center(), vehicle, view.zoom());
        self.camera_stale = self.last_pose.is_some();
        Ok(())
    }

    pub fn disengage_camera(&mut self) {
        self.camera.disengage();
    }

    /// Watchdog hook for a stalled estimator.
    pub fn report_stall(&mut self) -> Option<PlaybackEvent> {
        self.governor.report_stall().map(PlaybackEvent::QualityChanged)
    }

    /// One display refresh. `now_ms` must be monotonic.
    pub fn on_frame(&mut self, now_ms: f64, view: &mut dyn MapView) -> TrackResult<Vec<PlaybackEvent>> {
        let mut events = Vec::new();

        let delta_ms = self
            .last_frame_ms
            .map(|last| (now_ms - last).max(0.0))
            .unwrap_or(0.0);
        self.last_frame_ms = Some(now_ms);

        if let Some(change) = self.governor.record_timestamp(now_ms) {
            events.push(PlaybackEvent::QualityChanged(change));
        }

        let mut moved = self.camera_stale;
        match self.clock.advance(delta_ms / 1000.0)? {
            ClockTick::Idle => {}
            ClockTick::Pose(pose) => {
                self.last_pose = Some(pose);
                events.push(PlaybackEvent::PoseUpdated(pose));
                moved = true;
            }
            ClockTick::Finished(pose) => {
                self.last_pose = Some(pose);
                events.push(PlaybackEvent::PoseUpdated(pose));
                events.push(PlaybackEvent::PlaybackFinished(pose));
                info!("Session finished at ({:.6}, {:.6})", pose.position.lng, pose.position.lat);
                moved = true;
            }
        }

        if moved && self.camera.is_locked() {
            let interval = self.governor.settings().update_interval_ms;
            if let Some(mv) = self.camera.follow(
                self.last_pose.as_ref(),
                self.clock.speed_multiplier(),
                now_ms,
                interval,
                self.follow_mode,
                view,
            ) {
                self.camera_stale = false;
                events.push(PlaybackEvent::CameraMoved(mv));
            } else {
                self.camera_stale = true;
            }
        }

        Ok(events)
    }

    pub fn state(&self) -> PlaybackState {
        self.clock.state()
    }

    pub fn last_pose(&self) -> Option<Pose> {
        self.last_pose
    }

    pub fn tier(&self) -> QualityTier {
        self.governor.tier()
    }

    pub fn clock(&self) -> &AnimationClock {
        &self.clock
    }

    pub fn camera(&self) -> &CameraFollowController {
        &self.camera
    }
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self::new(FollowConfig::default())
    }
}
