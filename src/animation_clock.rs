//! Playback clock: maps wall-clock frame deltas onto track time.
//!
//! The clock owns the interpolating estimator so every tick produces one
//! pose through the same path as a seek.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::config::EstimatorConfig;
use crate::error::{TrackError, TrackResult};
use crate::estimator::PositionEstimator;
use crate::geo_math::haversine_distance;
use crate::track::Track;
use crate::track_sampler::sample_at;
use crate::types::{Pose, TrackPoint};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
}

/// Result of one frame advance
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ClockTick {
    /// Not playing; nothing to render
    Idle,
    Pose(Pose),
    /// Reached the end of the track; carries the pose at the last point
    Finished(Pose),
}

pub struct AnimationClock {
    estimator: PositionEstimator,
    track: Option<Track>,
    state: PlaybackState,
    elapsed_sec: f64,
    duration_sec: f64,
    speed_multiplier: f64,
    last_pose: Option<Pose>,
}

impl AnimationClock {
    pub fn new(config: EstimatorConfig) -> Self {
        Self {
            estimator: PositionEstimator::new(config),
            track: None,
            state: PlaybackState::Stopped,
            elapsed_sec: 0.0,
            duration_sec: 0.0,
            speed_multiplier: 1.0,
            last_pose: None,
        }
    }

    /// Replaces the current track. Playback stops at the start and the
    /// estimator history from the previous track is dropped.
    pub fn on_track_loaded(&mut self, track: Track) {
        self.duration_sec = track.duration_secs();
        self.elapsed_sec = 0.0;
        self.state = PlaybackState::Stopped;
        self.estimator.reset();
        self.last_pose = None;
        info!(
            "Track loaded: {} points, {:.1}s",
            track.len(),
            self.duration_sec
        );
        self.track = Some(track);
    }

    /// Starts or resumes playback. A finished track restarts from zero.
    /// Without a track this does nothing.
    pub fn play(&mut self) {
        if self.track.is_none() {
            warn!("play() ignored: no track loaded");
            return;
        }
        if self.state == PlaybackState::Playing {
            return;
        }
        if self.state == PlaybackState::Stopped && self.elapsed_sec >= self.duration_sec {
            self.elapsed_sec = 0.0;
        }
        self.state = PlaybackState::Playing;
        info!("Playback started at {:.2}s", self.elapsed_sec);
    }

    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
            info!("Playback paused at {:.2}s", self.elapsed_sec);
        }
    }

    /// Jumps to `sec` (clamped to the track) without changing the playback
    /// state, and returns the pose there.
    pub fn seek_to(&mut self, sec: f64) -> TrackResult<Pose> {
        if self.track.is_none() {
            return Err(TrackError::NoTrackLoaded);
        }
        let sec = if sec.is_nan() { 0.0 } else { sec };
        self.elapsed_sec = sec.clamp(0.0, self.duration_sec);
        self.pose_at_elapsed()
    }

    pub fn set_speed(&mut self, multiplier: f64) -> TrackResult<()> {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            warn!("Rejected speed multiplier {}", multiplier);
            return Err(TrackError::InvalidSpeedMultiplier(multiplier));
        }
        self.speed_multiplier = multiplier;
        Ok(())
    }

    /// Moves playback forward by a wall-clock frame delta.
    pub fn advance(&mut self, frame_delta_sec: f64) -> TrackResult<ClockTick> {
        if self.state != PlaybackState::Playing {
            return Ok(ClockTick::Idle);
        }
        let delta = if frame_delta_sec.is_finite() {
            frame_delta_sec.max(0.0)
        } else {
            0.0
        };
        self.elapsed_sec += delta * self.speed_multiplier;

        if self.elapsed_sec >= self.duration_sec {
            self.elapsed_sec = self.duration_sec;
            self.state = PlaybackState::Stopped;
            let pose = self.pose_at_elapsed()?;
            info!("Playback finished after {:.1}s", self.duration_sec);
            return Ok(ClockTick::Finished(pose));
        }
        self.pose_at_elapsed().map(ClockTick::Pose)
    }

    fn pose_at_elapsed(&mut self) -> TrackResult<Pose> {
        let track = self.track.as_ref().ok_or(TrackError::NoTrackLoaded)?;
        let sample = sample_at(track, self.elapsed_sec)?;
        let timestamp_ms = track.start_ms() as f64 + self.elapsed_sec * 1000.0;
        let mut pose = self.estimator.ingest_interpolation(
            sample.prev.position,
            sample.next.position,
            sample.prev.bearing,
            sample.next.bearing,
            sample.t,
            timestamp_ms,
        );
        pose.speed = segment_speed(&sample.prev, &sample.next);
        self.last_pose = Some(pose);
        Ok(pose)
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn elapsed_sec(&self) -> f64 {
        self.elapsed_sec
    }

    pub fn duration_sec(&self) -> f64 {
        self.duration_sec
    }

    pub fn speed_multiplier(&self) -> f64 {
        self.speed_multiplier
    }

    pub fn track(&self) -> Option<&Track> {
        self.track.as_ref()
    }

    /// Last pose produced by a tick or seek
    pub fn current_pose(&self) -> Option<Pose> {
        self.last_pose
    }
}

/// Ground speed (m/s) across a bracket; 0 when both points share a timestamp.
fn segment_speed(prev: &TrackPoint, next: &TrackPoint) -> f64 {
    let dt_secs = (next.timestamp_ms - prev.timestamp_ms) as f64 / 1000.0;
    if dt_secs <= 0.0 {
        return 0.0;
    }
    haversine_distance(&prev.position, &next.position) / dt_secs
}

impl Default for AnimationClock {
    fn default() -> Self {
        Self::new(EstimatorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TrackRecord;
    use approx::assert_abs_diff_eq;

    fn diagonal_track() -> Track {
        Track::from_records(&[
            TrackRecord::new(0.0, 0.0, 0),
            TrackRecord::new(0.01, 0.01, 10_000),
        ])
        .expect("track")
    }

    fn loaded() -> AnimationClock {
        let mut clock = AnimationClock::default();
        clock.on_track_loaded(diagonal_track());
        clock
    }

    #[test]
    fn test_play_without_track_is_noop() {
        let mut clock = AnimationClock::default();
        clock.play();
        assert_eq!(clock.state(), PlaybackState::Stopped);
        assert_eq!(clock.advance(0.016), Ok(ClockTick::Idle));
        assert_eq!(clock.seek_to(1.0), Err(TrackError::NoTrackLoaded));
    }

    #[test]
    fn test_track_load_resets() {
        let mut clock = loaded();
        clock.play();
        clock.advance(2.0).expect("advance");
        clock.on_track_loaded(diagonal_track());
        assert_eq!(clock.state(), PlaybackState::Stopped);
        assert_eq!(clock.elapsed_sec(), 0.0);
        assert_eq!(clock.duration_sec(), 10.0);
        assert!(clock.current_pose().is_none());
    }

    #[test]
    fn test_seek_midpoint_bearing_and_position() {
        let mut clock = loaded();
        let pose = clock.seek_to(5.0).expect("seek");
        assert_abs_diff_eq!(pose.bearing, 45.0, epsilon = 0.01);
        assert_abs_diff_eq!(pose.position.lng, 0.005, epsilon = 1e-6);
        assert_abs_diff_eq!(pose.position.lat, 0.005, epsilon = 1e-6);
        assert_eq!(clock.state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_seek_clamps() {
        let mut clock = loaded();
        clock.seek_to(99.0).expect("seek");
        assert_eq!(clock.elapsed_sec(), 10.0);
        clock.seek_to(-3.0).expect("seek");
        assert_eq!(clock.elapsed_sec(), 0.0);
    }

    #[test]
    fn test_speed_multiplier_validation() {
        let mut clock = loaded();
        assert_eq!(clock.set_speed(0.0), Err(TrackError::InvalidSpeedMultiplier(0.0)));
        assert!(clock.set_speed(-1.0).is_err());
        assert!(clock.set_speed(f64::NAN).is_err());
        assert_eq!(clock.speed_multiplier(), 1.0);
        clock.set_speed(2.5).expect("speed");
        assert_eq!(clock.speed_multiplier(), 2.5);
    }

    #[test]
    fn test_advance_scales_by_multiplier() {
        let mut clock = loaded();
        clock.set_speed(2.0).expect("speed");
        clock.play();
        let tick = clock.advance(1.0).expect("advance");
        assert!(matches!(tick, ClockTick::Pose(_)));
        assert_abs_diff_eq!(clock.elapsed_sec(), 2.0);
    }

    #[test]
    fn test_pause_holds_time() {
        let mut clock = loaded();
        clock.play();
        clock.advance(1.0).expect("advance");
        clock.pause();
        assert_eq!(clock.advance(1.0), Ok(ClockTick::Idle));
        assert_eq!(clock.elapsed_sec(), 1.0);
        clock.play();
        assert_eq!(clock.state(), PlaybackState::Playing);
    }

    #[test]
    fn test_finish_emits_last_point() {
        let mut clock = loaded();
        clock.play();
        clock.advance(9.0).expect("advance");
        let tick = clock.advance(5.0).expect("advance");
        match tick {
            ClockTick::Finished(pose) => {
                assert_abs_diff_eq!(pose.position.lng, 0.01, epsilon = 1e-12);
                assert_abs_diff_eq!(pose.position.lat, 0.01, epsilon = 1e-12);
            }
            other => panic!("expected Finished, got {:?}", other),
        }
        assert_eq!(clock.state(), PlaybackState::Stopped);
        assert_eq!(clock.elapsed_sec(), 10.0);

        // replaying a finished track starts over
        clock.play();
        assert_eq!(clock.elapsed_sec(), 0.0);
    }

    #[test]
    fn test_poses_carry_segment_speed() {
        let mut clock = loaded();
        let track = diagonal_track();
        let expected = haversine_distance(&track.first().position, &track.last().position) / 10.0;
        clock.play();
        for _ in 0..5 {
            match clock.advance(1.0).expect("advance") {
                ClockTick::Pose(pose) => assert_abs_diff_eq!(pose.speed, expected, epsilon = 1e-9),
                other => panic!("expected Pose, got {:?}", other),
            }
        }
        // last point brackets itself
        match clock.advance(10.0).expect("advance") {
            ClockTick::Finished(pose) => assert_eq!(pose.speed, 0.0),
            other => panic!("expected Finished, got {:?}", other),
        }
    }

    #[test]
    fn test_equal_timestamps_have_zero_speed() {
        let mut clock = AnimationClock::default();
        clock.on_track_loaded(
            Track::from_records(&[
                TrackRecord::new(0.0, 0.0, 0),
                TrackRecord::new(0.001, 0.0, 0),
                TrackRecord::new(0.002, 0.0, 1000),
            ])
            .expect("track"),
        );
        assert!(clock.seek_to(0.5).expect("seek").speed > 0.0);
        let track = clock.track().cloned().expect("track");
        assert_eq!(segment_speed(&track.points()[0], &track.points()[1]), 0.0);
    }

    #[test]
    fn test_variable_frame_deltas_accumulate() {
        let mut clock = loaded();
        clock.play();
        for dt in [0.016, 0.033, 0.1, 0.0, -0.5, f64::NAN] {
            clock.advance(dt).expect("advance");
        }
        assert_abs_diff_eq!(clock.elapsed_sec(), 0.149, epsilon = 1e-12);
    }
}
