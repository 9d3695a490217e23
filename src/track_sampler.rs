//! Maps elapsed playback time onto a bracketing pair of track points.

use crate::error::{TrackError, TrackResult};
use crate::track::Track;
use crate::types::TrackPoint;

/// Bracketing points and the fraction between them
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackSample {
    pub prev: TrackPoint,
    pub next: TrackPoint,
    pub prev_index: usize,
    pub next_index: usize,
    /// Always within [0, 1]
    pub t: f64,
}

/// Locates the bracket for `elapsed_sec` seconds after the track start.
///
/// Past the last point both brackets collapse onto it with `t = 0`, so the
/// result never extrapolates beyond the track end.
pub fn sample_at(track: &Track, elapsed_sec: f64) -> TrackResult<TrackSample> {
    let points = track.points();
    if points.is_empty() {
        return Err(TrackError::EmptyTrack);
    }

    let target_ms = track.start_ms() as f64 + elapsed_sec * 1000.0;

    // first point strictly after the target
    let found = points.partition_point(|p| p.timestamp_ms as f64 <= target_ms);
    let next_index = found.min(points.len() - 1);
    let prev_index = found.saturating_sub(1).min(next_index);
    let prev = points[prev_index];
    let next = points[next_index];

    let prev_time = prev.timestamp_ms as f64;
    let next_time = next.timestamp_ms as f64;
    let t = if prev_time == next_time {
        0.0
    } else {
        ((target_ms - prev_time) / (next_time - prev_time)).clamp(0.0, 1.0)
    };

    Ok(TrackSample {
        prev,
        next,
        prev_index,
        next_index,
        t,
    })
}
