//! Immutable, time-sorted track loaded from importer records.

use std::sync::Arc;

use log::info;

use crate::error::{TrackError, TrackResult};
use crate::geo_math::{initial_bearing, normalize_bearing};
use crate::types::{GeoPoint, TrackPoint, TrackRecord};

/// Loaded track. Cloning shares the point buffer; there is no way to
/// mutate it after construction, reloading replaces the whole value.
#[derive(Clone, Debug)]
pub struct Track {
    points: Arc<[TrackPoint]>,
    start_ms: i64,
    end_ms: i64,
}

impl Track {
    /// Validates importer records and fills in missing bearings.
    ///
    /// Records must already be sorted ascending by timestamp; equal
    /// timestamps are accepted.
    pub fn from_records(records: &[TrackRecord]) -> TrackResult<Self> {
        if records.is_empty() {
            return Err(TrackError::EmptyTrack);
        }

        let mut positions = Vec::with_capacity(records.len());
        for (index, rec) in records.iter().enumerate() {
            if index > 0 && rec.timestamp_ms < records[index - 1].timestamp_ms {
                return Err(TrackError::UnsortedTrack {
                    index,
                    timestamp_ms: rec.timestamp_ms,
                    previous_ms: records[index - 1].timestamp_ms,
                });
            }
            positions.push(GeoPoint::try_new(rec.lng, rec.lat)?);
        }

        let last = records.len() - 1;
        let points: Vec<TrackPoint> = records
            .iter()
            .enumerate()
            .map(|(i, rec)| {
                let bearing = match rec.bearing {
                    Some(b) if b.is_finite() => normalize_bearing(b),
                    _ if i < last => initial_bearing(&positions[i], &positions[i + 1]),
                    _ if i > 0 => initial_bearing(&positions[i - 1], &positions[i]),
                    _ => 0.0,
                };
                TrackPoint {
                    position: positions[i],
                    bearing,
                    timestamp_ms: rec.timestamp_ms,
                }
            })
            .collect();

        let track = Track {
            start_ms: points[0].timestamp_ms,
            end_ms: points[last].timestamp_ms,
            points: points.into(),
        };
        info!(
            "Track loaded: {} points, {:.1}s",
            track.len(),
            track.duration_secs()
        );
        Ok(track)
    }

    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn start_ms(&self) -> i64 {
        self.start_ms
    }

    pub fn end_ms(&self) -> i64 {
        self.end_ms
    }

    pub fn duration_secs(&self) -> f64 {
        (self.end_ms - self.start_ms) as f64 / 1000.0
    }

    pub fn first(&self) -> &TrackPoint {
        &self.points[0]
    }

    pub fn last(&self) -> &TrackPoint {
        &self.points[self.points.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_empty_rejected() {
        assert_eq!(Track::from_records(&[]).unwrap_err(), TrackError::EmptyTrack);
    }

    #[test]
    fn test_unsorted_rejected() {
        let records = vec![
            TrackRecord::new(0.0, 0.0, 0),
            TrackRecord::new(0.0, 0.1, 2000),
            TrackRecord::new(0.0, 0.2, 1000),
        ];
        assert!(matches!(
            Track::from_records(&records),
            Err(TrackError::UnsortedTrack { index: 2, .. })
        ));
    }

    #[test]
    fn test_invalid_coordinate_rejected() {
        let records = vec![TrackRecord::new(f64::NAN, 0.0, 0)];
        assert!(matches!(
            Track::from_records(&records),
            Err(TrackError::InvalidCoordinate { .. })
        ));
    }

    #[test]
    fn test_latitude_beyond_pole_rejected() {
        let records = vec![
            TrackRecord::new(0.0, 0.0, 0),
            TrackRecord::new(0.0, 200.0, 1000),
        ];
        assert_eq!(
            Track::from_records(&records).map(|t| t.len()),
            Err(TrackError::InvalidCoordinate { lng: 0.0, lat: 200.0 })
        );
        let records = vec![TrackRecord::new(10.0, -300.0, 0)];
        assert!(Track::from_records(&records).is_err());
    }

    #[test]
    fn test_missing_bearings_filled() {
        let records = vec![
            TrackRecord::new(0.0, 0.0, 0),
            TrackRecord::new(0.0, 0.01, 1000),
            TrackRecord::new(0.01, 0.01, 2000).with_bearing(-90.0),
            TrackRecord::new(0.02, 0.01, 3000),
        ];
        let track = Track::from_records(&records).expect("track");
        let pts = track.points();
        assert_abs_diff_eq!(pts[0].bearing, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(pts[1].bearing, 90.0, epsilon = 1e-3);
        assert_abs_diff_eq!(pts[2].bearing, 270.0, epsilon = 1e-12);
        // last point inherits the approach bearing
        assert_abs_diff_eq!(pts[3].bearing, 90.0, epsilon = 1e-3);
        assert_eq!(track.start_ms(), 0);
        assert_eq!(track.end_ms(), 3000);
        assert_abs_diff_eq!(track.duration_secs(), 3.0);
    }

    #[test]
    fn test_single_point_track() {
        let track = Track::from_records(&[TrackRecord::new(5.0, 5.0, 42)]).expect("track");
        assert_eq!(track.len(), 1);
        assert_eq!(track.first().bearing, 0.0);
        assert_eq!(track.duration_secs(), 0.0);
    }
}
