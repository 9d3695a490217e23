use thiserror::Error;

/// Errors surfaced at the API boundary of the smoothing core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackError {
    #[error("Invalid coordinate: lng={lng}, lat={lat}")]
    InvalidCoordinate { lng: f64, lat: f64 },

    #[error("Track has no points")]
    EmptyTrack,

    #[error("Track points out of order at index {index}: {timestamp_ms} < {previous_ms}")]
    UnsortedTrack {
        index: usize,
        timestamp_ms: i64,
        previous_ms: i64,
    },

    #[error("Speed multiplier must be positive and finite, got {0}")]
    InvalidSpeedMultiplier(f64),

    #[error("Invalid interpolation fraction: {0}")]
    InvalidFraction(f64),

    #[error("No track loaded")]
    NoTrackLoaded,

    #[error("Estimator request already in flight (generation {0})")]
    RequestInFlight(u64),

    #[error("No estimator request in flight")]
    NothingInFlight,

    #[error("Estimator worker disconnected")]
    WorkerDisconnected,

    #[error("Failed to start estimator worker: {0}")]
    WorkerSpawn(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for core operations
pub type TrackResult<T> = Result<T, TrackError>;
