pub mod animation_clock;
pub mod camera;
pub mod config;
pub mod error;
pub mod estimator;
pub mod frame_loop;
pub mod geo_math;
pub mod quality;
pub mod session;
pub mod track;
pub mod track_sampler;
pub mod types;

pub use animation_clock::{AnimationClock, ClockTick, PlaybackState};
pub use config::FollowConfig;
pub use error::{TrackError, TrackResult};
pub use session::{PlaybackEvent, PlaybackSession};
pub use track::Track;
pub use types::{GeoPoint, Pose, TrackPoint, TrackRecord};
