pub mod follow;
pub mod map_view;
pub mod spring;

pub use follow::{
    CameraFollowController, CameraMove, CameraOffset, CameraState, CameraTarget, FollowMode,
    SpeedProfile,
};
pub use map_view::{EaseOptions, HeadlessMapView, MapView};
pub use spring::DampedSpring;
