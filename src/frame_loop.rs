//! Display-refresh stand-in: calls a registered callback once per tick
//! with a monotonic timestamp.
//!
//! Ticks are paced by a tokio interval, but callers must use the delivered
//! timestamps rather than assume the nominal period.

use std::time::Duration;

use log::debug;
use tokio::time::{interval, Instant, MissedTickBehavior};

use crate::config::FrameConfig;
use crate::error::{TrackError, TrackResult};

/// Returned by a frame callback to stay registered or deregister
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameControl {
    Continue,
    Stop,
}

pub struct FrameLoop {
    period: Duration,
    origin: Instant,
}

impl FrameLoop {
    pub fn new(config: &FrameConfig) -> TrackResult<Self> {
        if !config.target_fps.is_finite() || config.target_fps <= 0.0 {
            return Err(TrackError::Config(format!(
                "target_fps must be positive, got {}",
                config.target_fps
            )));
        }
        Ok(Self {
            period: Duration::from_secs_f64(1.0 / config.target_fps),
            origin: Instant::now(),
        })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Milliseconds since the loop was created
    pub fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }

    /// Drives `callback` until it returns [`FrameControl::Stop`].
    /// Returns the number of frames delivered.
    pub async fn run<F>(&self, mut callback: F) -> u64
    where
        F: FnMut(f64) -> FrameControl,
    {
        let mut ticker = interval(self.period);
        // a late frame is dropped, not replayed in a burst
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut frames = 0u64;
        loop {
            ticker.tick().await;
            frames += 1;
            if callback(self.now_ms()) == FrameControl::Stop {
                break;
            }
        }
        debug!("Frame loop deregistered after {} frames", frames);
        frames
    }
}
