//! Adaptive quality tiers driven by observed frame timing.
//!
//! Evaluation needs a full window of samples, and the window is cleared
//! after every tier change, so one sustained slowdown steps down exactly
//! one tier per window. A single frame above the critical threshold
//! downgrades immediately.

use std::collections::VecDeque;

use log::info;
use serde::{Deserialize, Serialize};

use crate::config::QualityConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Low,
    Medium,
    High,
    Ultra,
}

/// Fixed settings record attached to each tier
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct QualitySettings {
    pub render_scale: f64,
    /// Minimum spacing between camera/estimator updates
    pub update_interval_ms: f64,
    pub max_particles: u32,
    pub trail_points: u32,
}

impl QualityTier {
    pub fn settings(self) -> QualitySettings {
        match self {
            QualityTier::Ultra => QualitySettings {
                render_scale: 1.0,
                update_interval_ms: 0.0,
                max_particles: 1000,
                trail_points: 2000,
            },
            QualityTier::High => QualitySettings {
                render_scale: 1.0,
                update_interval_ms: 16.0,
                max_particles: 500,
                trail_points: 1000,
            },
            QualityTier::Medium => QualitySettings {
                render_scale: 0.75,
                update_interval_ms: 33.0,
                max_particles: 200,
                trail_points: 500,
            },
            QualityTier::Low => QualitySettings {
                render_scale: 0.5,
                update_interval_ms: 66.0,
                max_particles: 50,
                trail_points: 200,
            },
        }
    }

    pub fn step_down(self) -> Self {
        match self {
            QualityTier::Ultra => QualityTier::High,
            QualityTier::High => QualityTier::Medium,
            QualityTier::Medium | QualityTier::Low => QualityTier::Low,
        }
    }

    pub fn step_up(self) -> Self {
        match self {
            QualityTier::Low => QualityTier::Medium,
            QualityTier::Medium => QualityTier::High,
            QualityTier::High | QualityTier::Ultra => QualityTier::Ultra,
        }
    }
}

/// Emitted only when the tier actually changes
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QualityChange {
    pub from: QualityTier,
    pub to: QualityTier,
    pub settings: QualitySettings,
    pub average_frame_ms: f64,
}

pub struct QualityGovernor {
    config: QualityConfig,
    tier: QualityTier,
    window: VecDeque<f64>,
    last_timestamp_ms: Option<f64>,
}

impl QualityGovernor {
    pub fn new(config: QualityConfig, initial: QualityTier) -> Self {
        let capacity = config.window_size.max(1);
        Self {
            config,
            tier: initial,
            window: VecDeque::with_capacity(capacity),
            last_timestamp_ms: None,
        }
    }

    pub fn tier(&self) -> QualityTier {
        self.tier
    }

    pub fn settings(&self) -> QualitySettings {
        self.tier.settings()
    }

    pub fn average_frame_ms(&self) -> Option<f64> {
        if self.window.is_empty() {
            return None;
        }
        Some(self.window.iter().sum::<f64>() / self.window.len() as f64)
    }

    /// Derives the frame duration from a frame-driver timestamp.
    pub fn record_timestamp(&mut self, timestamp_ms: f64) -> Option<QualityChange> {
        let previous = self.last_timestamp_ms.replace(timestamp_ms)?;
        let frame_ms = timestamp_ms - previous;
        if frame_ms <= 0.0 {
            return None;
        }
        self.record_frame(frame_ms)
    }

    /// Adds one frame duration and evaluates the tier.
    pub fn record_frame(&mut self, frame_ms: f64) -> Option<QualityChange> {
        if !frame_ms.is_finite() || frame_ms < 0.0 {
            return None;
        }
        let window_size = self.config.window_size.max(1);
        self.window.push_back(frame_ms);
        while self.window.len() > window_size {
            self.window.pop_front();
        }

        if frame_ms > self.config.critical_frame_ms {
            return self.transition(self.tier.step_down(), frame_ms);
        }
        if self.window.len() < window_size {
            return None;
        }

        let avg_ms = self.average_frame_ms()?;
        let avg_fps = if avg_ms > 0.0 { 1000.0 / avg_ms } else { f64::INFINITY };

        let target = if avg_fps < self.config.downgrade_fps {
            self.tier.step_down()
        } else if avg_fps > self.config.upgrade_fps && avg_ms < self.config.warning_frame_ms {
            self.tier.step_up()
        } else {
            self.tier
        };
        self.transition(target, avg_ms)
    }

    /// Watchdog input: a stalled worker counts as one downgrade.
    pub fn report_stall(&mut self) -> Option<QualityChange> {
        let avg = self.average_frame_ms().unwrap_or(0.0);
        self.transition(self.tier.step_down(), avg)
    }

    fn transition(&mut self, target: QualityTier, average_frame_ms: f64) -> Option<QualityChange> {
        if target == self.tier {
            return None;
        }
        let change = QualityChange {
            from: self.tier,
            to: target,
            settings: target.settings(),
            average_frame_ms,
        };
        info!(
            "Quality tier {:?} -> {:?} (avg frame {:.1}ms)",
            change.from, change.to, average_frame_ms
        );
        self.tier = target;
        self.window.clear();
        Some(change)
    }
}

impl Default for QualityGovernor {
    fn default() -> Self {
        Self::new(QualityConfig::default(), QualityTier::High)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sustained_slowdown_steps_down_once() {
        let mut gov = QualityGovernor::default();
        let changes: Vec<QualityChange> = (0..60).filter_map(|_| gov.record_frame(40.0)).collect();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].from, QualityTier::High);
        assert_eq!(changes[0].to, QualityTier::Medium);
        assert_eq!(gov.tier(), QualityTier::Medium);
    }

    #[test]
    fn test_second_window_steps_again() {
        let mut gov = QualityGovernor::default();
        let changes: Vec<QualityChange> = (0..120).filter_map(|_| gov.record_frame(40.0)).collect();
        assert_eq!(changes.len(), 2);
        assert_eq!(gov.tier(), QualityTier::Low);
        // clamped at low
        assert!((0..60).all(|_| gov.record_frame(40.0).is_none()));
    }

    #[test]
    fn test_fast_frames_step_up_to_ultra() {
        let mut gov = QualityGovernor::new(QualityConfig::default(), QualityTier::Medium);
        let changes: Vec<QualityChange> = (0..180).filter_map(|_| gov.record_frame(10.0)).collect();
        assert_eq!(changes.len(), 2);
        assert_eq!(gov.tier(), QualityTier::Ultra);
        assert_eq!(gov.settings(), QualityTier::Ultra.settings());
    }

    #[test]
    fn test_steady_sixty_fps_is_stable() {
        // 16.7ms: above 55fps but not under the 16ms warning line
        let mut gov = QualityGovernor::default();
        assert!((0..240).all(|_| gov.record_frame(16.7).is_none()));
        assert_eq!(gov.tier(), QualityTier::High);
    }

    #[test]
    fn test_critical_frame_downgrades_immediately() {
        let mut gov = QualityGovernor::default();
        gov.record_frame(16.0);
        let change = gov.record_frame(250.0).expect("change");
        assert_eq!(change.to, QualityTier::Medium);
        assert!(gov.average_frame_ms().is_none());
    }

    #[test]
    fn test_record_timestamp_derives_durations() {
        let mut gov = QualityGovernor::default();
        let mut ts = 0.0;
        let mut changes = Vec::new();
        for _ in 0..=60 {
            if let Some(c) = gov.record_timestamp(ts) {
                changes.push(c);
            }
            ts += 40.0;
        }
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].to, QualityTier::Medium);
    }

    #[test]
    fn test_stall_reported_by_watchdog() {
        let mut gov = QualityGovernor::new(QualityConfig::default(), QualityTier::Ultra);
        assert_eq!(gov.report_stall().map(|c| c.to), Some(QualityTier::High));
    }
}
