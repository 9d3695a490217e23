/// Second-order spring used to smooth per-frame camera moves.
///
/// `damping_ratio = 1.0` is critically damped: fastest approach with no
/// overshoot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DampedSpring {
    pub position: f64,
    pub velocity: f64,
    pub frequency: f64,
    pub damping_ratio: f64,
}

/// Largest integration step; longer frames are subdivided.
const MAX_STEP_SECS: f64 = 1.0 / 120.0;

impl DampedSpring {
    pub fn new(position: f64, frequency: f64, damping_ratio: f64) -> Self {
        Self {
            position,
            velocity: 0.0,
            frequency: frequency.max(1e-4),
            damping_ratio: damping_ratio.max(0.0),
        }
    }

    /// Moves toward `target` over `dt_secs` and returns the new position.
    pub fn step(&mut self, target: f64, dt_secs: f64) -> f64 {
        if !(dt_secs > 0.0) || !dt_secs.is_finite() {
            return self.position;
        }
        let steps = (dt_secs / MAX_STEP_SECS).ceil().max(1.0) as usize;
        let h = dt_secs / steps as f64;
        let w = self.frequency;
        for _ in 0..steps {
            let accel = w * w * (target - self.position) - 2.0 * self.damping_ratio * w * self.velocity;
            self.velocity += accel * h;
            self.position += self.velocity * h;
        }
        self.position
    }
}
