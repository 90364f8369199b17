//! Fixed-step logic clock
//!
//! Render frames arrive at whatever rate the client manages; the
//! simulation only ever advances in whole logic ticks.

/// Accumulates real time and hands out whole logic steps
#[derive(Debug, Clone)]
pub struct FixedStepClock {
    step: f32,
    accumulator: f32,
    max_steps: u32,
}

impl FixedStepClock {
    /// `logic_hz` ticks per second, at most `max_steps` per frame
    pub fn new(logic_hz: u32, max_steps: u32) -> Self {
        Self {
            step: 1.0 / logic_hz.max(1) as f32,
            accumulator: 0.0,
            max_steps: max_steps.max(1),
        }
    }

    pub fn step_seconds(&self) -> f32 {
        self.step
    }

    /// Add a frame's real time and return how many ticks to run
    ///
    /// Time beyond `max_steps` ticks is discarded so a long stall does not
    /// spiral into ever longer catch-up frames.
    pub fn accumulate(&mut self, real_dt: f32) -> u32 {
        if real_dt.is_finite() && real_dt > 0.0 {
            self.accumulator += real_dt;
        }

        let mut steps = 0;
        while self.accumulator >= self.step && steps < self.max_steps {
            self.accumulator -= self.step;
            steps += 1;
        }
        if steps == self.max_steps && self.accumulator >= self.step {
            tracing::debug!(dropped = self.accumulator, "Logic clock behind, dropping time");
            self.accumulator = 0.0;
        }
        steps
    }

    /// Fraction of a tick left over, for render interpolation
    pub fn alpha(&self) -> f32 {
        self.accumulator / self.step
    }
}
