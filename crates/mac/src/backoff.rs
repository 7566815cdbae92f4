//! Binary exponential backoff.

use rand::Rng;

/// Bounded exponential contention window.
#[derive(Debug, Clone)]
pub struct ContentionWindow {
    min: u32,
    max: u32,
    current: u32,
}

impl ContentionWindow {
    pub fn new(min: u32, max: u32) -> Self {
        Self {
            min,
            max: max.max(min),
            current: min,
        }
    }

    /// Current window size in slots.
    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    /// Double the window after a failed exchange, saturating at the ceiling.
    pub fn on_collision(&mut self) {
        self.current = self.current.saturating_mul(2).min(self.max);
    }

    /// Return to the minimum after a successful exchange.
    pub fn reset(&mut self) {
        self.current = self.min;
    }

    /// Draw a slot count uniformly from `[0, current]`.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        rng.gen_range(0..=self.current)
    }
}
