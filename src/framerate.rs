use crate::{constants::DEFAULT_FRAMERATE_WINDOW, ring_buffer::RingBuffer, utils::safe_cast::usize_to_f64, Result};
use std::num::NonZeroUsize;
use std::time::Instant;

/// Update-rate meter over the most recent ticks
#[derive(Debug, Clone)]
pub struct FramerateCounter {
    ticks: RingBuffer<Instant>,
}

impl FramerateCounter {
    /// Create a counter averaging over `window_size` ticks
    ///
    /// # Errors
    ///
    /// Returns an error if `window_size` is zero
    pub fn new(window_size: usize) -> Result<Self> {
        Ok(Self {
            ticks: RingBuffer::new(window_size)?,
        })
    }

    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    pub fn tick_at(&mut self, timestamp: Instant) {
        self.ticks.append(timestamp);
    }

    /// Ticks per second, `None` with fewer than two ticks or no elapsed time
    #[must_use]
    pub fn query(&self) -> Option<f64> {
        let (Some(earliest), Some(latest)) = (self.ticks.get_tail(), self.ticks.get_head()) else {
            return None;
        };
        let elapsed = latest.saturating_duration_since(earliest).as_secs_f64();
        if self.ticks.len() <= 1 || elapsed == 0.0 {
            return None;
        }
        Some(usize_to_f64(self.ticks.len()) / elapsed)
    }

    pub fn reset(&mut self) {
        self.ticks.reset();
    }
}

const DEFAULT_WINDOW: NonZeroUsize = match NonZeroUsize::new(DEFAULT_FRAMERATE_WINDOW) {
    Some(window) => window,
    None => panic!("default framerate window must be non-zero"),
};

impl Default for FramerateCounter {
    fn default() -> Self {
        Self {
            ticks: RingBuffer::with_capacity(DEFAULT_WINDOW),
        }
    }
}
