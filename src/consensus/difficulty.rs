use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::config::DifficultyConfig;

/// Windowed difficulty retargeting.
///
/// Block-to-block intervals accumulate in a ring buffer; once a full window
/// has been observed the mean is compared against the target with ±20%
/// hysteresis and the difficulty steps by at most one, clamped to the
/// configured bounds. The buffer is cleared after each retarget, so steps are
/// at most one per window.
///
/// The controller is advisory: the chain reads `current()` at the start of
/// append validation and the value only ever changes after a successful
/// append, inside the same critical section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DifficultyController {
    current: u32,
    min: u32,
    max: u32,
    target_block_time_ms: u64,
    window: usize,
    intervals: VecDeque<u64>,
}

impl DifficultyController {
    pub fn new(config: &DifficultyConfig) -> Self {
        DifficultyController {
            current: config.initial_difficulty,
            min: config.min_difficulty,
            max: config.max_difficulty,
            target_block_time_ms: config.target_block_time_ms,
            window: config.window,
            intervals: VecDeque::with_capacity(config.window),
        }
    }

    /// Difficulty currently in force.
    #[inline]
    pub fn current(&self) -> u32 {
        self.current
    }

    /// Record the interval between the previous block and the one just
    /// appended; retarget once a full window has accumulated.
    pub fn record_block_time(&mut self, interval_ms: u64) {
        self.intervals.push_back(interval_ms);
        if self.intervals.len() > self.window {
            self.intervals.pop_front();
        }

        if self.intervals.len() < self.window || self.intervals.len() < 2 {
            return;
        }

        let mean = self.intervals.iter().sum::<u64>() / self.intervals.len() as u64;

        // ±20% hysteresis avoids oscillation around the target.
        let fast = self.target_block_time_ms * 8 / 10;
        let slow = self.target_block_time_ms * 12 / 10;

        if mean < fast {
            self.current = (self.current + 1).min(self.max);
        } else if mean > slow {
            self.current = self.current.saturating_sub(1).max(self.min);
        }

        self.intervals.clear();
    }

    /// Observed intervals since the last retarget, oldest first.
    pub fn pending_intervals(&self) -> Vec<u64> {
        self.intervals.iter().copied().collect()
    }

    /// Rebuild controller state from a snapshot.
    pub fn restore(config: &DifficultyConfig, current: u32, intervals: Vec<u64>) -> Self {
        let mut controller = DifficultyController::new(config);
        controller.current = current.clamp(config.min_difficulty, config.max_difficulty);
        controller.intervals = intervals.into_iter().collect();
        controller
    }
}
