//! Monotonic timing with cumulative offset across resumes, and deadline
//! checks (spec §2 "Clock & Budget").

use std::time::{Duration, Instant};

/// Tracks elapsed wall time for one engine run, carrying forward however
/// much compute time previous runs of the same puzzle already spent
/// (spec §4.11 "Cumulative compute time").
#[derive(Debug, Clone)]
pub struct Clock {
    start: Instant,
    previous_time_offset: Duration,
    deadline: Option<Instant>,
}

impl Clock {
    /// Starts a fresh clock with no prior offset and no deadline.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
            previous_time_offset: Duration::ZERO,
            deadline: None,
        }
    }

    /// Starts a clock resuming from `previous_time_offset` already spent
    /// in earlier runs of this puzzle.
    pub fn resume(previous_time_offset: Duration) -> Self {
        Self {
            start: Instant::now(),
            previous_time_offset,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, max_execution: Option<Duration>) -> Self {
        self.deadline = max_execution.map(|d| self.start + d);
        self
    }

    /// Elapsed wall time in *this* run only.
    pub fn elapsed_this_run(&self) -> Duration {
        self.start.elapsed()
    }

    /// `previousTimeOffset + (now - startTime)` (spec §4.11).
    pub fn cumulative(&self) -> Duration {
        self.previous_time_offset + self.elapsed_this_run()
    }

    pub fn previous_time_offset(&self) -> Duration {
        self.previous_time_offset
    }

    /// Has the configured deadline (if any) passed?
    pub fn deadline_exceeded(&self) -> bool {
        match self.deadline {
            Some(d) => Instant::now() >= d,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cumulative_includes_previous_offset() {
        let clock = Clock::resume(Duration::from_secs(10));
        assert!(clock.cumulative() >= Duration::from_secs(10));
    }

    #[test]
    fn no_deadline_never_exceeded() {
        let clock = Clock::start();
        assert!(!clock.deadline_exceeded());
    }

    #[test]
    fn past_deadline_is_exceeded() {
        let clock = Clock::start().with_deadline(Some(Duration::from_nanos(1)));
        std::thread::sleep(Duration::from_millis(5));
        assert!(clock.deadline_exceeded());
    }
}
