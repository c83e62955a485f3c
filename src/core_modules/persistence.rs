// THEORY:
// The `PersistenceFilter` is the temporal voting layer that separates
// sustained motion from single-frame artifacts. Compression glitches, auto
// exposure kicks and sensor noise all produce one-tick bursts of "motion";
// a real object moving through the scene produces a run of them. The filter
// keeps a fixed trailing window of per-tick booleans and confirms motion only
// once the window is full and at most one observation is missing, tolerating
// a single dropped frame without demanding unanimity.
//
// Until the window fills, the filter always answers false: a cold-started
// pipeline never alarms during warm-up.

use std::collections::VecDeque;

/// Sliding-window vote over recent ticks.
pub struct PersistenceFilter {
    window: usize,
    history: VecDeque<bool>,
}

impl PersistenceFilter {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            history: VecDeque::with_capacity(window),
        }
    }

    /// Records this tick's observation and reports whether motion is
    /// confirmed as persistent.
    pub fn observe(&mut self, has_motion: bool) -> bool {
        self.history.push_back(has_motion);
        if self.history.len() > self.window {
            self.history.pop_front();
        }

        if self.history.len() < self.window {
            return false;
        }
        let motion_count = self.history.iter().filter(|&&seen| seen).count();
        motion_count >= self.window - 1
    }

    /// Forgets all observations; the next window must refill from scratch.
    pub fn reset(&mut self) {
        self.history.clear();
    }

    /// Observations currently held, at most the window size.
    pub fn observed(&self) -> usize {
        self.history.len()
    }

    /// How many held observations saw motion. Diagnostic only.
    pub fn motion_count(&self) -> usize {
        self.history.iter().filter(|&&seen| seen).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cold_start_reports_false_regardless_of_input() {
        let mut filter = PersistenceFilter::new(5);
        for _ in 0..4 {
            assert!(!filter.observe(true));
        }
        // Fifth observation fills the window.
        assert!(filter.observe(true));
    }

    #[test]
    fn tolerates_exactly_one_missed_frame() {
        let mut filter = PersistenceFilter::new(4);
        filter.observe(true);
        filter.observe(false);
        filter.observe(true);
        assert!(filter.observe(true)); // 3 of 4

        let mut filter = PersistenceFilter::new(4);
        filter.observe(false);
        filter.observe(false);
        filter.observe(true);
        assert!(!filter.observe(true)); // 2 of 4
    }

    #[test]
    fn window_never_exceeds_its_capacity() {
        let mut filter = PersistenceFilter::new(3);
        for tick in 0..20 {
            filter.observe(tick % 2 == 0);
            assert!(filter.observed() <= 3);
        }
    }

    #[test]
    fn old_observations_are_evicted() {
        let mut filter = PersistenceFilter::new(3);
        filter.observe(true);
        filter.observe(true);
        assert!(filter.observe(true));
        // The first quiet tick still holds two motion observations, enough
        // for the vote; the second evicts the run.
        assert!(filter.observe(false));
        assert!(!filter.observe(false));
        assert_eq!(filter.motion_count(), 1);
    }

    #[test]
    fn reset_restarts_the_warm_up() {
        let mut filter = PersistenceFilter::new(2);
        filter.observe(true);
        filter.observe(true);
        filter.reset();
        assert_eq!(filter.observed(), 0);
        assert!(!filter.observe(true));
        assert!(filter.observe(true));
    }
}
