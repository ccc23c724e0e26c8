//! Sample counter to step index mapping.

/// Step index for a running sample counter.
///
/// `floor(sample_counter / samples_per_step) mod step_count`.
pub fn current_step(sample_counter: u64, samples_per_step: u64, step_count: usize) -> usize {
    ((sample_counter / samples_per_step) % step_count as u64) as usize
}

/// Fixed-duration steps over a table of `step_count` entries, repeating forever.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sequencer {
    samples_per_step: u64,
    step_count: usize,
}

impl Sequencer {
    pub fn new(samples_per_step: u32, step_count: usize) -> Self {
        debug_assert!(samples_per_step > 0, "steps must last at least one sample");
        debug_assert!(step_count > 0, "step table is empty");
        Self {
            samples_per_step: samples_per_step.max(1) as u64,
            step_count: step_count.max(1),
        }
    }

    pub fn samples_per_step(&self) -> u64 {
        self.samples_per_step
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// Samples in one pass through the table.
    pub fn loop_length(&self) -> u64 {
        self.samples_per_step * self.step_count as u64
    }

    pub fn step_at(&self, sample_counter: u64) -> usize {
        current_step(sample_counter, self.samples_per_step, self.step_count)
    }

    /// True when `sample_counter` is the first sample of a new pass through
    /// the table. Holds for one-step tables too.
    ///
    /// Sample 0 has no predecessor and never counts as a wrap.
    pub fn is_loop_boundary(&self, sample_counter: u64) -> bool {
        sample_counter != 0 && sample_counter % self.loop_length() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_always_in_range() {
        let seq = Sequencer::new(7, 5);
        for counter in (0..10_000).chain(u64::MAX - 100..=u64::MAX) {
            assert!(seq.step_at(counter) < 5);
        }
    }

    #[test]
    fn steps_advance_every_samples_per_step() {
        let seq = Sequencer::new(10, 4);
        assert_eq!(seq.step_at(0), 0);
        assert_eq!(seq.step_at(9), 0);
        assert_eq!(seq.step_at(10), 1);
        assert_eq!(seq.step_at(39), 3);
        assert_eq!(seq.step_at(40), 0);
    }

    #[test]
    fn sample_zero_is_not_a_boundary() {
        let seq = Sequencer::new(10, 4);
        assert!(!seq.is_loop_boundary(0));
    }

    #[test]
    fn boundary_fires_once_per_loop() {
        let seq = Sequencer::new(10, 4);
        let hits: Vec<u64> = (0..200).filter(|&c| seq.is_loop_boundary(c)).collect();
        assert_eq!(hits, vec![40, 80, 120, 160]);
    }

    #[test]
    fn single_step_table_wraps_every_step() {
        let seq = Sequencer::new(3, 1);
        let hits: Vec<u64> = (0..10).filter(|&c| seq.is_loop_boundary(c)).collect();
        assert_eq!(hits, vec![3, 6, 9]);
    }

    #[test]
    fn boundary_agrees_with_step_wraparound() {
        let seq = Sequencer::new(7, 5);
        for c in 1..2_000u64 {
            let wrapped = seq.step_at(c - 1) > seq.step_at(c);
            assert_eq!(seq.is_loop_boundary(c), wrapped, "counter {c}");
        }
    }

    #[test]
    fn free_function_matches_formula() {
        assert_eq!(current_step(4 * 8820, 8820, 4), 0);
        assert_eq!(current_step(2 * 8820 + 5, 8820, 4), 2);
    }
}
