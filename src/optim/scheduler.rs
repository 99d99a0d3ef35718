//! Learning rate schedulers

use super::Optimizer;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Serializable scheduler position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerState {
    pub current_step: usize,
}

/// Learning rate scheduler trait
///
/// The trainer steps the schedule once per epoch, then applies it to the
/// optimizer.
pub trait LrScheduler {
    /// Get the current learning rate
    fn get_lr(&self) -> f32;

    /// Advance the schedule by one epoch
    fn step(&mut self);

    /// Apply the current learning rate to an optimizer
    fn apply(&self, optimizer: &mut dyn Optimizer) {
        optimizer.set_lr(self.get_lr());
    }

    /// Take an immutable value snapshot of the schedule position
    fn state(&self) -> SchedulerState;

    /// Restore from a snapshot
    fn load_state(&mut self, state: &SchedulerState);
}

/// Cosine Annealing Learning Rate Scheduler
///
/// Decreases the learning rate following a cosine curve from lr_max to
/// lr_min: `lr_t = lr_min + 0.5 * (lr_max - lr_min) * (1 + cos(π t / T))`.
pub struct CosineAnnealingLR {
    lr_max: f32,
    lr_min: f32,
    t_max: usize,
    current_step: usize,
}

impl CosineAnnealingLR {
    /// Create a new cosine annealing scheduler
    ///
    /// # Arguments
    /// * `lr_max` - Initial (maximum) learning rate
    /// * `t_max` - Total number of steps for the schedule
    /// * `lr_min` - Minimum learning rate
    pub fn new(lr_max: f32, t_max: usize, lr_min: f32) -> Self {
        Self {
            lr_max,
            lr_min,
            t_max,
            current_step: 0,
        }
    }

    /// Create scheduler with lr_min = 0
    pub fn default_min(lr_max: f32, t_max: usize) -> Self {
        Self::new(lr_max, t_max, 0.0)
    }
}

impl LrScheduler for CosineAnnealingLR {
    fn get_lr(&self) -> f32 {
        if self.current_step >= self.t_max {
            return self.lr_min;
        }

        let progress = self.current_step as f32 / self.t_max as f32;
        let cosine_decay = 0.5 * (1.0 + (PI * progress).cos());
        self.lr_min + (self.lr_max - self.lr_min) * cosine_decay
    }

    fn step(&mut self) {
        self.current_step += 1;
    }

    fn state(&self) -> SchedulerState {
        SchedulerState {
            current_step: self.current_step,
        }
    }

    fn load_state(&mut self, state: &SchedulerState) {
        self.current_step = state.current_step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_cosine_annealing_initial_lr() {
        let scheduler = CosineAnnealingLR::new(1.0, 100, 0.0);
        assert_abs_diff_eq!(scheduler.get_lr(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_cosine_annealing_final_lr() {
        let mut scheduler = CosineAnnealingLR::new(1.0, 100, 0.1);
        for _ in 0..100 {
            scheduler.step();
        }
        assert_abs_diff_eq!(scheduler.get_lr(), 0.1, epsilon = 1e-6);
    }

    #[test]
    fn test_cosine_annealing_midpoint() {
        let mut scheduler = CosineAnnealingLR::new(1.0, 100, 0.0);
        for _ in 0..50 {
            scheduler.step();
        }
        // cos(π/2) = 0, so lr = lr_max / 2
        assert_abs_diff_eq!(scheduler.get_lr(), 0.5, epsilon = 1e-4);
    }

    #[test]
    fn test_cosine_annealing_decreases_monotonically() {
        let mut scheduler = CosineAnnealingLR::new(1.0, 100, 0.0);
        let mut prev_lr = scheduler.get_lr();

        for _ in 0..100 {
            scheduler.step();
            let current_lr = scheduler.get_lr();
            assert!(
                current_lr <= prev_lr,
                "learning rate should decrease monotonically: prev={prev_lr}, current={current_lr}"
            );
            prev_lr = current_lr;
        }
    }

    #[test]
    fn test_apply_to_optimizer() {
        use crate::optim::SGD;

        let mut optimizer = SGD::new(1.0, 0.0);
        let mut scheduler = CosineAnnealingLR::default_min(1.0, 10);

        scheduler.step();
        scheduler.apply(&mut optimizer);
        assert!(optimizer.lr() < 1.0);
    }

    #[test]
    fn test_state_round_trip() {
        let mut scheduler = CosineAnnealingLR::new(1.0, 10, 0.0);
        for _ in 0..4 {
            scheduler.step();
        }
        let state = scheduler.state();

        let mut restored = CosineAnnealingLR::new(1.0, 10, 0.0);
        restored.load_state(&state);
        assert_abs_diff_eq!(restored.get_lr(), scheduler.get_lr(), epsilon = 1e-6);
    }

    #[test]
    fn test_past_t_max_stays_at_min() {
        let mut scheduler = CosineAnnealingLR::new(1.0, 10, 0.0);
        for _ in 0..20 {
            scheduler.step();
        }
        assert_abs_diff_eq!(scheduler.get_lr(), 0.0, epsilon = 1e-6);
    }
}
