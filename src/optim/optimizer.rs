//! Optimizer trait

use crate::autograd::TensorState;
use crate::Tensor;
use serde::{Deserialize, Serialize};

/// Serializable optimizer state: learning rate, step count, and the moment
/// buffers, grouped one inner vector per moment kind (SGD carries one
/// group of velocities, Adam two groups of moments). A `None` slot is a
/// buffer that has not been touched yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerState {
    pub lr: f32,
    pub step_count: u64,
    pub slots: Vec<Vec<Option<TensorState>>>,
}

/// Trait for optimization algorithms
pub trait Optimizer {
    /// Perform a single optimization step
    fn step(&mut self, params: &mut [Tensor]);

    /// Zero out all gradients
    fn zero_grad(&mut self, params: &mut [Tensor]) {
        for param in params {
            param.zero_grad();
        }
    }

    /// Get learning rate
    fn lr(&self) -> f32;

    /// Set learning rate
    fn set_lr(&mut self, lr: f32);

    /// Take an immutable value snapshot of the optimizer state
    fn state(&self) -> OptimizerState;

    /// Restore from a snapshot
    fn load_state(&mut self, state: &OptimizerState);
}
