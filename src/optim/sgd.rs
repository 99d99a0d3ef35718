//! Stochastic Gradient Descent optimizer

use super::{Optimizer, OptimizerState};
use crate::autograd::TensorState;
use crate::Tensor;
use ndarray::ArrayD;

/// SGD optimizer with optional momentum
pub struct SGD {
    lr: f32,
    momentum: f32,
    velocities: Vec<Option<ArrayD<f32>>>,
}

impl SGD {
    /// Create a new SGD optimizer
    pub fn new(lr: f32, momentum: f32) -> Self {
        Self {
            lr,
            momentum,
            velocities: Vec::new(),
        }
    }

    /// Initialize velocities if needed
    fn ensure_velocities(&mut self, params: &[Tensor]) {
        if self.velocities.is_empty() {
            self.velocities = params.iter().map(|_| None).collect();
        }
    }
}

impl Optimizer for SGD {
    fn step(&mut self, params: &mut [Tensor]) {
        self.ensure_velocities(params);

        for (i, param) in params.iter_mut().enumerate() {
            if let Some(grad) = param.grad() {
                if self.momentum > 0.0 {
                    // v = momentum * v - lr * grad
                    let velocity = if let Some(v) = &self.velocities[i] {
                        v * self.momentum - &grad * self.lr
                    } else {
                        &grad * (-self.lr)
                    };

                    *param.data_mut() = param.data() + &velocity;
                    self.velocities[i] = Some(velocity);
                } else {
                    // Simple SGD: param -= lr * grad
                    *param.data_mut() = param.data() - &(&grad * self.lr);
                }
            }
        }
    }

    fn lr(&self) -> f32 {
        self.lr
    }

    fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }

    fn state(&self) -> OptimizerState {
        OptimizerState {
            lr: self.lr,
            step_count: 0,
            slots: vec![self
                .velocities
                .iter()
                .map(|v| v.as_ref().map(TensorState::from_array))
                .collect()],
        }
    }

    fn load_state(&mut self, state: &OptimizerState) {
        self.lr = state.lr;
        self.velocities = state
            .slots
            .first()
            .map(|group| group.iter().map(|s| s.as_ref().map(|t| t.to_array())).collect())
            .unwrap_or_default();
    }
}
