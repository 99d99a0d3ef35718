//! Model collaborator abstraction

use crate::autograd::TensorState;
use crate::Tensor;
use serde::{Deserialize, Serialize};

/// Train/eval mode toggle for the model collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Train,
    Eval,
}

/// Named parameter snapshots, the unit of best-model tracking and
/// checkpoint persistence. Taking and restoring states are whole-value
/// operations; the trainer never mutates a snapshot in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelState {
    pub params: Vec<(String, TensorState)>,
}

/// The model collaborator consumed by the trainer
///
/// Maps an input batch `[N, C, H, W]` to predictions `[N, H, W]` of
/// matching spatial shape. To participate in backpropagation the forward
/// pass attaches a backward op to the returned prediction tensor; the
/// trainer triggers it after the loss gradient has landed in the
/// prediction's gradient cell, and the op is responsible for carrying that
/// gradient into the tensors exposed by
/// [`parameters`](SegmentationModel::parameters).
pub trait SegmentationModel {
    /// Forward pass
    fn forward(&mut self, inputs: &Tensor) -> Tensor;

    /// Toggle train/eval behavior (dropout, statistics freezing, …)
    fn set_mode(&mut self, mode: Mode);

    /// Trainable parameters, in a stable order
    fn parameters(&mut self) -> &mut [Tensor];

    /// Take an immutable value snapshot of all parameters
    fn state(&self) -> ModelState;

    /// Restore parameters from a snapshot
    fn load_state(&mut self, state: &ModelState);
}
