//! Loss functions for segmentation training
//!
//! Every loss is a scalar-valued function of `(prediction, target)` batches
//! shaped `[N, H, W]`. Differentiability is realized through the crate's
//! tape primitives: the forward pass computes the scalar eagerly and
//! registers a [`BackwardOp`](crate::autograd::BackwardOp) carrying the
//! analytically derived gradient, which the model collaborator picks up
//! from the prediction tensor's gradient cell.

mod dice;
mod focal;
mod hinge;
mod iou;
mod lovasz;

pub use dice::DiceLoss;
pub use focal::FocalLoss;
pub use hinge::HingeLoss;
pub use iou::IoULoss;
pub use lovasz::{lovasz_grad, LovaszHingeLoss};

use crate::autograd::BackwardOp;
use crate::Tensor;
use ndarray::ArrayD;
use std::cell::RefCell;
use std::rc::Rc;

/// Trait for loss functions
pub trait LossFn {
    /// Compute the loss for a batch of predictions and targets.
    ///
    /// Returns a scalar tensor wired for backpropagation into the
    /// prediction's gradient cell.
    fn forward(&self, predictions: &Tensor, targets: &Tensor) -> Tensor;

    /// Name of the loss function
    fn name(&self) -> &str;
}

/// Backward op that accumulates a precomputed gradient into a grad cell.
pub(crate) struct GradScatter {
    pub(crate) cell: Rc<RefCell<Option<ArrayD<f32>>>>,
    pub(crate) grad: ArrayD<f32>,
}

impl BackwardOp for GradScatter {
    fn backward(&self) {
        let mut slot = self.cell.borrow_mut();
        if let Some(existing) = slot.as_mut() {
            *existing = &*existing + &self.grad;
        } else {
            *slot = Some(self.grad.clone());
        }
    }
}

pub(crate) fn assert_same_shape(predictions: &Tensor, targets: &Tensor) {
    assert_eq!(
        predictions.shape(),
        targets.shape(),
        "Predictions and targets must have the same shape"
    );
}
