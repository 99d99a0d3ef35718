//! Soft IoU loss

use super::{assert_same_shape, GradScatter, LossFn};
use crate::Tensor;
use ndarray::{ArrayD, Axis};
use std::rc::Rc;

/// Soft intersection-over-union loss
///
/// `1 - mean(i/u per sample)` with soft (non-thresholded) sums:
/// `i = Σ p·t`, `u = Σ (p + t - p·t)`.
///
/// Known edge case: a sample whose soft union sums to exactly zero (both
/// prediction and target identically zero) produces NaN, and no guard is
/// applied. The NaN is propagated rather than masked; callers are expected
/// to filter degenerate samples out of the batch upstream.
pub struct IoULoss;

impl LossFn for IoULoss {
    fn forward(&self, predictions: &Tensor, targets: &Tensor) -> Tensor {
        assert_same_shape(predictions, targets);

        let p = predictions.data();
        let t = targets.data();
        let n = p.shape()[0];

        let mut grad = ArrayD::<f32>::zeros(p.raw_dim());
        let mut iou_sum = 0.0f32;

        for s in 0..n {
            let ps = p.index_axis(Axis(0), s);
            let ts = t.index_axis(Axis(0), s);

            let mut i = 0.0f32;
            let mut u = 0.0f32;
            for (&a, &b) in ps.iter().zip(ts.iter()) {
                i += a * b;
                u += a + b - a * b;
            }
            iou_sum += i / u;

            // d(i/u)/dp = (t·u - i·(1 - t)) / u²
            let mut gs = grad.index_axis_mut(Axis(0), s);
            for (g, &b) in gs.iter_mut().zip(ts.iter()) {
                *g = -(b * u - i * (1.0 - b)) / (u * u * n as f32);
            }
        }

        let loss_val = 1.0 - iou_sum / n as f32;
        let mut loss = Tensor::scalar(loss_val, true);

        if predictions.requires_grad() {
            loss.set_backward_op(Rc::new(GradScatter {
                cell: predictions.grad_cell(),
                grad,
            }));
        }
        loss
    }

    fn name(&self) -> &str {
        "IoU"
    }
}
