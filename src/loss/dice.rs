//! Dice loss

use super::{assert_same_shape, GradScatter, LossFn};
use crate::Tensor;
use ndarray::{ArrayD, Axis};
use std::rc::Rc;

/// Dice loss with additive smoothing
///
/// Per sample: `1 - (2i + smooth) / (Σp + Σt + smooth)` with `i = Σ p·t`,
/// averaged over the batch and scaled by `alpha`. The smoothing constant
/// keeps the denominator positive on empty masks.
pub struct DiceLoss {
    smooth: f32,
    alpha: f32,
}

impl DiceLoss {
    pub fn new(smooth: f32, alpha: f32) -> Self {
        Self { smooth, alpha }
    }
}

impl Default for DiceLoss {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

impl LossFn for DiceLoss {
    fn forward(&self, predictions: &Tensor, targets: &Tensor) -> Tensor {
        assert_same_shape(predictions, targets);

        let p = predictions.data();
        let t = targets.data();
        let n = p.shape()[0];

        let mut grad = ArrayD::<f32>::zeros(p.raw_dim());
        let mut dice_sum = 0.0f32;

        for s in 0..n {
            let ps = p.index_axis(Axis(0), s);
            let ts = t.index_axis(Axis(0), s);

            let mut i = 0.0f32;
            let mut sum_p = 0.0f32;
            let mut sum_t = 0.0f32;
            for (&a, &b) in ps.iter().zip(ts.iter()) {
                i += a * b;
                sum_p += a;
                sum_t += b;
            }
            let denom = sum_p + sum_t + self.smooth;
            let numer = 2.0 * i + self.smooth;
            dice_sum += 1.0 - numer / denom;

            // d(1 - numer/denom)/dp = -(2t·denom - numer) / denom²
            let scale = self.alpha / n as f32;
            let mut gs = grad.index_axis_mut(Axis(0), s);
            for (g, &b) in gs.iter_mut().zip(ts.iter()) {
                *g = -(2.0 * b * denom - numer) / (denom * denom) * scale;
            }
        }

        let loss_val = self.alpha * dice_sum / n as f32;
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
        "Dice"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_perfect_prediction_near_zero_loss() {
        // With smooth = 1 a perfect 2-positive mask scores
        // 1 - (2*2 + 1)/(2 + 2 + 1) = 0
        let p = Tensor::from_shape_vec(&[1, 2, 2], vec![1.0, 1.0, 0.0, 0.0], true);
        let t = Tensor::from_shape_vec(&[1, 2, 2], vec![1.0, 1.0, 0.0, 0.0], false);
        let loss = DiceLoss::default().forward(&p, &t);
        assert_relative_eq!(loss.item(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_empty_masks_no_division_by_zero() {
        let p = Tensor::zeros(&[1, 2, 2], true);
        let t = Tensor::zeros(&[1, 2, 2], false);
        let loss = DiceLoss::default().forward(&p, &t);
        // numer = smooth, denom = smooth -> dice term 0
        assert_relative_eq!(loss.item(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_alpha_scales_loss() {
        let p = Tensor::from_shape_vec(&[1, 1, 2], vec![0.5, 0.5], true);
        let t = Tensor::from_shape_vec(&[1, 1, 2], vec![1.0, 0.0], false);
        let base = DiceLoss::new(1.0, 1.0).forward(&p, &t).item();
        let doubled = DiceLoss::new(1.0, 2.0).forward(&p, &t).item();
        assert_relative_eq!(doubled, 2.0 * base, epsilon = 1e-6);
    }

    #[test]
    fn test_gradient_matches_finite_difference() {
        let data = vec![0.2, 0.8, 0.4, 0.6];
        let t = Tensor::from_shape_vec(&[1, 2, 2], vec![0.0, 1.0, 1.0, 0.0], false);
        let loss_fn = DiceLoss::default();

        let p = Tensor::from_shape_vec(&[1, 2, 2], data.clone(), true);
        let loss = loss_fn.forward(&p, &t);
        loss.backward_op().unwrap().backward();
        let g = p.grad().unwrap();

        let eps = 1e-3;
        for j in 0..4 {
            let mut bumped = data.clone();
            bumped[j] += eps;
            let pb = Tensor::from_shape_vec(&[1, 2, 2], bumped, false);
            let fd = (loss_fn.forward(&pb, &t).item() - loss.item()) / eps;
            assert_relative_eq!(fd, g.as_slice().unwrap()[j], epsilon = 1e-2);
        }
    }
}
