//! Focal loss

use super::{assert_same_shape, GradScatter, LossFn};
use crate::Tensor;
use ndarray::ArrayD;
use std::rc::Rc;

// Keeps ln finite when a probability input is exactly 0 or 1.
const PROB_EPS: f32 = 1e-7;

/// Focal loss: binary cross-entropy reweighted by `alpha·(1 - pt)^gamma`
/// with `pt = exp(-BCE)`.
///
/// Inputs are probabilities by default; set `logits` to feed raw logits
/// through the numerically stable BCE-with-logits form. With `reduce` the
/// loss is the scalar mean; without it the per-element map is returned
/// as-is and carries no backward op (the reduced form is the training
/// path).
pub struct FocalLoss {
    alpha: f32,
    gamma: f32,
    logits: bool,
    reduce: bool,
}

impl FocalLoss {
    pub fn new(alpha: f32, gamma: f32, logits: bool, reduce: bool) -> Self {
        Self {
            alpha,
            gamma,
            logits,
            reduce,
        }
    }

    /// Elementwise BCE and its derivative with respect to the raw input.
    fn bce_and_slope(&self, x: f32, t: f32) -> (f32, f32) {
        if self.logits {
            let bce = x.max(0.0) - x * t + (-x.abs()).exp().ln_1p();
            let sigma = 1.0 / (1.0 + (-x).exp());
            (bce, sigma - t)
        } else {
            let p = x.clamp(PROB_EPS, 1.0 - PROB_EPS);
            let bce = -(t * p.ln() + (1.0 - t) * (1.0 - p).ln());
            (bce, (p - t) / (p * (1.0 - p)))
        }
    }

    /// d(alpha·(1-pt)^gamma·bce)/d(bce)
    fn focal_slope(&self, bce: f32) -> f32 {
        if bce == 0.0 {
            return if self.gamma == 0.0 { self.alpha } else { 0.0 };
        }
        let pt = (-bce).exp();
        let base = (1.0 - pt).powf(self.gamma);
        let reweight = self.gamma * pt * bce * (1.0 - pt).powf(self.gamma - 1.0);
        self.alpha * (base + reweight)
    }
}

impl Default for FocalLoss {
    fn default() -> Self {
        Self::new(1.0, 2.0, false, true)
    }
}

impl LossFn for FocalLoss {
    fn forward(&self, predictions: &Tensor, targets: &Tensor) -> Tensor {
        assert_same_shape(predictions, targets);

        let p = predictions.data();
        let t = targets.data();
        let count = p.len();

        let mut map = ArrayD::<f32>::zeros(p.raw_dim());
        let mut grad = ArrayD::<f32>::zeros(p.raw_dim());

        for ((m, g), (&x, &y)) in map
            .iter_mut()
            .zip(grad.iter_mut())
            .zip(p.iter().zip(t.iter()))
        {
            let (bce, bce_slope) = self.bce_and_slope(x, y);
            let pt = (-bce).exp();
            *m = self.alpha * (1.0 - pt).powf(self.gamma) * bce;
            *g = self.focal_slope(bce) * bce_slope / count as f32;
        }

        if !self.reduce {
            return Tensor::new(map, false);
        }

        let loss_val = map.sum() / count as f32;
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
        "Focal"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_gamma_zero_reduces_to_bce() {
        let p = Tensor::from_shape_vec(&[1, 1, 3], vec![0.9, 0.3, 0.6], true);
        let t = Tensor::from_shape_vec(&[1, 1, 3], vec![1.0, 0.0, 1.0], false);
        let focal = FocalLoss::new(1.0, 0.0, false, true).forward(&p, &t).item();

        let bce_mean = [(0.9f32, 1.0f32), (0.3, 0.0), (0.6, 1.0)]
            .iter()
            .map(|&(pv, tv)| -(tv * pv.ln() + (1.0 - tv) * (1.0 - pv).ln()))
            .sum::<f32>()
            / 3.0;
        assert_relative_eq!(focal, bce_mean, epsilon = 1e-5);
    }

    #[test]
    fn test_confident_correct_prediction_downweighted() {
        let t = Tensor::from_shape_vec(&[1, 1, 1], vec![1.0], false);
        let confident = Tensor::from_shape_vec(&[1, 1, 1], vec![0.95], true);
        let unsure = Tensor::from_shape_vec(&[1, 1, 1], vec![0.6], true);

        let loss_fn = FocalLoss::default();
        let l_confident = loss_fn.forward(&confident, &t).item();
        let l_unsure = loss_fn.forward(&unsure, &t).item();
        assert!(l_confident < l_unsure);
    }

    #[test]
    fn test_unreduced_returns_element_map() {
        let p = Tensor::from_shape_vec(&[2, 1, 2], vec![0.9, 0.3, 0.5, 0.7], true);
        let t = Tensor::from_shape_vec(&[2, 1, 2], vec![1.0, 0.0, 1.0, 0.0], false);
        let map = FocalLoss::new(1.0, 2.0, false, false).forward(&p, &t);
        assert_eq!(map.shape(), &[2, 1, 2]);
        assert!(map.backward_op().is_none());
    }

    #[test]
    fn test_extreme_probabilities_stay_finite() {
        let p = Tensor::from_shape_vec(&[1, 1, 2], vec![0.0, 1.0], true);
        let t = Tensor::from_shape_vec(&[1, 1, 2], vec![1.0, 0.0], false);
        let loss = FocalLoss::default().forward(&p, &t);
        assert!(loss.item().is_finite());
    }

    #[test]
    fn test_gradient_matches_finite_difference_prob() {
        let data = vec![0.3, 0.8, 0.55];
        let t = Tensor::from_shape_vec(&[1, 1, 3], vec![1.0, 0.0, 1.0], false);
        let loss_fn = FocalLoss::default();

        let p = Tensor::from_shape_vec(&[1, 1, 3], data.clone(), true);
        let loss = loss_fn.forward(&p, &t);
        loss.backward_op().unwrap().backward();
        let g = p.grad().unwrap();

        let eps = 1e-3;
        for j in 0..3 {
            let mut bumped = data.clone();
            bumped[j] += eps;
            let pb = Tensor::from_shape_vec(&[1, 1, 3], bumped, false);
            let fd = (loss_fn.forward(&pb, &t).item() - loss.item()) / eps;
            assert_relative_eq!(fd, g.as_slice().unwrap()[j], epsilon = 1e-2);
        }
    }

    #[test]
    fn test_gradient_matches_finite_difference_logits() {
        let data = vec![-1.2, 0.4, 2.0];
        let t = Tensor::from_shape_vec(&[1, 1, 3], vec![0.0, 1.0, 1.0], false);
        let loss_fn = FocalLoss::new(1.0, 2.0, true, true);

        let p = Tensor::from_shape_vec(&[1, 1, 3], data.clone(), true);
        let loss = loss_fn.forward(&p, &t);
        loss.backward_op().unwrap().backward();
        let g = p.grad().unwrap();

        let eps = 1e-3;
        for j in 0..3 {
            let mut bumped = data.clone();
            bumped[j] += eps;
            let pb = Tensor::from_shape_vec(&[1, 1, 3], bumped, false);
            let fd = (loss_fn.forward(&pb, &t).item() - loss.item()) / eps;
            assert_relative_eq!(fd, g.as_slice().unwrap()[j], epsilon = 1e-2);
        }
    }
}
