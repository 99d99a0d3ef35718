//! Hinge loss

use super::{assert_same_shape, GradScatter, LossFn};
use crate::Tensor;
use ndarray::ArrayD;
use std::rc::Rc;

/// Two-sided hinge loss over positive/negative pixel groups
///
/// Elements with target ≥ 0.5 form the positive group, the rest the
/// negative group; the loss is `mean(relu(1 - pred))` over positives plus
/// `mean(relu(pred + 1))` over negatives.
///
/// The sign convention assumes predictions already mapped to a `{-1, +1}`
/// margin space. That is inherited from this loss's lineage, not a design
/// requirement: fed raw `[0, 1]` probabilities it has no stable zero
/// point. The lineage also left the loss of an absent group undefined (an
/// unassigned-variable failure); here an empty group contributes zero.
pub struct HingeLoss;

impl LossFn for HingeLoss {
    fn forward(&self, predictions: &Tensor, targets: &Tensor) -> Tensor {
        assert_same_shape(predictions, targets);

        let p = predictions.data();
        let t = targets.data();

        let mut grad = ArrayD::<f32>::zeros(p.raw_dim());

        let n_pos = t.iter().filter(|&&y| y >= 0.5).count();
        let n_neg = t.len() - n_pos;

        let mut pos_loss = 0.0f32;
        let mut neg_loss = 0.0f32;
        for (g, (&x, &y)) in grad.iter_mut().zip(p.iter().zip(t.iter())) {
            if y >= 0.5 {
                if 1.0 - x > 0.0 {
                    pos_loss += 1.0 - x;
                    *g = -1.0 / n_pos as f32;
                }
            } else if x + 1.0 > 0.0 {
                neg_loss += x + 1.0;
                *g = 1.0 / n_neg as f32;
            }
        }

        let pos_mean = if n_pos > 0 { pos_loss / n_pos as f32 } else { 0.0 };
        let neg_mean = if n_neg > 0 { neg_loss / n_neg as f32 } else { 0.0 };

        let mut loss = Tensor::scalar(pos_mean + neg_mean, true);
        if predictions.requires_grad() {
            loss.set_backward_op(Rc::new(GradScatter {
                cell: predictions.grad_cell(),
                grad,
            }));
        }
        loss
    }

    fn name(&self) -> &str {
        "Hinge"
    }
}
