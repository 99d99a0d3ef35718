//! Lovász-hinge loss
//!
//! Optimizes the Jaccard index through its Lovász extension: a convex,
//! piecewise-linear extension of the set function whose subgradient, once
//! hinge errors are sorted in descending order, equals the discrete first
//! differences of the Jaccard sequence over the sorted ground truth.

use super::{assert_same_shape, GradScatter, LossFn};
use crate::Tensor;
use ndarray::{ArrayD, Axis};
use std::rc::Rc;

/// Gradient of the Lovász extension with respect to sorted errors.
///
/// For `gt_sorted` (ground truth reordered by descending hinge error) the
/// running intersection is `gts - cumsum(gt)` and the running union is
/// `gts + cumsum(1 - gt)`, where `gts` is the total positive count. The
/// Jaccard-at-rank sequence `1 - intersection/union` is first-differenced
/// from index 1 onward (index 0 unchanged).
///
/// The returned vector always has the input's length.
pub fn lovasz_grad(gt_sorted: &[f32]) -> Vec<f32> {
    let p = gt_sorted.len();
    if p == 0 {
        return Vec::new();
    }

    let gts: f32 = gt_sorted.iter().sum();
    let mut jaccard = Vec::with_capacity(p);
    let mut cum_gt = 0.0f32;
    let mut cum_not = 0.0f32;
    for &g in gt_sorted {
        cum_gt += g;
        cum_not += 1.0 - g;
        let intersection = gts - cum_gt;
        let union = gts + cum_not;
        jaccard.push(1.0 - intersection / union);
    }

    // First-difference in place, highest rank first so each step still
    // reads the undifferenced predecessor.
    for k in (1..p).rev() {
        jaccard[k] -= jaccard[k - 1];
    }
    jaccard
}

/// Binary Lovász-hinge loss over logits
///
/// Per image (the default) each `[H, W]` plane is flattened, optionally
/// filtered of an ignore label, and scored independently; the batch loss is
/// the mean over images, with an empty batch yielding a configurable
/// default (0). With `per_batch` the whole batch flattens to one sequence.
///
/// An image left without labeled pixels after ignore-filtering contributes
/// zero loss through a zero-gradient path; intersection and union are
/// ill-defined on an empty set, so this is not a failure.
pub struct LovaszHingeLoss {
    per_image: bool,
    ignore: Option<f32>,
    empty_default: f32,
}

impl LovaszHingeLoss {
    pub fn new() -> Self {
        Self {
            per_image: true,
            ignore: None,
            empty_default: 0.0,
        }
    }

    /// Score the flattened batch as a single sequence instead of per image.
    pub fn per_batch(mut self) -> Self {
        self.per_image = false;
        self
    }

    /// Filter out pixels whose target equals `label` before scoring.
    pub fn with_ignore(mut self, label: f32) -> Self {
        self.ignore = Some(label);
        self
    }

    /// Value returned for an empty batch.
    pub fn with_empty_default(mut self, value: f32) -> Self {
        self.empty_default = value;
        self
    }

    /// Loss and per-element logit gradient for one flattened sequence.
    fn hinge_flat(logits: &[f32], labels: &[f32]) -> (f32, Vec<f32>) {
        if labels.is_empty() {
            return (0.0, Vec::new());
        }

        let signs: Vec<f32> = labels.iter().map(|&l| 2.0 * l - 1.0).collect();
        let errors: Vec<f32> = logits
            .iter()
            .zip(&signs)
            .map(|(&x, &s)| 1.0 - x * s)
            .collect();

        let mut perm: Vec<usize> = (0..errors.len()).collect();
        perm.sort_by(|&a, &b| {
            errors[b]
                .partial_cmp(&errors[a])
                .expect("non-finite hinge error")
        });

        let gt_sorted: Vec<f32> = perm.iter().map(|&i| labels[i]).collect();
        let grad = lovasz_grad(&gt_sorted);

        let mut loss = 0.0f32;
        let mut dlogit = vec![0.0f32; logits.len()];
        for (k, &i) in perm.iter().enumerate() {
            if errors[i] > 0.0 {
                loss += errors[i] * grad[k];
                dlogit[i] = -signs[i] * grad[k];
            }
        }
        (loss, dlogit)
    }

    /// Flatten one plane, dropping ignored positions; returns the kept
    /// original positions alongside the filtered logits/labels.
    fn flatten_filtered(
        &self,
        logits: &[f32],
        labels: &[f32],
    ) -> (Vec<f32>, Vec<f32>, Vec<usize>) {
        match self.ignore {
            None => (logits.to_vec(), labels.to_vec(), (0..labels.len()).collect()),
            Some(void) => {
                let mut vl = Vec::new();
                let mut vt = Vec::new();
                let mut kept = Vec::new();
                for (i, (&x, &y)) in logits.iter().zip(labels.iter()).enumerate() {
                    if y != void {
                        vl.push(x);
                        vt.push(y);
                        kept.push(i);
                    }
                }
                (vl, vt, kept)
            }
        }
    }
}

impl Default for LovaszHingeLoss {
    fn default() -> Self {
        Self::new()
    }
}

impl LossFn for LovaszHingeLoss {
    fn forward(&self, predictions: &Tensor, targets: &Tensor) -> Tensor {
        assert_same_shape(predictions, targets);

        let p = predictions.data();
        let t = targets.data();
        let n = p.shape()[0];

        let mut grad = ArrayD::<f32>::zeros(p.raw_dim());

        let loss_val = if self.per_image {
            if n == 0 {
                self.empty_default
            } else {
                let mut total = 0.0f32;
                for s in 0..n {
                    let logits: Vec<f32> = p.index_axis(Axis(0), s).iter().copied().collect();
                    let labels: Vec<f32> = t.index_axis(Axis(0), s).iter().copied().collect();
                    let (vl, vt, kept) = self.flatten_filtered(&logits, &labels);
                    let (loss_s, dflat) = Self::hinge_flat(&vl, &vt);
                    total += loss_s;

                    let mut sample_grad = vec![0.0f32; logits.len()];
                    for (j, &pos) in kept.iter().enumerate() {
                        sample_grad[pos] = dflat[j] / n as f32;
                    }
                    for (g, v) in grad.index_axis_mut(Axis(0), s).iter_mut().zip(sample_grad) {
                        *g = v;
                    }
                }
                total / n as f32
            }
        } else {
            let logits: Vec<f32> = p.iter().copied().collect();
            let labels: Vec<f32> = t.iter().copied().collect();
            let (vl, vt, kept) = self.flatten_filtered(&logits, &labels);
            let (loss_flat, dflat) = Self::hinge_flat(&vl, &vt);

            let mut full_grad = vec![0.0f32; logits.len()];
            for (j, &pos) in kept.iter().enumerate() {
                full_grad[pos] = dflat[j];
            }
            for (g, v) in grad.iter_mut().zip(full_grad) {
                *g = v;
            }
            loss_flat
        };

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
        "LovaszHinge"
    }
}
