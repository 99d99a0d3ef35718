//! Evaluation metrics for segmentation masks
//!
//! All functions are pure and operate on `[N, H, W]` views of one numeric
//! container type; predictions and targets are normalized to `ndarray`
//! before entering this module, so there is no runtime type dispatch here.
//! A shape mismatch between prediction and target is a caller contract
//! violation and panics immediately.

use ndarray::{Array1, ArrayView3};

/// The ten IoU thresholds used by [`threshold_avg_iou`]: 0.50 to 0.95 in
/// steps of 0.05.
pub const IOU_THRESHOLDS: [f32; 10] = [0.5, 0.55, 0.6, 0.65, 0.7, 0.75, 0.8, 0.85, 0.9, 0.95];

/// Per-sample intersection-over-union of two `[N, H, W]` mask batches.
///
/// Both inputs are clipped to `[0, 1]` first. Clipping does not binarize:
/// values are expected near 0/1 and callers must threshold beforehand for
/// the IoU to be meaningful. The intersection counts positions where the
/// clipped sum equals 2 (both positive); the union sums the clipped sum
/// clamped back to `[0, 1]`.
///
/// Edge-case policy: two empty masks are a perfect match (IoU = 1). A zero
/// union with a non-zero intersection cannot arise from the formula; the
/// branch yields 0 should it ever be reached.
///
/// # Example
///
/// ```
/// use ndarray::array;
/// use salina::metrics::raw_iou;
///
/// let a = array![[[1.0, 0.0], [0.0, 0.0]]];
/// let b = array![[[1.0, 1.0], [0.0, 0.0]]];
/// let iou = raw_iou(a.view(), b.view());
/// assert!((iou[0] - 0.5).abs() < 1e-6);
/// ```
pub fn raw_iou(pred: ArrayView3<f32>, truth: ArrayView3<f32>) -> Array1<f32> {
    assert_eq!(
        pred.dim(),
        truth.dim(),
        "Predictions and targets must have the same shape"
    );

    let n = pred.dim().0;
    let mut iou = Array1::zeros(n);
    for s in 0..n {
        let p = pred.index_axis(ndarray::Axis(0), s);
        let t = truth.index_axis(ndarray::Axis(0), s);

        let mut intersection = 0.0f32;
        let mut union = 0.0f32;
        for (&a, &b) in p.iter().zip(t.iter()) {
            let sum = a.clamp(0.0, 1.0) + b.clamp(0.0, 1.0);
            if sum == 2.0 {
                intersection += 1.0;
            }
            union += sum.clamp(0.0, 1.0);
        }

        iou[s] = if intersection == union {
            1.0
        } else if union == 0.0 {
            0.0
        } else {
            intersection / union
        };
    }
    iou
}

/// Competition-style average precision over IoU thresholds.
///
/// This is NOT a plain mean of per-sample IoUs, despite what the metric is
/// often casually called: for each threshold in [`IOU_THRESHOLDS`] it takes
/// the fraction of samples whose per-sample IoU strictly exceeds the
/// threshold, then averages over the ten thresholds. A batch that
/// self-compares perfectly scores exactly 1.0.
pub fn threshold_avg_iou(pred: ArrayView3<f32>, truth: ArrayView3<f32>) -> f32 {
    let iou = raw_iou(pred, truth);
    if iou.is_empty() {
        return 0.0;
    }

    let per_sample: f32 = iou
        .iter()
        .map(|&v| {
            let hits = IOU_THRESHOLDS.iter().filter(|&&t| v > t).count();
            hits as f32 / IOU_THRESHOLDS.len() as f32
        })
        .sum();
    per_sample / iou.len() as f32
}

/// Pixelwise classification accuracy.
///
/// Fraction of positions where prediction equals target. Callers threshold
/// predictions before calling; no clipping is applied here.
pub fn classification_accuracy(pred: ArrayView3<f32>, truth: ArrayView3<f32>) -> f32 {
    assert_eq!(
        pred.dim(),
        truth.dim(),
        "Predictions and targets must have the same shape"
    );

    if pred.is_empty() {
        return 0.0;
    }
    let correct = pred
        .iter()
        .zip(truth.iter())
        .filter(|(a, b)| a == b)
        .count();
    correct as f32 / pred.len() as f32
}
