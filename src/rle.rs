//! Submission mask encoding and prediction adjustment
//!
//! The submission format is a run-length encoding over the column-major
//! flattening of a binary mask: alternating `start length` pairs with
//! 1-based start indices, space-separated, one pair per maximal run of
//! positive pixels. An all-zero mask encodes to the empty string.

use crate::logging::RunLogger;
use crate::metrics::threshold_avg_iou;
use crate::{Error, Result};
use ndarray::{Array2, Array3, ArrayView2, ArrayView3, ArrayView4, Axis};

/// Encode one `[H, W]` mask. Values are clipped to `[0, 1]`; any strictly
/// positive pixel counts as part of a run.
pub fn rle_encode_mask(mask: ArrayView2<f32>) -> String {
    let (h, w) = mask.dim();
    let mut pairs: Vec<String> = Vec::new();
    let mut run_start = 0usize;
    let mut run_len = 0usize;

    let mut position = 0usize;
    for c in 0..w {
        for r in 0..h {
            position += 1;
            if mask[[r, c]].clamp(0.0, 1.0) > 0.0 {
                if run_len == 0 {
                    run_start = position;
                }
                run_len += 1;
            } else if run_len > 0 {
                pairs.push(format!("{run_start} {run_len}"));
                run_len = 0;
            }
        }
    }
    if run_len > 0 {
        pairs.push(format!("{run_start} {run_len}"));
    }
    pairs.join(" ")
}

/// Encode every mask in a `[N, H, W]` batch
pub fn rle_encode_batch(masks: ArrayView3<f32>) -> Vec<String> {
    masks
        .axis_iter(Axis(0))
        .map(|m| rle_encode_mask(m.view()))
        .collect()
}

/// Decode a run-length string back into an `[H, W]` binary mask
pub fn rle_decode(rle: &str, height: usize, width: usize) -> Result<Array2<f32>> {
    let mut flat = vec![0.0f32; height * width];

    let tokens: Vec<&str> = rle.split_whitespace().collect();
    if tokens.len() % 2 != 0 {
        return Err(Error::Serialization(format!(
            "run-length decode: odd token count {}",
            tokens.len()
        )));
    }

    for pair in tokens.chunks(2) {
        let start: usize = pair[0]
            .parse()
            .map_err(|_| Error::Serialization(format!("run-length decode: bad start '{}'", pair[0])))?;
        let len: usize = pair[1]
            .parse()
            .map_err(|_| Error::Serialization(format!("run-length decode: bad length '{}'", pair[1])))?;
        if start == 0 || start + len - 1 > flat.len() {
            return Err(Error::Serialization(format!(
                "run-length decode: run {start}+{len} outside a {height}x{width} mask"
            )));
        }
        for slot in &mut flat[start - 1..start - 1 + len] {
            *slot = 1.0;
        }
    }

    // Positions are column-major: position p sits at row p % h, column p / h.
    let mut mask = Array2::zeros((height, width));
    for (p, &v) in flat.iter().enumerate() {
        if v > 0.0 {
            mask[[p % height, p / height]] = v;
        }
    }
    Ok(mask)
}

/// Suppress implausible positive predictions before submission.
///
/// Clips predictions to `[0, 1]`, zeroes every prediction for an all-black
/// input image, and zeroes masks whose positive-pixel sum does not exceed
/// `zero_mask_cutoff`. When targets are supplied the score before and
/// after adjustment is logged.
pub fn adjust_predictions(
    inputs: ArrayView4<f32>,
    predictions: ArrayView3<f32>,
    targets: Option<ArrayView3<f32>>,
    zero_mask_cutoff: f32,
    logger: &RunLogger,
) -> Array3<f32> {
    assert_eq!(
        inputs.dim().0,
        predictions.dim().0,
        "inputs and predictions must agree on the batch dimension"
    );

    let mut adjusted = predictions.mapv(|v| v.clamp(0.0, 1.0));

    for (s, image) in inputs.axis_iter(Axis(0)).enumerate() {
        let black = image.iter().all(|&v| v == 0.0);
        let mut mask = adjusted.index_axis_mut(Axis(0), s);
        if black || mask.sum() <= zero_mask_cutoff {
            mask.fill(0.0);
        }
    }

    if let Some(truth) = targets {
        logger.info(&format!(
            "IOU score before: {:.4}, IOU score after: {:.4}",
            threshold_avg_iou(predictions, truth),
            threshold_avg_iou(adjusted.view(), truth),
        ));
    }

    adjusted
}
