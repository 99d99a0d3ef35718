//! Batches and in-memory datasets
//!
//! The trainer consumes restartable batch factories (`Fn() -> impl
//! IntoIterator<Item = Batch>`); [`Dataset`] is the in-memory realization
//! used by the companion tooling and tests. Image decoding and
//! augmentation live outside this crate, so a dataset is built from
//! already numeric `[N, C, H, W]` / `[N, H, W]` arrays.

mod cache;

pub use cache::DatasetCache;

use crate::Tensor;
use ndarray::{s, Array3, Array4};

/// One training batch
///
/// `ids` identify dataset rows for later lookup (visualization hooks,
/// submission naming); `depths` carry the auxiliary per-sample depth
/// measurement.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Inputs, `[N, C, H, W]`
    pub inputs: Tensor,
    /// Binary target masks, `[N, H, W]`
    pub targets: Tensor,
    /// Auxiliary depth per sample
    pub depths: Vec<f32>,
    /// Dataset row ids
    pub ids: Vec<usize>,
}

impl Batch {
    /// Create a batch, checking the batch-dimension invariant.
    pub fn new(inputs: Tensor, targets: Tensor, depths: Vec<f32>, ids: Vec<usize>) -> Self {
        let n = inputs.shape()[0];
        assert_eq!(targets.shape()[0], n, "targets batch dimension mismatch");
        assert_eq!(depths.len(), n, "depths length mismatch");
        assert_eq!(ids.len(), n, "ids length mismatch");
        Self {
            inputs,
            targets,
            depths,
            ids,
        }
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// In-memory dataset over numeric arrays
pub struct Dataset {
    images: Array4<f32>,
    masks: Array3<f32>,
    depths: Vec<f32>,
}

impl Dataset {
    /// Create a dataset; masks are clipped to `[0, 1]`.
    pub fn new(images: Array4<f32>, masks: Array3<f32>, depths: Vec<f32>) -> Self {
        let n = images.dim().0;
        assert_eq!(masks.dim().0, n, "masks batch dimension mismatch");
        assert_eq!(depths.len(), n, "depths length mismatch");
        Self {
            images,
            masks: masks.mapv(|v| v.clamp(0.0, 1.0)),
            depths,
        }
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.images.dim().0
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate the dataset in fixed-size batches, in row order. The final
    /// batch may be short. Call again for a fresh pass; each call is an
    /// independent restart.
    pub fn batches(&self, batch_size: usize) -> impl Iterator<Item = Batch> + '_ {
        assert!(batch_size > 0, "batch_size must be positive");
        let n = self.len();
        (0..n).step_by(batch_size).map(move |start| {
            let end = (start + batch_size).min(n);
            let inputs = self
                .images
                .slice(s![start..end, .., .., ..])
                .to_owned()
                .into_dyn();
            let targets = self.masks.slice(s![start..end, .., ..]).to_owned().into_dyn();
            Batch::new(
                Tensor::new(inputs, false),
                Tensor::new(targets, false),
                self.depths[start..end].to_vec(),
                (start..end).collect(),
            )
        })
    }
}
