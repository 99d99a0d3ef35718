//! Numeric dataset cache
//!
//! Decoding thousands of source images is slow; the numeric arrays are
//! cached on disk after the first pass. Loading is an explicit
//! existence-and-validity check returning a `Result`; a miss is an
//! expected path that triggers reconstruction and a cache rewrite, never
//! an error surfaced to the caller of
//! [`load_or_rebuild`](DatasetCache::load_or_rebuild).

use super::Dataset;
use crate::autograd::TensorState;
use crate::logging::RunLogger;
use crate::{Error, Result};
use ndarray::{Array3, Array4};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// On-disk cache of a fully decoded dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetCache {
    /// Images, `[N, C, H, W]`
    pub images: TensorState,
    /// Masks, `[N, H, W]`
    pub masks: TensorState,
    /// Depth per sample
    pub depths: Vec<f32>,
    /// Source row identifiers (image file stems)
    pub ids: Vec<String>,
}

impl DatasetCache {
    /// Load and validate a cache file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::CacheInvalid(format!("missing file {}", path.display())));
        }
        let bytes = fs::read(path)?;
        let cache: DatasetCache = serde_json::from_slice(&bytes)
            .map_err(|e| Error::CacheInvalid(format!("unreadable cache: {e}")))?;
        cache.validate()?;
        Ok(cache)
    }

    /// Write the cache file, replacing any previous content.
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = serde_json::to_vec(self)
            .map_err(|e| Error::Serialization(format!("cache encode: {e}")))?;
        fs::write(path, bytes)?;
        Ok(())
    }

    /// Structural validity: 4-D images, 3-D masks, consistent row count.
    pub fn validate(&self) -> Result<()> {
        if self.images.shape.len() != 4 {
            return Err(Error::CacheInvalid(format!(
                "images must be 4-D, got shape {:?}",
                self.images.shape
            )));
        }
        if self.masks.shape.len() != 3 {
            return Err(Error::CacheInvalid(format!(
                "masks must be 3-D, got shape {:?}",
                self.masks.shape
            )));
        }
        let n = self.images.shape[0];
        if self.masks.shape[0] != n || self.depths.len() != n || self.ids.len() != n {
            return Err(Error::CacheInvalid(format!(
                "row counts disagree: images {n}, masks {}, depths {}, ids {}",
                self.masks.shape[0],
                self.depths.len(),
                self.ids.len()
            )));
        }
        if self.images.data.len() != self.images.shape.iter().product::<usize>()
            || self.masks.data.len() != self.masks.shape.iter().product::<usize>()
        {
            return Err(Error::CacheInvalid("data length does not match shape".into()));
        }
        Ok(())
    }

    /// Load the cache at `path`, rebuilding it via `rebuild` and rewriting
    /// the file when it is missing or invalid.
    pub fn load_or_rebuild<F>(path: &Path, logger: &RunLogger, rebuild: F) -> Result<Self>
    where
        F: FnOnce() -> Result<DatasetCache>,
    {
        match Self::load(path) {
            Ok(cache) => {
                logger.info("Dataset cache loaded.");
                Ok(cache)
            }
            Err(reason) => {
                logger.info(&format!(
                    "Dataset cache unusable ({reason}); rebuilding from source data."
                ));
                let cache = rebuild()?;
                cache.validate()?;
                cache.save(path)?;
                logger.info("Dataset cache rebuilt and written.");
                Ok(cache)
            }
        }
    }

    /// Materialize an in-memory [`Dataset`].
    pub fn to_dataset(&self) -> Result<Dataset> {
        self.validate()?;
        let images = Array4::from_shape_vec(
            (
                self.images.shape[0],
                self.images.shape[1],
                self.images.shape[2],
                self.images.shape[3],
            ),
            self.images.data.clone(),
        )
        .map_err(|e| Error::CacheInvalid(format!("images: {e}")))?;
        let masks = Array3::from_shape_vec(
            (self.masks.shape[0], self.masks.shape[1], self.masks.shape[2]),
            self.masks.data.clone(),
        )
        .map_err(|e| Error::CacheInvalid(format!("masks: {e}")))?;
        Ok(Dataset::new(images, masks, self.depths.clone()))
    }
}
