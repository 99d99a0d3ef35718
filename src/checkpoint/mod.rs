//! Checkpoint record and chunked persistence
//!
//! A [`Checkpoint`] captures everything needed to resume or reproduce a
//! training run at an epoch boundary: model, optimizer, and scheduler
//! snapshots plus running statistics. Serialized checkpoints pass through
//! the chunk codec so no single persisted artifact exceeds the configured
//! size ceiling.

mod chunk;

pub use chunk::{chunk_name, join_chunks, join_chunks_to_file, split_to_chunks};

use crate::optim::{OptimizerState, SchedulerState};
use crate::train::ModelState;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default chunk ceiling: comfortably under common per-file hosting limits.
pub const DEFAULT_CHUNK_SIZE: usize = 40_000_000;

/// Running statistics carried inside a checkpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingStats {
    pub best_iou: f32,
    pub loss_history: Vec<f32>,
    pub iteration_count: usize,
}

/// Serialized training state at an epoch boundary; immutable once built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub epoch: usize,
    pub model: ModelState,
    pub optimizer: OptimizerState,
    pub scheduler: SchedulerState,
    pub stats: TrainingStats,
}

impl Checkpoint {
    /// Serialize to a byte stream
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| Error::Serialization(format!("checkpoint encode: {e}")))
    }

    /// Deserialize from a byte stream
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| Error::Serialization(format!("checkpoint decode: {e}")))
    }

    /// Serialize and split into chunk files under `dir`
    pub fn save_chunked(&self, prefix: &str, dir: &Path, chunk_size: usize) -> Result<Vec<String>> {
        split_to_chunks(&self.to_bytes()?, prefix, dir, chunk_size)
    }

    /// Reassemble and deserialize a checkpoint saved with
    /// [`save_chunked`](Checkpoint::save_chunked)
    pub fn load_chunked(prefix: &str, dir: &Path, delete_chunks: bool) -> Result<Self> {
        Self::from_bytes(&join_chunks(prefix, dir, delete_chunks)?)
    }
}
