//! Training configuration

use std::path::PathBuf;

use crate::checkpoint::DEFAULT_CHUNK_SIZE;

/// Training configuration
#[derive(Clone, Debug)]
pub struct TrainConfig {
    /// Number of epochs to run
    pub num_epochs: usize,

    /// Report batch metrics every N iterations
    pub print_every: usize,

    /// Persist the best snapshot every N epochs (None = never)
    pub save_model_every: Option<usize>,

    /// Fire the log-sync hook every N epochs (None = never)
    pub save_log_every: Option<usize>,

    /// Checkpoint chunk prefix (None = persistence disabled)
    pub checkpoint_prefix: Option<String>,

    /// Directory receiving checkpoint chunks
    pub checkpoint_dir: PathBuf,

    /// Per-chunk size ceiling in bytes
    pub chunk_size: usize,

    /// Binarization threshold applied to predictions before metrics
    pub mask_threshold: f32,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            num_epochs: 25,
            print_every: 10,
            save_model_every: None,
            save_log_every: None,
            checkpoint_prefix: None,
            checkpoint_dir: PathBuf::from("."),
            chunk_size: DEFAULT_CHUNK_SIZE,
            mask_threshold: 0.5,
        }
    }
}

impl TrainConfig {
    /// Create a new training configuration
    pub fn new(num_epochs: usize) -> Self {
        Self {
            num_epochs,
            ..Self::default()
        }
    }

    /// Set the batch-report cadence in iterations
    pub fn with_print_every(mut self, iterations: usize) -> Self {
        self.print_every = iterations.max(1);
        self
    }

    /// Persist checkpoints under `dir/prefix-chunk-*` every `epochs` epochs
    pub fn with_checkpoints(mut self, epochs: usize, prefix: impl Into<String>, dir: PathBuf) -> Self {
        self.save_model_every = Some(epochs);
        self.checkpoint_prefix = Some(prefix.into());
        self.checkpoint_dir = dir;
        self
    }

    /// Set the per-chunk size ceiling
    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes;
        self
    }

    /// Fire the log-sync hook every `epochs` epochs
    pub fn with_log_sync_every(mut self, epochs: usize) -> Self {
        self.save_log_every = Some(epochs);
        self
    }

    /// Set the metric binarization threshold
    pub fn with_mask_threshold(mut self, threshold: f32) -> Self {
        self.mask_threshold = threshold;
        self
    }
}
