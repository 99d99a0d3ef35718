//! # Salina: Salt-Deposit Segmentation Training Engine
//!
//! Salina trains binary salt-deposit masks from seismic images and manages
//! the experiment lifecycle: loss/metric computation, epoch-by-epoch
//! optimization with best-model tracking, and durable checkpoint
//! persistence under a hard per-artifact size ceiling.
//!
//! ## Architecture
//!
//! - **autograd**: Tape-style tensor with explicit backward ops
//! - **metrics**: Per-sample IoU, threshold-averaged IoU, pixel accuracy
//! - **loss**: IoU, Dice, Focal, Hinge, and Lovász-hinge losses
//! - **optim**: Optimizers (SGD, Adam) and learning-rate schedules
//! - **train**: Epoch/phase training loop with best-model tracking
//! - **checkpoint**: Checkpoint record and bounded-size chunk codec
//! - **data**: Batches, in-memory datasets, numeric dataset cache
//! - **rle**: Submission run-length encoding and prediction adjustment
//! - **logging**: Run-scoped logging context
//!
//! The network architecture, image I/O, augmentation, and remote
//! synchronization are external collaborators behind the traits in
//! [`train`] and the hook points of
//! [`TrainerHooks`](train::TrainerHooks).

pub mod autograd;
pub mod checkpoint;
pub mod data;
pub mod logging;
pub mod loss;
pub mod metrics;
pub mod optim;
pub mod rle;
pub mod train;

pub mod error;

// Re-export commonly used types
pub use autograd::{backward, Tensor};
pub use error::{Error, Result};
