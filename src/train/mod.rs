//! Training loop
//!
//! This module provides the experiment orchestration: the per-epoch
//! train/validation state machine, best-model tracking, cadenced
//! checkpoint persistence, and the collaborator traits the loop consumes
//! (model, hooks).
//!
//! # Example
//!
//! ```no_run
//! use salina::loss::LovaszHingeLoss;
//! use salina::logging::RunLogger;
//! use salina::optim::{Adam, CosineAnnealingLR};
//! use salina::train::{TrainConfig, Trainer};
//! # use salina::data::Batch;
//! # use salina::train::SegmentationModel;
//! # fn example<M: SegmentationModel>(model: M, batches: Vec<Batch>) {
//!
//! let config = TrainConfig::new(50)
//!     .with_print_every(20)
//!     .with_checkpoints(5, "saltnet", "./checkpoints".into());
//!
//! let mut trainer = Trainer::new(
//!     model,
//!     Box::new(Adam::default_params(1e-3)),
//!     Box::new(CosineAnnealingLR::default_min(1e-3, 50)),
//!     Box::new(LovaszHingeLoss::new()),
//!     config,
//!     RunLogger::to_stderr("saltnet"),
//! );
//! let report = trainer.train(|| batches.clone(), || batches.clone());
//! println!("best val IOU {:.4}", report.best_iou);
//! # }
//! ```

mod config;
mod hooks;
mod model;
mod state;
mod trainer;

pub use config::TrainConfig;
pub use hooks::{BatchReport, ImprovementReport, NoopHooks, TrainerHooks};
pub use model::{Mode, ModelState, SegmentationModel};
pub use state::{Phase, TrainReport, TrainingState};
pub use trainer::{format_elapsed, Trainer};
