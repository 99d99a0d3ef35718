//! Side-effect collaborators of the training loop
//!
//! Visualization and remote log synchronization happen outside this crate.
//! The trainer exposes them as a hook trait with default no-ops, so a run
//! without collaborators needs no wiring at all.

/// Batch-cadence report, fired every `print_every` training iterations
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub epoch: usize,
    pub iteration: usize,
    /// Mean loss over the last `print_every` batches
    pub window_loss: f32,
    /// Running mean loss over the current epoch
    pub epoch_loss: f32,
    pub batch_iou: f32,
    pub batch_accuracy: f32,
    /// First sample id of the reported batch, for visualization lookup
    pub first_sample_id: Option<usize>,
}

/// Fired when a validation epoch sets a new best IoU
#[derive(Debug, Clone)]
pub struct ImprovementReport {
    pub epoch: usize,
    pub best_iou: f32,
    pub first_sample_id: Option<usize>,
}

/// Trainer side-effect hooks; implement only what you care about.
pub trait TrainerHooks {
    /// A batch-cadence report is available (visualization trigger)
    fn on_batch_report(&mut self, _report: &BatchReport) {}

    /// Validation improved (visualization trigger)
    fn on_improvement(&mut self, _report: &ImprovementReport) {}

    /// Log-sync cadence reached (remote synchronization trigger)
    fn on_log_sync(&mut self, _epoch: usize) {}
}

/// Hooks that do nothing
pub struct NoopHooks;

impl TrainerHooks for NoopHooks {}
