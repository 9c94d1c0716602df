//! Progress hooks for the training loop.

use std::path::Path;

use nerc_core::EvaluationScores;
use tracing::info;

use crate::trainer::{TrainConfig, TrainingSummary};

/// Per-epoch results handed to [`TrainingCallback::on_epoch_end`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochMetrics {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Sum of batch losses over the epoch.
    pub loss: f32,
    pub scores: EvaluationScores,
    /// Whether this epoch beat the best F-score so far.
    pub improved: bool,
}

/// Observer of training progress. All methods default to no-ops.
#[allow(unused_variables)]
pub trait TrainingCallback {
    /// Called at the start of training
    fn on_training_start(&self, config: &TrainConfig, train_size: usize, dev_size: usize) {}

    /// Called at the start of each epoch
    fn on_epoch_start(&self, epoch: usize, total_epochs: usize) {}

    /// Called after each batch
    fn on_batch_end(&self, epoch: usize, batch: usize, loss: f32) {}

    /// Called at the end of each epoch
    fn on_epoch_end(&self, metrics: &EpochMetrics) {}

    /// Called after a checkpoint archive has been written
    fn on_checkpoint(&self, epoch: usize, path: &Path) {}

    /// Called when training completes
    fn on_training_end(&self, summary: &TrainingSummary) {}
}

/// Null callback that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCallback;

impl TrainingCallback for NullCallback {}

/// Reports progress through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingCallback;

impl TrainingCallback for LoggingCallback {
    fn on_training_start(&self, config: &TrainConfig, train_size: usize, dev_size: usize) {
        info!(
            lang = %config.lang,
            epochs = config.epochs,
            batch_size = config.batch_size,
            train_size,
            dev_size,
            "starting training"
        );
    }

    fn on_epoch_start(&self, epoch: usize, total_epochs: usize) {
        info!("Epoch {epoch}/{total_epochs}");
    }

    fn on_batch_end(&self, epoch: usize, batch: usize, loss: f32) {
        info!(epoch, batch, loss, "Losses");
    }

    fn on_epoch_end(&self, metrics: &EpochMetrics) {
        info!(
            epoch = metrics.epoch,
            loss = metrics.loss,
            improved = metrics.improved,
            "{}",
            metrics.scores
        );
    }

    fn on_checkpoint(&self, epoch: usize, path: &Path) {
        info!(epoch, path = %path.display(), "saved checkpoint");
    }

    fn on_training_end(&self, summary: &TrainingSummary) {
        info!(
            epochs = summary.epochs,
            best_fscore = summary.best_fscore,
            checkpoints = summary.checkpoints.len(),
            "training stopped"
        );
    }
}
