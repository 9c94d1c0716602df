//! # nerc trainer
//!
//! Loads BIO datasets, trains a [`nerc_core::NerModel`] in shuffled
//! mini-batch epochs, evaluates on a dev set after each epoch, and keeps a
//! zipped checkpoint whenever the dev F-score strictly improves.

pub mod callback;
pub mod checkpoint;
pub mod data;
pub mod trainer;

pub use callback::{EpochMetrics, LoggingCallback, NullCallback, TrainingCallback};
pub use checkpoint::{checkpoint_name, ArchiveSink, BestScore, CheckpointSink};
pub use data::{load_bio_dataset, read_lines};
pub use trainer::{run_training, TrainConfig, Trainer, TrainingSummary};
