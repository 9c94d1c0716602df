//! # NER Model Capability Interface
//!
//! The trainer, evaluator and analysis runner only talk to models through
//! [`NerModel`]. Loading is a backend constructor; the bundled backend is
//! [`PerceptronTagger`].

pub mod perceptron;
pub mod tokenizer;
pub mod viterbi;
pub mod weights;

use std::path::Path;

use crate::error::Result;
use crate::types::{EntitySpan, TrainingInstance};

pub use perceptron::{Component, PerceptronTagger};
pub use tokenizer::{Token, Tokenizer};
pub use viterbi::ViterbiDecoder;

/// An entity recognizer that can be run, trained and persisted.
pub trait NerModel {
    /// Runs the model over `text`, returning spans ordered by start offset.
    fn predict(&self, text: &str) -> Result<Vec<EntitySpan>>;

    /// Resets the model for training with the given label inventory.
    ///
    /// Labels absent from `labels` can never be predicted afterwards.
    fn begin_training(&mut self, labels: &[String]) -> Result<()>;

    /// Performs one update step over `batch` and returns its loss.
    ///
    /// `dropout` is the probability of hiding each input feature.
    fn update(&mut self, batch: &[TrainingInstance], dropout: f32) -> Result<f32>;

    /// Writes the model state into the (existing, empty) directory `dir`.
    fn save(&self, dir: &Path) -> Result<()>;
}
