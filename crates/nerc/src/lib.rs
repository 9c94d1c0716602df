//! # nerc
//!
//! Named-entity recognition toolkit. Re-exports the core library (BIO
//! conversion, evaluation, models, analysis) and the training loop.

pub use nerc_core::*;

/// Training loop, checkpoints and dataset loading.
pub mod train {
    pub use nerc_trainer::*;
}
