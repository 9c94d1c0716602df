//! Checkpoint naming, the strict-improvement policy, and persistence.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use nerc_core::archive::{pack_dir, ScopedDir};
use nerc_core::{NerModel, NercError};

/// `<model_name>_epoch<N>_fscore<F>` with the F-score at four decimals.
///
/// Epochs count from 1: the checkpoint written after the first pass over
/// the training data is `<model_name>_epoch1_...`, never `epoch0`.
pub fn checkpoint_name(model_name: &str, epoch: usize, fscore: f64) -> String {
    format!("{model_name}_epoch{epoch}_fscore{fscore:.4}")
}

/// Best F-score seen so far. Only a strictly higher score counts as an
/// improvement, so ties never produce a checkpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BestScore {
    best: f64,
}

impl BestScore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn best(&self) -> f64 {
        self.best
    }

    /// Records `fscore` and returns whether it improved on the best.
    pub fn observe(&mut self, fscore: f64) -> bool {
        if fscore > self.best {
            self.best = fscore;
            true
        } else {
            false
        }
    }
}

/// Destination for model checkpoints.
pub trait CheckpointSink {
    /// Persists `model` under `name` and returns where it was written.
    fn save(&mut self, model: &dyn NerModel, name: &str) -> anyhow::Result<PathBuf>;
}

/// Writes each checkpoint as `<output_dir>/<name>.zip`.
///
/// The model is first saved into `<output_dir>/<name>`, packed, and the
/// directory is removed whether or not packing succeeded.
#[derive(Debug, Clone)]
pub struct ArchiveSink {
    output_dir: PathBuf,
}

impl ArchiveSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl CheckpointSink for ArchiveSink {
    fn save(&mut self, model: &dyn NerModel, name: &str) -> anyhow::Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("creating {}", self.output_dir.display()))?;

        let staging = self.output_dir.join(name);
        if staging.exists() {
            return Err(NercError::Configuration(format!(
                "checkpoint directory {} already exists",
                staging.display()
            ))
            .into());
        }
        let guard = ScopedDir::new(staging);
        fs::create_dir(guard.path())?;
        model.save(guard.path())?;

        let zip_path = self.output_dir.join(format!("{name}.zip"));
        pack_dir(guard.path(), &zip_path)
            .with_context(|| format!("packing {}", zip_path.display()))?;
        Ok(zip_path)
    }
}
