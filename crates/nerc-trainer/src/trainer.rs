//! Epoch/batch training loop with strict-improvement checkpointing.

use std::path::{Path, PathBuf};

use nerc_core::bio::OverlapPolicy;
use nerc_core::model::perceptron::entropy_seed;
use nerc_core::{
    collect_labels, evaluate, Language, NerModel, NercError, PerceptronTagger, TrainingInstance,
};
use oorandom::Rand32;

use crate::callback::{EpochMetrics, TrainingCallback};
use crate::checkpoint::{checkpoint_name, ArchiveSink, BestScore, CheckpointSink};
use crate::data::load_bio_dataset;

/// Training configuration.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    /// Base language of the blank model.
    pub lang: Language,
    pub epochs: usize,
    pub batch_size: usize,
    /// Feature dropout probability for each update.
    pub dropout: f32,
    /// Required; checkpoints are written here.
    pub output_dir: Option<PathBuf>,
    pub model_name: String,
    /// Shuffle/dropout seed. Drawn from the clock when unset.
    pub seed: Option<u64>,
    pub overlap_policy: OverlapPolicy,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            lang: Language::En,
            epochs: 10,
            batch_size: 32,
            dropout: 0.5,
            output_dir: None,
            model_name: "nerc_model".to_string(),
            seed: None,
            overlap_policy: OverlapPolicy::default(),
        }
    }
}

impl TrainConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lang(mut self, lang: Language) -> Self {
        self.lang = lang;
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_dropout(mut self, dropout: f32) -> Self {
        self.dropout = dropout;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = name.into();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_overlap_policy(mut self, policy: OverlapPolicy) -> Self {
        self.overlap_policy = policy;
        self
    }

    /// Checks the configuration and returns the output directory.
    pub fn validate(&self) -> Result<&Path, NercError> {
        let output_dir = self
            .output_dir
            .as_deref()
            .ok_or_else(|| NercError::Configuration("an output directory is required".into()))?;
        if self.batch_size == 0 {
            return Err(NercError::Configuration("batch size must be positive".into()));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(NercError::Configuration(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        if self.model_name.trim().is_empty() {
            return Err(NercError::Configuration("model name must not be empty".into()));
        }
        Ok(output_dir)
    }
}

/// Outcome of a training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSummary {
    pub epochs: usize,
    pub best_fscore: f64,
    /// Epoch of the last checkpoint, if any was written.
    pub best_epoch: Option<usize>,
    pub checkpoints: Vec<PathBuf>,
    pub history: Vec<EpochMetrics>,
}

/// Drives a [`NerModel`] through shuffled mini-batch epochs.
pub struct Trainer {
    config: TrainConfig,
    callbacks: Vec<Box<dyn TrainingCallback>>,
    sink: Box<dyn CheckpointSink>,
}

impl Trainer {
    /// Creates a trainer writing zip checkpoints into the configured
    /// output directory.
    pub fn new(config: TrainConfig) -> Result<Self, NercError> {
        let sink = ArchiveSink::new(config.validate()?);
        Ok(Self {
            config,
            callbacks: Vec::new(),
            sink: Box::new(sink),
        })
    }

    /// Replaces the checkpoint destination.
    pub fn with_sink(mut self, sink: impl CheckpointSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Add a callback
    pub fn add_callback(mut self, callback: impl TrainingCallback + 'static) -> Self {
        self.callbacks.push(Box::new(callback));
        self
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Trains `model` from scratch on `train`, evaluating on `dev` after
    /// every epoch and checkpointing only on strict F-score improvement.
    pub fn train<M: NerModel>(
        &mut self,
        model: &mut M,
        train: &[TrainingInstance],
        dev: &[TrainingInstance],
    ) -> anyhow::Result<TrainingSummary> {
        let labels = collect_labels(train);
        model.begin_training(&labels)?;
        for cb in &self.callbacks {
            cb.on_training_start(&self.config, train.len(), dev.len());
        }

        let mut rng = Rand32::new(self.config.seed.unwrap_or_else(entropy_seed));
        let mut data = train.to_vec();
        let mut best = BestScore::new();
        let mut summary = TrainingSummary {
            epochs: self.config.epochs,
            best_fscore: 0.0,
            best_epoch: None,
            checkpoints: Vec::new(),
            history: Vec::with_capacity(self.config.epochs),
        };

        for epoch in 1..=self.config.epochs {
            for cb in &self.callbacks {
                cb.on_epoch_start(epoch, self.config.epochs);
            }

            shuffle(&mut data, &mut rng);
            let mut epoch_loss = 0.0;
            for (batch_idx, batch) in data.chunks(self.config.batch_size).enumerate() {
                let loss = model.update(batch, self.config.dropout)?;
                epoch_loss += loss;
                for cb in &self.callbacks {
                    cb.on_batch_end(epoch, batch_idx + 1, loss);
                }
            }

            let scores = evaluate(dev, &*model)?;
            let improved = best.observe(scores.fscore);
            let metrics = EpochMetrics {
                epoch,
                loss: epoch_loss,
                scores,
                improved,
            };
            for cb in &self.callbacks {
                cb.on_epoch_end(&metrics);
            }
            summary.history.push(metrics);

            if improved {
                let name = checkpoint_name(&self.config.model_name, epoch, scores.fscore);
                let path = self.sink.save(&*model, &name)?;
                for cb in &self.callbacks {
                    cb.on_checkpoint(epoch, &path);
                }
                summary.best_epoch = Some(epoch);
                summary.checkpoints.push(path);
            }
        }

        summary.best_fscore = best.best();
        for cb in &self.callbacks {
            cb.on_training_end(&summary);
        }
        Ok(summary)
    }
}

/// Fisher-Yates shuffle in place.
fn shuffle<T>(items: &mut [T], rng: &mut Rand32) {
    for i in (1..items.len()).rev() {
        let j = rng.rand_range(0..(i as u32 + 1)) as usize;
        items.swap(i, j);
    }
}

/// Loads both datasets and trains a blank [`PerceptronTagger`].
///
/// Configuration is checked first, then both dataset paths, so a bad run
/// aborts before any training starts.
pub fn run_training(
    config: TrainConfig,
    train_path: &Path,
    dev_path: &Path,
    callback: impl TrainingCallback + 'static,
) -> anyhow::Result<TrainingSummary> {
    config.validate()?;
    for path in [train_path, dev_path] {
        if !path.exists() {
            return Err(NercError::input_not_found(path).into());
        }
    }

    let train = load_bio_dataset(train_path, config.overlap_policy)?;
    let dev = load_bio_dataset(dev_path, config.overlap_policy)?;

    let mut model = PerceptronTagger::blank(config.lang);
    if let Some(seed) = config.seed {
        model = model.with_seed(seed);
    }
    let mut trainer = Trainer::new(config)?.add_callback(callback);
    trainer.train(&mut model, &train, &dev)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::fs;
    use std::rc::Rc;

    use super::*;
    use crate::callback::NullCallback;
    use nerc_core::EntitySpan;

    /// Predicts the gold spans for the first `hits[epoch]` dev instances.
    struct ScriptedModel {
        dev: Vec<TrainingInstance>,
        hits: Vec<usize>,
        epoch: usize,
        labels: Vec<String>,
        batches: Vec<usize>,
    }

    impl NerModel for ScriptedModel {
        fn predict(&self, text: &str) -> nerc_core::Result<Vec<EntitySpan>> {
            let hits = self.hits[self.epoch - 1];
            Ok(self
                .dev
                .iter()
                .take(hits)
                .find(|i| i.text == text)
                .map(|i| i.entities.clone())
                .unwrap_or_default())
        }

        fn begin_training(&mut self, labels: &[String]) -> nerc_core::Result<()> {
            self.labels = labels.to_vec();
            Ok(())
        }

        fn update(&mut self, batch: &[TrainingInstance], _dropout: f32) -> nerc_core::Result<f32> {
            if self.batches.len() % 2 == 0 {
                self.epoch += 1;
            }
            self.batches.push(batch.len());
            Ok(1.0)
        }

        fn save(&self, dir: &Path) -> nerc_core::Result<()> {
            fs::write(dir.join("epoch.txt"), self.epoch.to_string())?;
            Ok(())
        }
    }

    #[derive(Default, Clone)]
    struct MemorySink {
        saved: Rc<RefCell<Vec<String>>>,
    }

    impl CheckpointSink for MemorySink {
        fn save(&mut self, _model: &dyn NerModel, name: &str) -> anyhow::Result<PathBuf> {
            self.saved.borrow_mut().push(name.to_string());
            Ok(PathBuf::from(name))
        }
    }

    fn instance(text: &str, label: &str) -> TrainingInstance {
        TrainingInstance::new(text, vec![EntitySpan::new(0, text.len(), label)])
    }

    fn dev_set() -> Vec<TrainingInstance> {
        (0..10).map(|i| instance(&format!("e{i}"), "X")).collect()
    }

    #[test]
    fn test_checkpoints_only_on_strict_improvement() {
        // Precision is always 1.0, so fscore = 2r/(1+r) with r = hits/10.
        let dev = dev_set();
        let train: Vec<_> = (0..40).map(|i| instance(&format!("t{i}"), "X")).collect();
        let mut model = ScriptedModel {
            dev: dev.clone(),
            hits: vec![5, 5, 6, 4],
            epoch: 0,
            labels: Vec::new(),
            batches: Vec::new(),
        };

        let sink = MemorySink::default();
        let config = TrainConfig::new()
            .with_epochs(4)
            .with_output_dir("unused")
            .with_seed(42);
        let mut trainer = Trainer::new(config)
            .unwrap()
            .with_sink(sink.clone())
            .add_callback(NullCallback);
        let summary = trainer.train(&mut model, &train, &dev).unwrap();

        let f = |hits: f64| {
            let r = hits / 10.0;
            2.0 * r / (1.0 + r)
        };
        assert_eq!(
            *sink.saved.borrow(),
            vec![
                checkpoint_name("nerc_model", 1, f(5.0)),
                checkpoint_name("nerc_model", 3, f(6.0)),
            ]
        );
        assert_eq!(summary.best_epoch, Some(3));
        assert_eq!(summary.checkpoints.len(), 2);
        assert!((summary.best_fscore - f(6.0)).abs() < 1e-12);
        let improved: Vec<bool> = summary.history.iter().map(|m| m.improved).collect();
        assert_eq!(improved, [true, false, true, false]);
        assert_eq!(model.labels, vec!["X"]);
        // 40 instances in batches of 32: two updates per epoch, the last one short.
        assert_eq!(model.batches, [32, 8, 32, 8, 32, 8, 32, 8]);
    }

    #[test]
    fn test_missing_output_dir_is_configuration_error() {
        let err = Trainer::new(TrainConfig::new()).err().unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_invalid_dropout_is_configuration_error() {
        let config = TrainConfig::new().with_output_dir("out").with_dropout(1.0);
        assert!(config.validate().unwrap_err().is_configuration());
    }

    #[test]
    fn test_missing_train_data_aborts_before_training() {
        let tmp = tempfile::tempdir().unwrap();
        let dev = tmp.path().join("dev.txt");
        fs::write(&dev, "Paris B-LOC\n").unwrap();
        let out = tmp.path().join("out");
        let config = TrainConfig::new().with_output_dir(&out);

        let err = run_training(config, &tmp.path().join("train.txt"), &dev, NullCallback)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<NercError>(),
            Some(NercError::InputNotFound { path }) if path.ends_with("train.txt")
        ));
        assert!(!out.exists());
    }

    #[test]
    fn test_missing_dev_data_aborts_before_training() {
        let tmp = tempfile::tempdir().unwrap();
        let train = tmp.path().join("train.txt");
        fs::write(&train, "Paris B-LOC\n").unwrap();
        let config = TrainConfig::new().with_output_dir(tmp.path().join("out"));

        let err = run_training(config, &train, &tmp.path().join("dev.txt"), NullCallback)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<NercError>(),
            Some(NercError::InputNotFound { path }) if path.ends_with("dev.txt")
        ));
    }

    #[test]
    fn test_run_training_end_to_end() {
        let tmp = tempfile::tempdir().unwrap();
        let data = "I O\nlive O\nin O\nParis B-LOC\n. O\n\n\
                    Berlin B-LOC\nis O\nbig O\n. O\n\n\
                    We O\nsaw O\nParis B-LOC\n. O\n\n";
        let train = tmp.path().join("train.txt");
        let dev = tmp.path().join("dev.txt");
        fs::write(&train, data).unwrap();
        fs::write(&dev, data).unwrap();
        let out = tmp.path().join("out");

        let config = TrainConfig::new()
            .with_output_dir(&out)
            .with_epochs(5)
            .with_dropout(0.0)
            .with_seed(7)
            .with_overlap_policy(OverlapPolicy::KeepFirst);
        let summary = run_training(config, &train, &dev, NullCallback).unwrap();

        assert_eq!(summary.history.len(), 5);
        assert!(summary.best_fscore > 0.0);
        for path in &summary.checkpoints {
            assert!(path.is_file());
            let name = path.file_name().unwrap().to_string_lossy();
            assert!(name.starts_with("nerc_model_epoch"));
            assert!(name.ends_with(".zip"));
        }
        // Only archives remain in the output directory.
        for entry in fs::read_dir(&out).unwrap() {
            assert!(entry.unwrap().path().is_file());
        }
    }

    #[test]
    fn test_shuffle_is_a_permutation() {
        let mut rng = Rand32::new(1);
        let mut items: Vec<usize> = (0..100).collect();
        shuffle(&mut items, &mut rng);
        let mut sorted = items.clone();
        sorted.sort();
        assert_eq!(sorted, (0..100).collect::<Vec<_>>());
    }
}
