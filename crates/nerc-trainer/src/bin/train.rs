//! Train a NER model from BIO-tagged train/dev files.

use std::path::PathBuf;

use clap::Parser;
use nerc_core::{Language, OverlapPolicy};
use nerc_trainer::{run_training, LoggingCallback, TrainConfig};
use tracing::info;

#[derive(Parser)]
#[command(name = "nerc-train")]
#[command(about = "Train a custom NERC model")]
#[command(version)]
struct Cli {
    /// Path to the training data
    #[arg(long = "train_data", alias = "train-data")]
    train_data: PathBuf,

    /// Path to the development data for evaluation
    #[arg(long = "dev_data", alias = "dev-data")]
    dev_data: PathBuf,

    /// Base language of the blank model
    #[arg(long, default_value = "en")]
    lang: Language,

    /// Number of epochs (full training set loops)
    #[arg(long = "num_epochs", alias = "num-epochs", default_value_t = 10)]
    num_epochs: usize,

    /// Folder to store the trained models
    #[arg(long = "output_dir", alias = "output-dir")]
    output_dir: PathBuf,

    /// Name used as the prefix of every stored model
    #[arg(long = "model_name", alias = "model-name", default_value = "nerc_model")]
    model_name: String,

    /// Seed for shuffling and dropout
    #[arg(long)]
    seed: Option<u64>,

    /// How overlapping entities are filtered: legacy or keep-first
    #[arg(long = "overlap-policy", default_value = "legacy")]
    overlap_policy: OverlapPolicy,
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = TrainConfig::new()
        .with_lang(cli.lang)
        .with_epochs(cli.num_epochs)
        .with_output_dir(cli.output_dir)
        .with_model_name(cli.model_name)
        .with_overlap_policy(cli.overlap_policy);
    if let Some(seed) = cli.seed {
        config = config.with_seed(seed);
    }

    let summary = run_training(config, &cli.train_data, &cli.dev_data, LoggingCallback)?;
    info!(
        "Training stopped after {} epochs, best fscore {:.4}",
        summary.epochs, summary.best_fscore
    );
    for path in &summary.checkpoints {
        info!(path = %path.display(), "checkpoint");
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt::init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Training failed: {e:#}");
        std::process::exit(1);
    }
}
