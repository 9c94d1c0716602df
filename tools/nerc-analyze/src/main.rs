//! Perform NERC over a file's content.
//!
//! Prints the entity report, optionally saves it, and writes
//! `<file>._HIGHLIGHTED.html` next to the input.

use std::io;
use std::path::PathBuf;

use clap::Parser;
use nerc_core::analysis::{analyze, AnalyzeConfig};
use tracing::info;

#[derive(Parser)]
#[command(name = "nerc-analyze")]
#[command(about = "Perform NERC over a file content")]
#[command(version)]
struct Cli {
    /// Path to the file to be processed
    #[arg(long)]
    file: PathBuf,

    /// Language of the input: en, fr or es
    #[arg(long, default_value = "fr")]
    lang: String,

    /// Optional path to a file to write the results to
    #[arg(long)]
    output: Option<PathBuf>,

    /// Path to a custom model directory or zip; overrides --lang
    #[arg(long = "custom_model", alias = "custom-model")]
    custom_model: Option<PathBuf>,

    /// Top N entities per type to print in the report
    #[arg(long = "top_n", alias = "top-n", default_value_t = 10)]
    top_n: usize,

    /// Directory holding the default per-language models
    #[arg(long = "model-home", env = "NERC_MODEL_HOME")]
    model_home: Option<PathBuf>,
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = AnalyzeConfig::new(cli.file)
        .with_lang(cli.lang)
        .with_top_n(cli.top_n);
    if let Some(home) = cli.model_home {
        config = config.with_model_home(home);
    }
    if let Some(model) = cli.custom_model {
        config = config.with_custom_model(model);
    }
    if let Some(output) = cli.output {
        config = config.with_output(output);
    }

    let analysis = analyze(&config)?;
    println!("{}", analysis.rendered);
    info!(
        "HTML with highlighted entities written to {}; open it with a web browser",
        analysis.highlight_path.display()
    );
    Ok(())
}

fn main() {
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Analysis failed: {e:#}");
        std::process::exit(1);
    }
}
