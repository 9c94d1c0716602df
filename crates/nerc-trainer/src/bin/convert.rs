//! Convert a BIO-tagged file into JSON lines or plain sentences.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use nerc_core::{conll_to_plain_text, OverlapPolicy};
use nerc_trainer::{load_bio_dataset, read_lines};
use tracing::info;

#[derive(Parser)]
#[command(name = "nerc-convert")]
#[command(about = "Convert BIO-tagged data into span instances or plain text")]
#[command(version)]
struct Cli {
    /// BIO file to convert
    #[arg(long)]
    input: PathBuf,

    /// Destination file (stdout when omitted)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Write one plain sentence per line instead of JSON instances
    #[arg(long = "plain-text", alias = "plain_text")]
    plain_text: bool,

    /// How overlapping entities are filtered: legacy or keep-first
    #[arg(long = "overlap-policy", default_value = "legacy")]
    overlap_policy: OverlapPolicy,
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut out: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let written = if cli.plain_text {
        let sentences = conll_to_plain_text(read_lines(&cli.input)?);
        for sentence in &sentences {
            writeln!(out, "{sentence}")?;
        }
        sentences.len()
    } else {
        let instances = load_bio_dataset(&cli.input, cli.overlap_policy)?;
        for instance in &instances {
            serde_json::to_writer(&mut out, instance)?;
            writeln!(out)?;
        }
        instances.len()
    };
    out.flush()?;

    info!(input = %cli.input.display(), written, "conversion done");
    Ok(())
}

fn main() {
    // Converted data may go to stdout, so logs go to stderr.
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Conversion failed: {e:#}");
        std::process::exit(1);
    }
}
