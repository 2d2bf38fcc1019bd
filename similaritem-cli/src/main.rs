mod metrics;
mod output;
mod source;

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use similaritem::minhash::{CoefficientRange, LshMode, ShingleHasher, DEFAULT_SEED};
use similaritem::{DocumentSource, SimilarityConfig, SimilarityPipeline};

use crate::source::DirectorySource;

#[derive(Parser, Debug)]
#[command(
    name = "similaritem",
    version,
    about = "Reports shingle, MinHash and LSH similarities between the documents of a directory."
)]
struct Args {
    /// Characters per shingle
    #[arg(short = 'k', long = "shingle-size", default_value_t = 9)]
    shingle_size: usize,

    /// Similarity at which two documents count as similar
    #[arg(short = 't', long, default_value_t = 0.8)]
    threshold: f64,

    /// Signature size, the number of MinHash functions
    #[arg(long = "sig", default_value_t = 100)]
    signature_size: usize,

    /// How bands and rows are chosen: favor-recall or favor-precision
    #[arg(long, default_value_t = LshMode::FavorRecall)]
    mode: LshMode,

    /// Seed of the hash-function family
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Smallest affine coefficient
    #[arg(long = "coef-min", default_value_t = 1)]
    coef_min: u32,

    /// Largest affine coefficient
    #[arg(long = "coef-max", default_value_t = 100)]
    coef_max: u32,

    /// Shingle hash: sea, sip or fnv
    #[arg(long, default_value_t = ShingleHasher::Sea)]
    hasher: ShingleHasher,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Directory of text documents
    path: PathBuf,
}

impl Args {
    fn config(&self) -> SimilarityConfig {
        SimilarityConfig::default()
            .with_shingle_size(self.shingle_size)
            .with_threshold(self.threshold)
            .with_signature_size(self.signature_size)
            .with_lsh_mode(self.mode)
            .with_seed(self.seed)
            .with_coefficient_range(CoefficientRange::new(self.coef_min, self.coef_max))
            .with_hasher(self.hasher)
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let pipeline = SimilarityPipeline::new(args.config()).context("invalid configuration")?;
    let documents = DirectorySource::new(&args.path).documents()?;
    info!(path = %args.path.display(), documents = documents.len(), "corpus_loaded");

    let report = pipeline.run(&documents)?;
    let quality = metrics::lsh_quality(&report);

    let stdout = io::stdout();
    let mut stdout = stdout.lock();
    if args.json {
        output::write_json(&mut stdout, &report, quality)?;
        writeln!(stdout)?;
    } else {
        stdout.write_all(output::render_text(&report, quality).as_bytes())?;
    }
    Ok(())
}
