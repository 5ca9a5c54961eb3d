use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use soft_vsm_eval::{
    Collection, Error, Evaluator, HarnessConfig, MeasureKind, Result, SharedContext, SimilarityEngine, SpaceKind,
    TermSimilarityCache, WeightsKind,
};

#[derive(Parser, Debug)]
#[command(name = "soft-vsm-eval")]
#[command(about = "Evaluate document similarity models by k-NN classification")]
#[command(version)]
struct Args {
    /// harness configuration (TOML); defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// training collection, `label<TAB>text` per line
    #[arg(long)]
    train: PathBuf,

    /// validation collection, `label<TAB>text` per line
    #[arg(long)]
    validation: PathBuf,

    /// test collection, `label<TAB>text` per line
    #[arg(long)]
    test: PathBuf,

    /// vsm, sparse_soft_vsm, dense_soft_vsm or random
    #[arg(long, default_value = "vsm")]
    space: SpaceKind,

    /// bow, binary, tfidf or random
    #[arg(long, default_value = "bow")]
    weights: WeightsKind,

    /// inner_product, wmd or random
    #[arg(long, default_value = "inner_product")]
    measure: MeasureKind,

    /// embedding quantization level
    #[arg(long, default_value_t = 32)]
    num_bits: u32,

    /// word mover's worker threads (overrides the configuration)
    #[arg(long)]
    workers: Option<usize>,
}

/// Load a labeled collection from the store, or parse its text file.
/// The collection is named after the file stem.
fn load_collection(corpora_dir: &Path, path: &Path) -> Result<Collection> {
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::Config(format!("cannot name a collection after {}", path.display())))?;
    Collection::load_or_build(corpora_dir, name, || {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Collection::from_labeled_lines(&text, name)
    })
}

fn run(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => HarnessConfig::from_file(path)?,
        None => HarnessConfig::default(),
    };
    if let Some(workers) = args.workers {
        config.num_workers = workers;
    }

    let train = load_collection(&config.corpora_dir, &args.train)?;
    let validation = load_collection(&config.corpora_dir, &args.validation)?;
    let test = load_collection(&config.corpora_dir, &args.test)?;
    info!(
        "Loaded {} train, {} validation and {} test documents.",
        train.len(),
        validation.len(),
        test.len()
    );

    let context = SharedContext::load(&config)?;
    if !context.quantization_levels().any(|bits| bits == args.num_bits) {
        warn!("No word vectors configured for num_bits={}; only exact and random models can run.", args.num_bits);
    }
    let term_matrices = TermSimilarityCache::new(&config.matrices_dir);
    let engine = SimilarityEngine::new(&context, &term_matrices, config.worker_count());
    let evaluator = Evaluator::new(engine, &config);

    let result = evaluator.evaluate(
        &train,
        &validation,
        &test,
        args.space,
        args.weights,
        args.measure,
        args.num_bits,
    )?;
    let json = serde_json::to_string_pretty(&result)?;
    println!("{json}");
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
