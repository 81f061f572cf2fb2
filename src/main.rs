//! MS2 Retrieval CLI
//!
//! Builds query examples from the MS2 review corpus, indexes the candidate
//! documents with a dense encoder and scores the retriever.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ms2_retrieval::{
    config::Config,
    corpus::{ReviewReader, Split, discover_split_files},
    eval::{Evaluator, EvaluatorConfig},
    indexer::IndexJob,
    persistence::{load_examples, save_json, save_synthesis},
    search::SearchClient,
    sentence::RuleSentenceSplitter,
    synthesis::Synthesizer,
};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// MS2 Retrieval - evaluate a dense retriever on systematic-review search
#[derive(Parser)]
#[command(name = "ms2-retrieval")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the preprocessed example files
    CreateExamples {
        /// Path to a local copy of the MS2 dataset
        input_dir: PathBuf,

        /// Directory where the example files should be saved
        output_dir: PathBuf,

        /// Only read these splits (default: all)
        #[arg(long = "split", value_enum)]
        splits: Vec<SplitArg>,
    },

    /// Create the dense vector index
    CreateIndex {
        /// Path to the file containing the documents to index (to_index.jsonl)
        input_fp: PathBuf,

        /// Directory where the index should be saved
        output_dir: PathBuf,

        /// Device to use for embedding ("cpu" or "cuda:0, cuda:1...")
        #[arg(long)]
        device: Option<String>,
    },

    /// Query the dense retriever with each example and score the retrieved results
    SearchAndScore {
        /// Path to the file containing the preprocessed examples
        input_fp: PathBuf,

        /// Path to the directory containing the index
        index_fp: PathBuf,

        /// Maximum number of examples to evaluate
        #[arg(long)]
        max_examples: Option<usize>,

        /// Save full results to a JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Disable the progress bar
        #[arg(long)]
        no_progress: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SplitArg {
    Training,
    Validation,
    Testing,
}

impl From<SplitArg> for Split {
    fn from(arg: SplitArg) -> Self {
        match arg {
            SplitArg::Training => Split::Training,
            SplitArg::Validation => Split::Validation,
            SplitArg::Testing => Split::Testing,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("info")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::CreateExamples {
            input_dir,
            output_dir,
            splits,
        } => cmd_create_examples(input_dir, output_dir, splits),
        Commands::CreateIndex {
            input_fp,
            output_dir,
            device,
        } => cmd_create_index(input_fp, output_dir, device).await,
        Commands::SearchAndScore {
            input_fp,
            index_fp,
            max_examples,
            output,
            no_progress,
        } => cmd_search_and_score(input_fp, index_fp, max_examples, output, no_progress).await,
    }
}

fn divider(title: &str) {
    println!("\n{} {} {}\n", "─".repeat(4), title, "─".repeat(40));
}

fn cmd_create_examples(
    input_dir: PathBuf,
    output_dir: PathBuf,
    splits: Vec<SplitArg>,
) -> Result<()> {
    divider("Create Examples");

    let splits: Vec<Split> = if splits.is_empty() {
        Split::ALL.to_vec()
    } else {
        splits.into_iter().map(Split::from).collect()
    };

    let files =
        discover_split_files(&input_dir, &splits).context("Failed to find corpus split files")?;
    println!("Found {} split file(s) in {}", files.len(), input_dir.display());

    let start = Instant::now();
    let mut synthesizer = Synthesizer::new(RuleSentenceSplitter::new());

    println!("Creating example files (this could take several minutes)...");
    for file in &files {
        let reader = ReviewReader::open(file)
            .with_context(|| format!("Failed to open {}", file.display()))?;
        let before = synthesizer.example_count();

        for review in reader {
            let review = review.context("Failed to read review record")?;
            synthesizer.add_review(&review);
        }

        println!(
            "  {}: {} examples",
            file.display(),
            synthesizer.example_count() - before
        );
    }

    let synthesis = synthesizer.finish();
    let stats = synthesis.stats;
    println!(
        "Created {} examples with an index size of {} ({} reviews read in {:.2?}).",
        stats.examples,
        stats.candidates,
        stats.reviews,
        start.elapsed()
    );
    if stats.reviews_without_studies > 0 {
        println!(
            "  Skipped {} question titles with no included studies.",
            stats.reviews_without_studies
        );
    }

    let saved = save_synthesis(&synthesis, &output_dir).context("Failed to save example files")?;
    let resolved = output_dir.canonicalize().unwrap_or(output_dir);
    println!("Preprocessed data saved to {}.", resolved.display());
    println!("  Examples: {}", saved.examples.display());
    println!("  To index: {}", saved.to_index.display());

    Ok(())
}

async fn cmd_create_index(
    input_fp: PathBuf,
    output_dir: PathBuf,
    device: Option<String>,
) -> Result<()> {
    divider("Create Index");

    let config = Config::load().context("Failed to load configuration")?;
    let device = device.unwrap_or_else(|| config.index.device.clone());

    println!("Indexing: {}", input_fp.display());
    println!("Using encoder: {}", config.search.encoder);
    println!("Device: {}", device);

    let start = Instant::now();
    let job = IndexJob::new(config.index, config.search.encoder);
    let index_dir = job
        .run(&input_fp, &output_dir, &device)
        .await
        .context("Failed to build index")?;

    println!(
        "Local FAISS index saved to {} in {:.2?}.",
        index_dir.display(),
        start.elapsed()
    );

    Ok(())
}

async fn cmd_search_and_score(
    input_fp: PathBuf,
    index_fp: PathBuf,
    max_examples: Option<usize>,
    output: Option<PathBuf>,
    no_progress: bool,
) -> Result<()> {
    divider("Search and Score");

    if !index_fp.exists() {
        anyhow::bail!(
            "Index not found at '{}'. Run 'create-index' command first.",
            index_fp.display()
        );
    }

    let config = Config::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let examples = load_examples(&input_fp).context("Failed to load examples")?;
    println!("Loaded {} examples at {}.", examples.len(), input_fp.display());

    let index = index_fp.to_string_lossy().into_owned();
    let client =
        SearchClient::new(config.search.clone(), index).context("Failed to create search client")?;
    println!("Using encoder {}.", config.search.encoder);
    println!("Searching index at {} via {}.", index_fp.display(), config.search.api_base);

    let evaluator = Evaluator::new(
        client,
        EvaluatorConfig {
            max_examples,
            show_progress: !no_progress,
        },
    );
    let results = evaluator
        .evaluate(&examples)
        .await
        .with_context(|| {
            format!(
                "Evaluation failed (is a search service such as scripts/search_server.py running at {}?)",
                config.search.api_base
            )
        })?;

    println!();
    println!("{}", results.report);
    println!(
        "\nScored {} examples in {:.1}s",
        results.report.examples, results.total_time_secs
    );

    if let Some(output_path) = output {
        save_json(&results, &output_path).context("Failed to save results")?;
        println!("Results saved to {}", output_path.display());
    }

    Ok(())
}
