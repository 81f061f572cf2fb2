//! MS2 Retrieval - evaluating a dense retriever on systematic-review search.
//!
//! Systematic reviews cite the studies they include. When a review's title
//! is phrased as a question, that question is a realistic literature-search
//! query and the included studies are its relevant documents. This crate
//! turns the MS2 review corpus into such query examples plus a corpus of
//! candidate documents, and scores a dense retriever on them.
//!
//! # Pipeline
//!
//! 1. [`corpus`] streams review records from the split files
//! 2. [`synthesis`] picks question-like titles and flattens included studies
//!    into candidate documents
//! 3. [`persistence`] writes `examples.jsonl` and `to_index.jsonl`
//! 4. [`indexer`] runs the external encoder over `to_index.jsonl`
//! 5. [`eval`] queries the index through a [`search::Retriever`] and reports
//!    R-Precision and Recall@K
//!
//! # Quick Start
//!
//! ```no_run
//! use ms2_retrieval::{
//!     config::Config,
//!     eval::{Evaluator, EvaluatorConfig},
//!     persistence::load_examples,
//!     search::SearchClient,
//! };
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     config.validate()?;
//!
//!     let examples = load_examples(Path::new("output/examples.jsonl"))?;
//!     let client = SearchClient::new(config.search, "output/index")?;
//!
//!     let evaluator = Evaluator::new(client, EvaluatorConfig::default());
//!     let results = evaluator.evaluate(&examples).await?;
//!     println!("{}", results.report);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod corpus;
pub mod error;
pub mod eval;
pub mod indexer;
pub mod persistence;
pub mod search;
pub mod sentence;
pub mod synthesis;
pub mod text;

// Re-export commonly used types
pub use config::Config;
pub use corpus::{ReviewReader, ReviewRecord, Split, StudyReference};
pub use error::{Ms2Error, Result};
pub use eval::{EvaluationResults, Evaluator, EvaluatorConfig, MetricReport};
pub use indexer::IndexJob;
pub use search::{Retriever, SearchClient};
pub use sentence::{RuleSentenceSplitter, SentenceSplitter};
pub use synthesis::{CandidateDocument, QueryExample, Synthesis, Synthesizer, synthesize};
pub use text::normalize;
