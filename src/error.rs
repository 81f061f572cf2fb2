//! Error types for the retrieval evaluation pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom error.
pub type Result<T> = std::result::Result<T, Ms2Error>;

/// Errors that can occur while building examples, indexing or scoring.
#[derive(Error, Debug)]
pub enum Ms2Error {
    /// Error reading or writing files.
    #[error("I/O error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A corpus or examples line could not be parsed into the expected shape.
    #[error("Malformed record in '{path}' at line {line}: {message}")]
    MalformedRecord {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Error during serialization/deserialization.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The corpus directory does not exist or is not a directory.
    #[error("Corpus path '{0}' does not exist or is not a directory")]
    InvalidCorpusPath(PathBuf),

    /// No training/validation/testing files in the corpus directory.
    #[error("No split files found in corpus at '{0}'")]
    NoSplitFiles(PathBuf),

    /// An input file (examples, to-index corpus, indexing script) is missing.
    #[error("File not found at '{0}'")]
    FileNotFound(PathBuf),

    /// A query example without relevant documents reached the evaluator.
    #[error("Example for review '{0}' has no relevant documents; R-precision and recall are undefined")]
    EmptyRelevantSet(String),

    /// Nothing to evaluate.
    #[error("No examples to evaluate")]
    NoExamples,

    /// The search service answered with an error.
    #[error("Search service error: {0}")]
    Search(String),

    /// HTTP request error (including timeouts).
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The external indexing job exited unsuccessfully.
    #[error("Indexing job failed ({status}): {stderr}")]
    IndexJob { status: String, stderr: String },

    /// Configuration file error or invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Ms2Error {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a malformed-record error for a 1-based line number.
    pub fn malformed(path: impl Into<PathBuf>, line: usize, message: impl ToString) -> Self {
        Self::MalformedRecord {
            path: path.into(),
            line,
            message: message.to_string(),
        }
    }
}

impl From<reqwest::Error> for Ms2Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Ms2Error::Http(format!("request timed out: {}", err))
        } else {
            Ms2Error::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for Ms2Error {
    fn from(err: serde_json::Error) -> Self {
        Ms2Error::Serialization(err.to_string())
    }
}
