//! Dense retrieval against an externally built index.
//!
//! The encoder and the vector index live outside this crate. The evaluator
//! only needs ranked document ids for a query, which is what [`Retriever`]
//! exposes; [`SearchClient`] implements it over HTTP.

mod client;

pub use client::{SearchClient, SearchHit};

use crate::error::Result;

/// Ranked retrieval of document ids.
#[allow(async_fn_in_trait)]
pub trait Retriever {
    /// Return up to `k` document ids for `query`, best first.
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<String>>;
}
