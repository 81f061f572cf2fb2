//! Retrieval evaluation.
//!
//! This module provides:
//! - The metric cutoff table and R-Precision / Recall@K scoring
//! - An evaluator that issues one retrieval call per (example, cutoff)
//!   and averages the scores into a [`MetricReport`]

pub mod evaluator;
pub mod metrics;

pub use evaluator::{EvaluationResults, Evaluator, EvaluatorConfig, ExampleScores};
pub use metrics::{CUTOFFS, Cutoff, MetricReport, MetricValue, hit_fraction};
