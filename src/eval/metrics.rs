//! Ranking metrics computed against a known relevant set.
//!
//! Both R-Precision and Recall@K reduce to the same quantity here: the share
//! of the relevant set found among the first `k` returned ids. They differ
//! only in the cutoff, which is `r` (the relevant count) for R-Precision.

use crate::error::{Ms2Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Rank cutoff for a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cutoff {
    /// Cut at the number of relevant documents (R-Precision).
    RelevantCount,
    /// Cut at a fixed rank.
    Fixed(usize),
}

impl Cutoff {
    /// Concrete `k` for an example with `relevant` known-relevant documents.
    pub fn resolve(self, relevant: usize) -> usize {
        match self {
            Cutoff::RelevantCount => relevant,
            Cutoff::Fixed(k) => k,
        }
    }
}

/// Metric names and their cutoffs, in report order. Each entry costs one
/// retrieval call per example.
pub const CUTOFFS: [(&str, Cutoff); 5] = [
    ("mean-r-precision", Cutoff::RelevantCount),
    ("recall@10", Cutoff::Fixed(10)),
    ("recall@50", Cutoff::Fixed(50)),
    ("recall@100", Cutoff::Fixed(100)),
    ("recall@1000", Cutoff::Fixed(1000)),
];

/// Fraction of `relevant` found in the first `k` of `retrieved`.
///
/// Duplicate ids in `retrieved` count once. Returns `None` for an empty
/// relevant set, where the fraction is undefined.
pub fn hit_fraction(retrieved: &[String], relevant: &HashSet<&str>, k: usize) -> Option<f64> {
    if relevant.is_empty() {
        return None;
    }

    let found: HashSet<&str> = retrieved
        .iter()
        .take(k)
        .map(String::as_str)
        .filter(|id| relevant.contains(id))
        .collect();

    Some(found.len() as f64 / relevant.len() as f64)
}

/// Mean of a single metric over all scored examples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    pub name: String,
    pub value: f64,
}

/// Corpus-level metric means, in [`CUTOFFS`] order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricReport {
    pub metrics: Vec<MetricValue>,
    /// Number of examples each mean is taken over.
    pub examples: usize,
}

impl MetricReport {
    /// Look a metric up by name.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.metrics
            .iter()
            .find(|metric| metric.name == name)
            .map(|metric| metric.value)
    }
}

impl fmt::Display for MetricReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, metric) in self.metrics.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "* {}: {:.4}", metric.name, metric.value)?;
        }
        Ok(())
    }
}

/// Running per-metric score lists.
#[derive(Debug, Clone)]
pub struct MetricAccumulator {
    scores: Vec<(&'static str, Vec<f64>)>,
}

impl MetricAccumulator {
    pub fn new() -> Self {
        Self {
            scores: CUTOFFS.iter().map(|(name, _)| (*name, Vec::new())).collect(),
        }
    }

    /// Record a score for `name`. Unknown names are ignored.
    pub fn record(&mut self, name: &str, score: f64) {
        if let Some((_, scores)) = self.scores.iter_mut().find(|(n, _)| *n == name) {
            scores.push(score);
        }
    }

    /// Average every metric. Fails if any metric has no scores.
    pub fn finish(&self) -> Result<MetricReport> {
        let mut metrics = Vec::with_capacity(self.scores.len());
        let mut examples = 0;

        for (name, scores) in &self.scores {
            if scores.is_empty() {
                return Err(Ms2Error::NoExamples);
            }
            examples = examples.max(scores.len());
            metrics.push(MetricValue {
                name: name.to_string(),
                value: scores.iter().sum::<f64>() / scores.len() as f64,
            });
        }

        Ok(MetricReport { metrics, examples })
    }
}

impl Default for MetricAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_r_precision_scenario() {
        let relevant = HashSet::from(["1", "2", "3"]);
        let k = Cutoff::RelevantCount.resolve(relevant.len());
        assert_eq!(k, 3);

        let score = hit_fraction(&ids(&["1", "4", "9"]), &relevant, k).unwrap();
        assert!((score - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_recall_at_10_scenario() {
        let relevant = HashSet::from(["1", "2", "3"]);
        let retrieved = ids(&["1", "2", "5", "6", "7", "8", "9", "10", "11", "12"]);
        let score = hit_fraction(&retrieved, &relevant, 10).unwrap();
        assert!((score - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_results_beyond_k_are_ignored() {
        let relevant = HashSet::from(["1", "2"]);
        let retrieved = ids(&["9", "1", "2"]);
        assert_eq!(hit_fraction(&retrieved, &relevant, 2).unwrap(), 0.5);
        assert_eq!(hit_fraction(&retrieved, &relevant, 3).unwrap(), 1.0);
    }

    #[test]
    fn test_duplicates_count_once() {
        let relevant = HashSet::from(["1", "2"]);
        let retrieved = ids(&["1", "1", "1"]);
        assert_eq!(hit_fraction(&retrieved, &relevant, 3).unwrap(), 0.5);
    }

    #[test]
    fn test_scores_are_bounded() {
        let relevant = HashSet::from(["a", "b", "c", "d"]);
        let cases = [
            ids(&[]),
            ids(&["x", "y"]),
            ids(&["a", "b", "c", "d", "a", "b"]),
            ids(&["d", "x", "c", "y", "b", "z", "a"]),
        ];
        for retrieved in &cases {
            for k in [1, 4, 10, 1000] {
                let score = hit_fraction(retrieved, &relevant, k).unwrap();
                assert!((0.0..=1.0).contains(&score));
            }
        }
    }

    #[test]
    fn test_empty_relevant_set_is_undefined() {
        let relevant = HashSet::new();
        assert_eq!(hit_fraction(&ids(&["1"]), &relevant, 10), None);
    }

    #[test]
    fn test_cutoff_table() {
        let names: Vec<_> = CUTOFFS.iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            vec![
                "mean-r-precision",
                "recall@10",
                "recall@50",
                "recall@100",
                "recall@1000"
            ]
        );
        assert_eq!(CUTOFFS[0].1.resolve(7), 7);
        assert_eq!(CUTOFFS[4].1.resolve(7), 1000);
    }

    #[test]
    fn test_accumulator_means() {
        let mut acc = MetricAccumulator::new();
        for (name, _) in CUTOFFS {
            acc.record(name, 1.0);
            acc.record(name, 0.0);
        }
        acc.record("recall@10", 0.5);
        acc.record("ndcg@10", 1.0);

        let report = acc.finish().unwrap();
        assert_eq!(report.examples, 3);
        assert_eq!(report.get("mean-r-precision"), Some(0.5));
        assert_eq!(report.get("recall@10"), Some(0.5));
        assert_eq!(report.get("ndcg@10"), None);
    }

    #[test]
    fn test_accumulator_without_scores() {
        assert!(matches!(
            MetricAccumulator::new().finish(),
            Err(Ms2Error::NoExamples)
        ));
    }

    #[test]
    fn test_report_display() {
        let report = MetricReport {
            metrics: vec![
                MetricValue {
                    name: "mean-r-precision".to_string(),
                    value: 1.0 / 3.0,
                },
                MetricValue {
                    name: "recall@10".to_string(),
                    value: 2.0 / 3.0,
                },
            ],
            examples: 1,
        };
        assert_eq!(
            report.to_string(),
            "* mean-r-precision: 0.3333\n* recall@10: 0.6667"
        );
    }
}
