//! Evaluation runner: query the retriever with each example and score the results.

use super::metrics::{CUTOFFS, MetricAccumulator, MetricReport, hit_fraction};
use crate::error::{Ms2Error, Result};
use crate::search::Retriever;
use crate::synthesis::QueryExample;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Configuration for an evaluation run.
#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    /// Maximum examples to evaluate (for quick testing).
    pub max_examples: Option<usize>,
    /// Show a progress bar while scoring.
    pub show_progress: bool,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            max_examples: None,
            show_progress: true,
        }
    }
}

/// Scores for a single example, in cutoff order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExampleScores {
    /// Review the query came from.
    pub review_id: String,
    /// Number of distinct relevant documents.
    pub relevant: usize,
    /// `(metric, score)` pairs.
    pub scores: Vec<(String, f64)>,
}

/// Everything produced by an evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResults {
    /// Corpus-level means.
    pub report: MetricReport,
    /// Individual example scores.
    pub per_example: Vec<ExampleScores>,
    /// Total evaluation time (seconds).
    pub total_time_secs: f64,
}

/// Scores query examples against a retriever.
pub struct Evaluator<R> {
    retriever: R,
    config: EvaluatorConfig,
}

impl<R: Retriever> Evaluator<R> {
    /// Create a new evaluator.
    pub fn new(retriever: R, config: EvaluatorConfig) -> Self {
        Self { retriever, config }
    }

    /// Score every example and average the scores per metric.
    pub async fn evaluate(&self, examples: &[QueryExample]) -> Result<EvaluationResults> {
        let start_time = Instant::now();

        let examples = match self.config.max_examples {
            Some(max) => &examples[..max.min(examples.len())],
            None => examples,
        };

        if examples.is_empty() {
            return Err(Ms2Error::NoExamples);
        }

        let progress = if self.config.show_progress {
            let pb = ProgressBar::new(examples.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{msg} [{bar:40}] {pos}/{len}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            pb.set_message("Scoring examples");
            pb
        } else {
            ProgressBar::hidden()
        };

        let mut accumulator = MetricAccumulator::new();
        let mut per_example = Vec::with_capacity(examples.len());

        for example in examples {
            let scores = match self.score_example(example).await {
                Ok(scores) => scores,
                Err(e) => {
                    progress.abandon();
                    return Err(e);
                }
            };

            for (name, score) in &scores.scores {
                accumulator.record(name, *score);
            }
            per_example.push(scores);
            progress.inc(1);
        }
        progress.finish();

        let report = accumulator.finish()?;
        tracing::info!(examples = report.examples, "evaluation complete");

        Ok(EvaluationResults {
            report,
            per_example,
            total_time_secs: start_time.elapsed().as_secs_f64(),
        })
    }

    /// Score one example: one retrieval call per cutoff.
    pub async fn score_example(&self, example: &QueryExample) -> Result<ExampleScores> {
        let relevant = example.relevant_ids();
        if relevant.is_empty() {
            return Err(Ms2Error::EmptyRelevantSet(example.review_id.clone()));
        }

        let mut scores = Vec::with_capacity(CUTOFFS.len());
        for (name, cutoff) in CUTOFFS {
            let k = cutoff.resolve(relevant.len());
            let retrieved = self.retriever.retrieve(&example.query, k).await?;
            let score = hit_fraction(&retrieved, &relevant, k)
                .ok_or_else(|| Ms2Error::EmptyRelevantSet(example.review_id.clone()))?;
            tracing::debug!(review = %example.review_id, metric = name, k, score, "scored");
            scores.push((name.to_string(), score));
        }

        Ok(ExampleScores {
            review_id: example.review_id.clone(),
            relevant: relevant.len(),
            scores,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Retriever returning scripted id lists per `(query, k)`, recording calls.
    #[derive(Default)]
    struct ScriptedRetriever {
        responses: HashMap<(String, usize), Vec<String>>,
        calls: Mutex<Vec<(String, usize)>>,
    }

    impl ScriptedRetriever {
        fn with(mut self, query: &str, k: usize, ids: &[&str]) -> Self {
            self.responses.insert(
                (query.to_string(), k),
                ids.iter().map(|id| id.to_string()).collect(),
            );
            self
        }

        fn calls(&self) -> Vec<(String, usize)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Retriever for ScriptedRetriever {
        async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<String>> {
            self.calls.lock().unwrap().push((query.to_string(), k));
            Ok(self
                .responses
                .get(&(query.to_string(), k))
                .cloned()
                .unwrap_or_default())
        }
    }

    /// Retriever that always fails.
    struct FailingRetriever;

    impl Retriever for FailingRetriever {
        async fn retrieve(&self, _query: &str, _k: usize) -> Result<Vec<String>> {
            Err(Ms2Error::Http("request timed out".to_string()))
        }
    }

    fn quiet() -> EvaluatorConfig {
        EvaluatorConfig {
            max_examples: None,
            show_progress: false,
        }
    }

    const QUERY: &str = "Does drug X reduce pain?";

    #[tokio::test]
    async fn test_scenario_d_scores() {
        let retriever = ScriptedRetriever::default()
            .with(QUERY, 3, &["1", "4", "9"])
            .with(
                QUERY,
                10,
                &["1", "2", "5", "6", "7", "8", "9", "10", "11", "12"],
            )
            .with(QUERY, 50, &["1", "2", "3"])
            .with(QUERY, 100, &["1", "2", "3"])
            .with(QUERY, 1000, &["1", "2", "3"]);
        let evaluator = Evaluator::new(retriever, quiet());
        let example = QueryExample::new("100", QUERY, ["1", "2", "3"]);

        let results = evaluator.evaluate(&[example]).await.unwrap();
        let report = &results.report;

        assert_eq!(report.examples, 1);
        assert!((report.get("mean-r-precision").unwrap() - 1.0 / 3.0).abs() < 1e-9);
        assert!((report.get("recall@10").unwrap() - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(report.get("recall@50"), Some(1.0));
        assert_eq!(report.get("recall@1000"), Some(1.0));
        assert!(report.to_string().starts_with("* mean-r-precision: 0.3333\n* recall@10: 0.6667"));

        assert_eq!(results.per_example.len(), 1);
        assert_eq!(results.per_example[0].relevant, 3);
    }

    #[tokio::test]
    async fn test_one_call_per_cutoff_in_order() {
        let evaluator = Evaluator::new(ScriptedRetriever::default(), quiet());
        let example = QueryExample::new("100", QUERY, ["1", "2"]);

        evaluator.score_example(&example).await.unwrap();

        let ks: Vec<_> = evaluator.retriever.calls().into_iter().map(|(_, k)| k).collect();
        assert_eq!(ks, vec![2, 10, 50, 100, 1000]);
    }

    #[tokio::test]
    async fn test_means_over_examples() {
        let q1 = "Is drug A effective for migraine?";
        let q2 = "Can drug B prevent migraine attacks?";
        let mut retriever = ScriptedRetriever::default();
        for k in [1, 10, 50, 100, 1000] {
            retriever = retriever.with(q1, k, &["a"]).with(q2, k, &["x"]);
        }
        let evaluator = Evaluator::new(retriever, quiet());
        let examples = vec![
            QueryExample::new("1", q1, ["a"]),
            QueryExample::new("2", q2, ["b"]),
        ];

        let results = evaluator.evaluate(&examples).await.unwrap();
        assert_eq!(results.report.examples, 2);
        for metric in &results.report.metrics {
            assert_eq!(metric.value, 0.5, "{}", metric.name);
        }
    }

    #[tokio::test]
    async fn test_duplicate_relevant_ids_are_deduplicated() {
        let retriever = ScriptedRetriever::default().with(QUERY, 2, &["1", "2"]);
        let evaluator = Evaluator::new(retriever, quiet());
        let example = QueryExample::new("100", QUERY, ["1", "2", "2"]);

        let scores = evaluator.score_example(&example).await.unwrap();
        assert_eq!(scores.relevant, 2);
        assert_eq!(scores.scores[0], ("mean-r-precision".to_string(), 1.0));
    }

    #[tokio::test]
    async fn test_empty_relevant_set_is_rejected() {
        let evaluator = Evaluator::new(ScriptedRetriever::default(), quiet());
        let example = QueryExample::new("400", QUERY, Vec::<String>::new());

        match evaluator.evaluate(&[example]).await {
            Err(err @ Ms2Error::EmptyRelevantSet(_)) => {
                assert!(err.to_string().contains("review '400'"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(evaluator.retriever.calls().is_empty());
    }

    #[tokio::test]
    async fn test_no_examples() {
        let evaluator = Evaluator::new(ScriptedRetriever::default(), quiet());
        assert!(matches!(
            evaluator.evaluate(&[]).await,
            Err(Ms2Error::NoExamples)
        ));
    }

    #[tokio::test]
    async fn test_max_examples() {
        let config = EvaluatorConfig {
            max_examples: Some(1),
            show_progress: false,
        };
        let evaluator = Evaluator::new(ScriptedRetriever::default(), config);
        let examples = vec![
            QueryExample::new("1", QUERY, ["1"]),
            QueryExample::new("2", QUERY, ["2"]),
        ];

        let results = evaluator.evaluate(&examples).await.unwrap();
        assert_eq!(results.per_example.len(), 1);
        assert_eq!(evaluator.retriever.calls().len(), 5);
    }

    #[test]
    fn test_retrieval_failure_aborts() {
        let evaluator = Evaluator::new(FailingRetriever, quiet());
        let example = QueryExample::new("1", QUERY, ["1"]);

        let result = tokio_test::block_on(evaluator.evaluate(&[example]));
        assert!(matches!(result, Err(Ms2Error::Http(_))));
    }
}
