//! Query example construction from review titles.
//!
//! A review title phrased as a yes/no clinical question ("Does drug X reduce
//! pain?") is used as a search query whose relevant documents are the studies
//! the review includes. Every included study, whether or not its review yields
//! a query, becomes a candidate document for the index.

use crate::corpus::ReviewRecord;
use crate::sentence::SentenceSplitter;
use crate::text::normalize;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Interrogative words a qualifying title must start with.
pub const QUESTION_WORDS: [&str; 4] = ["Is", "Does", "Can", "Are"];

/// Minimum number of whitespace-separated tokens in a query.
pub const MIN_QUERY_TOKENS: usize = 4;

static QUESTION_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^(?:{})\b", QUESTION_WORDS.join("|")))
        .expect("Invalid question prefix regex")
});

/// Reference to a relevant study, as written in `examples.jsonl`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludedStudy {
    #[serde(deserialize_with = "crate::corpus::deserialize_id")]
    pub pmid: String,
}

/// A query and the documents that should be retrieved for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryExample {
    /// Id of the review the query was taken from.
    #[serde(rename = "pmid", deserialize_with = "crate::corpus::deserialize_id")]
    pub review_id: String,
    /// Studies included by the review.
    pub included_studies: Vec<IncludedStudy>,
    /// First sentence of the review title.
    pub query: String,
}

impl QueryExample {
    pub fn new(
        review_id: impl Into<String>,
        query: impl Into<String>,
        relevant_ids: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            review_id: review_id.into(),
            included_studies: relevant_ids
                .into_iter()
                .map(|id| IncludedStudy { pmid: id.into() })
                .collect(),
            query: query.into(),
        }
    }

    /// The distinct ids of the relevant studies.
    pub fn relevant_ids(&self) -> HashSet<&str> {
        self.included_studies
            .iter()
            .map(|study| study.pmid.as_str())
            .collect()
    }
}

/// A study flattened into an indexable document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDocument {
    pub id: String,
    /// Normalized title and abstract joined by a single space.
    #[serde(rename = "contents")]
    pub text: String,
}

/// Whether `candidate`, the first sentence of `title`, is usable as a query.
///
/// The original title must start with one of [`QUESTION_WORDS`] as a whole
/// word, and the candidate must have at least [`MIN_QUERY_TOKENS`] tokens and
/// end with a question mark.
pub fn is_answerable_question(title: &str, candidate: &str) -> bool {
    QUESTION_PREFIX.is_match(title)
        && candidate.split_whitespace().count() >= MIN_QUERY_TOKENS
        && candidate.ends_with('?')
}

/// Extract a query from a review title, if the title qualifies.
pub fn extract_query<S: SentenceSplitter>(title: &str, splitter: &S) -> Option<String> {
    let sentence = splitter.first_sentence(title)?;
    // Titles often continue after a colon that the splitter leaves attached
    let candidate = sentence.text.trim_end_matches(':');
    is_answerable_question(title, candidate).then(|| candidate.to_string())
}

/// Build the candidate document for one study.
fn candidate_document(id: &str, title: Option<&str>, abstract_text: Option<&str>) -> CandidateDocument {
    let title = normalize(title.unwrap_or(""), false);
    let abstract_text = normalize(abstract_text.unwrap_or(""), false);
    CandidateDocument {
        id: id.to_string(),
        text: format!("{} {}", title, abstract_text),
    }
}

/// Counters describing a synthesis run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SynthesisStats {
    pub reviews: usize,
    pub examples: usize,
    pub candidates: usize,
    /// Reviews whose title qualified but which include no studies.
    pub reviews_without_studies: usize,
}

/// Output of the synthesizer.
#[derive(Debug, Clone, Default)]
pub struct Synthesis {
    pub examples: Vec<QueryExample>,
    pub candidates: Vec<CandidateDocument>,
    pub stats: SynthesisStats,
}

/// Incremental synthesizer, fed one review at a time.
pub struct Synthesizer<S> {
    splitter: S,
    output: Synthesis,
}

impl<S: SentenceSplitter> Synthesizer<S> {
    pub fn new(splitter: S) -> Self {
        Self {
            splitter,
            output: Synthesis::default(),
        }
    }

    /// Add one review's candidates and, if its title qualifies, its example.
    pub fn add_review(&mut self, review: &ReviewRecord) {
        let output = &mut self.output;
        output.stats.reviews += 1;

        for study in &review.included_studies {
            output.candidates.push(candidate_document(
                &study.id,
                study.reference_title.as_deref(),
                study.reference_abstract.as_deref(),
            ));
        }
        output.stats.candidates = output.candidates.len();

        let Some(query) = extract_query(&review.title, &self.splitter) else {
            return;
        };

        if review.included_studies.is_empty() {
            tracing::warn!(review = %review.id, %query, "skipping question with no included studies");
            output.stats.reviews_without_studies += 1;
            return;
        }

        tracing::debug!(review = %review.id, %query, "created example");
        output.examples.push(QueryExample::new(
            review.id.clone(),
            query,
            review.included_studies.iter().map(|study| study.id.clone()),
        ));
        output.stats.examples = output.examples.len();
    }

    /// Number of examples produced so far.
    pub fn example_count(&self) -> usize {
        self.output.examples.len()
    }

    pub fn finish(self) -> Synthesis {
        self.output
    }
}

/// Synthesize examples and candidates from a sequence of reviews.
pub fn synthesize<'a, S, I>(reviews: I, splitter: S) -> Synthesis
where
    S: SentenceSplitter,
    I: IntoIterator<Item = &'a ReviewRecord>,
{
    let mut synthesizer = Synthesizer::new(splitter);
    for review in reviews {
        synthesizer.add_review(review);
    }
    synthesizer.finish()
}
