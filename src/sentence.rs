//! Sentence segmentation for review titles.
//!
//! The synthesizer only needs the first sentence of a title, so splitters
//! yield sentences lazily and callers stop after the first one.

use once_cell::sync::Lazy;
use regex::{Matches, Regex};

// Terminal punctuation followed by whitespace or end of text.
static SENTENCE_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]+(?:\s+|$)").expect("Invalid sentence regex pattern"));

/// Lowercased tokens whose trailing period does not end a sentence.
const ABBREVIATIONS: &[&str] = &[
    "al", "approx", "ca", "cf", "dr", "e.g", "eg", "fig", "i.e", "ie", "incl", "mr", "mrs", "ms",
    "prof", "resp", "vol", "vs",
];

/// A sentence span within the segmented text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    /// Sentence text with surrounding whitespace removed.
    pub text: String,
    /// Byte offset where the sentence starts.
    pub start: usize,
    /// Byte offset where the sentence ends (exclusive).
    pub end: usize,
}

impl Sentence {
    /// Build a sentence from a raw span starting at `offset`, trimming whitespace.
    /// Returns `None` for blank spans.
    fn from_span(span: &str, offset: usize) -> Option<Self> {
        let trimmed = span.trim();
        if trimmed.is_empty() {
            return None;
        }
        let leading = span.len() - span.trim_start().len();
        let start = offset + leading;
        Some(Self {
            text: trimmed.to_string(),
            start,
            end: start + trimmed.len(),
        })
    }
}

/// Splits text into sentences.
pub trait SentenceSplitter {
    /// Lazily segment `text` into sentences, in order.
    fn sentences<'a>(&'a self, text: &'a str) -> impl Iterator<Item = Sentence> + 'a;

    /// The first sentence of `text`, or `None` if it has no content.
    fn first_sentence(&self, text: &str) -> Option<Sentence> {
        self.sentences(text).next()
    }
}

/// Punctuation-driven splitter with a small abbreviation list.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleSentenceSplitter;

impl RuleSentenceSplitter {
    pub fn new() -> Self {
        Self
    }
}

impl SentenceSplitter for RuleSentenceSplitter {
    fn sentences<'a>(&'a self, text: &'a str) -> impl Iterator<Item = Sentence> + 'a {
        RuleSentences {
            text,
            boundaries: SENTENCE_BOUNDARY.find_iter(text),
            start: 0,
            done: false,
        }
    }
}

/// Iterator returned by [`RuleSentenceSplitter`].
struct RuleSentences<'a> {
    text: &'a str,
    boundaries: Matches<'static, 'a>,
    start: usize,
    done: bool,
}

impl Iterator for RuleSentences<'_> {
    type Item = Sentence;

    fn next(&mut self) -> Option<Sentence> {
        if self.done {
            return None;
        }

        for boundary in self.boundaries.by_ref() {
            let before = &self.text[self.start..boundary.start()];
            if boundary.as_str().trim_end() == "." && ends_with_abbreviation(before) {
                continue;
            }

            let offset = self.start;
            self.start = boundary.end();
            if let Some(sentence) = Sentence::from_span(&self.text[offset..boundary.end()], offset)
            {
                return Some(sentence);
            }
        }

        // Whatever follows the last boundary is a sentence without terminal punctuation
        self.done = true;
        Sentence::from_span(&self.text[self.start..], self.start)
    }
}

fn ends_with_abbreviation(before: &str) -> bool {
    let Some(token) = before.split_whitespace().last() else {
        return false;
    };
    let token = token.trim_start_matches(['(', '[', '"', '\'']);

    // Single capital initial, e.g. "J. Smith"
    let mut chars = token.chars();
    if let (Some(first), None) = (chars.next(), chars.next()) {
        if first.is_uppercase() {
            return true;
        }
    }

    let lowered = token.to_lowercase();
    ABBREVIATIONS.contains(&lowered.as_str()) || is_dotted_acronym(token)
}

/// Letter groups joined by periods, e.g. "U.S", "i.v" or "Ph.D".
fn is_dotted_acronym(token: &str) -> bool {
    let mut groups = 0;
    for group in token.split('.') {
        if group.is_empty() || group.chars().count() > 3 || !group.chars().all(char::is_alphabetic)
        {
            return false;
        }
        groups += 1;
    }
    groups > 1
}
