//! Review corpus representation and loading.
//!
//! The corpus is a directory of line-delimited JSON files, one per split
//! (`training_reviews.jsonl`, `validation_reviews.jsonl`, ...). Each line is a
//! review with the studies it includes:
//!
//! ```json
//! {"pmid": "123", "title": "...", "included_studies": [
//!     {"pmid": "456", "references": [{"title": "...", "abstract": "..."}]}
//! ]}
//! ```

use crate::error::{Ms2Error, Result};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extension of split files.
pub const SPLIT_EXTENSION: &str = "jsonl";

/// Dataset split a corpus file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Split {
    Training,
    Validation,
    Testing,
}

impl Split {
    pub const ALL: [Split; 3] = [Split::Training, Split::Validation, Split::Testing];

    /// File name prefix for this split.
    pub fn name(self) -> &'static str {
        match self {
            Split::Training => "training",
            Split::Validation => "validation",
            Split::Testing => "testing",
        }
    }

    /// Determine the split of a corpus file from its name.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(&format!(".{}", SPLIT_EXTENSION))?;
        Self::ALL
            .into_iter()
            .find(|split| stem.starts_with(split.name()))
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One study a review cites as included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyReference {
    /// Study identifier (PubMed id).
    pub id: String,
    pub reference_title: Option<String>,
    pub reference_abstract: Option<String>,
}

/// A systematic review and the studies it includes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRecord {
    /// Review identifier (PubMed id).
    pub id: String,
    /// Review title, free text.
    pub title: String,
    /// Included studies, in corpus order.
    pub included_studies: Vec<StudyReference>,
}

impl ReviewRecord {
    /// Parse one corpus line.
    pub fn from_json(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawReview>(line).map(Into::into)
    }
}

/// Raw review shape as stored in the corpus files.
#[derive(Debug, Deserialize)]
struct RawReview {
    #[serde(deserialize_with = "deserialize_id")]
    pmid: String,
    title: String,
    included_studies: Vec<RawStudy>,
}

#[derive(Debug, Deserialize)]
struct RawStudy {
    #[serde(deserialize_with = "deserialize_id")]
    pmid: String,
    #[serde(default)]
    references: Vec<RawReference>,
}

#[derive(Debug, Deserialize)]
struct RawReference {
    #[serde(default)]
    title: Option<String>,
    #[serde(default, rename = "abstract")]
    abstract_text: Option<String>,
}

impl From<RawReview> for ReviewRecord {
    fn from(raw: RawReview) -> Self {
        let included_studies = raw
            .included_studies
            .into_iter()
            .map(|study| {
                // Only the first reference of a study carries its text
                let reference = study.references.into_iter().next();
                let (reference_title, reference_abstract) = match reference {
                    Some(r) => (r.title, r.abstract_text),
                    None => (None, None),
                };
                StudyReference {
                    id: study.pmid,
                    reference_title,
                    reference_abstract,
                }
            })
            .collect();

        Self {
            id: raw.pmid,
            title: raw.title,
            included_studies,
        }
    }
}

/// Accept identifiers written either as JSON strings or integers.
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(u64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}

/// Find the split files directly under `dir`, sorted by file name.
///
/// Only files named `<split>*.jsonl` for one of the requested splits qualify.
pub fn discover_split_files(dir: &Path, splits: &[Split]) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Ms2Error::InvalidCorpusPath(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            let source = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
            Ms2Error::io(path, source)
        })?;

        // Resolves symlinks, so linked split files count as well
        if !entry.path().is_file() {
            continue;
        }

        let Some(name) = entry.file_name().to_str() else {
            continue;
        };

        match Split::from_file_name(name) {
            Some(split) if splits.contains(&split) => {
                tracing::debug!(file = %entry.path().display(), %split, "found split file");
                files.push(entry.into_path());
            }
            _ => {}
        }
    }

    if files.is_empty() {
        return Err(Ms2Error::NoSplitFiles(dir.to_path_buf()));
    }

    Ok(files)
}

/// Streaming reader over the reviews of one split file.
///
/// Blank lines are skipped. A line that does not parse ends the stream with
/// a [`Ms2Error::MalformedRecord`] naming the file and line.
pub struct ReviewReader {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line_number: usize,
}

impl ReviewReader {
    /// Open a split file for reading.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Ms2Error::FileNotFound(path.to_path_buf()));
        }
        let file = File::open(path).map_err(|e| Ms2Error::io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            lines: BufReader::new(file).lines(),
            line_number: 0,
        })
    }
}

impl Iterator for ReviewReader {
    type Item = Result<ReviewRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line_number += 1;

            let line = match line {
                Ok(line) => line,
                Err(e) => return Some(Err(Ms2Error::io(&self.path, e))),
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            return Some(
                ReviewRecord::from_json(line)
                    .map_err(|e| Ms2Error::malformed(&self.path, self.line_number, e)),
            );
        }
    }
}
