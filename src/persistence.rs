//! Persistence layer for the example and index corpora.
//!
//! Both artifacts are line-delimited JSON. Files are written to a temporary
//! sibling first and renamed into place, so an aborted run never leaves a
//! truncated file under the final name.

use crate::error::{Ms2Error, Result};
use crate::synthesis::{QueryExample, Synthesis};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// File holding one query example per line.
pub const EXAMPLES_FILENAME: &str = "examples.jsonl";

/// File holding one candidate document per line, consumed by the indexing job.
pub const TO_INDEX_FILENAME: &str = "to_index.jsonl";

/// Paths of the artifacts written by [`save_synthesis`].
#[derive(Debug, Clone)]
pub struct SavedCorpora {
    pub examples: PathBuf,
    pub to_index: PathBuf,
}

/// Write `examples.jsonl` and `to_index.jsonl` into `output_dir`, creating it if needed.
///
/// Both files are staged before either is renamed into place, so a failed
/// write leaves any previous pair untouched.
pub fn save_synthesis(synthesis: &Synthesis, output_dir: &Path) -> Result<SavedCorpora> {
    fs::create_dir_all(output_dir).map_err(|e| Ms2Error::io(output_dir, e))?;

    let saved = SavedCorpora {
        examples: output_dir.join(EXAMPLES_FILENAME),
        to_index: output_dir.join(TO_INDEX_FILENAME),
    };

    let examples_tmp = stage_jsonl(&saved.examples, &synthesis.examples)?;
    let to_index_tmp = match stage_jsonl(&saved.to_index, &synthesis.candidates) {
        Ok(tmp) => tmp,
        Err(e) => {
            let _ = fs::remove_file(&examples_tmp);
            return Err(e);
        }
    };

    if let Err(e) = commit(&to_index_tmp, &saved.to_index) {
        let _ = fs::remove_file(&examples_tmp);
        return Err(e);
    }
    commit(&examples_tmp, &saved.examples)?;

    Ok(saved)
}

/// Write items to the temporary sibling of `path` and return its location.
fn stage_jsonl<T: Serialize>(path: &Path, items: &[T]) -> Result<PathBuf> {
    let tmp_path = temporary_path(path);

    let result = (|| -> Result<()> {
        let file = fs::File::create(&tmp_path).map_err(|e| Ms2Error::io(&tmp_path, e))?;
        let mut writer = BufWriter::new(file);
        for item in items {
            serde_json::to_writer(&mut writer, item)?;
            writer
                .write_all(b"\n")
                .map_err(|e| Ms2Error::io(&tmp_path, e))?;
        }
        writer.flush().map_err(|e| Ms2Error::io(&tmp_path, e))
    })();

    match result {
        Ok(()) => Ok(tmp_path),
        Err(e) => {
            let _ = fs::remove_file(&tmp_path);
            Err(e)
        }
    }
}

fn commit(tmp_path: &Path, path: &Path) -> Result<()> {
    fs::rename(tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(tmp_path);
        Ms2Error::io(path, e)
    })
}

fn temporary_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Read a JSON-lines file, skipping blank lines.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Err(Ms2Error::FileNotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(|e| Ms2Error::io(path, e))?;

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).map_err(|e| Ms2Error::malformed(path, idx + 1, e))
        })
        .collect()
}

/// Load query examples written by [`save_synthesis`].
pub fn load_examples(path: &Path) -> Result<Vec<QueryExample>> {
    read_jsonl(path)
}

/// Save a value as pretty-printed JSON, creating parent directories.
pub fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| Ms2Error::io(parent, e))?;
        }
    }

    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).map_err(|e| Ms2Error::io(path, e))
}
