//! Dense index construction.
//!
//! Encoding the candidate corpus and writing the vector index is done by an
//! external script (see `scripts/encode.sh`). This module validates the
//! inputs, runs the script and turns a failed run into an error carrying the
//! script's own diagnostics.

use crate::config::{IndexConfig, validate_device};
use crate::error::{Ms2Error, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Name of the index directory created under the output directory.
pub const INDEX_DIRNAME: &str = "index";

/// Number of trailing stderr lines kept in an [`Ms2Error::IndexJob`].
const STDERR_TAIL_LINES: usize = 20;

/// Runs the external indexing job.
#[derive(Debug, Clone)]
pub struct IndexJob {
    config: IndexConfig,
    encoder: String,
}

impl IndexJob {
    /// Create a job runner using `encoder` to embed the corpus.
    pub fn new(config: IndexConfig, encoder: impl Into<String>) -> Self {
        Self {
            config,
            encoder: encoder.into(),
        }
    }

    /// Build the index for the `to_index.jsonl` file at `input`.
    ///
    /// The index is written to `<output_dir>/index`, whose path is returned.
    pub async fn run(&self, input: &Path, output_dir: &Path, device: &str) -> Result<PathBuf> {
        if !input.is_file() {
            return Err(Ms2Error::FileNotFound(input.to_path_buf()));
        }
        if !self.config.script.is_file() {
            return Err(Ms2Error::FileNotFound(self.config.script.clone()));
        }
        validate_device(device)?;

        std::fs::create_dir_all(output_dir).map_err(|e| Ms2Error::io(output_dir, e))?;
        let index_dir = output_dir.join(INDEX_DIRNAME);

        tracing::info!(
            script = %self.config.script.display(),
            input = %input.display(),
            index = %index_dir.display(),
            device,
            "starting indexing job"
        );

        // Progress goes straight to the terminal; stderr is kept for the error report
        let child = Command::new(&self.config.shell)
            .arg(&self.config.script)
            .arg(input)
            .arg(&index_dir)
            .arg(device)
            .arg(&self.encoder)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Ms2Error::io(&self.config.script, e))?;

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| Ms2Error::io(&self.config.script, e))?;

        if !output.status.success() {
            return Err(Ms2Error::IndexJob {
                status: output.status.to_string(),
                stderr: stderr_tail(&output.stderr),
            });
        }

        Ok(index_dir)
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("encode.sh");
        fs::write(&path, body).unwrap();
        path
    }

    fn job(script: PathBuf) -> IndexJob {
        let config = IndexConfig {
            shell: "sh".to_string(),
            script,
            device: "cpu".to_string(),
        };
        IndexJob::new(config, "test-encoder")
    }

    #[tokio::test]
    async fn test_runs_script_with_arguments() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("to_index.jsonl");
        fs::write(&input, "{\"id\":\"1\",\"contents\":\"x\"}\n").unwrap();
        let script = write_script(
            dir.path(),
            "mkdir -p \"$2\"\necho \"$1 $3 $4\" > \"$2/args.txt\"\n",
        );

        let out = dir.path().join("out");
        let index_dir = job(script).run(&input, &out, "cuda:0").await.unwrap();

        assert_eq!(index_dir, out.join(INDEX_DIRNAME));
        let args = fs::read_to_string(index_dir.join("args.txt")).unwrap();
        assert_eq!(
            args.trim(),
            format!("{} cuda:0 test-encoder", input.display())
        );
    }

    #[tokio::test]
    async fn test_failure_carries_stderr() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("to_index.jsonl");
        fs::write(&input, "").unwrap();
        let script = write_script(dir.path(), "echo 'CUDA device not found' >&2\nexit 3\n");

        let err = job(script)
            .run(&input, &dir.path().join("out"), "cpu")
            .await
            .unwrap_err();
        match err {
            Ms2Error::IndexJob { status, stderr } => {
                assert!(status.contains('3'));
                assert_eq!(stderr, "CUDA device not found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_inputs() {
        let dir = TempDir::new().unwrap();
        let script = write_script(dir.path(), "exit 0\n");
        let input = dir.path().join("missing.jsonl");

        let err = job(script.clone())
            .run(&input, dir.path(), "cpu")
            .await
            .unwrap_err();
        assert!(matches!(err, Ms2Error::FileNotFound(_)));

        fs::write(&input, "").unwrap();
        let err = job(dir.path().join("nope.sh"))
            .run(&input, dir.path(), "cpu")
            .await
            .unwrap_err();
        assert!(matches!(err, Ms2Error::FileNotFound(_)));

        let err = job(script).run(&input, dir.path(), "gpu0").await.unwrap_err();
        assert!(matches!(err, Ms2Error::Config(_)));
    }

    #[test]
    fn test_stderr_tail() {
        let text: String = (0..30).map(|i| format!("line {}\n", i)).collect();
        let tail = stderr_tail(text.as_bytes());
        assert!(tail.starts_with("line 10"));
        assert!(tail.ends_with("line 29"));
    }
}
