//! Format normalisation: office documents → PDF via a headless renderer.
//!
//! The renderer is an external executable (LibreOffice by default) invoked as
//!
//! ```text
//! <program> --headless --convert-to pdf --outdir <out_dir> <input>
//! ```
//!
//! It names its output after the input's stem, so the produced file is
//! expected at `<out_dir>/<stem>.pdf`. Anything else (spawn failure, non-zero
//! exit, missing output) is a [`DocmillError::RenderFailed`] carrying the
//! renderer's stderr.
//!
//! The renderer call is awaited on `tokio::process`, so a slow conversion
//! never blocks a runtime worker thread.

use crate::error::DocmillError;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Longest stderr excerpt kept in a [`DocmillError::RenderFailed`].
const MAX_STDERR_CHARS: usize = 2_000;

/// Handle to the external office renderer.
#[derive(Debug, Clone)]
pub struct OfficeRenderer {
    program: String,
}

impl OfficeRenderer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Check that the renderer can be started at all.
    pub async fn is_available(&self) -> bool {
        let result = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        matches!(result, Ok(status) if status.success())
    }

    /// Render `input` to PDF inside `out_dir` and return the output path.
    ///
    /// `out_dir` must be a directory owned by the caller's request; the
    /// renderer may leave lock or profile files in it.
    pub async fn render(&self, input: &Path, out_dir: &Path) -> Result<PathBuf, DocmillError> {
        let expected = expected_output_path(input, out_dir)?;
        info!(
            "Rendering {} to PDF with '{}'",
            input.display(),
            self.program
        );

        let output = Command::new(&self.program)
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(out_dir)
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| DocmillError::RenderFailed {
                input: input.to_path_buf(),
                detail: format!("failed to run '{}': {}", self.program, e),
            })?;

        if !output.status.success() {
            return Err(DocmillError::RenderFailed {
                input: input.to_path_buf(),
                detail: format!("{}: {}", output.status, stderr_excerpt(&output.stderr)),
            });
        }

        if !expected.is_file() {
            return Err(DocmillError::RenderFailed {
                input: input.to_path_buf(),
                detail: format!(
                    "renderer exited successfully but produced no '{}'{}",
                    expected.display(),
                    match stderr_excerpt(&output.stderr) {
                        s if s.is_empty() => String::new(),
                        s => format!(" ({s})"),
                    }
                ),
            });
        }

        debug!("Renderer produced {}", expected.display());
        Ok(expected)
    }
}

/// `<out_dir>/<input stem>.pdf`.
pub fn expected_output_path(input: &Path, out_dir: &Path) -> Result<PathBuf, DocmillError> {
    let stem = input
        .file_stem()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| DocmillError::RenderFailed {
            input: input.to_path_buf(),
            detail: "input path has no file name".into(),
        })?;
    let mut name = stem.to_os_string();
    name.push(".pdf");
    Ok(out_dir.join(name))
}

fn stderr_excerpt(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.chars().count() <= MAX_STDERR_CHARS {
        return text.to_string();
    }
    let tail: String = text
        .chars()
        .rev()
        .take(MAX_STDERR_CHARS)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("...{tail}")
}
