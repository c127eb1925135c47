//! Error types for the docmill library.
//!
//! Every failure a request can hit is a variant of [`DocmillError`]. The
//! pipeline never retries: a failed renderer call, a converter that rejects
//! its input or a picture that cannot be rasterised ends the request, after
//! all of its transient files have been removed.
//!
//! The five pipeline failures map one-to-one onto the stages that raise them:
//!
//! | Variant | Raised by |
//! |---------|-----------|
//! | [`DocmillError::UnsupportedFormat`] | extension check, before any I/O |
//! | [`DocmillError::RenderFailed`] | office renderer (format normalisation) |
//! | [`DocmillError::ExtractionFailed`] | structural converter |
//! | [`DocmillError::InvalidImage`] | image ingestion (decode / whitelist) |
//! | [`DocmillError::EncodingFailed`] | media encoder |

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DocmillError>;

/// All fatal errors returned by the docmill library.
#[derive(Debug, Error)]
pub enum DocmillError {
    // ── Pipeline errors ───────────────────────────────────────────────────
    /// The file extension is not one of pdf, ppt, pptx, doc, docx.
    #[error("Unsupported file type '{extension}' for '{filename}'. Only PDF, PPT, PPTX, DOC and DOCX are allowed.")]
    UnsupportedFormat { filename: String, extension: String },

    /// The office renderer exited non-zero, could not be started, or left no
    /// PDF at the expected path.
    #[error("Failed to render '{input}' to PDF: {detail}")]
    RenderFailed { input: PathBuf, detail: String },

    /// The structural converter rejected the (normalised) PDF.
    #[error("Failed to extract document structure from '{filename}': {detail}")]
    ExtractionFailed { filename: String, detail: String },

    /// Image bytes could not be decoded, or decoded to a format outside the
    /// accepted set.
    #[error("Invalid image '{name}': {detail}")]
    InvalidImage { name: String, detail: String },

    /// A picture element could not be rendered to PNG.
    #[error("Failed to encode picture {index}: {detail}")]
    EncodingFailed { index: usize, detail: String },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// The input string is neither a readable file path nor an HTTP(S) URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The assembled result violates the output contract.
    #[error("Invalid result document: {0}")]
    InvalidResult(String),

    /// Could not create or write the output JSON file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The document engine library could not be loaded.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide.\n"
    )]
    EngineUnavailable(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (temp file creation, task join, ...).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DocmillError {
    /// Short machine-friendly name of the failure class, used in logs and by
    /// the CLI when reporting per-input failures.
    pub fn kind(&self) -> &'static str {
        match self {
            DocmillError::UnsupportedFormat { .. } => "unsupported_format",
            DocmillError::RenderFailed { .. } => "render_error",
            DocmillError::ExtractionFailed { .. } => "extraction_error",
            DocmillError::InvalidImage { .. } => "invalid_image",
            DocmillError::EncodingFailed { .. } => "encoding_error",
            DocmillError::FileNotFound { .. }
            | DocmillError::InvalidInput { .. }
            | DocmillError::DownloadFailed { .. }
            | DocmillError::DownloadTimeout { .. } => "input_error",
            DocmillError::InvalidResult(_) => "invalid_result",
            DocmillError::OutputWriteFailed { .. } => "output_error",
            DocmillError::InvalidConfig(_) => "config_error",
            DocmillError::EngineUnavailable(_) => "engine_unavailable",
            DocmillError::Internal(_) => "internal_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_format_display() {
        let e = DocmillError::UnsupportedFormat {
            filename: "notes.txt".into(),
            extension: "txt".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("notes.txt"), "got: {msg}");
        assert!(msg.contains("'txt'"), "got: {msg}");
        assert_eq!(e.kind(), "unsupported_format");
    }

    #[test]
    fn render_failed_display() {
        let e = DocmillError::RenderFailed {
            input: PathBuf::from("/tmp/deck.pptx"),
            detail: "exit status 1".into(),
        };
        assert!(e.to_string().contains("/tmp/deck.pptx"));
        assert!(e.to_string().contains("exit status 1"));
        assert_eq!(e.kind(), "render_error");
    }

    #[test]
    fn encoding_failed_display() {
        let e = DocmillError::EncodingFailed {
            index: 3,
            detail: "no raster".into(),
        };
        assert!(e.to_string().contains("picture 3"));
    }

    #[test]
    fn input_errors_share_kind() {
        let a = DocmillError::FileNotFound {
            path: PathBuf::from("x.pdf"),
        };
        let b = DocmillError::DownloadTimeout {
            url: "https://example.org/x.pdf".into(),
            secs: 5,
        };
        assert_eq!(a.kind(), b.kind());
    }
}
