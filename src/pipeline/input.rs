//! Input handling: format detection and resolution of paths and URLs.
//!
//! Format detection looks at the declared file extension only. Content is
//! never sniffed here: a `.pdf` that is really a spreadsheet goes straight
//! to the structural converter and fails there.

use crate::error::DocmillError;
use crate::pipeline::artifact::TransientArtifact;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Extensions the pipeline routes to the image ingestion path when a caller
/// lets docmill choose (the CLI does). Image acceptance itself is decided by
/// the decoded format, not by this list.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "webp"];

/// A document format accepted by the conversion orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    Pdf,
    Ppt,
    Pptx,
    Doc,
    Docx,
}

impl DocumentFormat {
    pub const ALL: [DocumentFormat; 5] = [
        DocumentFormat::Pdf,
        DocumentFormat::Ppt,
        DocumentFormat::Pptx,
        DocumentFormat::Doc,
        DocumentFormat::Docx,
    ];

    /// Detect the format from a file name's extension, case-insensitively.
    pub fn from_filename(filename: &str) -> Result<Self, DocmillError> {
        let ext = extension_of(filename).unwrap_or_default();
        Self::from_extension(&ext).ok_or_else(|| DocmillError::UnsupportedFormat {
            filename: filename.to_string(),
            extension: ext,
        })
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "ppt" => Some(DocumentFormat::Ppt),
            "pptx" => Some(DocumentFormat::Pptx),
            "doc" => Some(DocumentFormat::Doc),
            "docx" => Some(DocumentFormat::Docx),
            _ => None,
        }
    }

    /// Lower-case extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Ppt => "ppt",
            DocumentFormat::Pptx => "pptx",
            DocumentFormat::Doc => "doc",
            DocumentFormat::Docx => "docx",
        }
    }

    /// Whether the office renderer must turn this format into PDF first.
    pub fn needs_rendering(self) -> bool {
        self != DocumentFormat::Pdf
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.extension().to_ascii_uppercase())
    }
}

/// Extension of `filename` without the dot, as written.
pub fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
}

/// `filetype` metadata value for a document: the original extension, upper-cased.
pub fn document_filetype(filename: &str) -> String {
    extension_of(filename)
        .unwrap_or_default()
        .to_ascii_uppercase()
}

/// Whether `filename` carries one of [`IMAGE_EXTENSIONS`].
pub fn has_image_extension(filename: &str) -> bool {
    extension_of(filename)
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Request payload: raw bytes (an upload) or a caller-owned file on disk.
#[derive(Debug, Clone)]
pub enum InputData {
    Bytes(Vec<u8>),
    Path(PathBuf),
}

impl InputData {
    /// Read the payload into memory.
    pub async fn into_bytes(self) -> Result<Vec<u8>, DocmillError> {
        match self {
            InputData::Bytes(b) => Ok(b),
            InputData::Path(p) => read_file(&p).await,
        }
    }
}

impl From<Vec<u8>> for InputData {
    fn from(bytes: Vec<u8>) -> Self {
        InputData::Bytes(bytes)
    }
}

impl From<PathBuf> for InputData {
    fn from(path: PathBuf) -> Self {
        InputData::Path(path)
    }
}

pub(crate) async fn read_file(path: &Path) -> Result<Vec<u8>, DocmillError> {
    tokio::fs::read(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            DocmillError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            DocmillError::Internal(format!("read {}: {e}", path.display()))
        }
    })
}

/// The resolved input: either a local path or a downloaded transient file.
#[derive(Debug)]
pub enum ResolvedInput {
    /// Input was already a local file.
    Local { path: PathBuf, filename: String },
    /// Input was a URL; body saved as a transient file that lives as long
    /// as this value.
    Downloaded {
        filename: String,
        artifact: TransientArtifact,
    },
}

impl ResolvedInput {
    /// Path of the file regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local { path, .. } => path,
            ResolvedInput::Downloaded { artifact, .. } => artifact.path(),
        }
    }

    /// Name used for `metadata.filename` and image names.
    pub fn filename(&self) -> &str {
        match self {
            ResolvedInput::Local { filename, .. } | ResolvedInput::Downloaded { filename, .. } => {
                filename
            }
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Name given to a downloaded document whose URL has no file name.
pub const DOCUMENT_FALLBACK_NAME: &str = "downloaded.pdf";

/// Name given to a downloaded image whose URL has no file name. The image
/// path detects the format from content, so no extension is implied.
pub const IMAGE_FALLBACK_NAME: &str = "downloaded";

/// Resolve a path or URL to a local file.
///
/// URLs are downloaded into a transient file under `temp_root`. When the URL
/// path carries no file name, `fallback_name` is used.
pub async fn resolve_input(
    input: &str,
    temp_root: &Path,
    timeout_secs: u64,
    fallback_name: &str,
) -> Result<ResolvedInput, DocmillError> {
    if is_url(input) {
        download_url(input, temp_root, timeout_secs, fallback_name).await
    } else {
        resolve_local(input)
    }
}

fn resolve_local(path_str: &str) -> Result<ResolvedInput, DocmillError> {
    if path_str.trim().is_empty() {
        return Err(DocmillError::InvalidInput {
            input: path_str.to_string(),
        });
    }
    let path = PathBuf::from(path_str);
    if !path.is_file() {
        return Err(DocmillError::FileNotFound { path });
    }
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| DocmillError::InvalidInput {
            input: path_str.to_string(),
        })?;

    debug!("Resolved local input: {}", path.display());
    Ok(ResolvedInput::Local { path, filename })
}

async fn download_url(
    url: &str,
    temp_root: &Path,
    timeout_secs: u64,
    fallback_name: &str,
) -> Result<ResolvedInput, DocmillError> {
    info!("Downloading input from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| DocmillError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let map_send_err = |e: reqwest::Error| {
        if e.is_timeout() {
            DocmillError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            DocmillError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(url).send().await.map_err(map_send_err)?;

    if !response.status().is_success() {
        return Err(DocmillError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let filename = extract_filename(url, fallback_name);
    let bytes = response.bytes().await.map_err(map_send_err)?;

    let suffix = extension_of(&filename)
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    let artifact = TransientArtifact::write(temp_root, &suffix, &bytes)?;

    info!("Downloaded {} bytes to {}", bytes.len(), artifact.path().display());
    Ok(ResolvedInput::Downloaded { filename, artifact })
}

/// Derive a file name from the last URL path segment.
fn extract_filename(url: &str, fallback: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    fallback.to_string()
}
