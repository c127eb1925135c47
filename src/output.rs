//! The result contract returned to callers.
//!
//! A [`ResultDocument`] is assembled once per request, after every stage has
//! succeeded, and is never mutated afterwards. It serialises to:
//!
//! ```json
//! {
//!   "text": "# Title ...",
//!   "metadata": {
//!     "filename": "report.docx",
//!     "filetype": "DOCX",
//!     "block_stats": { "images": 2, "tables": 1 }
//!   },
//!   "images": [ { "name": "report.docx_image_0", "data": "iVBORw0..." } ]
//! }
//! ```

use crate::error::DocmillError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Element counts taken from the structured document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockStats {
    /// Number of picture elements.
    pub images: usize,
    /// Number of table elements.
    pub tables: usize,
}

/// Summary metadata describing the source of a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Name supplied by the caller (upload name or path file name).
    pub filename: String,
    /// Upper-case extension for documents (`"PDF"`, `"DOCX"`), lower-case
    /// decoded format for images (`"png"`, `"jpeg"`).
    pub filetype: String,
    pub block_stats: BlockStats,
}

/// One embedded picture, PNG-encoded and base64-wrapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedImage {
    /// `{document_name}_image_{index}`.
    pub name: String,
    /// Standard base64 of the PNG bytes.
    pub data: String,
}

/// Canonical output of a conversion: Markdown text, metadata, media.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultDocument {
    pub text: String,
    pub metadata: DocumentMetadata,
    pub images: Vec<EncodedImage>,
}

impl ResultDocument {
    /// Combine extracted text, metadata and encoded media into a result.
    ///
    /// Pure data assembly. Fails with [`DocmillError::InvalidResult`] when
    /// `filename` or `filetype` is empty, when two images share a name, or
    /// when there are more images than `block_stats.images` reports.
    pub fn assemble(
        text: String,
        metadata: DocumentMetadata,
        images: Vec<EncodedImage>,
    ) -> Result<Self, DocmillError> {
        if metadata.filename.trim().is_empty() {
            return Err(DocmillError::InvalidResult(
                "metadata.filename must not be empty".into(),
            ));
        }
        if metadata.filetype.trim().is_empty() {
            return Err(DocmillError::InvalidResult(
                "metadata.filetype must not be empty".into(),
            ));
        }
        if images.len() > metadata.block_stats.images {
            return Err(DocmillError::InvalidResult(format!(
                "{} images encoded but only {} pictures reported",
                images.len(),
                metadata.block_stats.images
            )));
        }

        let mut seen = HashSet::with_capacity(images.len());
        for img in &images {
            if !seen.insert(img.name.as_str()) {
                return Err(DocmillError::InvalidResult(format!(
                    "duplicate image name '{}'",
                    img.name
                )));
            }
        }

        Ok(Self {
            text,
            metadata,
            images,
        })
    }

    /// Look up an encoded image by name.
    pub fn image(&self, name: &str) -> Option<&EncodedImage> {
        self.images.iter().find(|i| i.name == name)
    }
}
