//! Default structural converter backed by pdfium.
//!
//! [`PdfiumConverter`] reads a PDF with `pdfium-render` and fills a
//! [`StructuredDocument`] page by page: the text layer becomes paragraphs
//! (cleaned by [`crate::pipeline::postprocess`]), every image object becomes
//! a [`Picture`] carrying its decoded raster, and pages are separated by
//! [`crate::document::Block::PageBreak`]. Table detection is not attempted,
//! so `tables` is always empty for this engine.
//!
//! ## Library binding
//!
//! pdfium is a native library loaded at runtime. The converter binds to
//! `PDFIUM_LIB_PATH` when that variable is set (either the library file or
//! the directory holding it) and to the system library otherwise. Binding
//! happens per call on the blocking worker thread that runs the conversion,
//! so the converter itself holds no native handles and is trivially
//! `Send + Sync`.

use crate::document::{
    ConverterError, DocumentSource, Picture, StructuralConverter, StructuredDocument,
};
use crate::error::DocmillError;
use crate::pipeline::postprocess;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Environment variable naming the pdfium library (file or directory).
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// pdfium-backed [`StructuralConverter`].
#[derive(Clone, Default)]
pub struct PdfiumConverter {
    library_path: Option<PathBuf>,
    password: Option<String>,
}

impl std::fmt::Debug for PdfiumConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfiumConverter")
            .field("library_path", &self.library_path)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl PdfiumConverter {
    /// Converter bound according to `PDFIUM_LIB_PATH`.
    pub fn new() -> Self {
        Self {
            library_path: std::env::var_os(PDFIUM_LIB_PATH_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            password: None,
        }
    }

    /// Bind to an explicit library file or directory.
    pub fn with_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_path = Some(path.into());
        self
    }

    /// User password for encrypted documents.
    pub fn with_password(mut self, password: Option<String>) -> Self {
        self.password = password;
        self
    }

    fn bind(&self) -> Result<Pdfium, PdfiumError> {
        let bindings = match &self.library_path {
            Some(p) if p.is_dir() => {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(p))?
            }
            Some(p) => Pdfium::bind_to_library(p)?,
            None => Pdfium::bind_to_system_library()?,
        };
        Ok(Pdfium::new(bindings))
    }

    /// Check that the pdfium library can be loaded.
    pub fn probe(&self) -> Result<(), DocmillError> {
        self.bind().map(|_| ()).map_err(|e| {
            DocmillError::EngineUnavailable(format!(
                "{:?} (library: {})",
                e,
                self.library_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "system".into())
            ))
        })
    }
}

impl StructuralConverter for PdfiumConverter {
    fn convert(&self, source: DocumentSource) -> Result<StructuredDocument, ConverterError> {
        let pdfium = self
            .bind()
            .map_err(|e| ConverterError::Unavailable(format!("{:?}", e)))?;

        let name = source.name();
        let password = self.password.as_deref();
        let document = match source {
            DocumentSource::Stream { bytes, .. } => pdfium.load_pdf_from_byte_vec(bytes, password),
            DocumentSource::Path(path) => pdfium.load_pdf_from_file(&path, password),
        }
        .map_err(|e| load_error(e, password.is_some()))?;

        let pages = document.pages();
        info!("PDF loaded: {} ({} pages)", name, pages.len());

        let mut out = StructuredDocument::new();
        for (idx, page) in pages.iter().enumerate() {
            let page_num = idx + 1;
            if idx > 0 {
                out.push_page_break();
            }

            let text = page
                .text()
                .map_err(|e| ConverterError::Rejected(format!("page {page_num} text: {e:?}")))?
                .all();
            for paragraph in postprocess::clean_page_text(&text) {
                out.push_paragraph(paragraph);
            }

            for object in page.objects().iter() {
                let Some(image) = object.as_image_object() else {
                    continue;
                };
                let raster = match image.get_raw_image() {
                    Ok(img) => Some(img),
                    Err(e) => {
                        warn!("Page {}: image object has no decodable raster: {:?}", page_num, e);
                        None
                    }
                };
                out.push_picture(Picture {
                    page: page_num,
                    image: raster,
                    caption: None,
                });
            }

            debug!(
                "Page {} done ({} pictures so far)",
                page_num,
                out.pictures().len()
            );
        }

        Ok(out)
    }
}

fn load_error(e: PdfiumError, had_password: bool) -> ConverterError {
    let detail = format!("{:?}", e);
    if detail.contains("Password") || detail.contains("password") {
        if had_password {
            ConverterError::Rejected("incorrect password".into())
        } else {
            ConverterError::Rejected("document is password protected".into())
        }
    } else {
        ConverterError::Rejected(format!("not a readable PDF: {detail}"))
    }
}
