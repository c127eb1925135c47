//! Conversion entry points.
//!
//! [`Pipeline`] is the application-scoped context: it owns the
//! configuration, the office renderer handle and the structural converter,
//! and is cloned cheaply into every request handler. Each call runs one
//! request end to end:
//!
//! ```text
//! convert(filename, input)
//!  │
//!  ├─ 1. Detect    extension check, before any I/O
//!  ├─ 2. Normalise office formats → PDF (renderer, transient files)
//!  ├─ 3. Extract   structural converter (spawn_blocking)
//!  ├─ 4. Describe  filetype + block_stats
//!  ├─ 5. Encode    pictures → base64 PNG
//!  ├─ 6. Cleanup   every transient artifact, on every exit path
//!  └─ 7. Assemble  ResultDocument
//! ```
//!
//! Cleanup is structural: transient files live in an
//! [`ArtifactSet`](crate::pipeline::artifact::ArtifactSet) owned by the call,
//! and an early `?` return drops the set exactly like the success path does.

use crate::config::PipelineConfig;
use crate::document::{DocumentSource, StructuralConverter};
use crate::engine::PdfiumConverter;
use crate::error::{DocmillError, Result};
use crate::output::{BlockStats, DocumentMetadata, ResultDocument};
use crate::pipeline::artifact::{ArtifactSet, TransientArtifact};
use crate::pipeline::encode;
use crate::pipeline::image::{decode_image, flatten, format_name, wrap_as_pdf};
use crate::pipeline::input::{
    self, document_filetype, read_file, DocumentFormat, InputData, ResolvedInput,
};
use crate::pipeline::normalize::OfficeRenderer;
use crate::progress::Stage;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Shared conversion context. Cheap to clone; safe to use from many tasks.
#[derive(Clone)]
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    renderer: OfficeRenderer,
    converter: Arc<dyn StructuralConverter>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("renderer", &self.renderer)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Build a pipeline around an already initialised converter.
    pub fn new(config: PipelineConfig, converter: Arc<dyn StructuralConverter>) -> Self {
        let renderer = OfficeRenderer::new(config.office_program.clone());
        Self {
            config: Arc::new(config),
            renderer,
            converter,
        }
    }

    /// Build a pipeline using [`PdfiumConverter`] as the structural converter.
    pub fn with_default_engine(config: PipelineConfig) -> Self {
        let engine = PdfiumConverter::new().with_password(config.password.clone());
        Self::new(config, Arc::new(engine))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn renderer(&self) -> &OfficeRenderer {
        &self.renderer
    }

    /// Convert a PDF or office document into a [`ResultDocument`].
    ///
    /// `filename` decides the route: only `.pdf`, `.ppt`, `.pptx`, `.doc`
    /// and `.docx` are accepted (case-insensitive). Anything else fails with
    /// [`DocmillError::UnsupportedFormat`] before the input is touched.
    ///
    /// # Errors
    /// - [`DocmillError::UnsupportedFormat`] for an unknown extension
    /// - [`DocmillError::RenderFailed`] when office → PDF rendering fails
    /// - [`DocmillError::ExtractionFailed`] when the converter rejects the PDF
    /// - [`DocmillError::EncodingFailed`] when a picture cannot be encoded
    pub async fn convert(&self, filename: &str, input: InputData) -> Result<ResultDocument> {
        let start = Instant::now();
        let format = match DocumentFormat::from_filename(filename) {
            Ok(f) => f,
            Err(e) => return Err(self.reject(filename, e)),
        };
        info!("Starting conversion: {} ({})", filename, format);
        self.notify_start(filename);

        let result = self.convert_document(filename, format, input).await;
        self.finish(filename, start, result)
    }

    async fn convert_document(
        &self,
        filename: &str,
        format: DocumentFormat,
        input: InputData,
    ) -> Result<ResultDocument> {
        let mut artifacts = ArtifactSet::new();

        let source = if format.needs_rendering() {
            self.notify_stage(filename, Stage::Normalizing);
            let root = self.config.temp_root();
            let working = match input {
                InputData::Path(path) if has_extension(&path, format) => path,
                other => {
                    let bytes = other.into_bytes().await?;
                    let suffix = format!(".{}", format.extension());
                    artifacts
                        .track(TransientArtifact::write(&root, &suffix, &bytes)?)
                        .to_path_buf()
                }
            };
            let out_dir = artifacts
                .track(TransientArtifact::dir(&root)?)
                .to_path_buf();
            let pdf = self.renderer.render(&working, &out_dir).await?;
            DocumentSource::Path(pdf)
        } else {
            match input {
                InputData::Bytes(bytes) => DocumentSource::Stream {
                    name: filename.to_string(),
                    bytes,
                },
                InputData::Path(path) => DocumentSource::Path(path),
            }
        };

        let result = self
            .extract_and_assemble(filename, document_filetype(filename), source)
            .await;
        debug!("Releasing {} transient artifact(s)", artifacts.len());
        artifacts.release();
        result
    }

    /// Convert a raw image (PNG, JPEG, TIFF or WebP) into a [`ResultDocument`].
    ///
    /// The image is decoded, checked against the accepted formats by its
    /// content, flattened to RGB and wrapped as a one-page PDF before going
    /// through the same extraction path as documents. `filetype` is the
    /// decoded format in lower case (`"png"`, `"jpeg"`, ...).
    pub async fn ingest_image(&self, name: &str, input: InputData) -> Result<ResultDocument> {
        let start = Instant::now();
        info!("Starting image ingestion: {}", name);
        self.notify_start(name);

        let result = self.ingest(name, input).await;
        self.finish(name, start, result)
    }

    async fn ingest(&self, name: &str, input: InputData) -> Result<ResultDocument> {
        self.notify_stage(name, Stage::Wrapping);
        let bytes = input.into_bytes().await?;

        let owned_name = name.to_string();
        let (pdf, filetype) = tokio::task::spawn_blocking(move || -> Result<(Vec<u8>, String)> {
            let (img, format) = decode_image(&owned_name, &bytes)?;
            let pdf = wrap_as_pdf(&owned_name, &flatten(img))?;
            Ok((pdf, format_name(format).to_string()))
        })
        .await
        .map_err(|e| DocmillError::Internal(format!("Image task panicked: {}", e)))??;

        let mut artifacts = ArtifactSet::new();
        let pdf_path = artifacts
            .track(TransientArtifact::write(&self.config.temp_root(), ".pdf", &pdf)?)
            .to_path_buf();

        let result = self
            .extract_and_assemble(name, filetype, DocumentSource::Path(pdf_path))
            .await;
        artifacts.release();
        result
    }

    /// Steps 3–5 and 7, shared by documents and images.
    async fn extract_and_assemble(
        &self,
        filename: &str,
        filetype: String,
        source: DocumentSource,
    ) -> Result<ResultDocument> {
        self.notify_stage(filename, Stage::Extracting);
        let converter = Arc::clone(&self.converter);
        let document = tokio::task::spawn_blocking(move || converter.convert(source))
            .await
            .map_err(|e| DocmillError::Internal(format!("Extraction task panicked: {}", e)))?
            .map_err(|e| DocmillError::ExtractionFailed {
                filename: filename.to_string(),
                detail: e.to_string(),
            })?;

        let block_stats = BlockStats {
            images: document.pictures().len(),
            tables: document.tables().len(),
        };
        let text = document.export_to_markdown_with(&self.config.page_separator);
        debug!(
            "{}: {} pictures, {} tables, {} chars of text",
            filename,
            block_stats.images,
            block_stats.tables,
            text.len()
        );

        let images = if self.config.extract_images && block_stats.images > 0 {
            self.notify_stage(filename, Stage::Encoding);
            let doc_name = filename.to_string();
            tokio::task::spawn_blocking(move || encode::encode_media(&doc_name, &document))
                .await
                .map_err(|e| DocmillError::Internal(format!("Encoding task panicked: {}", e)))??
        } else {
            Vec::new()
        };

        ResultDocument::assemble(
            text,
            DocumentMetadata {
                filename: filename.to_string(),
                filetype,
                block_stats,
            },
            images,
        )
    }

    /// Convert a document on disk; the file name is taken from the path.
    pub async fn convert_path(&self, path: impl AsRef<Path>) -> Result<ResultDocument> {
        let path = path.as_ref();
        let filename =
            file_name_of(path).map_err(|e| self.reject(&path.display().to_string(), e))?;
        self.convert(&filename, InputData::Path(path.to_path_buf()))
            .await
    }

    /// Convert a local path or an HTTP(S) URL as a document.
    ///
    /// URLs are downloaded into a transient file first, deleted once the
    /// conversion returns.
    ///
    /// Resolution failures (missing file, failed download) are reported to
    /// the progress callback under `input`.
    pub async fn convert_input(&self, input: &str) -> Result<ResultDocument> {
        let resolved = self
            .resolve(input, input::DOCUMENT_FALLBACK_NAME)
            .await
            .map_err(|e| self.reject(input, e))?;
        self.convert(resolved.filename(), InputData::Path(resolved.path().to_path_buf()))
            .await
    }

    /// Like [`Pipeline::convert_input`], but through the image path.
    pub async fn ingest_input(&self, input: &str) -> Result<ResultDocument> {
        let resolved = self
            .resolve(input, input::IMAGE_FALLBACK_NAME)
            .await
            .map_err(|e| self.reject(input, e))?;
        let bytes = read_file(resolved.path())
            .await
            .map_err(|e| self.reject(resolved.filename(), e))?;
        self.ingest_image(resolved.filename(), InputData::Bytes(bytes))
            .await
    }

    async fn resolve(&self, input: &str, fallback_name: &str) -> Result<ResolvedInput> {
        input::resolve_input(
            input,
            &self.config.temp_root(),
            self.config.download_timeout_secs,
            fallback_name,
        )
        .await
    }

    /// Convert a path or URL and write the result as JSON to `output_path`.
    ///
    /// Uses atomic write (temp file + rename) to prevent partial files.
    pub async fn convert_to_file(
        &self,
        input: &str,
        output_path: impl AsRef<Path>,
    ) -> Result<BlockStats> {
        let doc = self.convert_input(input).await?;
        write_json(&doc, output_path.as_ref()).await?;
        Ok(doc.metadata.block_stats)
    }

    /// Synchronous wrapper around [`Pipeline::convert`].
    ///
    /// Creates a temporary tokio runtime internally; do not call from
    /// within an async context.
    pub fn convert_sync(&self, filename: &str, input: InputData) -> Result<ResultDocument> {
        tokio::runtime::Runtime::new()
            .map_err(|e| DocmillError::Internal(format!("Failed to create tokio runtime: {}", e)))?
            .block_on(self.convert(filename, input))
    }

    // ── Progress plumbing ────────────────────────────────────────────────

    fn notify_start(&self, filename: &str) {
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_request_start(filename);
        }
    }

    fn notify_stage(&self, filename: &str, stage: Stage) {
        debug!("{}: {}", filename, stage);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_stage(filename, stage);
        }
    }

    /// Report a request that failed before it started.
    fn reject(&self, name: &str, error: DocmillError) -> DocmillError {
        warn!("Rejected {}: {}", name, error);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_request_error(name, error.to_string());
        }
        error
    }

    fn finish(
        &self,
        filename: &str,
        start: Instant,
        result: Result<ResultDocument>,
    ) -> Result<ResultDocument> {
        let elapsed_ms = start.elapsed().as_millis();
        match &result {
            Ok(doc) => {
                info!(
                    "Converted {} in {}ms: {} images, {} tables",
                    filename,
                    elapsed_ms,
                    doc.metadata.block_stats.images,
                    doc.metadata.block_stats.tables
                );
                if let Some(ref cb) = self.config.progress_callback {
                    cb.on_request_complete(filename, &doc.metadata.block_stats);
                }
            }
            Err(e) => {
                warn!("Conversion of {} failed after {}ms: {}", filename, elapsed_ms, e);
                if let Some(ref cb) = self.config.progress_callback {
                    cb.on_request_error(filename, e.to_string());
                }
            }
        }
        result
    }
}

/// Write a result as pretty JSON, atomically.
pub async fn write_json(doc: &ResultDocument, path: &Path) -> Result<()> {
    let write_err = |source: std::io::Error| DocmillError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let json = serde_json::to_vec_pretty(doc)
        .map_err(|e| DocmillError::Internal(format!("JSON serialisation failed: {}", e)))?;

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, &json).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}

fn has_extension(path: &Path, format: DocumentFormat) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(format.extension()))
        .unwrap_or(false)
}

fn file_name_of(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| DocmillError::InvalidInput {
            input: path.display().to_string(),
        })
}
