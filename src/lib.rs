//! # docmill
//!
//! Normalise PDF, office documents and raster images into one result shape:
//! Markdown text, the embedded pictures as base64 PNG, and block statistics.
//!
//! ## Pipeline Overview
//!
//! ```text
//! input (bytes | path | URL)
//!  │
//!  ├─ 1. Detect     pdf / ppt / pptx / doc / docx by extension, images by content
//!  ├─ 2. Normalise  office → PDF via a headless renderer (LibreOffice)
//!  │                image  → flatten to RGB, wrap as a one-page PDF
//!  ├─ 3. Extract    structural converter → StructuredDocument (pdfium by default)
//!  ├─ 4. Encode     pictures → `{name}_image_{i}` base64 PNG
//!  └─ 5. Assemble   ResultDocument { text, metadata, images }
//! ```
//!
//! Every temporary file created on the way is owned by the request and
//! removed before the call returns, whether it succeeds or fails.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docmill::{InputData, Pipeline, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = Pipeline::with_default_engine(PipelineConfig::default());
//!
//!     let bytes = std::fs::read("slides.pptx")?;
//!     let doc = pipeline.convert("slides.pptx", InputData::Bytes(bytes)).await?;
//!
//!     println!("{}", doc.text);
//!     eprintln!(
//!         "{}: {} images, {} tables",
//!         doc.metadata.filetype,
//!         doc.metadata.block_stats.images,
//!         doc.metadata.block_stats.tables
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Plugging in another engine
//!
//! [`Pipeline::new`] accepts any [`StructuralConverter`]. The converter is
//! shared by all requests and called from blocking worker threads.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docmill` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! docmill = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod document;
pub mod engine;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PageSeparator, PipelineConfig, PipelineConfigBuilder, DEFAULT_OFFICE_PROGRAM};
pub use convert::{write_json, Pipeline};
pub use document::{
    Block, ConverterError, DocumentSource, Picture, StructuralConverter, StructuredDocument,
    Table, IMAGE_PLACEHOLDER,
};
pub use engine::PdfiumConverter;
pub use error::{DocmillError, Result};
pub use output::{BlockStats, DocumentMetadata, EncodedImage, ResultDocument};
pub use pipeline::encode::encode_media;
pub use pipeline::input::{DocumentFormat, InputData};
pub use pipeline::normalize::OfficeRenderer;
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
