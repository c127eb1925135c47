//! Progress-callback trait for per-request pipeline events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to observe
//! each request as it moves through the pipeline stages.
//!
//! # Example
//!
//! ```rust
//! use docmill::{ConversionProgressCallback, PipelineConfig, Stage};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct StageCounter {
//!     stages: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for StageCounter {
//!     fn on_stage(&self, filename: &str, stage: Stage) {
//!         self.stages.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{filename}: {stage}");
//!     }
//! }
//!
//! let counter = Arc::new(StageCounter { stages: AtomicUsize::new(0) });
//!
//! let config = PipelineConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::BlockStats;
use std::fmt;
use std::sync::Arc;

/// A pipeline stage reported through [`ConversionProgressCallback::on_stage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Office document is being rendered to PDF.
    Normalizing,
    /// Raw image is being decoded and wrapped as a PDF.
    Wrapping,
    /// Structural converter is running.
    Extracting,
    /// Pictures are being encoded.
    Encoding,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Normalizing => "normalizing",
            Stage::Wrapping => "wrapping image",
            Stage::Extracting => "extracting",
            Stage::Encoding => "encoding media",
        };
        f.write_str(s)
    }
}

/// Called by the pipeline as it processes each request.
///
/// Implementations must be `Send + Sync`: one shared
/// [`crate::convert::Pipeline`] serves concurrent requests, so events for
/// different files may interleave. All methods default to no-ops.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once the input has passed the format check.
    fn on_request_start(&self, filename: &str) {
        let _ = filename;
    }

    /// Called when a request enters a new stage.
    fn on_stage(&self, filename: &str, stage: Stage) {
        let _ = (filename, stage);
    }

    /// Called after the result document has been assembled.
    fn on_request_complete(&self, filename: &str, stats: &BlockStats) {
        let _ = (filename, stats);
    }

    /// Called when a request fails, after its transient files are gone.
    ///
    /// Also fires for inputs rejected before [`Self::on_request_start`]
    /// (unsupported extension, missing file, failed download), so every
    /// request ends in exactly one complete or error event.
    ///
    /// `error` is owned so implementations can move it into spawned tasks.
    fn on_request_error(&self, filename: &str, error: String) {
        let _ = (filename, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
