//! Configuration types for the normalisation pipeline.
//!
//! All pipeline behaviour is controlled through [`PipelineConfig`], built via
//! its [`PipelineConfigBuilder`]. The config is part of the shared
//! [`crate::convert::Pipeline`] context and is never mutated per request.

use crate::error::DocmillError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Executable used to render office documents when none is configured.
pub const DEFAULT_OFFICE_PROGRAM: &str = "libreoffice";

/// Configuration for a [`crate::convert::Pipeline`].
///
/// # Example
/// ```rust
/// use docmill::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .office_program("soffice")
///     .extract_images(false)
///     .build()
///     .unwrap();
/// assert_eq!(config.office_program, "soffice");
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Office renderer executable (looked up on `PATH` unless absolute).
    /// Default: `libreoffice`.
    pub office_program: String,

    /// Directory under which every transient file and directory is created.
    /// `None` uses the system temp dir.
    pub temp_dir: Option<PathBuf>,

    /// Run the media encoder. Default: true.
    ///
    /// With `false` the result carries no `images`, but `block_stats`
    /// still reports the real picture count.
    pub extract_images: bool,

    /// PDF user password forwarded to the structural converter.
    pub password: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// How page breaks appear in `text`. Default: a blank line.
    pub page_separator: PageSeparator,

    /// Optional stage-level progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            office_program: DEFAULT_OFFICE_PROGRAM.to_string(),
            temp_dir: None,
            extract_images: true,
            password: None,
            download_timeout_secs: 120,
            page_separator: PageSeparator::None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("office_program", &self.office_program)
            .field("temp_dir", &self.temp_dir)
            .field("extract_images", &self.extract_images)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("page_separator", &self.page_separator)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// Directory new transient artifacts are created in.
    pub fn temp_root(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn office_program(mut self, program: impl Into<String>) -> Self {
        self.config.office_program = program.into();
        self
    }

    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_dir = Some(dir.into());
        self
    }

    pub fn extract_images(mut self, v: bool) -> Self {
        self.config.extract_images = v;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs.max(1);
        self
    }

    pub fn page_separator(mut self, sep: PageSeparator) -> Self {
        self.config.page_separator = sep;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, DocmillError> {
        let c = &self.config;
        if c.office_program.trim().is_empty() {
            return Err(DocmillError::InvalidConfig(
                "office renderer program must not be empty".into(),
            ));
        }
        if let Some(ref dir) = c.temp_dir {
            if !dir.is_dir() {
                return Err(DocmillError::InvalidConfig(format!(
                    "temp dir '{}' does not exist or is not a directory",
                    dir.display()
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How page boundaries are rendered in exported Markdown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSeparator {
    /// No visible separator; pages joined with a blank line. (default)
    #[default]
    None,
    /// Horizontal rule: "\n\n---\n\n"
    HorizontalRule,
    /// HTML comment with page number: "<!-- page N -->"
    Comment,
    /// Custom string inserted between pages.
    Custom(String),
}

impl PageSeparator {
    /// Render the separator placed before page `page_num` (1-indexed).
    pub fn render(&self, page_num: usize) -> String {
        match self {
            PageSeparator::None => "\n\n".to_string(),
            PageSeparator::HorizontalRule => "\n\n---\n\n".to_string(),
            PageSeparator::Comment => format!("\n\n<!-- page {} -->\n\n", page_num),
            PageSeparator::Custom(s) => format!("\n\n{}\n\n", s),
        }
    }
}
