//! Structured document model and the structural-converter seam.
//!
//! The pipeline never parses PDF itself. It hands a [`DocumentSource`] to a
//! [`StructuralConverter`] and works only with the [`StructuredDocument`]
//! that comes back: its picture sequence, its table sequence and its
//! Markdown export. Any engine that can fill this model can be plugged into
//! [`crate::convert::Pipeline`]; [`crate::engine::PdfiumConverter`] is the
//! default one.

use crate::config::PageSeparator;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Placeholder emitted in Markdown where a picture sits in reading order.
pub const IMAGE_PLACEHOLDER: &str = "<!-- image -->";

/// What the structural converter reads from.
#[derive(Debug, Clone)]
pub enum DocumentSource {
    /// An in-memory PDF, named for diagnostics.
    Stream { name: String, bytes: Vec<u8> },
    /// A PDF on disk.
    Path(PathBuf),
}

impl DocumentSource {
    /// Human-readable name of the source.
    pub fn name(&self) -> String {
        match self {
            DocumentSource::Stream { name, .. } => name.clone(),
            DocumentSource::Path(p) => p.display().to_string(),
        }
    }

    /// Filesystem path, when the source lives on disk.
    pub fn path(&self) -> Option<&Path> {
        match self {
            DocumentSource::Stream { .. } => None,
            DocumentSource::Path(p) => Some(p),
        }
    }
}

/// Failure reported by a structural converter.
#[derive(Debug, Error)]
pub enum ConverterError {
    /// The engine itself could not be initialised.
    #[error("document engine unavailable: {0}")]
    Unavailable(String),

    /// The engine rejected the input (corrupt, encrypted, not a PDF, ...).
    #[error("{0}")]
    Rejected(String),
}

/// Turns a PDF into a [`StructuredDocument`].
///
/// Implementations are shared across concurrent requests and are called
/// from blocking worker threads, so they must be `Send + Sync` and must not
/// keep per-request state.
pub trait StructuralConverter: Send + Sync {
    fn convert(&self, source: DocumentSource) -> Result<StructuredDocument, ConverterError>;
}

/// A picture element found in the document.
#[derive(Debug, Clone)]
pub struct Picture {
    /// 1-indexed page the picture was found on.
    pub page: usize,
    /// Decoded raster, when the engine could extract one.
    pub image: Option<DynamicImage>,
    pub caption: Option<String>,
}

/// A table element: rows of cell text, the first row being the header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub page: usize,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Render as a GFM pipe table. Ragged rows are padded; `|` in cells is
    /// escaped and line breaks become spaces. Empty tables render as `None`.
    pub fn to_markdown(&self) -> Option<String> {
        let width = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        if width == 0 {
            return None;
        }

        let render_row = |row: &[String]| -> String {
            let cells: Vec<String> = (0..width)
                .map(|i| {
                    row.get(i)
                        .map(|c| c.replace('|', "\\|").replace(['\r', '\n'], " ").trim().to_string())
                        .unwrap_or_default()
                })
                .collect();
            format!("| {} |", cells.join(" | "))
        };

        let mut lines = Vec::with_capacity(self.rows.len() + 1);
        lines.push(render_row(&self.rows[0]));
        lines.push(format!("|{}", " --- |".repeat(width)));
        for row in &self.rows[1..] {
            lines.push(render_row(row));
        }
        Some(lines.join("\n"))
    }
}

/// One element of the reading-order body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph(String),
    /// Index into [`StructuredDocument::pictures`].
    Picture(usize),
    /// Index into [`StructuredDocument::tables`].
    Table(usize),
    PageBreak,
}

/// In-memory result of structural conversion.
///
/// Read-only once built: the pipeline only counts pictures and tables,
/// rasterises pictures and exports Markdown.
#[derive(Debug, Clone, Default)]
pub struct StructuredDocument {
    pictures: Vec<Picture>,
    tables: Vec<Table>,
    blocks: Vec<Block>,
}

impl StructuredDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pictures(&self) -> &[Picture] {
        &self.pictures
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn push_heading(&mut self, level: u8, text: impl Into<String>) {
        self.blocks.push(Block::Heading {
            level: level.clamp(1, 6),
            text: text.into(),
        });
    }

    pub fn push_paragraph(&mut self, text: impl Into<String>) {
        self.blocks.push(Block::Paragraph(text.into()));
    }

    /// Append a picture in reading order and return its index.
    pub fn push_picture(&mut self, picture: Picture) -> usize {
        let idx = self.pictures.len();
        self.pictures.push(picture);
        self.blocks.push(Block::Picture(idx));
        idx
    }

    /// Append a table in reading order and return its index.
    pub fn push_table(&mut self, table: Table) -> usize {
        let idx = self.tables.len();
        self.tables.push(table);
        self.blocks.push(Block::Table(idx));
        idx
    }

    pub fn push_page_break(&mut self) {
        self.blocks.push(Block::PageBreak);
    }

    /// Export the body as Markdown with pages joined by a blank line.
    pub fn export_to_markdown(&self) -> String {
        self.export_to_markdown_with(&PageSeparator::None)
    }

    /// Export the body as Markdown, rendering page breaks with `separator`.
    ///
    /// Empty paragraphs and empty tables are skipped; a page break before any
    /// content, or two breaks in a row, produce a single separator at most.
    pub fn export_to_markdown_with(&self, separator: &PageSeparator) -> String {
        let mut out = String::new();
        let mut page_num = 1usize;
        let mut pending_sep: Option<String> = None;

        for block in &self.blocks {
            if *block == Block::PageBreak {
                page_num += 1;
                if !out.is_empty() {
                    pending_sep = Some(separator.render(page_num));
                }
                continue;
            }

            let Some(chunk) = self.render_block(block) else {
                continue;
            };

            if !out.is_empty() {
                let sep = pending_sep.take().unwrap_or_else(|| "\n\n".to_string());
                out.push_str(&sep);
            }
            out.push_str(&chunk);
        }

        if !out.is_empty() {
            out.push('\n');
        }
        out
    }

    fn render_block(&self, block: &Block) -> Option<String> {
        match block {
            Block::Heading { level, text } => {
                let text = text.trim();
                (!text.is_empty()).then(|| format!("{} {}", "#".repeat(*level as usize), text))
            }
            Block::Paragraph(text) => {
                let text = text.trim();
                (!text.is_empty()).then(|| text.to_string())
            }
            Block::Picture(idx) => {
                let caption = self
                    .pictures
                    .get(*idx)
                    .and_then(|p| p.caption.as_deref())
                    .map(str::trim)
                    .filter(|c| !c.is_empty());
                Some(match caption {
                    Some(c) => format!("{}\n\n*{}*", IMAGE_PLACEHOLDER, c),
                    None => IMAGE_PLACEHOLDER.to_string(),
                })
            }
            Block::Table(idx) => self.tables.get(*idx).and_then(Table::to_markdown),
            Block::PageBreak => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn picture(page: usize) -> Picture {
        Picture {
            page,
            image: Some(DynamicImage::ImageRgb8(RgbImage::from_pixel(
                2,
                2,
                Rgb([0, 0, 0]),
            ))),
            caption: None,
        }
    }

    fn sample() -> StructuredDocument {
        let mut doc = StructuredDocument::new();
        doc.push_heading(1, "Quarterly report");
        doc.push_paragraph("Revenue grew.");
        doc.push_picture(picture(1));
        doc.push_page_break();
        doc.push_table(Table {
            page: 2,
            rows: vec![
                vec!["Region".into(), "Sales".into()],
                vec!["North".into(), "10".into()],
            ],
        });
        doc.push_picture(picture(2));
        doc
    }

    #[test]
    fn counts_follow_pushes() {
        let doc = sample();
        assert_eq!(doc.pictures().len(), 2);
        assert_eq!(doc.tables().len(), 1);
        assert_eq!(doc.blocks().len(), 6);
    }

    #[test]
    fn export_markdown_default() {
        let md = sample().export_to_markdown();
        assert_eq!(
            md,
            "# Quarterly report\n\nRevenue grew.\n\n<!-- image -->\n\n\
             | Region | Sales |\n| --- | --- |\n| North | 10 |\n\n<!-- image -->\n"
        );
    }

    #[test]
    fn export_markdown_with_comment_separator() {
        let md = sample().export_to_markdown_with(&PageSeparator::Comment);
        assert!(md.contains("<!-- image -->\n\n<!-- page 2 -->\n\n| Region"));
    }

    #[test]
    fn export_skips_empty_blocks_and_leading_breaks() {
        let mut doc = StructuredDocument::new();
        doc.push_page_break();
        doc.push_paragraph("   ");
        doc.push_paragraph("only text");
        assert_eq!(
            doc.export_to_markdown_with(&PageSeparator::HorizontalRule),
            "only text\n"
        );
        assert_eq!(StructuredDocument::new().export_to_markdown(), "");
    }

    #[test]
    fn heading_level_is_clamped() {
        let mut doc = StructuredDocument::new();
        doc.push_heading(9, "Deep");
        doc.push_heading(0, "Top");
        assert_eq!(doc.export_to_markdown(), "###### Deep\n\n# Top\n");
    }

    #[test]
    fn picture_caption_is_rendered() {
        let mut doc = StructuredDocument::new();
        let mut p = picture(1);
        p.caption = Some("Figure 1: Layout".into());
        doc.push_picture(p);
        assert_eq!(
            doc.export_to_markdown(),
            "<!-- image -->\n\n*Figure 1: Layout*\n"
        );
    }

    #[test]
    fn table_escapes_and_pads() {
        let t = Table {
            page: 1,
            rows: vec![
                vec!["a|b".into(), "c".into()],
                vec!["line\nbreak".into()],
            ],
        };
        assert_eq!(
            t.to_markdown().unwrap(),
            "| a\\|b | c |\n| --- | --- |\n| line break |  |"
        );
        assert!(Table::default().to_markdown().is_none());
    }

    #[test]
    fn source_name_and_path() {
        let s = DocumentSource::Stream {
            name: "a.pdf".into(),
            bytes: vec![],
        };
        assert_eq!(s.name(), "a.pdf");
        assert!(s.path().is_none());
        let p = DocumentSource::Path(PathBuf::from("/tmp/b.pdf"));
        assert_eq!(p.path(), Some(Path::new("/tmp/b.pdf")));
    }
}
