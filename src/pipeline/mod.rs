//! Pipeline stages for document normalisation.
//!
//! Each submodule implements one step; [`crate::convert`] wires them
//! together per request.
//!
//! ## Data Flow
//!
//! ```text
//!             ┌─ pdf ──────────────────────────┐
//! input ──▶ ──┤                                 ├──▶ converter ──▶ encode ──▶ ResultDocument
//!             ├─ ppt/pptx/doc/docx ─▶ normalize ┤
//!             └─ png/jpeg/tiff/webp ─▶ image ───┘
//! ```
//!
//! 1. [`input`]    : format detection and input resolution (bytes, path, URL)
//! 2. [`artifact`] : request-scoped temp files that delete themselves
//! 3. [`normalize`]: office document → PDF via the headless renderer
//! 4. [`image`]    : decode, whitelist, flatten and wrap raw images as PDF
//! 5. [`encode`]   : picture elements → base64 PNG payloads
//! 6. [`postprocess`]: deterministic cleanup of engine-extracted text

pub mod artifact;
pub mod encode;
pub mod image;
pub mod input;
pub mod normalize;
pub mod postprocess;
