//! Image ingestion: decode, whitelist, flatten and wrap as a one-page PDF.
//!
//! Only PNG, JPEG, TIFF and WebP are accepted; the decision is made on the
//! *decoded* format, so a GIF renamed to `.png` is still rejected. Every
//! accepted raster is flattened to 8-bit RGB (alpha dropped) and placed on a
//! single page whose media box equals its pixel size, one pixel per point.
//! The pixels are embedded losslessly with Flate compression.

use crate::error::DocmillError;
use image::{DynamicImage, ImageFormat, ImageReader};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::io::Cursor;
use tracing::debug;

/// Formats accepted by image ingestion.
pub const ACCEPTED_FORMATS: [ImageFormat; 4] = [
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Tiff,
    ImageFormat::WebP,
];

/// Decode `bytes` and check the detected format against [`ACCEPTED_FORMATS`].
pub fn decode_image(name: &str, bytes: &[u8]) -> Result<(DynamicImage, ImageFormat), DocmillError> {
    let invalid = |detail: String| DocmillError::InvalidImage {
        name: name.to_string(),
        detail,
    };

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| invalid(format!("cannot read image data: {e}")))?;

    let format = reader
        .format()
        .ok_or_else(|| invalid("unrecognised image data".into()))?;

    if !ACCEPTED_FORMATS.contains(&format) {
        return Err(invalid(format!(
            "unsupported image format '{}'; accepted formats are png, jpeg, tiff, webp",
            format_name(format)
        )));
    }

    let img = reader
        .decode()
        .map_err(|e| invalid(format!("decode failed: {e}")))?;

    debug!(
        "Decoded {} as {} ({}x{}, {:?})",
        name,
        format_name(format),
        img.width(),
        img.height(),
        img.color()
    );
    Ok((img, format))
}

/// Lower-case name used as `filetype` for image inputs.
pub fn format_name(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "png",
        ImageFormat::Jpeg => "jpeg",
        ImageFormat::Tiff => "tiff",
        ImageFormat::WebP => "webp",
        ImageFormat::Gif => "gif",
        ImageFormat::Bmp => "bmp",
        ImageFormat::Ico => "ico",
        _ => "image",
    }
}

/// Drop alpha and normalise to 8-bit RGB.
pub fn flatten(img: DynamicImage) -> DynamicImage {
    match img {
        DynamicImage::ImageRgb8(_) => img,
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

/// Wrap a raster as a single-page PDF document.
///
/// `name` identifies the image in errors, as in [`decode_image`].
pub fn wrap_as_pdf(name: &str, img: &DynamicImage) -> Result<Vec<u8>, DocmillError> {
    let rgb = img.to_rgb8();
    let (w, h) = rgb.dimensions();
    if w == 0 || h == 0 {
        return Err(DocmillError::InvalidImage {
            name: name.to_string(),
            detail: "image has zero width or height".into(),
        });
    }
    let (w, h) = (i64::from(w), i64::from(h));

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => w,
            "Height" => h,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        rgb.into_raw(),
    ));

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![w.into(), 0.into(), 0.into(), h.into(), 0.into(), 0.into()],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_bytes = content.encode().map_err(|e| pdf_err(name, e))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, content_bytes));

    let resources_id = doc.add_object(dictionary! {
        "XObject" => dictionary! { "Im0" => image_id },
    });
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), w.into(), h.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut out = Vec::new();
    doc.save_to(&mut out).map_err(|e| pdf_err(name, e))?;
    debug!("Wrapped {}x{} raster into {} byte PDF", w, h, out.len());
    Ok(out)
}

fn pdf_err(name: &str, e: impl std::fmt::Display) -> DocmillError {
    DocmillError::Internal(format!("PDF assembly failed for '{name}': {e}"))
}
