//! Media encoding: picture elements → named base64 PNG payloads.
//!
//! Pictures are encoded in document order and named
//! `{document_name}_image_{index}` with a 0-based index, so names are unique
//! within a result. PNG is written into memory; nothing touches disk.

use crate::document::{Picture, StructuredDocument};
use crate::error::DocmillError;
use crate::output::EncodedImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Name of the `index`-th picture of `document_name`.
pub fn image_name(document_name: &str, index: usize) -> String {
    format!("{}_image_{}", document_name, index)
}

/// Encode a raster as standard base64 of its PNG bytes.
pub fn encode_png_base64(img: &DynamicImage) -> Result<String, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(STANDARD.encode(&buf))
}

/// Encode one picture. Fails when it has no raster or PNG writing fails.
pub fn encode_picture(
    document_name: &str,
    index: usize,
    picture: &Picture,
) -> Result<EncodedImage, DocmillError> {
    let img = picture
        .image
        .as_ref()
        .ok_or_else(|| DocmillError::EncodingFailed {
            index,
            detail: format!("picture on page {} has no raster", picture.page),
        })?;

    let data = encode_png_base64(img).map_err(|e| DocmillError::EncodingFailed {
        index,
        detail: e.to_string(),
    })?;

    let name = image_name(document_name, index);
    debug!("Encoded {} → {} bytes base64", name, data.len());
    Ok(EncodedImage { name, data })
}

/// Encode every picture of `document` in order. The first failure aborts.
pub fn encode_media(
    document_name: &str,
    document: &StructuredDocument,
) -> Result<Vec<EncodedImage>, DocmillError> {
    document
        .pictures()
        .iter()
        .enumerate()
        .map(|(i, p)| encode_picture(document_name, i, p))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn picture(px: [u8; 4]) -> Picture {
        Picture {
            page: 1,
            image: Some(DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba(px)))),
            caption: None,
        }
    }

    #[test]
    fn encode_small_image() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])));
        let data = encode_png_base64(&img).expect("encode should succeed");
        let decoded = STANDARD.decode(&data).expect("valid base64");
        assert!(decoded.starts_with(b"\x89PNG\r\n\x1a\n"));
    }

    #[test]
    fn names_follow_document_order() {
        let mut doc = StructuredDocument::new();
        doc.push_picture(picture([255, 0, 0, 255]));
        doc.push_paragraph("between");
        doc.push_picture(picture([0, 255, 0, 255]));

        let images = encode_media("report.pdf", &doc).unwrap();
        let names: Vec<_> = images.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["report.pdf_image_0", "report.pdf_image_1"]);
        assert_ne!(images[0].data, images[1].data);
    }

    #[test]
    fn no_pictures_no_images() {
        assert!(encode_media("a.pdf", &StructuredDocument::new())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn missing_raster_fails_with_index() {
        let mut doc = StructuredDocument::new();
        doc.push_picture(picture([0, 0, 0, 255]));
        doc.push_picture(Picture {
            page: 3,
            image: None,
            caption: None,
        });

        let err = encode_media("deck.pptx", &doc).unwrap_err();
        match err {
            DocmillError::EncodingFailed { index, detail } => {
                assert_eq!(index, 1);
                assert!(detail.contains("page 3"));
            }
            other => panic!("unexpected: {other}"),
        }
    }
}
