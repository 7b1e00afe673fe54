//! Image encoding: `DynamicImage` → base64 JPEG.
//!
//! Book photos come from phone cameras, so JPEG keeps request bodies small
//! without hurting legibility of cover text. JPEG has no alpha channel, so
//! every image is flattened to RGB first.

use crate::error::BookMetaError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Media type of every encoded image.
pub const IMAGE_MEDIA_TYPE: &str = "image/jpeg";

/// A base64-encoded image ready for a multimodal request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data: String,
    pub media_type: &'static str,
}

impl EncodedImage {
    /// Convert into the edgequake-llm attachment type.
    pub fn into_image_data(self) -> ImageData {
        ImageData::new(self.data, self.media_type).with_detail("high")
    }
}

/// Encode a decoded photo as base64 JPEG.
pub fn encode_image(img: &DynamicImage) -> Result<EncodedImage, BookMetaError> {
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut buf = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Jpeg)
        .map_err(|e| BookMetaError::ImageEncodingFailed {
            detail: e.to_string(),
        })?;

    let b64 = STANDARD.encode(&buf);
    debug!(
        "Encoded {}x{} image → {} bytes base64",
        img.width(),
        img.height(),
        b64.len()
    );

    Ok(EncodedImage {
        data: b64,
        media_type: IMAGE_MEDIA_TYPE,
    })
}

/// Encode every image of a book, preserving order.
pub fn encode_all(images: &[DynamicImage]) -> Result<Vec<EncodedImage>, BookMetaError> {
    images.iter().map(encode_image).collect()
}
