//! Image encoding: `DynamicImage` → base64 JPEG data URL.
//!
//! Chat-completion APIs accept images as data URLs inside the JSON body.
//! A 300-DPI CV page is several megabytes as PNG; JPEG at reduced quality
//! keeps a five-page request well under typical payload limits while the
//! text stays legible to the model.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::debug;

/// A base64-encoded image ready to inline in a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime_type: &'static str,
    pub data: String,
}

impl EncodedImage {
    /// `data:<mime>;base64,<data>`
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Encode a rendered page as base64 JPEG at the given quality (1–100).
///
/// JPEG has no alpha channel, so the page is flattened to RGB first.
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<EncodedImage, image::ImageError> {
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut buf = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100)))?;

    let data = STANDARD.encode(&buf);
    debug!("Encoded page → {} bytes base64", data.len());

    Ok(EncodedImage {
        mime_type: "image/jpeg",
        data,
    })
}
