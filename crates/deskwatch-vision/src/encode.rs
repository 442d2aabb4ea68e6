//! JPEG encoding for network transport.

use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

use crate::error::{VisionError, VisionResult};

/// Encode a frame as JPEG at the given quality (1-100).
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> VisionResult<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
    encoder
        .encode_image(image)
        .map_err(|e| VisionError::Encode(e.to_string()))?;
    Ok(buffer)
}
