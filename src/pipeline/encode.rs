//! Image encoding: `DynamicImage` → PNG or JPEG bytes.
//!
//! PNG is lossless and ignores the quality setting. JPEG has no alpha
//! channel, so the page is flattened to RGB before encoding at the requested
//! quality (1–100).

use crate::config::ImageFormat;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rasterised page in `format`. `quality` only applies to JPEG.
pub fn encode_page(
    img: &DynamicImage,
    format: ImageFormat,
    quality: u8,
) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    match format {
        ImageFormat::Png => {
            img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
        }
        ImageFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
            DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)?;
        }
    }

    debug!("Encoded {}x{} image → {} bytes {}", img.width(), img.height(), buf.len(), format);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn gradient(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(w, h, |x, y| {
            Rgba([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x ^ y) % 256) as u8, 255])
        }))
    }

    #[test]
    fn png_has_signature_and_round_trips_dimensions() {
        let data = encode_page(&gradient(12, 9), ImageFormat::Png, 50).unwrap();
        assert_eq!(&data[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::load_from_memory(&data).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (12, 9));
    }

    #[test]
    fn png_ignores_quality() {
        let img = gradient(16, 16);
        let a = encode_page(&img, ImageFormat::Png, 1).unwrap();
        let b = encode_page(&img, ImageFormat::Png, 100).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn jpeg_has_soi_marker() {
        let data = encode_page(&gradient(8, 8), ImageFormat::Jpeg, 90).unwrap();
        assert_eq!(&data[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn jpeg_quality_changes_output() {
        let img = gradient(64, 64);
        let low = encode_page(&img, ImageFormat::Jpeg, 10).unwrap();
        let high = encode_page(&img, ImageFormat::Jpeg, 95).unwrap();
        assert!(low.len() < high.len(), "low={} high={}", low.len(), high.len());
    }
}
