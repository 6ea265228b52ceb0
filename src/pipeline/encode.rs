//! Image encoding: rendered page → JPEG → base64 [`DocumentImagePart`].
//!
//! JPEG keeps a full résumé page well under provider upload limits, and the
//! vision stage only needs titles and keywords, not pixel-perfect glyphs.
//! pdfium renders RGBA; JPEG has no alpha channel, so the page is flattened
//! to RGB first.

use crate::output::DocumentImagePart;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::debug;

/// Encode a rendered page as a base64 JPEG part.
pub fn encode_page(img: &DynamicImage, quality: u8) -> Result<DocumentImagePart, image::ImageError> {
    let jpeg = encode_jpeg(img, quality)?;
    let part = DocumentImagePart::from_jpeg(&jpeg);
    debug!(
        "Encoded {}x{} page → {} bytes JPEG, {} bytes base64",
        img.width(),
        img.height(),
        jpeg.len(),
        part.data().len()
    );
    Ok(part)
}

/// Raw JPEG bytes for a page.
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn red_square() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 16, Rgba([255, 0, 0, 255])))
    }

    #[test]
    fn encode_small_image() {
        let part = encode_page(&red_square(), 75).expect("encode should succeed");
        assert_eq!(part.mime_type(), "image/jpeg");
        assert!(!part.data().is_empty());
    }

    #[test]
    fn base64_round_trip_reproduces_jpeg_bytes() {
        let jpeg = encode_jpeg(&red_square(), 90).unwrap();
        let part = DocumentImagePart::from_jpeg(&jpeg);
        assert_eq!(part.decode().unwrap(), jpeg);
        // SOI marker
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn decoded_jpeg_keeps_dimensions() {
        let jpeg = encode_jpeg(&red_square(), 75).unwrap();
        let back = image::load_from_memory_with_format(&jpeg, image::ImageFormat::Jpeg).unwrap();
        assert_eq!((back.width(), back.height()), (16, 16));
    }
}
