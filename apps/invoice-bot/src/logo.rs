//! # Logo Intake
//!
//! Normalizes an uploaded photo to PNG before it is stored.
//!
//! ```text
//! photo bytes (jpeg / png / webp)
//!      │
//!      ▼
//! image::load_from_memory ── unknown or broken format? ──► BotError::Logo
//!      │
//!      ▼
//! re-encode as PNG ──► LogoRepository::save
//! ```

use std::io::Cursor;

use image::ImageFormat;
use tracing::debug;

use crate::error::{BotError, BotResult};

/// Upper bound on accepted uploads.
pub const MAX_LOGO_BYTES: usize = 10 * 1024 * 1024;

/// Decodes `bytes` and returns the same image encoded as PNG.
pub fn normalize_logo(bytes: &[u8]) -> BotResult<Vec<u8>> {
    if bytes.is_empty() {
        return Err(BotError::Logo("the image is empty".to_string()));
    }
    if bytes.len() > MAX_LOGO_BYTES {
        return Err(BotError::Logo(format!(
            "the image is larger than {} MB",
            MAX_LOGO_BYTES / (1024 * 1024)
        )));
    }

    let image = image::load_from_memory(bytes)?;
    debug!(width = image.width(), height = image.height(), "Logo decoded");

    let mut png = Vec::new();
    image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn sample_png() -> Vec<u8> {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_fn(4, 3, |x, y| Rgb([x as u8 * 60, y as u8 * 80, 200]));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png).unwrap();
        out
    }

    #[test]
    fn test_png_round_trips_as_png() {
        let png = normalize_logo(&sample_png()).unwrap();

        assert_eq!(&png[..4], &[0x89, b'P', b'N', b'G']);
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 3));
    }

    #[test]
    fn test_jpeg_is_converted() {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(8, 8, Rgb([10, 20, 30]));
        let mut jpeg = Vec::new();
        img.write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg).unwrap();

        let png = normalize_logo(&jpeg).unwrap();
        assert_eq!(image::guess_format(&png).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_garbage_is_a_logo_error() {
        let err = normalize_logo(b"definitely not an image").unwrap_err();
        assert!(matches!(err, BotError::Logo(_)));

        assert!(matches!(normalize_logo(&[]), Err(BotError::Logo(_))));
    }
}
