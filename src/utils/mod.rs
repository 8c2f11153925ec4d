//! Utility functions for the dewarping pipeline.
//!
//! Image loading and encoding helpers, cropping helpers and logging setup.

pub mod bbox_crop;

pub use bbox_crop::BBoxCrop;

use crate::core::errors::DewarpError;
use image::{DynamicImage, GrayImage, ImageFormat};
use std::io::Cursor;
use std::path::Path;

/// Initializes the global tracing subscriber.
///
/// Log filtering follows `RUST_LOG` and defaults to `info`. Calling this
/// more than once is harmless; later calls are ignored.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Loads an image from disk.
pub fn load_image(path: &Path) -> Result<DynamicImage, DewarpError> {
    image::open(path).map_err(DewarpError::ImageLoad)
}

/// Decodes an image from memory, guessing the format from its content.
pub fn load_image_from_memory(bytes: &[u8]) -> Result<DynamicImage, DewarpError> {
    image::load_from_memory(bytes).map_err(DewarpError::ImageLoad)
}

/// Encodes a grayscale image as PNG.
pub fn encode_png(image: &GrayImage) -> Result<Vec<u8>, DewarpError> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(DewarpError::ImageLoad)?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_png_encode_then_decode() {
        let mut img = GrayImage::new(3, 2);
        img.put_pixel(2, 1, Luma([255]));
        let bytes = encode_png(&img).unwrap();
        let decoded = load_image_from_memory(&bytes).unwrap().to_luma8();
        assert_eq!(decoded, img);
    }

    #[test]
    fn test_load_image_missing_file() {
        let err = load_image(Path::new("/nonexistent/page.png")).unwrap_err();
        assert!(matches!(err, DewarpError::ImageLoad(_)));
    }

    #[test]
    fn test_init_tracing_twice() {
        init_tracing();
        init_tracing();
    }
}
