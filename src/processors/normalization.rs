//! Image normalization for the generator input.
//!
//! The generator was trained on RGB images mapped to `[-1, 1]`
//! (`(v / 255 - 0.5) / 0.5`), laid out as a `[1, 3, H, W]` tensor.

use crate::core::Tensor4D;
use crate::core::errors::{DewarpError, ProcessingStage};
use image::RgbImage;

const SCALE: f32 = 1.0 / 255.0;
const MEAN: [f32; 3] = [0.5, 0.5, 0.5];
const STD: [f32; 3] = [0.5, 0.5, 0.5];

/// Normalizes images for inference.
///
/// Each channel value `v` becomes `v * alpha[c] + beta[c]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizeImage {
    /// Scaling factors for each channel (alpha = scale / std)
    alpha: [f32; 3],
    /// Offset values for each channel (beta = -mean / std)
    beta: [f32; 3],
}

impl NormalizeImage {
    /// The generator's normalization: RGB, CHW, values in `[-1, 1]`.
    pub fn for_generator() -> Self {
        Self {
            alpha: STD.map(|s| SCALE / s),
            beta: [0, 1, 2].map(|c| -MEAN[c] / STD[c]),
        }
    }

    /// Normalizes a single image into a `[1, 3, H, W]` tensor.
    pub fn normalize_to(&self, img: &RgbImage) -> Result<Tensor4D, DewarpError> {
        let (width, height) = img.dimensions();
        let (w, h) = (width as usize, height as usize);

        let mut result = vec![0.0f32; 3 * h * w];
        for (x, y, pixel) in img.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for c in 0..3 {
                result[c * h * w + y * w + x] = pixel[c] as f32 * self.alpha[c] + self.beta[c];
            }
        }

        Tensor4D::from_shape_vec((1, 3, h, w), result).map_err(|e| {
            DewarpError::processing(
                ProcessingStage::TensorOperation,
                format!("failed to build normalization tensor for {width}x{height} image"),
                e,
            )
        })
    }
}

impl Default for NormalizeImage {
    fn default() -> Self {
        Self::for_generator()
    }
}
