//! Generator output to a binary page image.
//!
//! The score map is taken back to 8-bit, collapsed to one channel,
//! thresholded at its midrange and resized to the unit's original size.

use crate::core::batch::ScoreMap;
use crate::core::errors::{DewarpError, DewarpResult, ImageProcessError, ProcessingStage};
use image::GrayImage;
use image::imageops::{self, FilterType};
use imageproc::contrast::{ThresholdType, threshold};
use itertools::{Itertools, MinMaxResult};
use tracing::debug;

/// Converts generator output into the dewarped unit image.
#[derive(Debug, Clone, Copy, Default)]
pub struct DewarpPostProcessor;

impl DewarpPostProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Produces a `width x height` image containing only 0 and 255.
    pub fn apply(&self, output: &ScoreMap, width: u32, height: u32) -> DewarpResult<GrayImage> {
        if width == 0 || height == 0 {
            return Err(DewarpError::processing(
                ProcessingStage::PostProcessing,
                format!("cannot restore an image of size {width}x{height}"),
                ImageProcessError::InvalidCropSize,
            ));
        }

        let gray = Self::to_gray(output)?;
        let level = Self::midrange_level(&gray);
        debug!(
            generated_width = gray.width(),
            generated_height = gray.height(),
            threshold = level,
            "binarizing generator output"
        );
        let binary = threshold(&gray, level, ThresholdType::Binary);

        if binary.dimensions() == (width, height) {
            return Ok(binary);
        }
        Ok(imageops::resize(&binary, width, height, FilterType::Nearest))
    }

    /// First batch item as an 8-bit single-channel image.
    ///
    /// Values in `[-1, 1]` map to `[0, 255]`; channels are averaged.
    pub fn to_gray(output: &ScoreMap) -> DewarpResult<GrayImage> {
        let tensor = output.tensor();
        let (channels, height, width) = (tensor.shape()[1], tensor.shape()[2], tensor.shape()[3]);
        let item = tensor.index_axis(ndarray::Axis(0), 0);
        // CHW -> HWC
        let hwc = item.permuted_axes([1, 2, 0]);

        let pixels: Vec<u8> = hwc
            .outer_iter()
            .flat_map(|row| {
                row.outer_iter()
                    .map(|px| {
                        let sum: f32 = px.iter().map(|v| to_byte(*v)).sum();
                        (sum / channels as f32).round() as u8
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        GrayImage::from_raw(width as u32, height as u32, pixels).ok_or_else(|| {
            DewarpError::processing(
                ProcessingStage::PostProcessing,
                format!("score map of {width}x{height} does not fit an image buffer"),
                ImageProcessError::InvalidCropSize,
            )
        })
    }

    /// Largest intensity not above the midrange `(min + max) / 2`.
    ///
    /// Thresholding strictly above this level equals thresholding strictly
    /// above the exact midrange.
    pub fn midrange_level(image: &GrayImage) -> u8 {
        match image.as_raw().iter().minmax() {
            MinMaxResult::NoElements => 0,
            MinMaxResult::OneElement(v) => *v,
            MinMaxResult::MinMax(min, max) => ((u16::from(*min) + u16::from(*max)) / 2) as u8,
        }
    }
}

fn to_byte(value: f32) -> f32 {
    ((value + 1.0) / 2.0 * 255.0).clamp(0.0, 255.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Tensor4D;
    use image::Luma;

    fn score_map(channels: usize, height: usize, width: usize, f: impl Fn(usize, usize) -> f32) -> ScoreMap {
        let tensor = Tensor4D::from_shape_fn((1, channels, height, width), |(_, _, y, x)| f(y, x));
        ScoreMap::new(tensor).unwrap()
    }

    #[test]
    fn test_to_gray_range() {
        let map = score_map(1, 1, 3, |_, x| [-1.0, 0.0, 1.0][x]);
        let gray = DewarpPostProcessor::to_gray(&map).unwrap();
        assert_eq!(gray.as_raw(), &vec![0, 128, 255]);
    }

    #[test]
    fn test_channels_are_averaged() {
        let tensor = Tensor4D::from_shape_fn((1, 3, 1, 1), |(_, c, _, _)| [-1.0, 1.0, 1.0][c]);
        let gray = DewarpPostProcessor::to_gray(&ScoreMap::new(tensor).unwrap()).unwrap();
        assert_eq!(gray.get_pixel(0, 0)[0], 170);
    }

    #[test]
    fn test_midrange_level() {
        let img = GrayImage::from_raw(4, 1, vec![10, 20, 200, 201]).unwrap();
        assert_eq!(DewarpPostProcessor::midrange_level(&img), 105);
        let flat = GrayImage::from_pixel(2, 2, Luma([77]));
        assert_eq!(DewarpPostProcessor::midrange_level(&flat), 77);
    }

    #[test]
    fn test_output_is_binary_and_sized() {
        let map = score_map(3, 16, 16, |y, x| ((x + y) as f32 / 30.0) * 2.0 - 1.0);
        let out = DewarpPostProcessor::new().apply(&map, 37, 23).unwrap();
        assert_eq!(out.dimensions(), (37, 23));
        assert!(out.pixels().all(|p| p[0] == 0 || p[0] == 255));
        assert_eq!(out.get_pixel(0, 0)[0], 0);
        assert_eq!(out.get_pixel(36, 22)[0], 255);
    }

    #[test]
    fn test_strictly_above_midrange() {
        // min 0, max 254: midrange 127, value 127 stays black.
        let map = score_map(1, 1, 3, |_, x| [0u8, 127, 254][x] as f32 / 255.0 * 2.0 - 1.0);
        let out = DewarpPostProcessor::new().apply(&map, 3, 1).unwrap();
        assert_eq!(out.as_raw(), &vec![0, 0, 255]);
    }

    #[test]
    fn test_zero_target_size_is_rejected() {
        let map = score_map(1, 4, 4, |_, _| 0.0);
        assert!(DewarpPostProcessor::new().apply(&map, 0, 4).is_err());
    }
}
