//! Inference input preparation.
//!
//! Mirrors the generator's test-time data loader: an optional resize, an
//! optional centred crop, rounding of both sides to a multiple of
//! [`GENERATOR_SIZE_BASE`], RGB conversion and normalization to `[-1, 1]`.
//! Every call produces a single-item batch.

use crate::core::batch::InputBatch;
use crate::core::config::DewarpConfig;
use crate::core::constants::GENERATOR_SIZE_BASE;
use crate::core::errors::{DewarpError, DewarpResult};
use crate::processors::normalization::NormalizeImage;
use crate::processors::types::ResizePolicy;
use crate::utils::BBoxCrop;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use tracing::debug;

/// Bicubic, as used when the generator was trained.
const RESIZE_FILTER: FilterType = FilterType::CatmullRom;

/// Turns an image unit into the generator's input batch.
#[derive(Debug, Clone)]
pub struct InputPreparer {
    policy: ResizePolicy,
    /// Resize target (`target_height`).
    load_size: u32,
    /// Crop target (`target_width`).
    fine_size: u32,
    normalizer: NormalizeImage,
}

impl InputPreparer {
    pub fn new(policy: ResizePolicy, load_size: u32, fine_size: u32) -> DewarpResult<Self> {
        if policy != ResizePolicy::None && (load_size == 0 || fine_size == 0) {
            return Err(DewarpError::ConfigError {
                message: format!(
                    "resize policy '{policy}' needs non-zero sizes, got {load_size}x{fine_size}"
                ),
            });
        }
        Ok(Self {
            policy,
            load_size,
            fine_size,
            normalizer: NormalizeImage::for_generator(),
        })
    }

    pub fn from_config(config: &DewarpConfig) -> DewarpResult<Self> {
        Self::new(
            config.resize_or_crop,
            config.target_height,
            config.target_width,
        )
    }

    pub fn policy(&self) -> ResizePolicy {
        self.policy
    }

    /// Size of the prepared image for a `(width, height)` input.
    pub fn prepared_size(&self, (width, height): (u32, u32)) -> (u32, u32) {
        let (w, h) = match self.policy {
            ResizePolicy::ResizeAndCrop => (self.load_size, self.load_size),
            ResizePolicy::ScaleWidth | ResizePolicy::ScaleWidthAndCrop => {
                scaled_width_size((width, height), self.load_size)
            }
            ResizePolicy::Crop | ResizePolicy::None => (width, height),
        };
        let (w, h) = if self.policy.crops() {
            (w.min(self.fine_size), h.min(self.fine_size))
        } else {
            (w, h)
        };
        (
            round_to_base(w, GENERATOR_SIZE_BASE),
            round_to_base(h, GENERATOR_SIZE_BASE),
        )
    }

    /// Applies the resize policy and normalization to one image.
    pub fn prepare(&self, image: &DynamicImage) -> DewarpResult<InputBatch> {
        if image.width() == 0 || image.height() == 0 {
            return Err(DewarpError::invalid_input("cannot prepare an empty image"));
        }

        let resized = match self.policy {
            ResizePolicy::ResizeAndCrop => {
                image.resize_exact(self.load_size, self.load_size, RESIZE_FILTER)
            }
            ResizePolicy::ScaleWidth | ResizePolicy::ScaleWidthAndCrop => {
                let (w, h) = scaled_width_size(image.dimensions(), self.load_size);
                if (w, h) == image.dimensions() {
                    image.clone()
                } else {
                    image.resize_exact(w, h, RESIZE_FILTER)
                }
            }
            ResizePolicy::Crop | ResizePolicy::None => image.clone(),
        };

        let cropped = if self.policy.crops() {
            center_crop(resized, self.fine_size)?
        } else {
            resized
        };

        let (w, h) = cropped.dimensions();
        let (target_w, target_h) = (
            round_to_base(w, GENERATOR_SIZE_BASE),
            round_to_base(h, GENERATOR_SIZE_BASE),
        );
        let rounded = if (target_w, target_h) == (w, h) {
            cropped
        } else {
            cropped.resize_exact(target_w, target_h, RESIZE_FILTER)
        };

        debug!(
            policy = %self.policy,
            input_width = image.width(),
            input_height = image.height(),
            width = target_w,
            height = target_h,
            "prepared generator input"
        );

        let tensor = self.normalizer.normalize_to(&rounded.to_rgb8())?;
        InputBatch::single(tensor)
    }
}

/// `(target, target * h / w)`, the size after scaling the width to `target`.
fn scaled_width_size((width, height): (u32, u32), target: u32) -> (u32, u32) {
    if width == target {
        return (width, height);
    }
    let scaled = (u64::from(target) * u64::from(height) / u64::from(width)).max(1);
    (target, scaled as u32)
}

/// Centred square crop; sides shorter than `size` are kept whole.
fn center_crop(image: DynamicImage, size: u32) -> DewarpResult<DynamicImage> {
    let (width, height) = image.dimensions();
    if width <= size && height <= size {
        return Ok(image);
    }
    let rect = BBoxCrop::center_rect((width, height), size.min(width), size.min(height))?;
    Ok(BBoxCrop::slice(&image, rect))
}

/// Rounds to the nearest positive multiple of `base`.
fn round_to_base(value: u32, base: u32) -> u32 {
    let rounded = (f64::from(value) / f64::from(base)).round() as u32 * base;
    rounded.max(base)
}
