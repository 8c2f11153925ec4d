//! Image processing stages around the generator.
//!
//! - [`acquisition`]: page and region images to process
//! - [`input`]: resize policies and normalization into the input batch
//! - [`postprocess`]: generator output back to a binary image
//! - [`geometry`]: polygons and pixel rectangles

pub mod acquisition;
pub mod geometry;
pub mod input;
pub mod normalization;
pub mod postprocess;
pub mod types;

pub use acquisition::{
    Acquisition, ImageUnit, PAGE_IMAGE_FILTER, PAGE_IMAGE_SELECTOR, acquire_units, page_unit,
    select_page_image,
};
pub use geometry::{BoundingBox, PixelRect, Point};
pub use input::InputPreparer;
pub use normalization::NormalizeImage;
pub use postprocess::DewarpPostProcessor;
pub use types::ResizePolicy;
