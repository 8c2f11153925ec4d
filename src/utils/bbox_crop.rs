//! Bounding box based image cropping utilities.

use crate::core::errors::ImageProcessError;
use crate::processors::geometry::{BoundingBox, PixelRect};
use image::{DynamicImage, GenericImageView};

/// Bounding box based image cropping utilities.
pub struct BBoxCrop;

impl BBoxCrop {
    /// Crops an image to the axis-aligned bounds of a polygon.
    ///
    /// The polygon is given in the image's own coordinate system. The crop
    /// rectangle is clipped to the image; a polygon that does not overlap the
    /// image yields [`ImageProcessError::CropOutOfBounds`].
    pub fn crop_bounding_box(
        image: &DynamicImage,
        bbox: &BoundingBox,
    ) -> Result<(DynamicImage, PixelRect), ImageProcessError> {
        let rect = Self::crop_rect(image.dimensions(), bbox)?;
        Ok((Self::slice(image, rect), rect))
    }

    /// The clipped pixel rectangle a crop of `bbox` would cover.
    pub fn crop_rect(
        (width, height): (u32, u32),
        bbox: &BoundingBox,
    ) -> Result<PixelRect, ImageProcessError> {
        if bbox.points.is_empty() {
            return Err(ImageProcessError::InvalidCropSize);
        }
        bbox.pixel_rect(width, height)
            .ok_or(ImageProcessError::CropOutOfBounds)
    }

    /// Copies a rectangle out of an image. The rectangle must lie inside the image.
    pub fn slice(image: &DynamicImage, rect: PixelRect) -> DynamicImage {
        image.crop_imm(rect.x, rect.y, rect.width, rect.height)
    }

    /// Coordinates of a centred `crop_w x crop_h` window.
    ///
    /// Odd margins are split with the extra pixel on the right/bottom.
    pub fn center_rect(
        (width, height): (u32, u32),
        crop_w: u32,
        crop_h: u32,
    ) -> Result<PixelRect, ImageProcessError> {
        if crop_w == 0 || crop_h == 0 {
            return Err(ImageProcessError::InvalidCropSize);
        }
        if crop_w > width || crop_h > height {
            return Err(ImageProcessError::ImageTooSmall {
                image_size: (width, height),
                crop_size: (crop_w, crop_h),
            });
        }
        Ok(PixelRect {
            x: (width - crop_w) / 2,
            y: (height - crop_h) / 2,
            width: crop_w,
            height: crop_h,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, RgbImage};

    #[test]
    fn test_crop_bounding_box_uses_polygon_bounds() {
        let mut img = GrayImage::new(10, 10);
        img.put_pixel(3, 4, Luma([200]));
        let bbox = BoundingBox::parse_points("3,4 7,4 7,8 5,9 3,8").unwrap();
        let (crop, rect) =
            BBoxCrop::crop_bounding_box(&DynamicImage::ImageLuma8(img), &bbox).unwrap();
        assert_eq!(crop.dimensions(), (4, 5));
        assert_eq!((rect.x, rect.y), (3, 4));
        assert_eq!(crop.to_luma8().get_pixel(0, 0)[0], 200);
    }

    #[test]
    fn test_crop_bounding_box_outside_image() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(10, 10));
        let bbox = BoundingBox::from_coords(20.0, 20.0, 30.0, 30.0);
        assert!(matches!(
            BBoxCrop::crop_bounding_box(&img, &bbox),
            Err(ImageProcessError::CropOutOfBounds)
        ));
    }

    #[test]
    fn test_center_rect() {
        let rect = BBoxCrop::center_rect((11, 8), 4, 4).unwrap();
        assert_eq!(
            rect,
            PixelRect {
                x: 3,
                y: 2,
                width: 4,
                height: 4
            }
        );
        assert!(BBoxCrop::center_rect((4, 4), 5, 4).is_err());
        assert!(BBoxCrop::center_rect((4, 4), 0, 4).is_err());
    }
}
