//! Geometric utilities for mapping document coordinates onto pixels.
//!
//! Region outlines in page documents are polygons in page coordinates.
//! Cropping only needs their axis-aligned bounds, shifted into the
//! coordinate system of the image actually being cropped.

use crate::core::errors::ImageProcessError;
use serde::{Deserialize, Serialize};

/// A 2D point with floating-point coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point {
    /// X-coordinate of the point.
    pub x: f32,
    /// Y-coordinate of the point.
    pub y: f32,
}

impl Point {
    /// Creates a new point with the given coordinates.
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A bounding box represented by a collection of points.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    /// The points that define the bounding box.
    pub points: Vec<Point>,
}

impl BoundingBox {
    /// Creates a new bounding box from a vector of points.
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Creates an axis-aligned bounding box from its corners.
    pub fn from_coords(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            points: vec![
                Point::new(x1, y1),
                Point::new(x2, y1),
                Point::new(x2, y2),
                Point::new(x1, y2),
            ],
        }
    }

    /// Parses a `"x1,y1 x2,y2 ..."` points string.
    ///
    /// # Errors
    ///
    /// Returns [`ImageProcessError::InvalidPoints`] for an empty string or a
    /// malformed pair.
    pub fn parse_points(points: &str) -> Result<Self, ImageProcessError> {
        let invalid = || ImageProcessError::InvalidPoints(points.to_string());
        let parsed = points
            .split_whitespace()
            .map(|pair| {
                let (x, y) = pair.split_once(',').ok_or_else(invalid)?;
                let x = x.trim().parse::<f32>().map_err(|_| invalid())?;
                let y = y.trim().parse::<f32>().map_err(|_| invalid())?;
                Ok(Point::new(x, y))
            })
            .collect::<Result<Vec<_>, ImageProcessError>>()?;

        if parsed.is_empty() {
            return Err(invalid());
        }
        Ok(Self::new(parsed))
    }

    /// Translates every point by `(dx, dy)`.
    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self {
            points: self
                .points
                .iter()
                .map(|p| Point::new(p.x + dx, p.y + dy))
                .collect(),
        }
    }

    /// Gets the minimum x-coordinate of all points.
    pub fn x_min(&self) -> f32 {
        self.points.iter().map(|p| p.x).fold(f32::INFINITY, f32::min)
    }

    /// Gets the minimum y-coordinate of all points.
    pub fn y_min(&self) -> f32 {
        self.points.iter().map(|p| p.y).fold(f32::INFINITY, f32::min)
    }

    /// Gets the maximum x-coordinate of all points.
    pub fn x_max(&self) -> f32 {
        self.points
            .iter()
            .map(|p| p.x)
            .fold(f32::NEG_INFINITY, f32::max)
    }

    /// Gets the maximum y-coordinate of all points.
    pub fn y_max(&self) -> f32 {
        self.points
            .iter()
            .map(|p| p.y)
            .fold(f32::NEG_INFINITY, f32::max)
    }

    /// Integer pixel rectangle covering this box, clipped to `width x height`.
    ///
    /// Returns `None` when nothing of the box lies inside the image.
    pub fn pixel_rect(&self, width: u32, height: u32) -> Option<PixelRect> {
        if self.points.is_empty() {
            return None;
        }
        let x1 = self.x_min().floor().max(0.0) as u32;
        let y1 = self.y_min().floor().max(0.0) as u32;
        let x2 = (self.x_max().ceil().max(0.0) as u32).min(width);
        let y2 = (self.y_max().ceil().max(0.0) as u32).min(height);

        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(PixelRect {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        })
    }
}

/// An axis-aligned rectangle in integer pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_points() {
        let bbox = BoundingBox::parse_points("10,20 110,20 110,70 10,70").unwrap();
        assert_eq!(bbox.points.len(), 4);
        assert_eq!(bbox.x_min(), 10.0);
        assert_eq!(bbox.y_max(), 70.0);
    }

    #[test]
    fn test_parse_points_rejects_garbage() {
        assert!(BoundingBox::parse_points("").is_err());
        assert!(BoundingBox::parse_points("10,20 30").is_err());
        assert!(BoundingBox::parse_points("a,b").is_err());
    }

    #[test]
    fn test_pixel_rect_is_clipped() {
        let bbox = BoundingBox::from_coords(-5.0, 10.0, 50.0, 200.0);
        let rect = bbox.pixel_rect(40, 100).unwrap();
        assert_eq!(
            rect,
            PixelRect {
                x: 0,
                y: 10,
                width: 40,
                height: 90
            }
        );
    }

    #[test]
    fn test_pixel_rect_outside_image() {
        let bbox = BoundingBox::from_coords(50.0, 50.0, 60.0, 60.0);
        assert!(bbox.pixel_rect(40, 40).is_none());
    }

    #[test]
    fn test_translate() {
        let bbox = BoundingBox::from_coords(10.0, 10.0, 20.0, 20.0).translate(-10.0, -5.0);
        assert_eq!(bbox.x_min(), 0.0);
        assert_eq!(bbox.y_min(), 5.0);
    }
}
