//! Page detection and retexturing pipeline.
//!
//! CPU image processing for the AR studio: edge detection, contour-based
//! page finding, perspective rectification and lighting normalization.

use image::{GrayImage, RgbaImage};
use imageproc::point::Point;

pub mod pipeline;
pub mod quad;
pub mod rectify;
pub mod scratch;
pub mod threshold;

pub use pipeline::{detect_quad, run_capture, run_capture_tracked, CaptureOutcome};
pub use quad::select_target_quad;
pub use rectify::{rectify, Rectification};
pub use scratch::{Scratch, ScratchFault, ScratchLedger};

/// Four corners of a detected page quadrilateral, in contour order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub corners: [(f32, f32); 4],
}

impl Quad {
    /// Build from a 4-vertex polygon approximation.
    pub fn from_points(points: &[Point<i32>]) -> Option<Self> {
        if points.len() != 4 {
            return None;
        }
        let mut corners = [(0.0, 0.0); 4];
        for (corner, p) in corners.iter_mut().zip(points) {
            *corner = (p.x as f32, p.y as f32);
        }
        Some(Self { corners })
    }

    /// Axis-aligned bounds as (min_x, min_y, max_x, max_y).
    pub fn bounds(&self) -> (f32, f32, f32, f32) {
        let mut min_x = f32::MAX;
        let mut min_y = f32::MAX;
        let mut max_x = f32::MIN;
        let mut max_y = f32::MIN;
        for &(x, y) in &self.corners {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        (min_x, min_y, max_x, max_y)
    }

    /// Bounds normalized to [0, 1] frame coordinates, for overlay anchoring.
    pub fn normalized_bounds(&self, frame_width: u32, frame_height: u32) -> (f32, f32, f32, f32) {
        let (min_x, min_y, max_x, max_y) = self.bounds();
        let w = frame_width.max(1) as f32;
        let h = frame_height.max(1) as f32;
        (
            (min_x / w).clamp(0.0, 1.0),
            (min_y / h).clamp(0.0, 1.0),
            (max_x / w).clamp(0.0, 1.0),
            (max_y / h).clamp(0.0, 1.0),
        )
    }
}

/// Convert an RGBA camera frame to the grayscale working image.
pub fn to_gray(frame: &RgbaImage) -> GrayImage {
    image::imageops::grayscale(frame)
}

/// Expand a grayscale result to RGBA for texture upload.
pub fn gray_to_rgba(gray: &GrayImage) -> RgbaImage {
    RgbaImage::from_fn(gray.width(), gray.height(), |x, y| {
        let v = gray.get_pixel(x, y)[0];
        image::Rgba([v, v, v, 255])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_from_points_requires_four() {
        let three = vec![Point::new(0, 0), Point::new(5, 0), Point::new(5, 5)];
        assert!(Quad::from_points(&three).is_none());

        let four = vec![
            Point::new(0, 0),
            Point::new(5, 0),
            Point::new(5, 5),
            Point::new(0, 5),
        ];
        assert!(Quad::from_points(&four).is_some());
    }

    #[test]
    fn test_quad_bounds() {
        let quad = Quad {
            corners: [(2.0, 3.0), (10.0, 1.0), (12.0, 8.0), (1.0, 9.0)],
        };
        let (min_x, min_y, max_x, max_y) = quad.bounds();
        assert_eq!(min_x, 1.0);
        assert_eq!(min_y, 1.0);
        assert_eq!(max_x, 12.0);
        assert_eq!(max_y, 9.0);
    }

    #[test]
    fn test_normalized_bounds_clamped() {
        let quad = Quad {
            corners: [(-5.0, 0.0), (50.0, 0.0), (50.0, 120.0), (-5.0, 120.0)],
        };
        let (min_x, min_y, max_x, max_y) = quad.normalized_bounds(100, 100);
        assert_eq!(min_x, 0.0, "negative x clamps to 0");
        assert_eq!(min_y, 0.0);
        assert_eq!(max_x, 0.5);
        assert_eq!(max_y, 1.0, "beyond-frame y clamps to 1");
    }
}
