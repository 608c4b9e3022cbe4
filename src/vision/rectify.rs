//! Bounding-box rectification of a detected page quadrilateral.

use image::{Rgba, RgbaImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};

use super::Quad;

/// Destination rectangle plus the correspondence sets for the perspective fit.
///
/// Known simplification: the source corners are the corners of the quad's
/// axis-aligned bounding box, not the quad's own vertices, so the warp is a
/// crop of the bounding box rather than a true unwarp of the page. Destination
/// size is the bounding box extent per axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Rectification {
    pub width: u32,
    pub height: u32,
    /// Bounding-box corners in TL, TR, BR, BL order.
    pub src: [(f32, f32); 4],
    /// Destination corners (0,0), (w,0), (w,h), (0,h).
    pub dst: [(f32, f32); 4],
}

impl Rectification {
    /// Perspective transform mapping `src` onto `dst`, if the correspondence
    /// is non-degenerate.
    pub fn projection(&self) -> Option<Projection> {
        Projection::from_control_points(self.src, self.dst)
    }

    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Compute the rectification for a quad's four corners.
pub fn rectify(quad: &Quad) -> Rectification {
    let (min_x, min_y, max_x, max_y) = quad.bounds();
    let width = max_x - min_x;
    let height = max_y - min_y;
    Rectification {
        width: width.round().max(0.0) as u32,
        height: height.round().max(0.0) as u32,
        src: [
            (min_x, min_y),
            (max_x, min_y),
            (max_x, max_y),
            (min_x, max_y),
        ],
        dst: [
            (0.0, 0.0),
            (width, 0.0),
            (width, height),
            (0.0, height),
        ],
    }
}

/// Warp the color frame into the rectification's destination rectangle.
pub fn warp_page(frame: &RgbaImage, rect: &Rectification) -> Option<RgbaImage> {
    if rect.is_degenerate() {
        return None;
    }
    let projection = rect.projection()?;
    let mut out = RgbaImage::new(rect.width, rect.height);
    warp_into(
        frame,
        &projection,
        Interpolation::Bilinear,
        Rgba([0, 0, 0, 255]),
        &mut out,
    );
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad(corners: [(f32, f32); 4]) -> Quad {
        Quad { corners }
    }

    #[test]
    fn test_axis_aligned_quad_maps_to_own_size() {
        let rect = rectify(&quad([(0.0, 0.0), (10.0, 0.0), (10.0, 5.0), (0.0, 5.0)]));
        assert_eq!(rect.width, 10);
        assert_eq!(rect.height, 5);
        assert_eq!(rect.src[0], (0.0, 0.0));
        assert_eq!(rect.src[2], (10.0, 5.0));
        assert_eq!(rect.dst, [(0.0, 0.0), (10.0, 0.0), (10.0, 5.0), (0.0, 5.0)]);
    }

    #[test]
    fn test_skewed_quad_uses_bounding_box() {
        // A tilted quad: destination size comes from the bounding box, and the
        // source corners are the box corners, not the quad's.
        let rect = rectify(&quad([(4.0, 0.0), (20.0, 2.0), (18.0, 12.0), (2.0, 10.0)]));
        assert_eq!(rect.width, 18, "max_x - min_x");
        assert_eq!(rect.height, 12, "max_y - min_y");
        assert_eq!(rect.src, [(2.0, 0.0), (20.0, 0.0), (20.0, 12.0), (2.0, 12.0)]);
    }

    #[test]
    fn test_degenerate_quad_has_no_projection_target() {
        let rect = rectify(&quad([(5.0, 5.0), (5.0, 5.0), (5.0, 5.0), (5.0, 5.0)]));
        assert!(rect.is_degenerate());
        let frame = RgbaImage::new(32, 32);
        assert!(warp_page(&frame, &rect).is_none());
    }

    #[test]
    fn test_warp_extracts_bounding_box_region() {
        // Left half dark, right half light; a quad over the right half must
        // warp to a light patch.
        let frame = RgbaImage::from_fn(40, 20, |x, _| {
            if x < 20 {
                Rgba([10, 10, 10, 255])
            } else {
                Rgba([240, 240, 240, 255])
            }
        });
        let rect = rectify(&quad([(24.0, 2.0), (38.0, 2.0), (38.0, 16.0), (24.0, 16.0)]));
        let warped = warp_page(&frame, &rect).unwrap();
        assert_eq!(warped.dimensions(), (14, 14));
        let center = warped.get_pixel(7, 7);
        assert!(center[0] > 200, "warp must sample the light region");
    }
}
