//! Target quadrilateral selection from contour candidates.

use imageproc::contours::{BorderType, Contour};
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use std::cmp::Ordering;

use super::Quad;

/// Polygon approximation tolerance as a fraction of contour perimeter.
const APPROX_EPSILON_RATIO: f64 = 0.02;

/// Pick the page quadrilateral from a set of contours.
///
/// Candidates are outer borders only, ranked by closed perimeter in descending
/// order. Contours whose perimeter reaches the frame perimeter
/// `2 * (width + height)` hug the frame border and are rejected. The first
/// candidate whose 2%-epsilon polygon approximation has exactly four vertices
/// wins; if none does, there is no target in this frame.
pub fn select_target_quad(
    contours: &[Contour<i32>],
    frame_width: u32,
    frame_height: u32,
) -> Option<Quad> {
    let frame_perimeter = 2.0 * (frame_width as f64 + frame_height as f64);

    let mut ranked: Vec<(usize, f64)> = contours
        .iter()
        .enumerate()
        .filter(|(_, c)| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|(i, c)| (i, arc_length(&c.points, true)))
        .filter(|&(_, perimeter)| perimeter > 0.0 && perimeter < frame_perimeter)
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    for (index, perimeter) in ranked {
        let epsilon = APPROX_EPSILON_RATIO * perimeter;
        let approx = approximate_closed(&contours[index].points, epsilon);
        if approx.len() == 4 {
            return Quad::from_points(&approx);
        }
    }
    None
}

/// Closed-polygon approximation of a border trace.
///
/// A border trace starts and ends on adjacent pixels and the approximation
/// keeps both endpoints, so a trailing vertex within epsilon of the first is
/// the same corner and is collapsed.
fn approximate_closed(points: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    let mut approx = approximate_polygon_dp(points, epsilon, true);
    while approx.len() > 1 {
        let first = approx[0];
        let last = approx[approx.len() - 1];
        let dx = (first.x - last.x) as f64;
        let dy = (first.y - last.y) as f64;
        if (dx * dx + dy * dy).sqrt() <= epsilon.max(1.5) {
            approx.pop();
        } else {
            break;
        }
    }
    approx
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::point::Point;

    fn outer_contour(points: Vec<(i32, i32)>) -> Contour<i32> {
        let points = points.into_iter().map(|(x, y)| Point::new(x, y)).collect();
        Contour::new(points, BorderType::Outer, None)
    }

    fn rect_contour(x: i32, y: i32, w: i32, h: i32) -> Contour<i32> {
        outer_contour(vec![(x, y), (x + w, y), (x + w, y + h), (x, y + h)])
    }

    #[test]
    fn test_selects_single_quadrilateral() {
        // One rectangle below the frame perimeter, one triangle.
        let contours = vec![
            outer_contour(vec![(10, 10), (40, 10), (25, 40)]),
            rect_contour(50, 50, 120, 80),
        ];
        let quad = select_target_quad(&contours, 640, 480);
        assert!(quad.is_some(), "the rectangle must be selected");
        let (min_x, min_y, max_x, max_y) = quad.unwrap().bounds();
        assert_eq!((min_x, min_y), (50.0, 50.0));
        assert_eq!((max_x, max_y), (170.0, 130.0));
    }

    #[test]
    fn test_rejects_contours_at_frame_perimeter() {
        // Perimeter of this rectangle is 2 * (200 + 160) = 720, well over the
        // 100x100 frame perimeter of 400.
        let contours = vec![rect_contour(0, 0, 200, 160)];
        assert!(
            select_target_quad(&contours, 100, 100).is_none(),
            "border-hugging contours must be rejected"
        );
    }

    #[test]
    fn test_none_when_no_four_vertex_approximation() {
        let contours = vec![outer_contour(vec![(10, 10), (60, 12), (30, 55)])];
        assert!(select_target_quad(&contours, 640, 480).is_none());
    }

    #[test]
    fn test_largest_qualifying_quad_wins() {
        let contours = vec![
            rect_contour(10, 10, 30, 30),
            rect_contour(100, 100, 200, 150),
        ];
        let quad = select_target_quad(&contours, 640, 480);
        assert!(quad.is_some());
        let (min_x, min_y, _, _) = quad.unwrap().bounds();
        assert_eq!(
            (min_x, min_y),
            (100.0, 100.0),
            "candidates are ranked by perimeter descending"
        );
    }

    #[test]
    fn test_hole_borders_are_not_candidates() {
        let mut hole = rect_contour(40, 40, 100, 80);
        hole.border_type = BorderType::Hole;
        hole.parent = Some(0);
        let contours = vec![hole];
        assert!(select_target_quad(&contours, 640, 480).is_none());
    }

    #[test]
    fn test_degenerate_contours_are_skipped() {
        let contours = vec![outer_contour(vec![(5, 5)])];
        assert!(select_target_quad(&contours, 640, 480).is_none());
    }
}
