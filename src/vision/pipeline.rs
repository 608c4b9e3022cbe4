//! Capture-and-retexture pipeline.
//!
//! One run takes the latest camera frame, finds the colored page, rectifies
//! it and normalizes its lighting. The result is either a texture ready to
//! apply to the model or the frame + edge map for on-screen diagnostics when
//! no page qualifies.

use image::{GrayImage, RgbaImage};
use imageproc::contours::find_contours;
use imageproc::edges::canny;

use super::quad::select_target_quad;
use super::rectify::{rectify, warp_page};
use super::scratch::ScratchLedger;
use super::threshold::adaptive_mean_threshold;
use super::{to_gray, Quad};

/// Canny hysteresis thresholds.
pub const CANNY_LOW: f32 = 100.0;
pub const CANNY_HIGH: f32 = 200.0;

/// Local-mean window radius for lighting normalization (5x5 window).
pub const THRESHOLD_BLOCK_RADIUS: u32 = 2;
/// Offset subtracted from the local mean before comparison.
pub const THRESHOLD_OFFSET: f32 = 3.0;

/// Result of one capture run.
#[derive(Debug, Clone)]
pub enum CaptureOutcome {
    /// A page was found. `texture` is the normalized page for the model,
    /// `preview` the color warp kept for display.
    Retextured {
        texture: GrayImage,
        preview: RgbaImage,
    },
    /// No page qualified. The captured frame and its edge map are kept so the
    /// user can see what the detector saw.
    NoTarget { frame: RgbaImage, edges: GrayImage },
}

impl CaptureOutcome {
    pub fn is_retextured(&self) -> bool {
        matches!(self, CaptureOutcome::Retextured { .. })
    }
}

/// Lightweight page detection for overlay anchoring. No buffers escape.
pub fn detect_quad(frame: &RgbaImage) -> Option<Quad> {
    let gray = to_gray(frame);
    let edges = canny(&gray, CANNY_LOW, CANNY_HIGH);
    let contours = find_contours::<i32>(&edges);
    select_target_quad(&contours, frame.width(), frame.height())
}

/// Run the pipeline with an internal ledger. Accounting faults are a bug and
/// are logged as errors.
pub fn run_capture(frame: &RgbaImage) -> CaptureOutcome {
    let ledger = ScratchLedger::new();
    let outcome = run_capture_tracked(frame, &ledger);
    for fault in ledger.faults() {
        log::error!("capture pipeline accounting: {}", fault);
    }
    outcome
}

/// Run the pipeline, registering every intermediate buffer with `ledger`.
pub fn run_capture_tracked(frame: &RgbaImage, ledger: &ScratchLedger) -> CaptureOutcome {
    let (width, height) = frame.dimensions();
    let gray = ledger.track("gray", to_gray(frame));
    let edges = ledger.track("edges", canny(&gray, CANNY_LOW, CANNY_HIGH));

    let quad = {
        let contours = find_contours::<i32>(&edges);
        select_target_quad(&contours, width, height)
    };
    let Some(quad) = quad else {
        log::info!("capture: no page target in frame");
        return CaptureOutcome::NoTarget {
            frame: frame.clone(),
            edges: edges.into_inner(),
        };
    };

    match retexture_page(frame, &quad, ledger) {
        Some((texture, preview)) => CaptureOutcome::Retextured { texture, preview },
        None => CaptureOutcome::NoTarget {
            frame: frame.clone(),
            edges: edges.into_inner(),
        },
    }
}

/// Rectify, warp and normalize the page under `quad`.
///
/// Returns the normalized texture and the color warp, or `None` when the quad
/// is degenerate or the perspective fit fails.
pub fn retexture_page(
    frame: &RgbaImage,
    quad: &Quad,
    ledger: &ScratchLedger,
) -> Option<(GrayImage, RgbaImage)> {
    let rect = rectify(quad);
    if rect.is_degenerate() {
        log::warn!(
            "capture: degenerate page bounds {}x{}",
            rect.width,
            rect.height
        );
        return None;
    }
    let Some(warped) = warp_page(frame, &rect) else {
        log::warn!("capture: perspective fit failed");
        return None;
    };
    let warped = ledger.track("warp", warped);
    let warped_gray = ledger.track("warp_gray", to_gray(&warped));
    let texture =
        adaptive_mean_threshold(&warped_gray, THRESHOLD_BLOCK_RADIUS, THRESHOLD_OFFSET);
    Some((texture, warped.into_inner()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_uniform_frame_has_no_target() {
        let frame = RgbaImage::from_pixel(64, 48, Rgba([180, 180, 180, 255]));
        let ledger = ScratchLedger::new();
        let outcome = run_capture_tracked(&frame, &ledger);
        assert!(!outcome.is_retextured());

        match outcome {
            CaptureOutcome::NoTarget { frame: kept, edges } => {
                assert_eq!(kept.dimensions(), (64, 48));
                assert_eq!(edges.dimensions(), (64, 48));
            }
            CaptureOutcome::Retextured { .. } => panic!("uniform frame cannot hold a page"),
        }
        assert_eq!(ledger.acquired(), 2, "gray and edge buffers");
        assert_eq!(ledger.outstanding(), 0);
        assert!(ledger.faults().is_empty(), "every buffer released exactly once");
    }

    #[test]
    fn test_retexture_releases_every_buffer() {
        // Light page region inside a darker frame.
        let frame = RgbaImage::from_fn(40, 30, |x, y| {
            if (8..32).contains(&x) && (6..24).contains(&y) {
                Rgba([230, 230, 230, 255])
            } else {
                Rgba([40, 40, 40, 255])
            }
        });
        let quad = Quad {
            corners: [(8.0, 6.0), (31.0, 6.0), (31.0, 23.0), (8.0, 23.0)],
        };
        let ledger = ScratchLedger::new();
        let result = retexture_page(&frame, &quad, &ledger);

        let (texture, preview) = result.expect("a real quad must retexture");
        assert_eq!(texture.dimensions(), (23, 17));
        assert_eq!(preview.dimensions(), (23, 17));
        assert_eq!(ledger.acquired(), 2, "warp and warp_gray buffers");
        assert_eq!(ledger.outstanding(), 0);
        assert!(ledger.faults().is_empty(), "every buffer released exactly once");
    }

    #[test]
    fn test_degenerate_quad_falls_back_clean() {
        let frame = RgbaImage::from_pixel(32, 32, Rgba([200, 200, 200, 255]));
        let quad = Quad {
            corners: [(5.0, 5.0); 4],
        };
        let ledger = ScratchLedger::new();
        assert!(retexture_page(&frame, &quad, &ledger).is_none());
        assert_eq!(ledger.acquired(), 0, "nothing acquired before the bail-out");
        assert!(ledger.faults().is_empty());
    }

    #[test]
    fn test_contour_stage_finds_synthetic_page() {
        // Drive the contour + selection stages with a synthetic edge map: a
        // filled block whose border trace must approximate to four corners.
        let edges = GrayImage::from_fn(300, 300, |x, y| {
            if (50..170).contains(&x) && (50..130).contains(&y) {
                image::Luma([255])
            } else {
                image::Luma([0])
            }
        });
        let contours = find_contours::<i32>(&edges);
        let quad = select_target_quad(&contours, 300, 300);
        let quad = quad.expect("the block border must be selected");
        let (min_x, min_y, max_x, max_y) = quad.bounds();
        assert!((min_x - 50.0).abs() <= 2.0, "left edge near 50, got {}", min_x);
        assert!((min_y - 50.0).abs() <= 2.0, "top edge near 50, got {}", min_y);
        assert!((max_x - 169.0).abs() <= 2.0, "right edge near 169, got {}", max_x);
        assert!((max_y - 129.0).abs() <= 2.0, "bottom edge near 129, got {}", max_y);
    }

    #[test]
    fn test_normalized_texture_is_binary() {
        let frame = RgbaImage::from_fn(60, 40, |x, _| {
            // Vertical dark stripe over light paper.
            if (28..32).contains(&x) {
                Rgba([20, 20, 20, 255])
            } else {
                Rgba([235, 235, 235, 255])
            }
        });
        let quad = Quad {
            corners: [(10.0, 5.0), (50.0, 5.0), (50.0, 35.0), (10.0, 35.0)],
        };
        let ledger = ScratchLedger::new();
        let (texture, _) = retexture_page(&frame, &quad, &ledger).expect("retexture");
        assert!(texture.pixels().all(|p| p[0] == 0 || p[0] == 255));
        let black = texture.pixels().filter(|p| p[0] == 0).count();
        assert!(black > 0, "the stripe must survive normalization");
        assert!(
            black < (texture.width() * texture.height()) as usize / 2,
            "paper must stay white"
        );
    }
}
