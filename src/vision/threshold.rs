//! Adaptive lighting normalization for captured pages.

use image::{GrayImage, Luma};

/// Integral image with a zero border row/column, laid out row-major with
/// stride `width + 1`.
fn integral_image(gray: &GrayImage) -> Vec<u64> {
    let (w, h) = gray.dimensions();
    let stride = (w + 1) as usize;
    let mut integral = vec![0u64; stride * (h + 1) as usize];
    for y in 0..h as usize {
        let mut row_sum = 0u64;
        for x in 0..w as usize {
            row_sum += gray.as_raw()[y * w as usize + x] as u64;
            integral[(y + 1) * stride + (x + 1)] = integral[y * stride + (x + 1)] + row_sum;
        }
    }
    integral
}

/// Sum over the inclusive pixel window [x0, x1] x [y0, y1].
fn window_sum(integral: &[u64], stride: usize, x0: u32, y0: u32, x1: u32, y1: u32) -> u64 {
    let (x0, y0) = (x0 as usize, y0 as usize);
    let (x1, y1) = (x1 as usize + 1, y1 as usize + 1);
    integral[y1 * stride + x1] + integral[y0 * stride + x0]
        - integral[y0 * stride + x1]
        - integral[y1 * stride + x0]
}

/// Binarize against the local mean.
///
/// Each pixel brighter than the mean of its `(2 * block_radius + 1)` square
/// window minus `offset` becomes white, everything else black. Windows are
/// clamped at the image border. This keeps paper white under uneven lighting
/// while crayon and ink go black.
pub fn adaptive_mean_threshold(gray: &GrayImage, block_radius: u32, offset: f32) -> GrayImage {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return GrayImage::new(w, h);
    }
    let stride = (w + 1) as usize;
    let integral = integral_image(gray);

    GrayImage::from_fn(w, h, |x, y| {
        let x0 = x.saturating_sub(block_radius);
        let y0 = y.saturating_sub(block_radius);
        let x1 = (x + block_radius).min(w - 1);
        let y1 = (y + block_radius).min(h - 1);
        let count = ((x1 - x0 + 1) * (y1 - y0 + 1)) as f32;
        let mean = window_sum(&integral, stride, x0, y0, x1, y1) as f32 / count;
        let value = gray.get_pixel(x, y)[0] as f32;
        if value > mean - offset {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_image_goes_white() {
        let gray = GrayImage::from_pixel(16, 16, Luma([128]));
        let out = adaptive_mean_threshold(&gray, 2, 3.0);
        assert!(out.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn test_dark_mark_on_paper_goes_black() {
        let mut gray = GrayImage::from_pixel(9, 9, Luma([255]));
        gray.put_pixel(4, 4, Luma([0]));
        let out = adaptive_mean_threshold(&gray, 2, 3.0);
        // Window mean at the mark is (24 * 255) / 25 ~ 244.8.
        assert_eq!(out.get_pixel(4, 4)[0], 0, "the mark stays black");
        assert_eq!(out.get_pixel(0, 0)[0], 255, "paper stays white");
        assert_eq!(out.get_pixel(3, 4)[0], 255, "neighbors above threshold stay white");
    }

    #[test]
    fn test_gradient_lighting_is_normalized() {
        // Slow horizontal gradient: no pixel is far from its local mean, so
        // the whole page reads as paper.
        let gray = GrayImage::from_fn(64, 8, |x, _| Luma([(64 + 2 * x) as u8]));
        let out = adaptive_mean_threshold(&gray, 2, 3.0);
        let white = out.pixels().filter(|p| p[0] == 255).count();
        assert_eq!(white, 64 * 8, "a smooth gradient must not produce marks");
    }

    #[test]
    fn test_empty_image() {
        let gray = GrayImage::new(0, 0);
        let out = adaptive_mean_threshold(&gray, 2, 3.0);
        assert_eq!(out.dimensions(), (0, 0));
    }

    #[test]
    fn test_integral_window_sums() {
        let gray = GrayImage::from_fn(4, 3, |x, y| Luma([(x + y * 4) as u8]));
        let integral = integral_image(&gray);
        // Full image: sum of 0..=11.
        assert_eq!(window_sum(&integral, 5, 0, 0, 3, 2), 66);
        // Single pixel (2, 1) has value 6.
        assert_eq!(window_sum(&integral, 5, 2, 1, 2, 1), 6);
        // 2x2 block at (1, 1): 5 + 6 + 9 + 10.
        assert_eq!(window_sum(&integral, 5, 1, 1, 2, 2), 30);
    }
}
