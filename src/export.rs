//! PNG export for screenshots and capture diagnostics.

use std::io;
use std::path::{Path, PathBuf};

use image::{GrayImage, RgbaImage};

/// Write a rendered frame as PNG.
pub fn save_screenshot_png(path: &Path, image: &RgbaImage) -> io::Result<()> {
    image.save(path).map_err(io::Error::other)?;
    log::info!("screenshot saved to {}", path.display());
    Ok(())
}

/// Write a grayscale diagnostic (edge map, normalized page) as PNG.
pub fn save_gray_png(path: &Path, image: &GrayImage) -> io::Result<()> {
    image.save(path).map_err(io::Error::other)?;
    log::info!("diagnostic saved to {}", path.display());
    Ok(())
}

/// Default screenshot destination: the platform pictures directory (falling
/// back to the working directory), avoiding collisions with a numeric suffix.
pub fn default_screenshot_path() -> PathBuf {
    let dir = dirs::picture_dir().unwrap_or_else(|| PathBuf::from("."));
    unique_path(&dir, "screenshot", "png")
}

fn unique_path(dir: &Path, stem: &str, ext: &str) -> PathBuf {
    let plain = dir.join(format!("{}.{}", stem, ext));
    if !plain.exists() {
        return plain;
    }
    for n in 1..1000u32 {
        let candidate = dir.join(format!("{}-{}.{}", stem, n, ext));
        if !candidate.exists() {
            return candidate;
        }
    }
    dir.join(format!("{}-{}.{}", stem, 1000, ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_unique_path_without_collision() {
        let dir = PathBuf::from("/no/such/directory");
        let path = unique_path(&dir, "screenshot", "png");
        assert_eq!(path, dir.join("screenshot.png"));
    }

    #[test]
    fn test_screenshot_roundtrip() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("arcolor-test-shot-{}.png", std::process::id()));
        let image = RgbaImage::from_pixel(4, 3, Rgba([200, 10, 10, 255]));

        save_screenshot_png(&path, &image).expect("png written");
        let reloaded = image::open(&path).expect("png reads back").to_rgba8();
        assert_eq!(reloaded.dimensions(), (4, 3));
        assert_eq!(reloaded.get_pixel(0, 0), &Rgba([200, 10, 10, 255]));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_suffix_skips_existing_file() {
        let dir = std::env::temp_dir();
        let stem = format!("arcolor-test-unique-{}", std::process::id());
        let taken = dir.join(format!("{}.png", stem));
        std::fs::write(&taken, b"occupied").expect("marker written");

        let next = unique_path(&dir, &stem, "png");
        assert_eq!(next, dir.join(format!("{}-1.png", stem)));

        let _ = std::fs::remove_file(&taken);
    }
}
