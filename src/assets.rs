//! Asset root resolution and the built-in model library.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset not found: {0}")]
    Missing(PathBuf),
    #[error("failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One model set the studio ships with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelEntry {
    pub id: &'static str,
    pub title: &'static str,
    /// Model shown in the plain viewer.
    pub viewer_model: &'static str,
    /// Uncolored model the capture pipeline retextures.
    pub capture_model: &'static str,
    /// Pre-colored variant for the overlay swap.
    pub colored_model: &'static str,
    /// Page outline the AR view anchors on.
    pub marker_image: &'static str,
    /// Overlay scale and vertical offset.
    pub scale: f32,
    pub y_offset: f32,
}

/// Built-in model sets.
pub const MODEL_LIBRARY: &[ModelEntry] = &[
    ModelEntry {
        id: "teapot",
        title: "Teapot",
        viewer_model: "models/teapot.glb",
        capture_model: "models/teapot_base.glb",
        colored_model: "models/teapot_colored.glb",
        marker_image: "markers/teapot_page.png",
        scale: 0.05,
        y_offset: -0.25,
    },
    ModelEntry {
        id: "fox",
        title: "Fox",
        viewer_model: "models/fox.glb",
        capture_model: "models/fox_base.glb",
        colored_model: "models/fox_colored.glb",
        marker_image: "markers/fox_page.png",
        scale: 0.05,
        y_offset: -0.25,
    },
];

/// Tutorial sample files.
pub const SAMPLE_MODEL: &str = "samples/sample_model.glb";
pub const SAMPLE_TEXTURE: &str = "samples/sample_texture.png";

pub fn library_entry(id: &str) -> Option<&'static ModelEntry> {
    MODEL_LIBRARY.iter().find(|entry| entry.id == id)
}

/// Resolves relative asset paths against the configured root.
#[derive(Debug, Clone)]
pub struct AssetCatalog {
    root: PathBuf,
}

impl AssetCatalog {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Root from config override, `ARCOLOR_ASSETS`, or `./assets`.
    pub fn locate(configured: Option<&Path>) -> Self {
        let root = configured
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("ARCOLOR_ASSETS").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("assets"));
        let catalog = Self::new(root);
        log::info!("asset root: {}", catalog.root().display());
        catalog
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// The ordered runtime manifest the AR studio preloads for an entry:
    /// capture model, colored variant, page marker. Order matters.
    pub fn runtime_manifest(&self, entry: &ModelEntry) -> Vec<PathBuf> {
        vec![
            self.resolve(entry.capture_model),
            self.resolve(entry.colored_model),
            self.resolve(entry.marker_image),
        ]
    }

    /// Copy a bundled sample to a user-chosen destination.
    pub fn export_sample(&self, relative: &str, dest: &Path) -> Result<(), AssetError> {
        let from = self.resolve(relative);
        if !from.exists() {
            return Err(AssetError::Missing(from));
        }
        std::fs::copy(&from, dest)
            .map(|_| ())
            .map_err(|source| AssetError::Copy {
                from,
                to: dest.to_path_buf(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_lookup() {
        assert_eq!(library_entry("teapot").map(|e| e.title), Some("Teapot"));
        assert!(library_entry("dragon").is_none());
    }

    #[test]
    fn test_manifest_order_is_fixed() {
        let catalog = AssetCatalog::new(PathBuf::from("/data"));
        let entry = library_entry("fox").expect("fox is built in");
        let manifest = catalog.runtime_manifest(entry);
        assert_eq!(manifest.len(), 3);
        assert_eq!(manifest[0], PathBuf::from("/data/models/fox_base.glb"));
        assert_eq!(manifest[1], PathBuf::from("/data/models/fox_colored.glb"));
        assert_eq!(manifest[2], PathBuf::from("/data/markers/fox_page.png"));
    }

    #[test]
    fn test_locate_prefers_configured_root() {
        let catalog = AssetCatalog::locate(Some(Path::new("/custom/assets")));
        assert_eq!(catalog.root(), Path::new("/custom/assets"));
    }

    #[test]
    fn test_export_missing_sample_fails() {
        let catalog = AssetCatalog::new(PathBuf::from("/definitely/not/here"));
        let err = catalog
            .export_sample(SAMPLE_MODEL, Path::new("/tmp/out.glb"))
            .expect_err("missing source must fail");
        assert!(matches!(err, AssetError::Missing(_)));
    }
}
