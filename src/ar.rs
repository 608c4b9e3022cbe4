//! AR studio session.
//!
//! Gates the AR view behind the runtime preload, tracks the page anchor on
//! the camera stream, and applies capture outcomes to the overlay model.

use image::RgbaImage;

use crate::assets::{AssetCatalog, ModelEntry};
use crate::bootstrap::{LoadedAsset, PreloadState, RuntimePreloader};
use crate::viewer::{ModelAsset, ViewerScene};
use crate::vision::{self, CaptureOutcome, Quad};

/// Frames between page-tracking passes.
const TRACK_INTERVAL: u64 = 5;
/// Tracking passes the anchor survives without a fresh quad.
const ANCHOR_GRACE: u32 = 6;

/// Which overlay model variant is up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayVariant {
    /// Uncolored capture model; retextured by the pipeline.
    Base,
    /// Pre-colored variant.
    Colored,
}

impl OverlayVariant {
    pub fn toggled(self) -> Self {
        match self {
            OverlayVariant::Base => OverlayVariant::Colored,
            OverlayVariant::Colored => OverlayVariant::Base,
        }
    }
}

/// Overlay anchor rectangle in normalized frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub min: (f32, f32),
    pub max: (f32, f32),
}

impl Anchor {
    pub fn from_quad(quad: &Quad, frame_width: u32, frame_height: u32) -> Self {
        let (min_x, min_y, max_x, max_y) = quad.normalized_bounds(frame_width, frame_height);
        Self {
            min: (min_x, min_y),
            max: (max_x, max_y),
        }
    }
}

/// Keeps the last good anchor through short tracking dropouts.
#[derive(Debug, Default)]
pub struct AnchorTracker {
    anchor: Option<Anchor>,
    misses: u32,
}

impl AnchorTracker {
    pub fn update(&mut self, found: Option<Anchor>) {
        match found {
            Some(anchor) => {
                self.anchor = Some(anchor);
                self.misses = 0;
            }
            None => {
                self.misses = self.misses.saturating_add(1);
                if self.misses > ANCHOR_GRACE {
                    self.anchor = None;
                }
            }
        }
    }

    pub fn anchor(&self) -> Option<Anchor> {
        self.anchor
    }

    pub fn clear(&mut self) {
        self.anchor = None;
        self.misses = 0;
    }
}

/// The parsed runtime assets the AR studio works with.
pub struct ArRuntime {
    pub base: ModelAsset,
    pub colored: ModelAsset,
    pub marker: RgbaImage,
}

impl ArRuntime {
    /// Build from the preloaded manifest: capture model, colored variant,
    /// page marker, in that order.
    pub fn from_assets(assets: &[LoadedAsset]) -> Result<Self, String> {
        let [base, colored, marker] = assets else {
            return Err(format!("expected 3 runtime assets, got {}", assets.len()));
        };
        let base_model = ModelAsset::from_glb_bytes("capture-base", &base.bytes)
            .map_err(|e| format!("{}: {}", base.path.display(), e))?;
        let colored_model = ModelAsset::from_glb_bytes("capture-colored", &colored.bytes)
            .map_err(|e| format!("{}: {}", colored.path.display(), e))?;
        let marker_image = image::load_from_memory(&marker.bytes)
            .map_err(|e| format!("{}: {}", marker.path.display(), e))?
            .to_rgba8();
        Ok(Self {
            base: base_model,
            colored: colored_model,
            marker: marker_image,
        })
    }
}

/// One AR studio session for a model library entry.
pub struct ArSession {
    entry: ModelEntry,
    preloader: Option<RuntimePreloader>,
    state: PreloadState,
    runtime: Option<ArRuntime>,
    variant: OverlayVariant,
    tracker: AnchorTracker,
    last_outcome: Option<CaptureOutcome>,
    /// Overlay scene composited over the camera preview.
    pub overlay: ViewerScene,
}

impl ArSession {
    /// Start preloading the entry's runtime manifest from disk.
    pub fn begin(entry: ModelEntry, catalog: &AssetCatalog) -> Self {
        let preloader = RuntimePreloader::spawn(catalog.runtime_manifest(&entry));
        Self::with_preloader(entry, preloader)
    }

    /// Start with a caller-provided preloader.
    pub fn with_preloader(entry: ModelEntry, preloader: RuntimePreloader) -> Self {
        let mut overlay = ViewerScene::new();
        overlay.set_model_transform(entry.scale, entry.y_offset);
        Self {
            entry,
            preloader: Some(preloader),
            state: PreloadState::Loading,
            runtime: None,
            variant: OverlayVariant::Base,
            tracker: AnchorTracker::default(),
            last_outcome: None,
            overlay,
        }
    }

    /// Drive the preloader; on readiness, parse the runtime and show the
    /// base model.
    pub fn poll(&mut self) {
        let Some(preloader) = &mut self.preloader else {
            return;
        };
        let ready = preloader.poll();
        self.state = preloader.state().clone();
        if let Some(assets) = ready {
            match ArRuntime::from_assets(&assets) {
                Ok(runtime) => {
                    self.install_runtime(runtime);
                    self.preloader = None;
                }
                Err(message) => {
                    log::error!("runtime assets unusable: {}", message);
                    self.state = PreloadState::Failed(message);
                    self.preloader = None;
                }
            }
        }
    }

    /// Install parsed runtime assets and show the base model.
    pub fn install_runtime(&mut self, runtime: ArRuntime) {
        self.overlay.install_model(runtime.base.clone());
        self.runtime = Some(runtime);
        self.state = PreloadState::Ready;
        self.variant = OverlayVariant::Base;
    }

    pub fn is_ready(&self) -> bool {
        self.state == PreloadState::Ready && self.runtime.is_some()
    }

    pub fn state(&self) -> &PreloadState {
        &self.state
    }

    pub fn entry(&self) -> &ModelEntry {
        &self.entry
    }

    pub fn variant(&self) -> OverlayVariant {
        self.variant
    }

    pub fn anchor(&self) -> Option<Anchor> {
        self.tracker.anchor()
    }

    pub fn last_outcome(&self) -> Option<&CaptureOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn preload_progress(&self) -> Option<(usize, usize)> {
        self.preloader.as_ref().map(|p| p.progress())
    }

    /// Artwork of the page this entry tracks, once the runtime is up.
    pub fn marker(&self) -> Option<&RgbaImage> {
        self.runtime.as_ref().map(|runtime| &runtime.marker)
    }

    /// Whether a tracking pass is due for this frame. Lets callers skip the
    /// frame conversion on off frames.
    pub fn should_observe(&self, frame_number: u64) -> bool {
        self.is_ready() && frame_number % TRACK_INTERVAL == 0
    }

    /// Track the page on the camera stream. Detection runs every few frames;
    /// the anchor survives short dropouts.
    pub fn observe_frame(&mut self, frame: &RgbaImage, frame_number: u64) {
        if !self.should_observe(frame_number) {
            return;
        }
        let found = vision::detect_quad(frame)
            .map(|quad| Anchor::from_quad(&quad, frame.width(), frame.height()));
        self.tracker.update(found);
    }

    /// Run the capture pipeline on `frame` and apply the outcome.
    /// Returns the outcome for display, or `None` while the runtime is not
    /// ready.
    pub fn capture(&mut self, frame: &RgbaImage) -> Option<&CaptureOutcome> {
        if !self.is_ready() {
            log::warn!("capture ignored: AR runtime not ready");
            return None;
        }
        let outcome = vision::run_capture(frame);
        self.absorb(outcome);
        self.last_outcome.as_ref()
    }

    /// Apply a pipeline outcome: a retexture dresses a fresh copy of the
    /// base model and resets the variant; no-target only updates diagnostics.
    pub fn absorb(&mut self, outcome: CaptureOutcome) {
        if let CaptureOutcome::Retextured { texture, .. } = &outcome {
            if let Some(runtime) = &self.runtime {
                let mut model = runtime.base.clone();
                let applied = model.apply_texture(&vision::gray_to_rgba(texture));
                if applied == 0 {
                    log::warn!("capture model has no texture slot");
                }
                self.overlay.install_model(model);
                self.variant = OverlayVariant::Base;
            }
        }
        self.last_outcome = Some(outcome);
    }

    /// Swap between the base and pre-colored overlay models.
    pub fn toggle_variant(&mut self) {
        let Some(runtime) = &self.runtime else {
            return;
        };
        self.variant = self.variant.toggled();
        let model = match self.variant {
            OverlayVariant::Base => runtime.base.clone(),
            OverlayVariant::Colored => runtime.colored.clone(),
        };
        self.overlay.install_model(model);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::RuntimePreloader;
    use image::{GrayImage, Rgba};
    use std::io;
    use std::path::PathBuf;
    use std::time::Duration;

    fn anchor(min: (f32, f32), max: (f32, f32)) -> Anchor {
        Anchor { min, max }
    }

    fn test_entry() -> ModelEntry {
        crate::assets::MODEL_LIBRARY[0]
    }

    fn retexturable_runtime() -> ArRuntime {
        let mut base = ModelAsset::placeholder_cube();
        base.materials[0].base_color_texture = Some(RgbaImage::new(2, 2));
        ArRuntime {
            base,
            colored: ModelAsset::placeholder_cube(),
            marker: RgbaImage::new(4, 4),
        }
    }

    #[test]
    fn test_anchor_survives_grace_then_clears() {
        let mut tracker = AnchorTracker::default();
        tracker.update(Some(anchor((0.1, 0.1), (0.6, 0.7))));
        assert!(tracker.anchor().is_some());

        for _ in 0..ANCHOR_GRACE {
            tracker.update(None);
            assert!(tracker.anchor().is_some(), "anchor held through dropouts");
        }
        tracker.update(None);
        assert!(tracker.anchor().is_none(), "anchor clears after the grace");
    }

    #[test]
    fn test_anchor_recovers_on_redetection() {
        let mut tracker = AnchorTracker::default();
        tracker.update(Some(anchor((0.0, 0.0), (0.5, 0.5))));
        for _ in 0..3 {
            tracker.update(None);
        }
        let fresh = anchor((0.2, 0.2), (0.8, 0.8));
        tracker.update(Some(fresh));
        assert_eq!(tracker.anchor(), Some(fresh));
        for _ in 0..ANCHOR_GRACE {
            tracker.update(None);
        }
        assert!(tracker.anchor().is_some(), "miss count reset on redetection");
    }

    #[test]
    fn test_capture_gated_until_ready() {
        let preloader = RuntimePreloader::spawn_with(vec![PathBuf::from("never.glb")], |_| {
            Err(io::Error::new(io::ErrorKind::NotFound, "gone"))
        });
        let mut session = ArSession::with_preloader(test_entry(), preloader);

        let frame = RgbaImage::from_pixel(32, 32, Rgba([128, 128, 128, 255]));
        assert!(session.capture(&frame).is_none(), "not ready, no capture");

        for _ in 0..200 {
            session.poll();
            if matches!(session.state(), PreloadState::Failed(_)) {
                break;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        match session.state() {
            PreloadState::Failed(message) => {
                assert!(message.contains("never.glb"), "failure names the file");
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(session.capture(&frame).is_none(), "failed runtime stays gated");
    }

    #[test]
    fn test_retexture_outcome_dresses_base_model() {
        let preloader = RuntimePreloader::spawn_with(Vec::new(), |_| Ok(Vec::new()));
        let mut session = ArSession::with_preloader(test_entry(), preloader);
        session.install_runtime(retexturable_runtime());
        session.toggle_variant();
        assert_eq!(session.variant(), OverlayVariant::Colored);

        let texture = GrayImage::from_pixel(6, 6, image::Luma([255]));
        session.absorb(CaptureOutcome::Retextured {
            texture,
            preview: RgbaImage::new(6, 6),
        });

        assert_eq!(session.variant(), OverlayVariant::Base, "capture resets to base");
        let model = session.overlay.model().expect("overlay model installed");
        let applied = model.materials[0]
            .base_color_texture
            .as_ref()
            .expect("texture slot filled");
        assert_eq!(applied.dimensions(), (6, 6));
        assert!(session.last_outcome().is_some());
    }

    #[test]
    fn test_no_target_outcome_keeps_model() {
        let preloader = RuntimePreloader::spawn_with(Vec::new(), |_| Ok(Vec::new()));
        let mut session = ArSession::with_preloader(test_entry(), preloader);
        session.install_runtime(retexturable_runtime());
        let revision = session.overlay.revision();

        session.absorb(CaptureOutcome::NoTarget {
            frame: RgbaImage::new(8, 8),
            edges: GrayImage::new(8, 8),
        });
        assert_eq!(session.overlay.revision(), revision, "model untouched");
        assert!(matches!(
            session.last_outcome(),
            Some(CaptureOutcome::NoTarget { .. })
        ));
    }

    #[test]
    fn test_variant_toggle_swaps_models() {
        let preloader = RuntimePreloader::spawn_with(Vec::new(), |_| Ok(Vec::new()));
        let mut session = ArSession::with_preloader(test_entry(), preloader);
        session.install_runtime(retexturable_runtime());

        assert_eq!(session.variant(), OverlayVariant::Base);
        session.toggle_variant();
        assert_eq!(session.variant(), OverlayVariant::Colored);
        session.toggle_variant();
        assert_eq!(session.variant(), OverlayVariant::Base);
    }
}
