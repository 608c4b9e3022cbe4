//! Model viewer scene state.
//!
//! Owns the loaded model, the orbit camera and the fixed lighting rig.
//! Models are parsed elsewhere and installed whole, so a failed import
//! never leaves a half-updated scene.

use glam::{Mat4, Vec3};
use image::RgbaImage;

pub mod camera;
pub mod model;

pub use camera::OrbitCamera;
pub use model::{has_model_extension, ModelAsset, ModelError};

use crate::tutorial::PLACEHOLDER_SPIN_STEP;

/// Fixed scene lighting: one ambient and one directional light.
#[derive(Debug, Clone, Copy)]
pub struct Lighting {
    pub ambient: f32,
    pub directional_dir: Vec3,
    pub directional_intensity: f32,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            ambient: 0.5,
            directional_dir: Vec3::new(1.0, 1.0, 1.0).normalize(),
            directional_intensity: 1.0,
        }
    }
}

/// One viewer's worth of scene state.
pub struct ViewerScene {
    pub camera: OrbitCamera,
    pub lighting: Lighting,
    model: Option<ModelAsset>,
    /// Offset applied to the model root.
    model_offset: Vec3,
    model_scale: f32,
    /// Auto-rotation per frame while the placeholder is up.
    spin_step: Option<f32>,
    rotation: f32,
    /// Bumped when geometry or textures change so the GPU side re-uploads.
    revision: u64,
}

impl ViewerScene {
    /// Empty scene; the model sits one unit below the orbit target.
    pub fn new() -> Self {
        Self {
            camera: OrbitCamera::new(),
            lighting: Lighting::default(),
            model: None,
            model_offset: Vec3::new(0.0, -1.0, 0.0),
            model_scale: 1.0,
            spin_step: None,
            rotation: 0.0,
            revision: 0,
        }
    }

    /// Tutorial scene: spinning placeholder cube until a model arrives.
    pub fn with_placeholder() -> Self {
        let mut scene = Self::new();
        scene.model = Some(ModelAsset::placeholder_cube());
        scene.model_offset = Vec3::ZERO;
        scene.spin_step = Some(PLACEHOLDER_SPIN_STEP);
        scene.revision = 1;
        scene
    }

    /// Install an already-imported model, replacing whatever was shown.
    pub fn install_model(&mut self, asset: ModelAsset) {
        self.model = Some(asset);
        // The placeholder spin does not carry over to a real model.
        self.spin_step = None;
        self.rotation = 0.0;
        self.revision += 1;
    }

    /// Retexture every material with a texture slot. Returns how many took it.
    pub fn apply_texture_rgba(&mut self, image: &RgbaImage) -> usize {
        let Some(model) = &mut self.model else {
            return 0;
        };
        let count = model.apply_texture(image);
        if count > 0 {
            self.revision += 1;
        } else {
            log::warn!("texture upload ignored: model has no texture slot");
        }
        count
    }

    /// Per-frame update: camera damping and placeholder spin.
    pub fn advance(&mut self) {
        self.camera.update();
        if let Some(step) = self.spin_step {
            self.rotation += step;
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.camera.set_aspect(width as f32 / height as f32);
        }
    }

    /// Model root transform: offset, spin, scale.
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.model_offset)
            * Mat4::from_rotation_y(self.rotation)
            * Mat4::from_scale(Vec3::splat(self.model_scale))
    }

    /// Catalog placement for AR overlay models.
    pub fn set_model_transform(&mut self, scale: f32, y_offset: f32) {
        self.model_scale = scale;
        self.model_offset = Vec3::new(0.0, y_offset, 0.0);
        self.revision += 1;
    }

    pub fn model(&self) -> Option<&ModelAsset> {
        self.model.as_ref()
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }
}

impl Default for ViewerScene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_install_model_resets_spin_and_bumps_revision() {
        let mut scene = ViewerScene::with_placeholder();
        let revision = scene.revision();
        scene.advance();
        assert!(scene.rotation() > 0.0);

        scene.install_model(ModelAsset::placeholder_cube());
        assert_eq!(scene.revision(), revision + 1);
        assert_eq!(scene.rotation(), 0.0);
    }

    #[test]
    fn test_placeholder_spins_until_model_installed() {
        let mut scene = ViewerScene::with_placeholder();
        scene.advance();
        scene.advance();
        let spun = scene.rotation();
        assert!(
            (spun - 2.0 * PLACEHOLDER_SPIN_STEP).abs() < 1e-6,
            "cube turns one step per frame"
        );

        scene.install_model(ModelAsset::placeholder_cube());
        scene.advance();
        assert_eq!(scene.rotation(), 0.0, "installed models do not auto-spin");
    }

    #[test]
    fn test_texture_upload_needs_a_slot() {
        let mut scene = ViewerScene::with_placeholder();
        let revision = scene.revision();
        let image = RgbaImage::from_pixel(2, 2, Rgba([9, 9, 9, 255]));
        assert_eq!(scene.apply_texture_rgba(&image), 0);
        assert_eq!(scene.revision(), revision, "nothing applied, nothing bumped");
    }

    #[test]
    fn test_texture_upload_bumps_revision() {
        let mut scene = ViewerScene::new();
        let mut asset = ModelAsset::placeholder_cube();
        asset.materials[0].base_color_texture = Some(RgbaImage::new(2, 2));
        scene.install_model(asset);
        let revision = scene.revision();

        let image = RgbaImage::from_pixel(8, 8, Rgba([1, 1, 1, 255]));
        assert_eq!(scene.apply_texture_rgba(&image), 1);
        assert_eq!(scene.revision(), revision + 1);
    }

    #[test]
    fn test_model_matrix_applies_catalog_transform() {
        let mut scene = ViewerScene::new();
        scene.set_model_transform(0.05, -1.0);
        let m = scene.model_matrix();
        let p = m.transform_point3(Vec3::new(1.0, 0.0, 0.0));
        assert!((p - Vec3::new(0.05, -1.0, 0.0)).length() < 1e-6);
    }
}
