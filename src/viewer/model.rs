//! glTF model loading, texture slots and the tutorial placeholder.

use std::path::Path;

use glam::{Mat3, Mat4, Vec3};
use image::RgbaImage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unsupported model format '{file_name}': only .glb and .gltf files are accepted")]
    UnsupportedFormat { file_name: String },
    #[error("failed to import model: {0}")]
    Import(#[from] gltf::Error),
    #[error("model has no renderable geometry")]
    Empty,
}

/// Geometry of one glTF primitive with its node transform baked in.
#[derive(Debug, Clone)]
pub struct Primitive {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
    /// Index into [`ModelAsset::materials`].
    pub material: usize,
}

/// Material with an optional base-color texture slot.
///
/// `base_color_texture` is the texture slot: `None` means a plain-color
/// material which texture uploads leave alone.
#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    pub base_color: [f32; 4],
    pub base_color_texture: Option<RgbaImage>,
}

#[derive(Debug, Clone)]
pub struct ModelAsset {
    pub name: String,
    pub primitives: Vec<Primitive>,
    pub materials: Vec<Material>,
}

/// Accepted model file extensions, ASCII case-insensitive.
pub fn has_model_extension(path: &Path) -> bool {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => ext.eq_ignore_ascii_case("glb") || ext.eq_ignore_ascii_case("gltf"),
        None => false,
    }
}

impl ModelAsset {
    /// Import a glTF/GLB file. UVs are taken as authored; node transforms are
    /// baked into the vertices.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        if !has_model_extension(path) {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            return Err(ModelError::UnsupportedFormat { file_name });
        }

        let (document, buffers, images) = gltf::import(path)?;
        let name = path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());
        Self::from_parts(name, document, buffers, images)
    }

    /// Import a self-contained GLB from memory (preloaded runtime assets).
    pub fn from_glb_bytes(name: &str, bytes: &[u8]) -> Result<Self, ModelError> {
        let (document, buffers, images) = gltf::import_slice(bytes)?;
        Self::from_parts(name.to_string(), document, buffers, images)
    }

    fn from_parts(
        name: String,
        document: gltf::Document,
        buffers: Vec<gltf::buffer::Data>,
        images: Vec<gltf::image::Data>,
    ) -> Result<Self, ModelError> {
        let mut materials: Vec<Material> = document
            .materials()
            .map(|material| {
                let pbr = material.pbr_metallic_roughness();
                let texture = pbr
                    .base_color_texture()
                    .and_then(|info| decode_texture(&images[info.texture().source().index()]));
                Material {
                    name: material.name().unwrap_or("unnamed").to_string(),
                    base_color: pbr.base_color_factor(),
                    base_color_texture: texture,
                }
            })
            .collect();
        // Slot for primitives that use the glTF default material.
        let default_material = materials.len();
        materials.push(Material {
            name: "default".to_string(),
            base_color: [1.0, 1.0, 1.0, 1.0],
            base_color_texture: None,
        });

        let mut primitives = Vec::new();
        let scene = document.default_scene().or_else(|| document.scenes().next());
        if let Some(scene) = scene {
            for node in scene.nodes() {
                collect_node(
                    &node,
                    Mat4::IDENTITY,
                    &buffers,
                    default_material,
                    &mut primitives,
                );
            }
        }
        if primitives.is_empty() {
            return Err(ModelError::Empty);
        }

        log::info!(
            "model loaded: {} ({} primitives, {} materials)",
            name,
            primitives.len(),
            materials.len()
        );
        Ok(Self {
            name,
            primitives,
            materials,
        })
    }

    /// Replace the texture of every material exposing a texture slot.
    /// Returns the number of materials retextured.
    pub fn apply_texture(&mut self, image: &RgbaImage) -> usize {
        let mut count = 0;
        for material in &mut self.materials {
            if material.base_color_texture.is_some() {
                material.base_color_texture = Some(image.clone());
                count += 1;
            }
        }
        count
    }

    /// Number of materials that would pick up a texture upload.
    pub fn texture_slots(&self) -> usize {
        self.materials
            .iter()
            .filter(|m| m.base_color_texture.is_some())
            .count()
    }

    /// The green tutorial placeholder cube. Plain-color material, so texture
    /// uploads do not touch it.
    pub fn placeholder_cube() -> Self {
        let face_data: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            // (normal, u axis, v axis) per face
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ];
        let mut positions = Vec::with_capacity(24);
        let mut normals = Vec::with_capacity(24);
        let mut uvs = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (face, (normal, u_axis, v_axis)) in face_data.iter().enumerate() {
            let n = Vec3::from(*normal);
            let u = Vec3::from(*u_axis);
            let v = Vec3::from(*v_axis);
            let base = (face * 4) as u32;
            for (du, dv) in [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)] {
                let p = n * 0.5 + u * du + v * dv;
                positions.push(p.to_array());
                normals.push(n.to_array());
                uvs.push([du + 0.5, dv + 0.5]);
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        Self {
            name: "placeholder".to_string(),
            primitives: vec![Primitive {
                positions,
                normals,
                uvs,
                indices,
                material: 0,
            }],
            materials: vec![Material {
                name: "placeholder-green".to_string(),
                base_color: [0.0, 1.0, 0.0, 1.0],
                base_color_texture: None,
            }],
        }
    }
}

fn collect_node(
    node: &gltf::Node,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    default_material: usize,
    out: &mut Vec<Primitive>,
) {
    let transform = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        let normal_matrix = Mat3::from_mat4(transform).inverse().transpose();
        for primitive in mesh.primitives() {
            let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));
            let Some(position_reader) = reader.read_positions() else {
                continue;
            };
            let positions: Vec<[f32; 3]> = position_reader
                .map(|p| transform.transform_point3(Vec3::from(p)).to_array())
                .collect();
            let indices: Vec<u32> = reader
                .read_indices()
                .map(|i| i.into_u32().collect())
                .unwrap_or_else(|| (0..positions.len() as u32).collect());
            let normals: Vec<[f32; 3]> = match reader.read_normals() {
                Some(normal_reader) => normal_reader
                    .map(|n| (normal_matrix * Vec3::from(n)).normalize_or_zero().to_array())
                    .collect(),
                None => averaged_normals(&positions, &indices),
            };
            let uvs: Vec<[f32; 2]> = reader
                .read_tex_coords(0)
                .map(|t| t.into_f32().collect())
                .unwrap_or_else(|| vec![[0.0, 0.0]; positions.len()]);
            out.push(Primitive {
                positions,
                normals,
                uvs,
                indices,
                material: primitive
                    .material()
                    .index()
                    .unwrap_or(default_material),
            });
        }
    }
    for child in node.children() {
        collect_node(&child, transform, buffers, default_material, out);
    }
}

/// Per-vertex normals accumulated from face normals, for primitives that
/// ship without them.
fn averaged_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut accumulated = vec![Vec3::ZERO; positions.len()];
    for triangle in indices.chunks_exact(3) {
        let [i0, i1, i2] = [
            triangle[0] as usize,
            triangle[1] as usize,
            triangle[2] as usize,
        ];
        if i0 >= positions.len() || i1 >= positions.len() || i2 >= positions.len() {
            continue;
        }
        let a = Vec3::from(positions[i0]);
        let b = Vec3::from(positions[i1]);
        let c = Vec3::from(positions[i2]);
        let face = (b - a).cross(c - a);
        accumulated[i0] += face;
        accumulated[i1] += face;
        accumulated[i2] += face;
    }
    accumulated
        .into_iter()
        .map(|n| n.normalize_or(Vec3::Y).to_array())
        .collect()
}

fn decode_texture(data: &gltf::image::Data) -> Option<RgbaImage> {
    use gltf::image::Format;
    let pixel_count = (data.width * data.height) as usize;
    match data.format {
        Format::R8G8B8A8 => RgbaImage::from_raw(data.width, data.height, data.pixels.clone()),
        Format::R8G8B8 => {
            let mut rgba = Vec::with_capacity(pixel_count * 4);
            for rgb in data.pixels.chunks_exact(3) {
                rgba.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
            }
            RgbaImage::from_raw(data.width, data.height, rgba)
        }
        Format::R8 => {
            let mut rgba = Vec::with_capacity(pixel_count * 4);
            for &v in &data.pixels {
                rgba.extend_from_slice(&[v, v, v, 255]);
            }
            RgbaImage::from_raw(data.width, data.height, rgba)
        }
        Format::R8G8 => {
            let mut rgba = Vec::with_capacity(pixel_count * 4);
            for lv in data.pixels.chunks_exact(2) {
                rgba.extend_from_slice(&[lv[0], lv[0], lv[0], lv[1]]);
            }
            RgbaImage::from_raw(data.width, data.height, rgba)
        }
        other => {
            log::warn!("unsupported base color texture format {:?}", other);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::path::PathBuf;

    #[test]
    fn test_extension_check() {
        assert!(has_model_extension(Path::new("bunny.glb")));
        assert!(has_model_extension(Path::new("scene.gltf")));
        assert!(has_model_extension(Path::new("UPPER.GLB")));
        assert!(!has_model_extension(Path::new("photo.png")));
        assert!(!has_model_extension(Path::new("model.glb.txt")));
        assert!(!has_model_extension(Path::new("noextension")));
    }

    #[test]
    fn test_load_rejects_wrong_extension_without_io() {
        // The path does not exist; the extension gate must fire first.
        let err = ModelAsset::load(&PathBuf::from("not-a-model.txt"))
            .expect_err("txt must be rejected");
        match err {
            ModelError::UnsupportedFormat { file_name } => {
                assert_eq!(file_name, "not-a-model.txt");
            }
            other => panic!("expected UnsupportedFormat, got {:?}", other),
        }
    }

    #[test]
    fn test_placeholder_cube_shape() {
        let cube = ModelAsset::placeholder_cube();
        assert_eq!(cube.primitives.len(), 1);
        assert_eq!(cube.primitives[0].positions.len(), 24);
        assert_eq!(cube.primitives[0].indices.len(), 36);
        assert_eq!(cube.materials.len(), 1);
        assert_eq!(cube.texture_slots(), 0, "plain color material has no slot");
    }

    #[test]
    fn test_apply_texture_only_touches_slots() {
        let mut asset = ModelAsset::placeholder_cube();
        let image = RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255]));
        assert_eq!(asset.apply_texture(&image), 0, "no slot, nothing applied");

        asset.materials.push(Material {
            name: "paper".to_string(),
            base_color: [1.0; 4],
            base_color_texture: Some(RgbaImage::new(2, 2)),
        });
        assert_eq!(asset.texture_slots(), 1);
        assert_eq!(asset.apply_texture(&image), 1);
        let applied = asset.materials[1]
            .base_color_texture
            .as_ref()
            .expect("slot keeps a texture");
        assert_eq!(applied.dimensions(), (4, 4));
        assert_eq!(applied.get_pixel(0, 0), &Rgba([1, 2, 3, 255]));
    }

    #[test]
    fn test_averaged_normals_flat_triangle() {
        let positions = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let normals = averaged_normals(&positions, &[0, 1, 2]);
        for n in normals {
            assert!((Vec3::from(n) - Vec3::Z).length() < 1e-6, "CCW triangle faces +Z");
        }
    }

    #[test]
    fn test_averaged_normals_degenerate_fallback() {
        let positions = vec![[0.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]];
        let normals = averaged_normals(&positions, &[0, 1, 2]);
        assert_eq!(normals[0], [0.0, 1.0, 0.0], "zero-area faces fall back to up");
    }
}
