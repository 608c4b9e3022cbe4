//! Streamed RGBA textures shown inside egui panels.
//!
//! Used for the live camera preview and for capture result thumbnails:
//! CPU images go up via `write_texture` and egui draws the registered
//! native texture.

use image::RgbaImage;

/// One CPU-fed texture registered with egui.
///
/// `upload` recreates the texture (and its egui registration) when the
/// dimensions change, otherwise it just rewrites the pixels.
pub struct StreamedTexture {
    label: &'static str,
    texture: Option<wgpu::Texture>,
    egui_id: Option<egui::TextureId>,
    width: u32,
    height: u32,
}

impl StreamedTexture {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            texture: None,
            egui_id: None,
            width: 0,
            height: 0,
        }
    }

    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        egui_renderer: &mut egui_wgpu::Renderer,
        image: &RgbaImage,
    ) {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return;
        }
        if width != self.width || height != self.height {
            self.create_texture(device, egui_renderer, width, height);
        }

        if let Some(ref texture) = self.texture {
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                image.as_raw(),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(width * 4),
                    rows_per_image: Some(height),
                },
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
            );
        }
    }

    fn create_texture(
        &mut self,
        device: &wgpu::Device,
        egui_renderer: &mut egui_wgpu::Renderer,
        width: u32,
        height: u32,
    ) {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(self.label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        // Free any previous registration before handing egui the new view
        if let Some(old_id) = self.egui_id.take() {
            egui_renderer.free_texture(&old_id);
        }
        let id = egui_renderer.register_native_texture(device, &view, wgpu::FilterMode::Linear);

        self.texture = Some(texture);
        self.egui_id = Some(id);
        self.width = width;
        self.height = height;
    }

    /// Drop the texture and its egui registration.
    pub fn free(&mut self, egui_renderer: &mut egui_wgpu::Renderer) {
        if let Some(id) = self.egui_id.take() {
            egui_renderer.free_texture(&id);
        }
        self.texture = None;
        self.width = 0;
        self.height = 0;
    }

    pub fn egui_id(&self) -> Option<egui::TextureId> {
        self.egui_id
    }

    pub fn size(&self) -> Option<egui::Vec2> {
        if self.width == 0 || self.height == 0 {
            None
        } else {
            Some(egui::Vec2::new(self.width as f32, self.height as f32))
        }
    }

    pub fn has_frame(&self) -> bool {
        self.texture.is_some()
    }
}
