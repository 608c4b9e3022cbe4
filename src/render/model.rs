//! Offscreen model renderer.
//!
//! Renders the active [`ViewerScene`] into its own texture so egui can show
//! it inside a panel, and reads that texture back for PNG screenshots.

use bytemuck::{Pod, Zeroable};
use image::RgbaImage;
use wgpu::util::DeviceExt;

use super::{aligned_bytes_per_row, RenderError};
use crate::viewer::model::{ModelAsset, Primitive};
use crate::viewer::ViewerScene;

/// Scene uniform buffer data.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct SceneUniforms {
    view_proj: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    light_dir: [f32; 3],
    ambient: f32,
    light_intensity: f32,
    _pad: [f32; 3],
}

/// Per-material uniform buffer data.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct MaterialParams {
    base_color: [f32; 4],
    use_texture: u32,
    _pad: [u32; 3],
}

/// Interleaved vertex as the shader consumes it.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct GpuVertex {
    position: [f32; 3],
    normal: [f32; 3],
    uv: [f32; 2],
}

impl GpuVertex {
    const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    fn buffer_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: Self::SIZE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                // position
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // normal
                wgpu::VertexAttribute {
                    offset: 12,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // uv
                wgpu::VertexAttribute {
                    offset: 24,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

fn interleave(primitive: &Primitive) -> Vec<GpuVertex> {
    let count = primitive.positions.len();
    let mut vertices = Vec::with_capacity(count);
    for i in 0..count {
        vertices.push(GpuVertex {
            position: primitive.positions[i],
            normal: primitive.normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
            uv: primitive.uvs.get(i).copied().unwrap_or([0.0, 0.0]),
        });
    }
    vertices
}

/// Uploaded geometry for one primitive.
struct GpuPrimitive {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    material: usize,
}

/// GPU renderer for one viewer scene.
pub struct ModelRenderer {
    pipeline: wgpu::RenderPipeline,
    material_bind_group_layout: wgpu::BindGroupLayout,

    scene_buffer: wgpu::Buffer,
    scene_bind_group: wgpu::BindGroup,

    // Model buffers, rebuilt when the scene revision changes
    primitives: Vec<GpuPrimitive>,
    material_bind_groups: Vec<wgpu::BindGroup>,
    uploaded_revision: Option<u64>,

    // Render target (panel's own texture)
    render_texture: Option<wgpu::Texture>,
    render_view: Option<wgpu::TextureView>,
    depth_view: Option<wgpu::TextureView>,
    render_width: u32,
    render_height: u32,

    sampler: wgpu::Sampler,
    // Bound in place of the base color texture for plain-color materials
    white_view: wgpu::TextureView,
}

impl ModelRenderer {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let shader_source = include_str!("shaders/model.wgsl");
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Model Shader"),
            source: wgpu::ShaderSource::Wgsl(shader_source.into()),
        });

        // Bind group 0: scene uniforms
        let scene_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Model Scene Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        // Bind group 1: material params, base color texture, sampler
        let material_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Model Material Bind Group Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Model Pipeline Layout"),
            bind_group_layouts: &[&scene_bind_group_layout, &material_bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Model Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[GpuVertex::buffer_layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: Self::FORMAT,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                // Coloring page models are often unclosed shells
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let scene_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Model Scene Buffer"),
            size: std::mem::size_of::<SceneUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let scene_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Model Scene Bind Group"),
            layout: &scene_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: scene_buffer.as_entire_binding(),
            }],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Model Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let white_view = create_white_texture(device, queue);

        Self {
            pipeline,
            material_bind_group_layout,
            scene_buffer,
            scene_bind_group,
            primitives: Vec::new(),
            material_bind_groups: Vec::new(),
            uploaded_revision: None,
            render_texture: None,
            render_view: None,
            depth_view: None,
            render_width: 0,
            render_height: 0,
            sampler,
            white_view,
        }
    }

    /// Ensure the render target exists with the given size.
    /// Returns true when the target was (re)created, so callers can
    /// re-register it with egui.
    pub fn ensure_render_target(
        &mut self,
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> bool {
        let width = width.max(1);
        let height = height.max(1);
        if self.render_width == width && self.render_height == height {
            return false;
        }

        let render_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Model Render Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Model Depth Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        self.render_view = Some(render_texture.create_view(&Default::default()));
        self.depth_view = Some(depth_texture.create_view(&Default::default()));
        self.render_texture = Some(render_texture);
        self.render_width = width;
        self.render_height = height;
        true
    }

    /// Re-upload model geometry and materials when the scene revision moved.
    fn sync_model(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, scene: &ViewerScene) {
        if self.uploaded_revision == Some(scene.revision()) {
            return;
        }
        self.primitives.clear();
        self.material_bind_groups.clear();
        if let Some(model) = scene.model() {
            self.upload_model(device, queue, model);
            log::debug!(
                "model uploaded to GPU: {} ({} primitives, {} materials)",
                model.name,
                self.primitives.len(),
                self.material_bind_groups.len()
            );
        }
        self.uploaded_revision = Some(scene.revision());
    }

    fn upload_model(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, model: &ModelAsset) {
        for material in &model.materials {
            let params = MaterialParams {
                base_color: material.base_color,
                use_texture: material.base_color_texture.is_some() as u32,
                _pad: [0; 3],
            };
            let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Material Params Buffer"),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM,
            });
            let texture_view = match &material.base_color_texture {
                Some(image) => upload_rgba_texture(device, queue, image),
                None => self.white_view.clone(),
            };
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Material Bind Group"),
                layout: &self.material_bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: params_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&texture_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                ],
            });
            self.material_bind_groups.push(bind_group);
        }

        for primitive in &model.primitives {
            let vertices = interleave(primitive);
            let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Model Vertex Buffer"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
            let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Model Index Buffer"),
                contents: bytemuck::cast_slice(&primitive.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            self.primitives.push(GpuPrimitive {
                vertex_buffer,
                index_buffer,
                index_count: primitive.indices.len() as u32,
                material: primitive.material.min(model.materials.len().saturating_sub(1)),
            });
        }
    }

    /// Render the scene into the internal texture.
    ///
    /// `clear` paints the backdrop; pass `wgpu::Color::TRANSPARENT` when the
    /// result is composited over a camera frame.
    pub fn render(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        scene: &ViewerScene,
        clear: wgpu::Color,
    ) {
        self.sync_model(device, queue, scene);

        let uniforms = SceneUniforms {
            view_proj: scene.camera.view_projection_matrix().to_cols_array_2d(),
            model: scene.model_matrix().to_cols_array_2d(),
            light_dir: scene.lighting.directional_dir.into(),
            ambient: scene.lighting.ambient,
            light_intensity: scene.lighting.directional_intensity,
            _pad: [0.0; 3],
        };
        queue.write_buffer(&self.scene_buffer, 0, bytemuck::bytes_of(&uniforms));

        let (Some(render_view), Some(depth_view)) = (&self.render_view, &self.depth_view) else {
            return;
        };

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Model Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: render_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.scene_bind_group, &[]);

        for primitive in &self.primitives {
            let Some(material) = self.material_bind_groups.get(primitive.material) else {
                continue;
            };
            render_pass.set_bind_group(1, material, &[]);
            render_pass.set_vertex_buffer(0, primitive.vertex_buffer.slice(..));
            render_pass.set_index_buffer(primitive.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..primitive.index_count, 0, 0..1);
        }
    }

    /// Blocking readback of the render target for PNG screenshots.
    pub fn screenshot(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Result<RgbaImage, RenderError> {
        let texture = self.render_texture.as_ref().ok_or(RenderError::NoTarget)?;
        let (width, height) = (self.render_width, self.render_height);
        let bytes_per_row = aligned_bytes_per_row(width);

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Screenshot Staging Buffer"),
            size: bytes_per_row as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Screenshot Encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device.poll(wgpu::Maintain::Wait);
        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(RenderError::Readback(e.to_string())),
            Err(e) => return Err(RenderError::Readback(e.to_string())),
        }

        let data = slice.get_mapped_range();
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        for row in 0..height as usize {
            let start = row * bytes_per_row as usize;
            pixels.extend_from_slice(&data[start..start + width as usize * 4]);
        }
        drop(data);
        staging.unmap();

        RgbaImage::from_raw(width, height, pixels)
            .ok_or_else(|| RenderError::Readback("pixel buffer size mismatch".to_string()))
    }

    pub fn texture_view(&self) -> Option<&wgpu::TextureView> {
        self.render_view.as_ref()
    }
}

fn create_white_texture(device: &wgpu::Device, queue: &wgpu::Queue) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("White Texture"),
        size: wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &[255, 255, 255, 255],
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4),
            rows_per_image: Some(1),
        },
        wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        },
    );
    texture.create_view(&Default::default())
}

fn upload_rgba_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    image: &RgbaImage,
) -> wgpu::TextureView {
    let (width, height) = image.dimensions();
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Material Texture"),
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
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
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
    texture.create_view(&Default::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewer::model::Primitive;

    #[test]
    fn test_vertex_layout_matches_struct() {
        assert_eq!(GpuVertex::SIZE, 32);
        let layout = GpuVertex::buffer_layout();
        assert_eq!(layout.array_stride, 32);
        assert_eq!(layout.attributes.len(), 3);
        assert_eq!(layout.attributes[1].offset, 12);
        assert_eq!(layout.attributes[2].offset, 24);
    }

    #[test]
    fn test_uniform_sizes_are_wgsl_compatible() {
        // Uniform structs must stay 16-byte aligned for the shader bindings.
        assert_eq!(std::mem::size_of::<SceneUniforms>(), 160);
        assert_eq!(std::mem::size_of::<MaterialParams>(), 32);
    }

    #[test]
    fn test_interleave_pads_short_attributes() {
        let primitive = Primitive {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
            normals: vec![[0.0, 0.0, 1.0]],
            uvs: vec![],
            indices: vec![0, 1],
            material: 0,
        };
        let vertices = interleave(&primitive);
        assert_eq!(vertices.len(), 2);
        assert_eq!(vertices[0].normal, [0.0, 0.0, 1.0]);
        assert_eq!(vertices[1].normal, [0.0, 1.0, 0.0], "missing normal defaults up");
        assert_eq!(vertices[1].uv, [0.0, 0.0]);
    }
}
