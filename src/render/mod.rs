//! GPU rendering: surface management, the offscreen model renderer and
//! streamed textures for camera frames and capture previews.

pub mod model;
pub mod preview;

pub use model::ModelRenderer;
pub use preview::StreamedTexture;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no render target allocated")]
    NoTarget,
    #[error("screenshot readback failed: {0}")]
    Readback(String),
}

/// Shared GPU state for the window surface.
pub struct RenderContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
}

impl RenderContext {
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    ) -> Self {
        Self {
            device,
            queue,
            surface,
            config,
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface(&self) -> &wgpu::Surface<'_> {
        &self.surface
    }

    pub fn config(&self) -> &wgpu::SurfaceConfiguration {
        &self.config
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.config.width = width.max(1);
        self.config.height = height.max(1);
        self.surface.configure(&self.device, &self.config);
    }
}

/// Pad a row length up to wgpu's copy alignment for texture readback.
pub(crate) fn aligned_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aligned_bytes_per_row() {
        // 256-byte alignment: exact multiples pass through, the rest round up.
        assert_eq!(aligned_bytes_per_row(64), 256);
        assert_eq!(aligned_bytes_per_row(320), 1280);
        assert_eq!(aligned_bytes_per_row(321), 1536);
        assert_eq!(aligned_bytes_per_row(1), 256);
    }
}
