//! wgpu backend
//!
//! Pages are `wgpu::Texture`s. The transfer buffer is a `COPY_SRC` buffer
//! paired with a host staging area: `map_range` hands out the staging bytes,
//! `unmap` pushes them with `queue.write_buffer`, and the copy into the page
//! is encoded and submitted right away. A discarding map orphans the buffer:
//! the old one is dropped (commands already submitted keep it alive) and a
//! fresh one of the same size takes its place.

use super::{AtlasBackend, CopyRegion};
use crate::error::{AtlasError, AtlasResult};
use crate::pixel_format::{PixelFormat, PixelType};
use std::sync::Arc;
use wgpu::{Device, Queue};

/// A page texture and its default view
pub struct WgpuSurface {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub format: wgpu::TextureFormat,
}

/// Streaming transfer buffer
pub struct WgpuTransferBuffer {
    pub buffer: wgpu::Buffer,
    pub size: u64,
    staging: Vec<u8>,
    mapped: Option<(u64, u64)>,
    /// Number of times the buffer was orphaned
    pub orphan_count: u64,
}

/// Backend uploading atlas pages through a wgpu device
pub struct WgpuBackend {
    device: Arc<Device>,
    queue: Arc<Queue>,
}

impl WgpuBackend {
    pub fn new(device: Arc<Device>, queue: Arc<Queue>) -> Self {
        Self { device, queue }
    }

    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    pub fn queue(&self) -> &Arc<Queue> {
        &self.queue
    }

    fn create_raw_buffer(&self, size: u64) -> wgpu::Buffer {
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Atlas Transfer Buffer"),
            size,
            usage: wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }
}

/// wgpu texture format for a page format, if one exists
pub fn texture_format(format: PixelFormat, pixel_type: PixelType) -> Option<wgpu::TextureFormat> {
    use wgpu::TextureFormat as T;
    let mapped = match (format, pixel_type) {
        (PixelFormat::R, PixelType::U8) => T::R8Unorm,
        (PixelFormat::Rg, PixelType::U8) => T::Rg8Unorm,
        (PixelFormat::Rgba, PixelType::U8) => T::Rgba8Unorm,
        (PixelFormat::Bgra, PixelType::U8) => T::Bgra8Unorm,
        (PixelFormat::R, PixelType::U16) => T::R16Uint,
        (PixelFormat::Rg, PixelType::U16) => T::Rg16Uint,
        (PixelFormat::Rgba, PixelType::U16) => T::Rgba16Uint,
        (PixelFormat::R, PixelType::F16) => T::R16Float,
        (PixelFormat::Rg, PixelType::F16) => T::Rg16Float,
        (PixelFormat::Rgba, PixelType::F16) => T::Rgba16Float,
        (PixelFormat::R, PixelType::F32) => T::R32Float,
        (PixelFormat::Rg, PixelType::F32) => T::Rg32Float,
        (PixelFormat::Rgba, PixelType::F32) => T::Rgba32Float,
        _ => return None,
    };
    Some(mapped)
}

impl AtlasBackend for WgpuBackend {
    type Surface = WgpuSurface;
    type Buffer = WgpuTransferBuffer;

    fn row_alignment(&self) -> u32 {
        wgpu::COPY_BYTES_PER_ROW_ALIGNMENT
    }

    fn supports_format(&self, format: PixelFormat, pixel_type: PixelType) -> bool {
        texture_format(format, pixel_type).is_some()
    }

    fn allocate_surface(
        &mut self,
        width: u32,
        height: u32,
        format: PixelFormat,
        pixel_type: PixelType,
    ) -> AtlasResult<WgpuSurface> {
        let texture_format = texture_format(format, pixel_type).ok_or(
            AtlasError::UnsupportedFormat {
                format,
                pixel_type,
            },
        )?;

        let max_dimension = self.device.limits().max_texture_dimension_2d;
        if width > max_dimension || height > max_dimension {
            log::warn!(
                "[wgpu_backend::allocate_surface] Page {}x{} exceeds GPU limit (max: {})",
                width,
                height,
                max_dimension
            );
            return Err(AtlasError::SurfaceAllocationFailed {
                width,
                height,
                reason: format!("exceeds max texture dimension {}", max_dimension),
            });
        }

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Atlas Page"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: texture_format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(AtlasError::SurfaceAllocationFailed {
                width,
                height,
                reason: error.to_string(),
            });
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(WgpuSurface {
            texture,
            view,
            format: texture_format,
        })
    }

    fn release_surface(&mut self, surface: WgpuSurface) {
        surface.texture.destroy();
    }

    fn create_transfer_buffer(&mut self, size: u64) -> AtlasResult<WgpuTransferBuffer> {
        let mut staging = Vec::new();
        staging
            .try_reserve_exact(size as usize)
            .map_err(|e| AtlasError::BufferCreationFailed {
                size,
                reason: e.to_string(),
            })?;

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let buffer = self.create_raw_buffer(size);
        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(AtlasError::BufferCreationFailed {
                size,
                reason: error.to_string(),
            });
        }

        Ok(WgpuTransferBuffer {
            buffer,
            size,
            staging,
            mapped: None,
            orphan_count: 0,
        })
    }

    fn release_buffer(&mut self, buffer: WgpuTransferBuffer) {
        drop(buffer);
    }

    fn map_range<'b>(
        &mut self,
        buffer: &'b mut WgpuTransferBuffer,
        offset: u64,
        size: u64,
        discard: bool,
    ) -> AtlasResult<&'b mut [u8]> {
        if offset + size > buffer.size {
            return Err(AtlasError::MapFailed {
                offset,
                size,
                reason: format!("range exceeds buffer of {} bytes", buffer.size),
            });
        }
        if buffer.mapped.is_some() {
            return Err(AtlasError::MapFailed {
                offset,
                size,
                reason: "buffer is already mapped".to_string(),
            });
        }

        if discard {
            buffer.buffer = self.create_raw_buffer(buffer.size);
            buffer.orphan_count += 1;
        }

        buffer.staging.clear();
        buffer.staging.resize(size as usize, 0);
        buffer.mapped = Some((offset, size));
        Ok(&mut buffer.staging[..])
    }

    fn unmap(&mut self, buffer: &mut WgpuTransferBuffer) -> AtlasResult<()> {
        let (offset, _size) = buffer
            .mapped
            .take()
            .ok_or_else(|| AtlasError::Backend("unmap without a mapped range".to_string()))?;
        self.queue.write_buffer(&buffer.buffer, offset, &buffer.staging);
        Ok(())
    }

    fn copy_buffer_to_surface(
        &mut self,
        buffer: &WgpuTransferBuffer,
        surface: &WgpuSurface,
        region: CopyRegion,
    ) -> AtlasResult<()> {
        let bytes_per_row = u32::try_from(region.bytes_per_row).map_err(|_| {
            AtlasError::Backend(format!("row stride {} too large", region.bytes_per_row))
        })?;

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Atlas Frame Upload"),
            });
        encoder.copy_buffer_to_texture(
            wgpu::ImageCopyBuffer {
                buffer: &buffer.buffer,
                layout: wgpu::ImageDataLayout {
                    offset: region.buffer_offset,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(region.height),
                },
            },
            wgpu::ImageCopyTexture {
                texture: &surface.texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: region.x,
                    y: region.y,
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::Extent3d {
                width: region.width,
                height: region.height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}
