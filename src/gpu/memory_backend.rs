//! Host memory backend
//!
//! Surfaces are plain byte arrays owned by the backend and copies run
//! immediately. Used for software rendering paths, offline atlas baking
//! and tests. Failure injection knobs let callers exercise rollback paths.

use super::{AtlasBackend, CopyRegion};
use crate::error::{AtlasError, AtlasResult, ErrorContext};
use crate::pixel_format::{bytes_per_pixel, PixelFormat, PixelType};
use image::RgbaImage;
use std::collections::HashMap;
use std::path::Path;

/// Row alignment used when none is given, matching the common unpack default
pub const DEFAULT_ROW_ALIGNMENT: u32 = 4;

/// Handle to a host surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemorySurface {
    pub id: u32,
}

/// Host transfer buffer
#[derive(Debug)]
pub struct MemoryBuffer {
    pub data: Vec<u8>,
    /// Currently mapped `(offset, size)`
    pub mapped: Option<(u64, u64)>,
}

struct SurfaceStorage {
    width: u32,
    height: u32,
    bytes_per_pixel: u32,
    format: PixelFormat,
    pixels: Vec<u8>,
}

/// Backend counters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryBackendStats {
    pub surfaces_allocated: u64,
    pub surfaces_live: usize,
    pub buffers_live: usize,
    pub maps: u64,
    pub discards: u64,
    pub copies: u64,
    pub bytes_copied: u64,
}

/// Backend keeping every surface in host memory
pub struct MemoryBackend {
    row_alignment: u32,
    surfaces: HashMap<u32, SurfaceStorage>,
    next_surface_id: u32,
    stats: MemoryBackendStats,
    /// Fail surface allocation once this many surfaces are live
    pub surface_limit: Option<usize>,
    /// Fail transfer buffer creation
    pub fail_buffers: bool,
    /// Fail every `map_range`
    pub fail_maps: bool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_row_alignment(DEFAULT_ROW_ALIGNMENT)
    }

    pub fn with_row_alignment(row_alignment: u32) -> Self {
        Self {
            row_alignment: row_alignment.max(1),
            surfaces: HashMap::new(),
            next_surface_id: 0,
            stats: MemoryBackendStats::default(),
            surface_limit: None,
            fail_buffers: false,
            fail_maps: false,
        }
    }

    pub fn stats(&self) -> &MemoryBackendStats {
        &self.stats
    }

    /// Raw pixels of a surface, rows tightly packed
    pub fn surface_pixels(&self, surface: &MemorySurface) -> Option<&[u8]> {
        self.surfaces
            .get(&surface.id)
            .map(|storage| storage.pixels.as_slice())
    }

    /// Copy of an RGBA8 surface as an image
    pub fn surface_image(&self, surface: &MemorySurface) -> Option<RgbaImage> {
        let storage = self.surfaces.get(&surface.id)?;
        if storage.format != PixelFormat::Rgba || storage.bytes_per_pixel != 4 {
            return None;
        }
        RgbaImage::from_raw(storage.width, storage.height, storage.pixels.clone())
    }

    /// Save an RGBA8 surface to an image file for debugging
    pub fn save_surface_debug(
        &self,
        surface: &MemorySurface,
        path: impl AsRef<Path>,
    ) -> AtlasResult<()> {
        let image = self
            .surface_image(surface)
            .ok_or_else(|| AtlasError::FormatMismatch {
                expected: "rgba/u8 surface".to_string(),
                actual: format!("surface {}", surface.id),
            })?;
        image
            .save(path.as_ref())
            .with_context(|| format!("saving surface {}", surface.id))
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AtlasBackend for MemoryBackend {
    type Surface = MemorySurface;
    type Buffer = MemoryBuffer;

    fn row_alignment(&self) -> u32 {
        self.row_alignment
    }

    fn supports_format(&self, _format: PixelFormat, _pixel_type: PixelType) -> bool {
        true
    }

    fn allocate_surface(
        &mut self,
        width: u32,
        height: u32,
        format: PixelFormat,
        pixel_type: PixelType,
    ) -> AtlasResult<MemorySurface> {
        if let Some(limit) = self.surface_limit {
            if self.surfaces.len() >= limit {
                return Err(AtlasError::SurfaceAllocationFailed {
                    width,
                    height,
                    reason: format!("surface limit of {} reached", limit),
                });
            }
        }

        let bpp = bytes_per_pixel(format, pixel_type);
        let size = width as usize * height as usize * bpp as usize;
        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(size)
            .map_err(|e| AtlasError::SurfaceAllocationFailed {
                width,
                height,
                reason: e.to_string(),
            })?;
        pixels.resize(size, 0);

        let id = self.next_surface_id;
        self.next_surface_id += 1;
        self.surfaces.insert(
            id,
            SurfaceStorage {
                width,
                height,
                bytes_per_pixel: bpp,
                format,
                pixels,
            },
        );
        self.stats.surfaces_allocated += 1;
        self.stats.surfaces_live = self.surfaces.len();

        Ok(MemorySurface { id })
    }

    fn release_surface(&mut self, surface: MemorySurface) {
        self.surfaces.remove(&surface.id);
        self.stats.surfaces_live = self.surfaces.len();
    }

    fn create_transfer_buffer(&mut self, size: u64) -> AtlasResult<MemoryBuffer> {
        if self.fail_buffers {
            return Err(AtlasError::BufferCreationFailed {
                size,
                reason: "buffer creation disabled".to_string(),
            });
        }

        let mut data = Vec::new();
        data.try_reserve_exact(size as usize)
            .map_err(|e| AtlasError::BufferCreationFailed {
                size,
                reason: e.to_string(),
            })?;
        data.resize(size as usize, 0);
        self.stats.buffers_live += 1;

        Ok(MemoryBuffer { data, mapped: None })
    }

    fn release_buffer(&mut self, buffer: MemoryBuffer) {
        drop(buffer);
        self.stats.buffers_live = self.stats.buffers_live.saturating_sub(1);
    }

    fn map_range<'b>(
        &mut self,
        buffer: &'b mut MemoryBuffer,
        offset: u64,
        size: u64,
        discard: bool,
    ) -> AtlasResult<&'b mut [u8]> {
        if self.fail_maps {
            return Err(AtlasError::MapFailed {
                offset,
                size,
                reason: "mapping disabled".to_string(),
            });
        }
        let end = offset + size;
        if end > buffer.data.len() as u64 {
            return Err(AtlasError::MapFailed {
                offset,
                size,
                reason: format!("range exceeds buffer of {} bytes", buffer.data.len()),
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
            buffer.data.fill(0);
            self.stats.discards += 1;
        }
        self.stats.maps += 1;
        buffer.mapped = Some((offset, size));

        Ok(&mut buffer.data[offset as usize..end as usize])
    }

    fn unmap(&mut self, buffer: &mut MemoryBuffer) -> AtlasResult<()> {
        buffer
            .mapped
            .take()
            .map(|_| ())
            .ok_or_else(|| AtlasError::Backend("unmap without a mapped range".to_string()))
    }

    fn copy_buffer_to_surface(
        &mut self,
        buffer: &MemoryBuffer,
        surface: &MemorySurface,
        region: CopyRegion,
    ) -> AtlasResult<()> {
        let storage = self
            .surfaces
            .get_mut(&surface.id)
            .ok_or_else(|| AtlasError::Backend(format!("unknown surface {}", surface.id)))?;

        if region.x + region.width > storage.width || region.y + region.height > storage.height {
            return Err(AtlasError::Backend(format!(
                "copy region {:?} exceeds {}x{} surface",
                region, storage.width, storage.height
            )));
        }

        let bpp = storage.bytes_per_pixel as usize;
        let row_len = region.width as usize * bpp;
        let end = region.buffer_offset + region.bytes_per_row * region.height as u64;
        if end > buffer.data.len() as u64 || (region.bytes_per_row as usize) < row_len {
            return Err(AtlasError::Backend(format!(
                "copy region {:?} exceeds transfer buffer of {} bytes",
                region,
                buffer.data.len()
            )));
        }

        for row in 0..region.height as usize {
            let src = region.buffer_offset as usize + row * region.bytes_per_row as usize;
            let dst =
                ((region.y as usize + row) * storage.width as usize + region.x as usize) * bpp;
            storage.pixels[dst..dst + row_len].copy_from_slice(&buffer.data[src..src + row_len]);
        }

        self.stats.copies += 1;
        self.stats.bytes_copied += region.size;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_lifecycle() {
        let mut backend = MemoryBackend::new();
        let surface = backend
            .allocate_surface(4, 2, PixelFormat::Rgba, PixelType::U8)
            .expect("Failed to allocate surface");
        assert_eq!(backend.surface_pixels(&surface).map(|p| p.len()), Some(32));
        assert_eq!(backend.stats().surfaces_live, 1);

        backend.release_surface(surface);
        assert_eq!(backend.stats().surfaces_live, 0);
        assert!(backend.surface_pixels(&surface).is_none());
    }

    #[test]
    fn test_surface_limit() {
        let mut backend = MemoryBackend::new();
        backend.surface_limit = Some(1);
        backend
            .allocate_surface(4, 4, PixelFormat::R, PixelType::U8)
            .expect("first surface fits the limit");
        let result = backend.allocate_surface(4, 4, PixelFormat::R, PixelType::U8);
        assert!(matches!(
            result,
            Err(AtlasError::SurfaceAllocationFailed { .. })
        ));
    }

    #[test]
    fn test_map_copy_roundtrip() {
        let mut backend = MemoryBackend::new();
        let surface = backend
            .allocate_surface(4, 4, PixelFormat::R, PixelType::U8)
            .expect("Failed to allocate surface");
        let mut buffer = backend
            .create_transfer_buffer(64)
            .expect("Failed to create buffer");

        // 3x2 region, rows padded to 4 bytes
        let mapped = backend
            .map_range(&mut buffer, 8, 8, false)
            .expect("Failed to map");
        mapped.copy_from_slice(&[1, 2, 3, 0, 4, 5, 6, 0]);
        backend.unmap(&mut buffer).expect("Failed to unmap");

        backend
            .copy_buffer_to_surface(
                &buffer,
                &surface,
                CopyRegion {
                    x: 1,
                    y: 2,
                    width: 3,
                    height: 2,
                    buffer_offset: 8,
                    bytes_per_row: 4,
                    size: 8,
                },
            )
            .expect("Failed to copy");

        let pixels = backend.surface_pixels(&surface).expect("surface exists");
        assert_eq!(&pixels[8..12], &[0, 1, 2, 3]);
        assert_eq!(&pixels[12..16], &[0, 4, 5, 6]);
        assert_eq!(&pixels[0..8], &[0; 8]);
        assert_eq!(backend.stats().copies, 1);
    }

    #[test]
    fn test_double_map_fails() {
        let mut backend = MemoryBackend::new();
        let mut buffer = backend
            .create_transfer_buffer(16)
            .expect("Failed to create buffer");
        backend
            .map_range(&mut buffer, 0, 4, false)
            .expect("Failed to map");
        assert!(backend.map_range(&mut buffer, 4, 4, false).is_err());
        backend.unmap(&mut buffer).expect("Failed to unmap");
        assert!(backend.unmap(&mut buffer).is_err());
    }

    #[test]
    fn test_map_out_of_range() {
        let mut backend = MemoryBackend::new();
        let mut buffer = backend
            .create_transfer_buffer(16)
            .expect("Failed to create buffer");
        assert!(matches!(
            backend.map_range(&mut buffer, 12, 8, false),
            Err(AtlasError::MapFailed { .. })
        ));
    }

    #[test]
    fn test_discard_counts() {
        let mut backend = MemoryBackend::new();
        let mut buffer = backend
            .create_transfer_buffer(16)
            .expect("Failed to create buffer");
        backend
            .map_range(&mut buffer, 0, 4, true)
            .expect("Failed to map");
        backend.unmap(&mut buffer).expect("Failed to unmap");
        assert_eq!(backend.stats().discards, 1);
        assert_eq!(backend.stats().maps, 1);
    }

    #[test]
    fn test_save_surface_debug() {
        let mut backend = MemoryBackend::new();
        let surface = backend
            .allocate_surface(8, 8, PixelFormat::Rgba, PixelType::U8)
            .expect("Failed to allocate surface");
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("page.png");

        backend
            .save_surface_debug(&surface, &path)
            .expect("Failed to save surface");
        assert!(path.exists());

        let missing = dir.path().join("missing").join("page.png");
        assert!(matches!(
            backend.save_surface_debug(&surface, &missing),
            Err(AtlasError::Internal { .. })
        ));

        let gray = backend
            .allocate_surface(8, 8, PixelFormat::R, PixelType::U8)
            .expect("Failed to allocate surface");
        assert!(backend.surface_image(&gray).is_none());
    }
}
