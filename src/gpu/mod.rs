//! Backend seam for the atlas engine
//!
//! The atlas never talks to a graphics API directly. It needs three things
//! from whatever sits underneath:
//!
//! - surface allocation: blank 2D images of a fixed size and format
//! - streaming transfer: a byte buffer that can be mapped range by range,
//!   optionally discarding its previous contents, plus an asynchronous
//!   buffer-to-surface copy
//! - the row alignment the platform requires for pixel rows

pub mod memory_backend;
#[cfg(feature = "wgpu-backend")]
pub mod wgpu_backend;

pub use memory_backend::{MemoryBackend, MemoryBackendStats, MemoryBuffer, MemorySurface};
#[cfg(feature = "wgpu-backend")]
pub use wgpu_backend::{WgpuBackend, WgpuSurface, WgpuTransferBuffer};

use crate::error::AtlasResult;
use crate::pixel_format::{PixelFormat, PixelType};

/// Source range and destination rectangle of one buffer-to-surface copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Start of the pixel data inside the transfer buffer
    pub buffer_offset: u64,
    /// Row stride inside the transfer buffer, already aligned
    pub bytes_per_row: u64,
    /// Total bytes covered by the copy
    pub size: u64,
}

/// Surface allocation and streaming transfer capabilities
pub trait AtlasBackend {
    /// Handle of one page image
    type Surface;
    /// Handle of the streaming transfer buffer
    type Buffer;

    /// Required byte alignment of pixel rows in a transfer buffer
    fn row_alignment(&self) -> u32;

    fn supports_format(&self, format: PixelFormat, pixel_type: PixelType) -> bool;

    fn allocate_surface(
        &mut self,
        width: u32,
        height: u32,
        format: PixelFormat,
        pixel_type: PixelType,
    ) -> AtlasResult<Self::Surface>;

    fn release_surface(&mut self, surface: Self::Surface);

    fn create_transfer_buffer(&mut self, size: u64) -> AtlasResult<Self::Buffer>;

    fn release_buffer(&mut self, buffer: Self::Buffer);

    /// Map `size` bytes at `offset` for writing. With `discard`, the previous
    /// contents of the whole buffer may be thrown away (orphaned) instead of
    /// waiting for in-flight copies that still read them.
    fn map_range<'b>(
        &mut self,
        buffer: &'b mut Self::Buffer,
        offset: u64,
        size: u64,
        discard: bool,
    ) -> AtlasResult<&'b mut [u8]>;

    /// Finish writing the range returned by the last `map_range`
    fn unmap(&mut self, buffer: &mut Self::Buffer) -> AtlasResult<()>;

    /// Queue a copy from the buffer into a surface. Returns once queued;
    /// copies to one surface execute in submission order.
    fn copy_buffer_to_surface(
        &mut self,
        buffer: &Self::Buffer,
        surface: &Self::Surface,
        region: CopyRegion,
    ) -> AtlasResult<()>;
}
