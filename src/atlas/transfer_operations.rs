//! Transfer Operations - streaming pixel upload
//!
//! All uploads go through one circular transfer buffer. Each upload maps just
//! the range it needs at the current offset. When the next upload would run
//! past the end, the offset wraps to 0 and the map asks the backend to discard
//! the old contents, so the write never waits on copies still in flight.

use super::atlas_data::AtlasData;
use super::entry_operations::entry_frame;
use crate::error::{AtlasError, AtlasResult, OptionExt};
use crate::gpu::{AtlasBackend, CopyRegion};
use crate::pixel_format::{row_bytes, row_stride, PixelFormat, PixelType};
use image::RgbaImage;

/// Upload the pixels of a placed frame.
///
/// `pixels` holds tightly packed rows (`width * bytes_per_pixel` bytes each);
/// they are re-strided to the backend row alignment on the way in.
pub fn transfer_frame<B: AtlasBackend>(
    data: &mut AtlasData<B>,
    entry_index: usize,
    frame: usize,
    pixels: &[u8],
) -> AtlasResult<()> {
    let stream = data.transfer.as_mut().ok_or_else(|| AtlasError::AtlasFrozen {
        operation: "transfer frame".to_string(),
    })?;

    let entry = data
        .entries
        .get(entry_index)
        .ok_or(AtlasError::EntryNotFound { index: entry_index })?;
    if frame >= entry.frame_count as usize {
        return Err(AtlasError::FrameOutOfRange {
            frame,
            frame_count: entry.frame_count as usize,
        });
    }
    let (page, rect) = entry_frame(entry, frame).ok_or(AtlasError::FrameNotPlaced {
        entry: entry_index,
        frame,
    })?;
    let surface = data
        .pages
        .get(page as usize)
        .ok_or_atlas(|| AtlasError::Internal {
            message: format!("entry {} references missing page {}", entry_index, page),
        })?;

    let format = data.config.format;
    let pixel_type = data.config.pixel_type;
    let row_len = row_bytes(rect.width, format, pixel_type) as usize;
    let stride = row_stride(rect.width, format, pixel_type, data.backend.row_alignment());
    let size = stride * rect.height as u64;

    let expected = row_len * rect.height as usize;
    if pixels.len() < expected {
        return Err(AtlasError::InvalidPixelData {
            expected,
            actual: pixels.len(),
        });
    }
    if size == 0 {
        return Ok(());
    }

    let discard = stream.offset + size > stream.capacity;
    let offset = if discard { 0 } else { stream.offset };

    let mapped = data
        .backend
        .map_range(&mut stream.buffer, offset, size, discard)
        .map_err(|e| {
            log::warn!(
                "[transfer_operations::transfer_frame] Map of {} bytes at {} failed: {}",
                size,
                offset,
                e
            );
            e
        })?;
    for (row, src) in pixels[..expected].chunks_exact(row_len).enumerate() {
        let dst = row * stride as usize;
        mapped[dst..dst + row_len].copy_from_slice(src);
    }
    data.backend.unmap(&mut stream.buffer)?;

    data.backend.copy_buffer_to_surface(
        &stream.buffer,
        surface,
        CopyRegion {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            buffer_offset: offset,
            bytes_per_row: stride,
            size,
        },
    )?;

    if discard {
        log::debug!(
            "[transfer_operations::transfer_frame] Transfer buffer wrapped at {} of {} bytes, orphaned",
            stream.offset,
            stream.capacity
        );
    }
    stream.offset = offset + size;

    Ok(())
}

/// Upload a frame from typed pixels, e.g. `[u8; 4]` or `f32` texels
pub fn transfer_frame_pod<B: AtlasBackend, T: bytemuck::Pod>(
    data: &mut AtlasData<B>,
    entry_index: usize,
    frame: usize,
    pixels: &[T],
) -> AtlasResult<()> {
    transfer_frame(data, entry_index, frame, bytemuck::cast_slice(pixels))
}

/// Upload a frame of an RGBA8 atlas from an image of the frame's exact size
pub fn transfer_frame_image<B: AtlasBackend>(
    data: &mut AtlasData<B>,
    entry_index: usize,
    frame: usize,
    image: &RgbaImage,
) -> AtlasResult<()> {
    if data.config.format != PixelFormat::Rgba || data.config.pixel_type != PixelType::U8 {
        return Err(AtlasError::FormatMismatch {
            expected: "Rgba/U8 atlas".to_string(),
            actual: format!("{:?}/{:?} atlas", data.config.format, data.config.pixel_type),
        });
    }

    let placed = data
        .entries
        .get(entry_index)
        .and_then(|entry| entry_frame(entry, frame));
    if let Some((_, rect)) = placed {
        if image.dimensions() != (rect.width, rect.height) {
            return Err(AtlasError::FormatMismatch {
                expected: format!("{}x{} image", rect.width, rect.height),
                actual: format!("{}x{} image", image.width(), image.height()),
            });
        }
    }

    transfer_frame(data, entry_index, frame, image.as_raw())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::atlas_operations::{
        add_named_entry, create_atlas, freeze_atlas, place_frame,
    };
    use crate::config::AtlasConfig;
    use crate::gpu::MemoryBackend;
    use image::Rgba;

    fn config(size: u32, padding: u32, format: PixelFormat) -> AtlasConfig {
        AtlasConfig {
            page_width: size,
            page_height: size,
            horizontal_padding: padding,
            vertical_padding: padding,
            expected_entries: 16,
            format,
            pixel_type: PixelType::U8,
        }
    }

    fn surface_bytes(atlas: &AtlasData<MemoryBackend>, page: usize) -> Vec<u8> {
        atlas
            .backend
            .surface_pixels(&atlas.pages[page])
            .expect("page surface exists")
            .to_vec()
    }

    #[test]
    fn test_pixels_land_in_frame_rect() {
        let mut atlas = create_atlas(config(256, 2, PixelFormat::Rgba), MemoryBackend::new())
            .expect("Failed to create atlas");
        let index = add_named_entry(&mut atlas, "tile", 1).expect("Failed to add entry");
        place_frame(&mut atlas, index, 0, 4, 2).expect("Failed to place");

        let pixels: Vec<u8> = (1..=32).collect();
        transfer_frame(&mut atlas, index, 0, &pixels).expect("Failed to transfer");

        let page = surface_bytes(&atlas, 0);
        let row0 = (2 * 256 + 2) * 4;
        let row1 = (3 * 256 + 2) * 4;
        assert_eq!(&page[row0..row0 + 16], &pixels[0..16]);
        assert_eq!(&page[row1..row1 + 16], &pixels[16..32]);
        // Padding stays untouched
        assert_eq!(&page[row0 - 4..row0], &[0; 4]);

        assert_eq!(atlas.transfer.as_ref().map(|s| s.offset), Some(32));
        assert_eq!(atlas.backend.stats().copies, 1);
    }

    #[test]
    fn test_rows_restrided_to_alignment() {
        let mut atlas = create_atlas(config(16, 0, PixelFormat::Rgb), MemoryBackend::new())
            .expect("Failed to create atlas");
        let index = add_named_entry(&mut atlas, "rgb", 1).expect("Failed to add entry");
        let placement = place_frame(&mut atlas, index, 0, 3, 2).expect("Failed to place");
        assert_eq!((placement.rect.x, placement.rect.y), (0, 0));

        // 9 bytes per row, stride 12
        let pixels: Vec<u8> = (1..=18).collect();
        transfer_frame(&mut atlas, index, 0, &pixels).expect("Failed to transfer");

        let page = surface_bytes(&atlas, 0);
        assert_eq!(&page[0..9], &pixels[0..9]);
        assert_eq!(&page[16 * 3..16 * 3 + 9], &pixels[9..18]);
        assert_eq!(atlas.transfer.as_ref().map(|s| s.offset), Some(24));
    }

    #[test]
    fn test_wraparound_discards_buffer() {
        // 8x8 RGBA page: 256 byte transfer buffer, 128 bytes per 8x4 frame
        let mut atlas = create_atlas(config(8, 0, PixelFormat::Rgba), MemoryBackend::new())
            .expect("Failed to create atlas");
        assert_eq!(atlas.transfer.as_ref().map(|s| s.capacity), Some(256));

        let index = add_named_entry(&mut atlas, "strip", 2).expect("Failed to add entry");
        place_frame(&mut atlas, index, 0, 8, 4).expect("Failed to place");
        place_frame(&mut atlas, index, 1, 8, 4).expect("Failed to place");

        transfer_frame(&mut atlas, index, 0, &[1; 128]).expect("Failed to transfer");
        transfer_frame(&mut atlas, index, 1, &[2; 128]).expect("Failed to transfer");
        assert_eq!(atlas.transfer.as_ref().map(|s| s.offset), Some(256));
        assert_eq!(atlas.backend.stats().discards, 0);

        transfer_frame(&mut atlas, index, 0, &[3; 128]).expect("Failed to transfer");
        assert_eq!(atlas.transfer.as_ref().map(|s| s.offset), Some(128));
        assert_eq!(atlas.backend.stats().discards, 1);
        assert_eq!(atlas.backend.stats().maps, 3);

        let page = surface_bytes(&atlas, 0);
        assert!(page[..128].iter().all(|&b| b == 3));
        assert!(page[128..].iter().all(|&b| b == 2));
    }

    #[test]
    fn test_failed_map_keeps_offset() {
        let mut atlas = create_atlas(config(64, 1, PixelFormat::Rgba), MemoryBackend::new())
            .expect("Failed to create atlas");
        let index = add_named_entry(&mut atlas, "tile", 1).expect("Failed to add entry");
        place_frame(&mut atlas, index, 0, 4, 4).expect("Failed to place");
        transfer_frame(&mut atlas, index, 0, &[1; 64]).expect("Failed to transfer");

        atlas.backend.fail_maps = true;
        assert!(matches!(
            transfer_frame(&mut atlas, index, 0, &[2; 64]),
            Err(AtlasError::MapFailed { .. })
        ));
        assert_eq!(atlas.transfer.as_ref().map(|s| s.offset), Some(64));
        assert_eq!(atlas.backend.stats().copies, 1);

        // The stream recovers once mapping works again
        atlas.backend.fail_maps = false;
        transfer_frame(&mut atlas, index, 0, &[3; 64]).expect("Failed to transfer");
        assert_eq!(atlas.transfer.as_ref().map(|s| s.offset), Some(128));
        let page = surface_bytes(&atlas, 0);
        let row0 = (64 + 1) * 4;
        assert_eq!(&page[row0..row0 + 16], &[3; 16]);
    }

    #[test]
    fn test_short_pixel_data_rejected() {
        let mut atlas = create_atlas(config(64, 1, PixelFormat::Rgba), MemoryBackend::new())
            .expect("Failed to create atlas");
        let index = add_named_entry(&mut atlas, "tile", 1).expect("Failed to add entry");
        place_frame(&mut atlas, index, 0, 4, 4).expect("Failed to place");

        let result = transfer_frame(&mut atlas, index, 0, &[0; 63]);
        assert!(matches!(
            result,
            Err(AtlasError::InvalidPixelData {
                expected: 64,
                actual: 63
            })
        ));
        assert_eq!(atlas.transfer.as_ref().map(|s| s.offset), Some(0));
        assert_eq!(atlas.backend.stats().maps, 0);
    }

    #[test]
    fn test_unplaced_and_frozen() {
        let mut atlas = create_atlas(config(64, 1, PixelFormat::Rgba), MemoryBackend::new())
            .expect("Failed to create atlas");
        let index = add_named_entry(&mut atlas, "tile", 2).expect("Failed to add entry");
        place_frame(&mut atlas, index, 0, 4, 4).expect("Failed to place");

        assert!(matches!(
            transfer_frame(&mut atlas, index, 1, &[0; 64]),
            Err(AtlasError::FrameNotPlaced { frame: 1, .. })
        ));
        assert!(matches!(
            transfer_frame(&mut atlas, index, 2, &[0; 64]),
            Err(AtlasError::FrameOutOfRange { .. })
        ));

        freeze_atlas(&mut atlas);
        assert!(matches!(
            transfer_frame(&mut atlas, index, 0, &[0; 64]),
            Err(AtlasError::AtlasFrozen { .. })
        ));
    }

    #[test]
    fn test_transfer_pod_pixels() {
        let mut atlas = create_atlas(config(32, 0, PixelFormat::Rgba), MemoryBackend::new())
            .expect("Failed to create atlas");
        let index = add_named_entry(&mut atlas, "pod", 1).expect("Failed to add entry");
        place_frame(&mut atlas, index, 0, 2, 1).expect("Failed to place");

        let texels: [[u8; 4]; 2] = [[10, 20, 30, 40], [50, 60, 70, 80]];
        transfer_frame_pod(&mut atlas, index, 0, &texels).expect("Failed to transfer");

        let page = surface_bytes(&atlas, 0);
        assert_eq!(&page[0..8], &[10, 20, 30, 40, 50, 60, 70, 80]);
    }

    #[test]
    fn test_transfer_image() {
        let mut atlas = create_atlas(config(64, 1, PixelFormat::Rgba), MemoryBackend::new())
            .expect("Failed to create atlas");
        let index = add_named_entry(&mut atlas, "red", 1).expect("Failed to add entry");
        place_frame(&mut atlas, index, 0, 4, 4).expect("Failed to place");

        let wrong = RgbaImage::from_pixel(2, 8, Rgba([255, 0, 0, 255]));
        assert!(matches!(
            transfer_frame_image(&mut atlas, index, 0, &wrong),
            Err(AtlasError::FormatMismatch { .. })
        ));

        let red = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
        transfer_frame_image(&mut atlas, index, 0, &red).expect("Failed to transfer");

        let page = atlas
            .backend
            .surface_image(&atlas.pages[0])
            .expect("rgba page");
        assert_eq!(page.get_pixel(1, 1), &Rgba([255, 0, 0, 255]));
        assert_eq!(page.get_pixel(4, 4), &Rgba([255, 0, 0, 255]));
        assert_eq!(page.get_pixel(5, 5), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_transfer_image_requires_rgba8() {
        let mut atlas = create_atlas(config(64, 1, PixelFormat::R), MemoryBackend::new())
            .expect("Failed to create atlas");
        let index = add_named_entry(&mut atlas, "gray", 1).expect("Failed to add entry");
        place_frame(&mut atlas, index, 0, 4, 4).expect("Failed to place");

        let image = RgbaImage::new(4, 4);
        assert!(matches!(
            transfer_frame_image(&mut atlas, index, 0, &image),
            Err(AtlasError::FormatMismatch { .. })
        ));
    }
}
