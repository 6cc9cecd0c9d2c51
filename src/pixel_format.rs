//! Pixel format description for atlas pages
//!
//! A page format is a channel layout plus a per-channel data type. The
//! streaming upload path only needs byte sizes out of it: bytes per pixel,
//! row stride under the backend's row alignment, and the byte size of a
//! rectangular region.

use serde::{Deserialize, Serialize};

/// Channel layout of an atlas page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    R,
    Rg,
    Rgb,
    Rgba,
    Bgra,
}

/// Per-channel data type of an atlas page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelType {
    U8,
    U16,
    F16,
    F32,
}

/// Number of channels in a format
pub fn channel_count(format: PixelFormat) -> u32 {
    match format {
        PixelFormat::R => 1,
        PixelFormat::Rg => 2,
        PixelFormat::Rgb => 3,
        PixelFormat::Rgba | PixelFormat::Bgra => 4,
    }
}

/// Size of one channel in bytes
pub fn channel_size(pixel_type: PixelType) -> u32 {
    match pixel_type {
        PixelType::U8 => 1,
        PixelType::U16 | PixelType::F16 => 2,
        PixelType::F32 => 4,
    }
}

/// Size of one pixel in bytes
pub fn bytes_per_pixel(format: PixelFormat, pixel_type: PixelType) -> u32 {
    channel_count(format) * channel_size(pixel_type)
}

/// Round `value` up to a multiple of `alignment` (alignment 0 or 1 is a no-op)
pub fn align_up(value: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        return value;
    }
    value.div_ceil(alignment) * alignment
}

/// Tightly packed row size in bytes
pub fn row_bytes(width: u32, format: PixelFormat, pixel_type: PixelType) -> u64 {
    width as u64 * bytes_per_pixel(format, pixel_type) as u64
}

/// Row stride in bytes once padded to the backend row alignment
pub fn row_stride(width: u32, format: PixelFormat, pixel_type: PixelType, alignment: u32) -> u64 {
    align_up(row_bytes(width, format, pixel_type), alignment as u64)
}

/// Byte size of a `width` x `height` region laid out with aligned rows
pub fn region_size(
    width: u32,
    height: u32,
    format: PixelFormat,
    pixel_type: PixelType,
    alignment: u32,
) -> u64 {
    row_stride(width, format, pixel_type, alignment) * height as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_per_pixel() {
        assert_eq!(bytes_per_pixel(PixelFormat::Rgba, PixelType::U8), 4);
        assert_eq!(bytes_per_pixel(PixelFormat::Rgb, PixelType::U8), 3);
        assert_eq!(bytes_per_pixel(PixelFormat::Rg, PixelType::F16), 4);
        assert_eq!(bytes_per_pixel(PixelFormat::Rgba, PixelType::F32), 16);
    }

    #[test]
    fn test_row_stride_alignment() {
        // 5 RGB pixels = 15 bytes, padded to 16 under 4-byte alignment
        assert_eq!(row_stride(5, PixelFormat::Rgb, PixelType::U8, 4), 16);
        assert_eq!(row_stride(5, PixelFormat::Rgb, PixelType::U8, 1), 15);
        assert_eq!(row_stride(64, PixelFormat::Rgba, PixelType::U8, 256), 256);
        assert_eq!(row_stride(65, PixelFormat::Rgba, PixelType::U8, 256), 512);
    }

    #[test]
    fn test_region_size() {
        assert_eq!(region_size(64, 64, PixelFormat::Rgba, PixelType::U8, 4), 16384);
        assert_eq!(region_size(3, 2, PixelFormat::R, PixelType::U8, 4), 8);
    }
}
