//! Atlas Data - Pure DOP
//!
//! NO METHODS. Just data.
//! All transformations happen in atlas_operations.rs and transfer_operations.rs

use super::entry_data::{AtlasEntry, FrameRect};
use super::name_index_data::NameIndexData;
use crate::config::AtlasConfig;
use crate::gpu::AtlasBackend;
use crate::packer::PackerData;
use cgmath::Vector2;
use parking_lot::Mutex;
use std::sync::Arc;

/// Entry storage doubles below this many entries and grows linearly above it
pub const ATLAS_ENTRY_GROW_LIMIT: usize = 512;
/// Page slots added each time page storage fills up (also the initial capacity)
pub const ATLAS_PAGE_CAPACITY_STEP: usize = 4;
/// Rectangle capacity hint for the packer of a new page
pub const ATLAS_PAGE_PACKER_CAPACITY: usize = 64;

/// Circular streaming buffer with one monotonically advancing write offset
pub struct TransferStream<Buf> {
    pub buffer: Buf,
    /// Total size of the buffer in bytes
    pub capacity: u64,
    /// Next write position; wraps to 0 (with discard) when a write would overflow
    pub offset: u64,
}

/// Multi-page texture atlas
///
/// While authoring, `packers` holds one packer per page and `transfer` the
/// streaming buffer. Freezing drops both; entries and pages stay queryable.
pub struct AtlasData<B: AtlasBackend> {
    pub config: AtlasConfig,
    pub entries: Vec<AtlasEntry>,
    pub names: NameIndexData,
    pub pages: Vec<B::Surface>,
    /// `None` once frozen
    pub packers: Option<Vec<PackerData>>,
    /// `None` once frozen
    pub transfer: Option<TransferStream<B::Buffer>>,
    pub backend: B,
}

/// Atlas shared between threads; all access is serialized by the mutex
pub type SharedAtlas<B> = Arc<Mutex<AtlasData<B>>>;

/// Where a frame landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePlacement {
    pub page: u32,
    pub rect: FrameRect,
}

/// UV coordinates of a frame within its page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtlasUV {
    pub page: u32,
    pub min: Vector2<f32>,
    pub max: Vector2<f32>,
}

/// Atlas statistics
#[derive(Debug, Clone, PartialEq)]
pub struct AtlasStats {
    pub page_count: usize,
    pub page_capacity: usize,
    pub entry_count: usize,
    pub placed_frames: usize,
    pub bucket_count: usize,
    pub longest_bucket: usize,
    pub frozen: bool,
    /// Content pixels of all placed frames
    pub placed_area: u64,
    /// Percentage of total page area covered by placed frames
    pub utilization: f32,
}
