//! Atlas Operations - Pure DOP Functions
//!
//! Lifecycle: `create_atlas` -> `add_entry` / `place_frame` / `transfer_frame`
//! while authoring -> optional `freeze_atlas` -> `destroy_atlas` (or drop).
//! After freezing only lookups and queries succeed.
//!
//! Nothing here locks. Callers serialize access to one atlas, e.g. by keeping
//! it on a loader thread or wrapping it in a [`SharedAtlas`].

use super::atlas_data::{
    AtlasData, AtlasStats, AtlasUV, FramePlacement, SharedAtlas, TransferStream,
    ATLAS_ENTRY_GROW_LIMIT, ATLAS_PAGE_CAPACITY_STEP, ATLAS_PAGE_PACKER_CAPACITY,
};
use super::entry_data::{AtlasEntry, FrameRect, UNPLACED_PAGE};
use super::entry_operations::{
    create_atlas_entry, delete_atlas_entry, entry_frame, entry_frames, entry_pages,
    set_entry_frame,
};
use super::name_index_operations::{
    create_name_index, insert_name, longest_bucket, lookup_name, name_hash,
};
use crate::config::AtlasConfig;
use crate::error::{AtlasError, AtlasResult};
use crate::gpu::AtlasBackend;
use crate::packer::{create_packer, delete_packer, insert_rect, PackerRect};
use crate::pixel_format::region_size;
use cgmath::Vector2;
use parking_lot::Mutex;
use std::sync::Arc;

/// Create an atlas. Either everything is allocated or nothing is.
pub fn create_atlas<B: AtlasBackend>(
    config: AtlasConfig,
    mut backend: B,
) -> AtlasResult<AtlasData<B>> {
    config.validate()?;
    if !backend.supports_format(config.format, config.pixel_type) {
        return Err(AtlasError::UnsupportedFormat {
            format: config.format,
            pixel_type: config.pixel_type,
        });
    }

    let names = create_name_index(config.expected_entries)?;

    let entry_slots = (config.expected_entries as usize).max(1);
    let mut entries = Vec::new();
    entries
        .try_reserve_exact(entry_slots)
        .map_err(|_| AtlasError::AllocationFailed {
            what: "atlas entries".to_string(),
            requested: entry_slots,
        })?;

    let mut pages = Vec::new();
    let mut packers = Vec::new();
    if pages.try_reserve_exact(ATLAS_PAGE_CAPACITY_STEP).is_err()
        || packers.try_reserve_exact(ATLAS_PAGE_CAPACITY_STEP).is_err()
    {
        return Err(AtlasError::AllocationFailed {
            what: "atlas pages".to_string(),
            requested: ATLAS_PAGE_CAPACITY_STEP,
        });
    }

    // One full page image, rows at the platform alignment
    let capacity = region_size(
        config.page_width,
        config.page_height,
        config.format,
        config.pixel_type,
        backend.row_alignment(),
    );
    let buffer = backend.create_transfer_buffer(capacity).map_err(|e| {
        log::warn!(
            "[atlas_operations::create] Transfer buffer of {} bytes failed: {}",
            capacity,
            e
        );
        e
    })?;

    log::info!(
        "[atlas_operations::create] Created {}x{} {:?}/{:?} atlas (padding {}x{}, {} buckets, {} byte transfer buffer)",
        config.page_width,
        config.page_height,
        config.format,
        config.pixel_type,
        config.horizontal_padding,
        config.vertical_padding,
        names.buckets.len(),
        capacity
    );

    Ok(AtlasData {
        config,
        entries,
        names,
        pages,
        packers: Some(packers),
        transfer: Some(TransferStream {
            buffer,
            capacity,
            offset: 0,
        }),
        backend,
    })
}

/// Create an atlas behind a mutex so several threads can share it
pub fn create_shared_atlas<B: AtlasBackend>(
    config: AtlasConfig,
    backend: B,
) -> AtlasResult<SharedAtlas<B>> {
    Ok(Arc::new(Mutex::new(create_atlas(config, backend)?)))
}

/// Release every resource: transfer buffer, page surfaces, packers, entries, name index
pub fn destroy_atlas<B: AtlasBackend>(data: AtlasData<B>) {
    log::info!(
        "[atlas_operations::destroy] Destroying atlas ({} pages, {} entries)",
        data.pages.len(),
        data.entries.len()
    );
    drop(data);
}

fn release_atlas_resources<B: AtlasBackend>(data: &mut AtlasData<B>) {
    if let Some(stream) = data.transfer.take() {
        data.backend.release_buffer(stream.buffer);
    }
    for surface in data.pages.drain(..) {
        data.backend.release_surface(surface);
    }
    if let Some(packers) = data.packers.take() {
        for packer in packers {
            delete_packer(packer);
        }
    }
    for entry in data.entries.drain(..) {
        delete_atlas_entry(entry);
    }
    data.names.buckets.clear();
    data.names.count = 0;
}

impl<B: AtlasBackend> Drop for AtlasData<B> {
    fn drop(&mut self) {
        release_atlas_resources(self);
    }
}

pub fn is_frozen<B: AtlasBackend>(data: &AtlasData<B>) -> bool {
    data.packers.is_none()
}

/// Add a new entry named by a 32-bit hash. Returns its index.
pub fn add_entry<B: AtlasBackend>(
    data: &mut AtlasData<B>,
    name: u32,
    frame_count: u32,
) -> AtlasResult<usize> {
    if is_frozen(data) {
        return Err(AtlasError::AtlasFrozen {
            operation: "add entry".to_string(),
        });
    }

    let entry = create_atlas_entry(name, frame_count)?;

    let len = data.entries.len();
    if len == data.entries.capacity() {
        let capacity = len.max(1);
        let grown = if capacity < ATLAS_ENTRY_GROW_LIMIT {
            capacity * 2
        } else {
            capacity + ATLAS_ENTRY_GROW_LIMIT
        };
        data.entries
            .try_reserve_exact(grown - len)
            .map_err(|_| AtlasError::AllocationFailed {
                what: "atlas entries".to_string(),
                requested: grown,
            })?;
    }

    let index = len;
    insert_name(&mut data.names, name, index as u32)?;
    data.entries.push(entry);
    Ok(index)
}

/// Add a new entry named by a string
pub fn add_named_entry<B: AtlasBackend>(
    data: &mut AtlasData<B>,
    name: &str,
    frame_count: u32,
) -> AtlasResult<usize> {
    add_entry(data, name_hash(name), frame_count)
}

/// Index of the entry registered under `name`
pub fn find_entry_index<B: AtlasBackend>(data: &AtlasData<B>, name: u32) -> Option<usize> {
    lookup_name(&data.names, name).map(|index| index as usize)
}

/// Entry registered under `name`
pub fn find_entry<B: AtlasBackend>(data: &AtlasData<B>, name: u32) -> Option<&AtlasEntry> {
    find_entry_index(data, name).and_then(|index| data.entries.get(index))
}

/// Entry registered under a string name
pub fn find_named_entry<'a, B: AtlasBackend>(
    data: &'a AtlasData<B>,
    name: &str,
) -> Option<&'a AtlasEntry> {
    find_entry(data, name_hash(name))
}

pub fn get_entry<B: AtlasBackend>(data: &AtlasData<B>, index: usize) -> Option<&AtlasEntry> {
    data.entries.get(index)
}

pub fn entry_count<B: AtlasBackend>(data: &AtlasData<B>) -> usize {
    data.entries.len()
}

pub fn page_count<B: AtlasBackend>(data: &AtlasData<B>) -> usize {
    data.pages.len()
}

/// Page surfaces, indexed by page id
pub fn page_surfaces<B: AtlasBackend>(data: &AtlasData<B>) -> &[B::Surface] {
    &data.pages
}

pub fn backend<B: AtlasBackend>(data: &AtlasData<B>) -> &B {
    &data.backend
}

pub fn backend_mut<B: AtlasBackend>(data: &mut AtlasData<B>) -> &mut B {
    &mut data.backend
}

/// Place a frame using the atlas padding
pub fn place_frame<B: AtlasBackend>(
    data: &mut AtlasData<B>,
    entry_index: usize,
    frame: usize,
    width: u32,
    height: u32,
) -> AtlasResult<FramePlacement> {
    let hpad = data.config.horizontal_padding;
    let vpad = data.config.vertical_padding;
    place_frame_padded(data, entry_index, frame, width, height, hpad, vpad)
}

/// Place a frame with explicit padding.
///
/// Existing pages are tried newest first. If none has room, a new page is
/// allocated; if that fails, the partially created page is released and the
/// atlas is left as it was.
pub fn place_frame_padded<B: AtlasBackend>(
    data: &mut AtlasData<B>,
    entry_index: usize,
    frame: usize,
    width: u32,
    height: u32,
    hpad: u32,
    vpad: u32,
) -> AtlasResult<FramePlacement> {
    let page_width = data.config.page_width;
    let page_height = data.config.page_height;

    let packers = data.packers.as_mut().ok_or_else(|| AtlasError::AtlasFrozen {
        operation: "place frame".to_string(),
    })?;

    let padded_width = width as u64 + 2 * hpad as u64;
    let padded_height = height as u64 + 2 * vpad as u64;
    if padded_width > page_width as u64 || padded_height > page_height as u64 {
        log::warn!(
            "[atlas_operations::place_frame] Frame {}x{} (padded {}x{}) can never fit a {}x{} page",
            width,
            height,
            padded_width,
            padded_height,
            page_width,
            page_height
        );
        return Err(AtlasError::FrameTooLarge {
            width: u32::try_from(padded_width).unwrap_or(u32::MAX),
            height: u32::try_from(padded_height).unwrap_or(u32::MAX),
            page_width,
            page_height,
        });
    }

    let entry = data
        .entries
        .get_mut(entry_index)
        .ok_or(AtlasError::EntryNotFound { index: entry_index })?;
    if frame >= entry.frame_count as usize {
        return Err(AtlasError::FrameOutOfRange {
            frame,
            frame_count: entry.frame_count as usize,
        });
    }

    let id = entry_index as u32;

    for page in (0..packers.len()).rev() {
        if let Some(rect) = insert_rect(&mut packers[page], width, height, hpad, vpad, id) {
            let placement = FramePlacement {
                page: page as u32,
                rect: frame_rect(&rect),
            };
            set_entry_frame(entry, frame, placement.page, placement.rect);
            return Ok(placement);
        }
    }

    // No existing page has room: open a new one
    if data.pages.len() == data.pages.capacity() {
        data.pages
            .try_reserve_exact(ATLAS_PAGE_CAPACITY_STEP)
            .map_err(|_| AtlasError::AllocationFailed {
                what: "atlas pages".to_string(),
                requested: data.pages.len() + ATLAS_PAGE_CAPACITY_STEP,
            })?;
    }
    if packers.len() == packers.capacity() {
        packers
            .try_reserve_exact(ATLAS_PAGE_CAPACITY_STEP)
            .map_err(|_| AtlasError::AllocationFailed {
                what: "atlas packers".to_string(),
                requested: packers.len() + ATLAS_PAGE_CAPACITY_STEP,
            })?;
    }

    let surface = data
        .backend
        .allocate_surface(
            page_width,
            page_height,
            data.config.format,
            data.config.pixel_type,
        )
        .map_err(|e| {
            log::warn!(
                "[atlas_operations::place_frame] Failed to allocate page {}: {}",
                data.pages.len(),
                e
            );
            e
        })?;

    let mut packer = match create_packer(page_width, page_height, ATLAS_PAGE_PACKER_CAPACITY) {
        Ok(packer) => packer,
        Err(e) => {
            data.backend.release_surface(surface);
            return Err(e);
        }
    };

    let rect = match insert_rect(&mut packer, width, height, hpad, vpad, id) {
        Some(rect) => rect,
        None => {
            data.backend.release_surface(surface);
            return Err(AtlasError::Internal {
                message: format!(
                    "frame {}x{} rejected by an empty {}x{} page",
                    width, height, page_width, page_height
                ),
            });
        }
    };

    let page = data.pages.len() as u32;
    data.pages.push(surface);
    packers.push(packer);

    let placement = FramePlacement {
        page,
        rect: frame_rect(&rect),
    };
    set_entry_frame(entry, frame, page, placement.rect);

    log::debug!(
        "[atlas_operations::place_frame] Opened page {} for entry {} frame {}",
        page,
        entry_index,
        frame
    );

    Ok(placement)
}

fn frame_rect(rect: &PackerRect) -> FrameRect {
    FrameRect {
        x: rect.x,
        y: rect.y,
        width: rect.width,
        height: rect.height,
    }
}

/// Release the packers and the transfer buffer. Entries and pages stay valid.
pub fn freeze_atlas<B: AtlasBackend>(data: &mut AtlasData<B>) {
    let Some(packers) = data.packers.take() else {
        log::debug!("[atlas_operations::freeze] Atlas already frozen");
        return;
    };

    let packer_count = packers.len();
    for packer in packers {
        delete_packer(packer);
    }
    if let Some(stream) = data.transfer.take() {
        data.backend.release_buffer(stream.buffer);
    }

    log::debug!(
        "[atlas_operations::freeze] Froze atlas: released {} packers, {} entries remain",
        packer_count,
        data.entries.len()
    );
}

/// Transform local UV (0-1) to atlas UV
pub fn transform_uv(atlas_uv: &AtlasUV, local_uv: Vector2<f32>) -> Vector2<f32> {
    Vector2::new(
        atlas_uv.min.x + (atlas_uv.max.x - atlas_uv.min.x) * local_uv.x,
        atlas_uv.min.y + (atlas_uv.max.y - atlas_uv.min.y) * local_uv.y,
    )
}

/// UV coordinates of a placed frame
pub fn frame_uv<B: AtlasBackend>(
    data: &AtlasData<B>,
    entry_index: usize,
    frame: usize,
) -> Option<AtlasUV> {
    let (page, rect) = entry_frame(data.entries.get(entry_index)?, frame)?;
    let width = data.config.page_width as f32;
    let height = data.config.page_height as f32;

    Some(AtlasUV {
        page,
        min: Vector2::new(rect.x as f32 / width, rect.y as f32 / height),
        max: Vector2::new(
            (rect.x + rect.width) as f32 / width,
            (rect.y + rect.height) as f32 / height,
        ),
    })
}

/// Get atlas statistics
pub fn get_stats<B: AtlasBackend>(data: &AtlasData<B>) -> AtlasStats {
    let mut placed_frames = 0;
    let mut placed_area = 0u64;
    for entry in &data.entries {
        for (rect, &page) in entry_frames(entry).iter().zip(entry_pages(entry)) {
            if page != UNPLACED_PAGE {
                placed_frames += 1;
                placed_area += rect.width as u64 * rect.height as u64;
            }
        }
    }

    let page_area =
        data.pages.len() as u64 * data.config.page_width as u64 * data.config.page_height as u64;
    let utilization = if page_area == 0 {
        0.0
    } else {
        (placed_area as f64 / page_area as f64 * 100.0) as f32
    };

    AtlasStats {
        page_count: data.pages.len(),
        page_capacity: data.pages.capacity(),
        entry_count: data.entries.len(),
        placed_frames,
        bucket_count: data.names.buckets.len(),
        longest_bucket: longest_bucket(&data.names),
        frozen: is_frozen(data),
        placed_area,
        utilization,
    }
}
