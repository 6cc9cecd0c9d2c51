//! Atlas Entry Operations - Pure DOP Functions

use super::entry_data::{
    AtlasEntry, EntryFrames, FrameRect, ENTRY_FLAG_MULTIFRAME, ENTRY_FLAG_MULTIPAGE,
    UNPLACED_PAGE,
};
use crate::error::{AtlasError, AtlasResult};

/// Create an entry with `frame_count` unplaced frame slots
pub fn create_atlas_entry(name: u32, frame_count: u32) -> AtlasResult<AtlasEntry> {
    let frames = match frame_count {
        0 => {
            return Err(AtlasError::InvalidConfig {
                field: "frame_count".to_string(),
                value: "0".to_string(),
                reason: "an entry needs at least one frame".to_string(),
            })
        }
        1 => EntryFrames::Inline {
            page: UNPLACED_PAGE,
            frame: FrameRect::default(),
        },
        count => {
            let count = count as usize;
            let mut pages = Vec::new();
            let mut frames = Vec::new();
            if pages.try_reserve_exact(count).is_err() || frames.try_reserve_exact(count).is_err() {
                return Err(AtlasError::AllocationFailed {
                    what: "entry frames".to_string(),
                    requested: count,
                });
            }
            pages.resize(count, UNPLACED_PAGE);
            frames.resize(count, FrameRect::default());
            EntryFrames::Heap { pages, frames }
        }
    };

    let flags = if frame_count > 1 {
        ENTRY_FLAG_MULTIFRAME
    } else {
        0
    };

    Ok(AtlasEntry {
        name,
        frame_count,
        flags,
        max_width: 0,
        max_height: 0,
        frames,
    })
}

/// Release an entry. Only multi-frame entries own separate frame storage.
pub fn delete_atlas_entry(entry: AtlasEntry) {
    if let EntryFrames::Heap { frames, .. } = &entry.frames {
        log::trace!(
            "[entry_operations::delete] Releasing {} frame slots of entry {:#010x}",
            frames.len(),
            entry.name
        );
    }
}

/// Frame rectangles of an entry, one per frame slot
pub fn entry_frames(entry: &AtlasEntry) -> &[FrameRect] {
    match &entry.frames {
        EntryFrames::Inline { frame, .. } => std::slice::from_ref(frame),
        EntryFrames::Heap { frames, .. } => frames,
    }
}

/// Page ids of an entry, one per frame slot (`UNPLACED_PAGE` if not placed)
pub fn entry_pages(entry: &AtlasEntry) -> &[u32] {
    match &entry.frames {
        EntryFrames::Inline { page, .. } => std::slice::from_ref(page),
        EntryFrames::Heap { pages, .. } => pages,
    }
}

/// Page and rectangle of a placed frame
pub fn entry_frame(entry: &AtlasEntry, frame_index: usize) -> Option<(u32, FrameRect)> {
    let page = *entry_pages(entry).get(frame_index)?;
    if page == UNPLACED_PAGE {
        return None;
    }
    Some((page, entry_frames(entry)[frame_index]))
}

pub fn is_multiframe(entry: &AtlasEntry) -> bool {
    entry.flags & ENTRY_FLAG_MULTIFRAME != 0
}

pub fn is_multipage(entry: &AtlasEntry) -> bool {
    entry.flags & ENTRY_FLAG_MULTIPAGE != 0
}

/// Record the placement of one frame.
///
/// # Panics
///
/// Panics if `frame_index >= entry.frame_count`.
pub fn set_entry_frame(entry: &mut AtlasEntry, frame_index: usize, page: u32, frame: FrameRect) {
    let spans_pages = entry_pages(entry)
        .iter()
        .enumerate()
        .any(|(i, &other)| i != frame_index && other != UNPLACED_PAGE && other != page);

    match &mut entry.frames {
        EntryFrames::Inline {
            page: slot_page,
            frame: slot_frame,
        } => {
            assert!(frame_index == 0, "frame index {} out of range", frame_index);
            *slot_page = page;
            *slot_frame = frame;
        }
        EntryFrames::Heap { pages, frames } => {
            pages[frame_index] = page;
            frames[frame_index] = frame;
        }
    }

    entry.max_width = entry.max_width.max(frame.width);
    entry.max_height = entry.max_height.max(frame.height);
    if spans_pages {
        entry.flags |= ENTRY_FLAG_MULTIPAGE;
    }
}
