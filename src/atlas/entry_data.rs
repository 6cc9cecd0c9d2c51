//! Atlas Entry Data - Pure DOP
//!
//! NO METHODS. Just data.
//! All transformations happen in entry_operations.rs

/// Entry has more than one frame (frame storage lives on the heap)
pub const ENTRY_FLAG_MULTIFRAME: u32 = 1 << 0;
/// Frames of this entry live on more than one page
pub const ENTRY_FLAG_MULTIPAGE: u32 = 1 << 1;

/// Page id of a frame slot that has not been placed yet
pub const UNPLACED_PAGE: u32 = u32::MAX;

/// Placement of one frame inside its page, content area only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Frame storage: single-frame entries keep their one slot inline
#[derive(Debug, Clone, PartialEq)]
pub enum EntryFrames {
    Inline { page: u32, frame: FrameRect },
    Heap { pages: Vec<u32>, frames: Vec<FrameRect> },
}

/// One named, possibly animated, logical image
#[derive(Debug, Clone, PartialEq)]
pub struct AtlasEntry {
    /// 32-bit name hash
    pub name: u32,
    pub frame_count: u32,
    pub flags: u32,
    /// Largest frame dimensions seen so far
    pub max_width: u32,
    pub max_height: u32,
    pub frames: EntryFrames,
}
