//! Texture Atlas - multi-page atlas built on the rectangle packer
//!
//! Entries are registered by 32-bit name, their frames are placed onto pages
//! (one packer per page), and pixel data is streamed into the placed regions
//! through a single circular transfer buffer.

pub mod atlas_data;
pub mod atlas_operations;
pub mod entry_data;
pub mod entry_operations;
pub mod name_index_data;
pub mod name_index_operations;
pub mod transfer_operations;

pub use atlas_data::{
    AtlasData, AtlasStats, AtlasUV, FramePlacement, SharedAtlas, TransferStream,
    ATLAS_ENTRY_GROW_LIMIT, ATLAS_PAGE_CAPACITY_STEP, ATLAS_PAGE_PACKER_CAPACITY,
};
pub use atlas_operations::{
    add_entry, add_named_entry, backend, backend_mut, create_atlas, create_shared_atlas,
    destroy_atlas, entry_count, find_entry, find_entry_index, find_named_entry, frame_uv,
    freeze_atlas, get_entry, get_stats, is_frozen, page_count, page_surfaces, place_frame,
    place_frame_padded, transform_uv,
};
pub use entry_data::{
    AtlasEntry, EntryFrames, FrameRect, ENTRY_FLAG_MULTIFRAME, ENTRY_FLAG_MULTIPAGE,
    UNPLACED_PAGE,
};
pub use entry_operations::{
    entry_frame, entry_frames, entry_pages, is_multiframe, is_multipage,
};
pub use name_index_data::{NameBucket, NameIndexData};
pub use name_index_operations::{hash_name, name_hash};
pub use transfer_operations::{transfer_frame, transfer_frame_image, transfer_frame_pod};
